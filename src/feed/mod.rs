//! Feed domain logic
//!
//! Everything between the HTTP surface and the collections: day-based
//! pagination, filter resolution, related-content matching, and the
//! display-ready view shapes. Query construction is kept pure so it can
//! be tested without a database.

use bson::oid::ObjectId;

use crate::db::schemas::ContextDoc;

pub mod filters;
pub mod paginator;
pub mod related;
pub mod resolution;
pub mod slug;
pub mod views;

pub use filters::{resolve_filter, FeedFilter, FeedFilterNames};
pub use paginator::DayPage;
pub use resolution::{EmptyReason, Resolution};
pub use views::{load_view_data, FeedResponse, ViewData};

/// Drop repeated contexts by id, keeping first occurrence order.
///
/// Both the paginator and the related-content resolver promise
/// duplicate-free results; a context can match several query branches.
pub fn dedup_contexts(contexts: Vec<ContextDoc>) -> Vec<ContextDoc> {
    let mut seen: Vec<ObjectId> = Vec::with_capacity(contexts.len());
    contexts
        .into_iter()
        .filter(|ctx| match ctx._id {
            Some(id) => {
                if seen.contains(&id) {
                    false
                } else {
                    seen.push(id);
                    true
                }
            }
            // Unsaved documents cannot collide; keep them
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut first = ContextDoc::default();
        first._id = Some(a);
        first.title = "first".to_string();
        let mut dup = ContextDoc::default();
        dup._id = Some(a);
        dup.title = "dup".to_string();
        let mut other = ContextDoc::default();
        other._id = Some(b);

        let out = dedup_contexts(vec![first, dup, other]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "first");
        assert_eq!(out[1]._id, Some(b));
    }
}
