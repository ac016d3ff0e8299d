//! Feed eligibility filters
//!
//! The feed endpoint accepts at most one human-readable name per taxonomy
//! dimension. Names resolve to ids before any content query runs: sectors
//! and sub-sectors against the cached taxonomy snapshot, signals against
//! the lists the caller fetched. A name that resolves to nothing is a
//! soft miss for the whole request, not an error.

use bson::{doc, oid::ObjectId, DateTime, Document};
use serde::Deserialize;

use super::resolution::{EmptyReason, Resolution};
use crate::cache::TaxonomySnapshot;
use crate::db::schemas::{SignalDoc, SubSignalDoc};

/// Raw filter names from the feed request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedFilterNames {
    pub sector: Option<String>,
    pub sub_sector: Option<String>,
    pub signal_category: Option<String>,
    pub signal_sub_category: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl FeedFilterNames {
    /// Whether any signal-side name needs resolving; tells the caller
    /// whether the signal lists are worth fetching.
    pub fn wants_signals(&self) -> bool {
        present(&self.signal_category).is_some() || present(&self.signal_sub_category).is_some()
    }
}

/// Resolved taxonomy ids narrowing the feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFilter {
    pub sector: Option<ObjectId>,
    pub sub_sector: Option<ObjectId>,
    pub signal_category: Option<ObjectId>,
    pub signal_sub_category: Option<ObjectId>,
}

impl FeedFilter {
    /// Eligibility filter over contexts. Each resolved id must appear in
    /// the matching array field; Mongo array equality gives contains.
    pub fn to_filter(&self) -> Document {
        let mut filter = doc! {};
        if let Some(id) = self.sector {
            filter.insert("sectors", id);
        }
        if let Some(id) = self.sub_sector {
            filter.insert("sub_sectors", id);
        }
        if let Some(id) = self.signal_category {
            filter.insert("signal_categories", id);
        }
        if let Some(id) = self.signal_sub_category {
            filter.insert("signal_sub_categories", id);
        }
        filter
    }

    /// Eligibility filter bounded to one day's inclusive window.
    pub fn to_day_filter(&self, start: DateTime, end: DateTime) -> Document {
        let mut filter = self.to_filter();
        filter.insert("publish_date", doc! { "$gte": start, "$lte": end });
        filter
    }
}

fn signal_id_by_name(signals: &[SignalDoc], name: &str) -> Option<ObjectId> {
    signals
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .and_then(|s| s._id)
}

fn sub_signal_id_by_name(sub_signals: &[SubSignalDoc], name: &str) -> Option<ObjectId> {
    sub_signals
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .and_then(|s| s._id)
}

/// Resolve request names to a [`FeedFilter`].
///
/// Blank names count as absent. Any present name that matches nothing
/// resolves the whole request to `Empty(UnknownFilter)`.
pub fn resolve_filter(
    names: &FeedFilterNames,
    snapshot: &TaxonomySnapshot,
    signals: &[SignalDoc],
    sub_signals: &[SubSignalDoc],
) -> Resolution<FeedFilter> {
    let mut filter = FeedFilter::default();

    if let Some(name) = present(&names.sector) {
        match snapshot.sector_id_by_name(name) {
            Some(id) => filter.sector = Some(id),
            None => return Resolution::Empty(EmptyReason::UnknownFilter),
        }
    }

    if let Some(name) = present(&names.sub_sector) {
        match snapshot.sub_sector_id_by_name(name) {
            Some(id) => filter.sub_sector = Some(id),
            None => return Resolution::Empty(EmptyReason::UnknownFilter),
        }
    }

    if let Some(name) = present(&names.signal_category) {
        match signal_id_by_name(signals, name) {
            Some(id) => filter.signal_category = Some(id),
            None => return Resolution::Empty(EmptyReason::UnknownFilter),
        }
    }

    if let Some(name) = present(&names.signal_sub_category) {
        match sub_signal_id_by_name(sub_signals, name) {
            Some(id) => filter.signal_sub_category = Some(id),
            None => return Resolution::Empty(EmptyReason::UnknownFilter),
        }
    }

    Resolution::Found(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{Metadata, SectorDoc, SubSectorDoc};

    fn snapshot() -> TaxonomySnapshot {
        let fintech = ObjectId::new();
        TaxonomySnapshot {
            sectors: vec![SectorDoc {
                _id: Some(fintech),
                metadata: Metadata::default(),
                name: "Fintech".to_string(),
            }],
            sub_sectors: vec![SubSectorDoc {
                _id: Some(ObjectId::new()),
                metadata: Metadata::default(),
                name: "BNPL".to_string(),
                sector_id: fintech,
            }],
        }
    }

    fn signals() -> Vec<SignalDoc> {
        vec![SignalDoc {
            _id: Some(ObjectId::new()),
            metadata: Metadata::default(),
            name: "Regulation".to_string(),
        }]
    }

    #[test]
    fn test_resolve_known_names() {
        let names = FeedFilterNames {
            sector: Some("fintech".to_string()),
            signal_category: Some("Regulation".to_string()),
            ..Default::default()
        };
        let resolved = resolve_filter(&names, &snapshot(), &signals(), &[]);
        match resolved {
            Resolution::Found(filter) => {
                assert!(filter.sector.is_some());
                assert!(filter.signal_category.is_some());
                assert!(filter.sub_sector.is_none());
            }
            Resolution::Empty(reason) => panic!("unexpected soft miss: {reason:?}"),
        }
    }

    #[test]
    fn test_unknown_name_is_soft_miss() {
        let names = FeedFilterNames {
            sector: Some("Aerospace".to_string()),
            ..Default::default()
        };
        let resolved = resolve_filter(&names, &snapshot(), &[], &[]);
        assert_eq!(resolved, Resolution::Empty(EmptyReason::UnknownFilter));

        let names = FeedFilterNames {
            signal_sub_category: Some("nope".to_string()),
            ..Default::default()
        };
        let resolved = resolve_filter(&names, &snapshot(), &signals(), &[]);
        assert_eq!(resolved, Resolution::Empty(EmptyReason::UnknownFilter));
    }

    #[test]
    fn test_blank_names_are_absent() {
        let names = FeedFilterNames {
            sector: Some("   ".to_string()),
            sub_sector: Some(String::new()),
            ..Default::default()
        };
        assert!(!names.wants_signals());
        let resolved = resolve_filter(&names, &snapshot(), &[], &[]);
        match resolved {
            Resolution::Found(filter) => {
                assert!(filter.sector.is_none());
                assert!(filter.sub_sector.is_none());
            }
            Resolution::Empty(reason) => panic!("unexpected soft miss: {reason:?}"),
        }
    }

    #[test]
    fn test_filter_document_composition() {
        let sector = ObjectId::new();
        let signal = ObjectId::new();
        let filter = FeedFilter {
            sector: Some(sector),
            signal_category: Some(signal),
            ..Default::default()
        };

        let doc = filter.to_filter();
        assert_eq!(doc.get_object_id("sectors").unwrap(), sector);
        assert_eq!(doc.get_object_id("signal_categories").unwrap(), signal);
        assert!(!doc.contains_key("sub_sectors"));

        let empty = FeedFilter::default().to_filter();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_day_filter_bounds_publish_date() {
        let start = DateTime::from_millis(1_700_000_000_000);
        let end = DateTime::from_millis(1_700_086_399_999);
        let doc = FeedFilter::default().to_day_filter(start, end);
        let window = doc.get_document("publish_date").unwrap();
        assert_eq!(window.get_datetime("$gte").unwrap(), &start);
        assert_eq!(window.get_datetime("$lte").unwrap(), &end);
    }
}
