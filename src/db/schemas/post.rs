//! Post document schema
//!
//! Posts are the individual content items referenced by contexts. The
//! expert-opinion rail of a context detail page is carved out of these by
//! kind and trending flag.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for posts
pub const POST_COLLECTION: &str = "posts";

/// Editorial kind of a post
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PostKind {
    ExpertOpinion,
    Infographic,
    Interview,
    #[default]
    News,
    ResearchReport,
    LoyaltyProgram,
    Podcast,
    Webinar,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::ExpertOpinion => "expert-opinion",
            PostKind::Infographic => "infographic",
            PostKind::Interview => "interview",
            PostKind::News => "news",
            PostKind::ResearchReport => "research-report",
            PostKind::LoyaltyProgram => "loyalty-program",
            PostKind::Podcast => "podcast",
            PostKind::Webinar => "webinar",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    /// URL-safe identifier, unique across posts
    pub slug: String,

    #[serde(default)]
    pub post_type: PostKind,

    pub publish_date: DateTime,

    #[serde(default)]
    pub is_trending: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// External links backing the post
    #[serde(default)]
    pub source_urls: Vec<String>,

    /// Publisher, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ObjectId>,

    /// Contexts that reference this post; kept in sync at context write time
    #[serde(default)]
    pub contexts: Vec<ObjectId>,

    /// Optional client rendering template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_template: Option<ObjectId>,
}

impl Default for PostDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            title: String::new(),
            slug: String::new(),
            post_type: PostKind::default(),
            publish_date: DateTime::now(),
            is_trending: false,
            summary: None,
            source_urls: Vec::new(),
            source: None,
            contexts: Vec::new(),
            display_template: None,
        }
    }
}

impl PostDoc {
    pub fn new(title: impl Into<String>, slug: impl Into<String>, publish_date: DateTime) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            publish_date,
            ..Default::default()
        }
    }
}

impl IntoIndexes for PostDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "slug": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("slug_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "publish_date": -1 },
                Some(
                    IndexOptions::builder()
                        .name("publish_date_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PostDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_kind_wire_names() {
        for kind in [
            PostKind::ExpertOpinion,
            PostKind::Infographic,
            PostKind::Interview,
            PostKind::News,
            PostKind::ResearchReport,
            PostKind::LoyaltyProgram,
            PostKind::Podcast,
            PostKind::Webinar,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_post_kind_default_is_news() {
        let doc = doc! {
            "title": "Untyped",
            "slug": "untyped",
            "publish_date": DateTime::now(),
        };
        let post: PostDoc = bson::from_document(doc).unwrap();
        assert_eq!(post.post_type, PostKind::News);
    }
}
