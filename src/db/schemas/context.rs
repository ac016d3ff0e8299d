//! Context document schema
//!
//! A context is the primary feed container: a dated, taxonomy-tagged
//! collection of posts rendered as one card in the daily feed. Contexts
//! carry denormalized taxonomy id arrays so related-content resolution
//! can match (sub-sector, signal) pairs with plain array queries.

use bson::{doc, oid::ObjectId, Binary, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for contexts
pub const CONTEXT_COLLECTION: &str = "contexts";

/// Hard cap on slides per context; setters truncate beyond this.
pub const MAX_SLIDES: usize = 10;

/// Presentation container used by the feed client to pick a card layout
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerKind {
    #[default]
    ArticleCard,
    SlideCarousel,
    StatSpotlight,
    QuoteBoard,
    VideoFeature,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::ArticleCard => "article-card",
            ContainerKind::SlideCarousel => "slide-carousel",
            ContainerKind::StatSpotlight => "stat-spotlight",
            ContainerKind::QuoteBoard => "quote-board",
            ContainerKind::VideoFeature => "video-feature",
        }
    }
}

/// Reference from a context to one of its posts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ContextPostRef {
    pub post_id: ObjectId,

    /// Whether the post renders inside the context card itself
    #[serde(default)]
    pub include_in_container: bool,
}

/// One slide of a slide-carousel context
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Slide {
    pub title: String,
    pub description: String,
}

/// Uploaded PDF stored inline with its content hash for ETag responses
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PdfAttachment {
    pub file_name: String,
    pub content_type: String,
    /// List reads project `pdf.data` out; the bytes deserialize empty and
    /// only the download route fetches them
    #[serde(default = "empty_binary")]
    pub data: Binary,
    /// Hex sha256 of `data`, computed at upload time
    pub sha256: String,
    pub size_bytes: i64,
}

fn empty_binary() -> Binary {
    Binary {
        subtype: bson::spec::BinarySubtype::Generic,
        bytes: Vec::new(),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ContextDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    /// URL-safe identifier, unique across contexts, derived from title at
    /// write time
    pub slug: String,

    /// Date the context appears under in the day-paged feed
    pub publish_date: DateTime,

    #[serde(default)]
    pub is_trending: bool,

    /// Ascending sort key within a feed day; ties fall back to recency
    #[serde(default)]
    pub display_order: i32,

    #[serde(default)]
    pub container_kind: ContainerKind,

    // Denormalized taxonomy tags. Sub-entities are stored alongside their
    // parents rather than resolved through them at query time.
    #[serde(default)]
    pub sectors: Vec<ObjectId>,
    #[serde(default)]
    pub sub_sectors: Vec<ObjectId>,
    #[serde(default)]
    pub signal_categories: Vec<ObjectId>,
    #[serde(default)]
    pub signal_sub_categories: Vec<ObjectId>,

    /// Themes this context develops
    #[serde(default)]
    pub themes: Vec<ObjectId>,

    #[serde(default)]
    pub posts: Vec<ContextPostRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default)]
    pub slides: Vec<Slide>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_image: Option<String>,

    /// Inline PDF. List queries keep the metadata but project the bytes
    /// out; only the download route reads them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfAttachment>,
}

impl Default for ContextDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            title: String::new(),
            slug: String::new(),
            publish_date: DateTime::now(),
            is_trending: false,
            display_order: 0,
            container_kind: ContainerKind::default(),
            sectors: Vec::new(),
            sub_sectors: Vec::new(),
            signal_categories: Vec::new(),
            signal_sub_categories: Vec::new(),
            themes: Vec::new(),
            posts: Vec::new(),
            summary: None,
            slides: Vec::new(),
            banner_image: None,
            pdf: None,
        }
    }
}

impl ContextDoc {
    pub fn new(title: impl Into<String>, slug: impl Into<String>, publish_date: DateTime) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            publish_date,
            ..Default::default()
        }
    }

    /// Replace the slide deck, truncating past [`MAX_SLIDES`].
    pub fn set_slides(&mut self, mut slides: Vec<Slide>) {
        slides.truncate(MAX_SLIDES);
        self.slides = slides;
    }

    /// Ids of posts flagged for in-container rendering, in stored order.
    pub fn container_post_ids(&self) -> Vec<ObjectId> {
        self.posts
            .iter()
            .filter(|p| p.include_in_container)
            .map(|p| p.post_id)
            .collect()
    }

    /// Ids of every referenced post, flagged or not.
    pub fn all_post_ids(&self) -> Vec<ObjectId> {
        self.posts.iter().map(|p| p.post_id).collect()
    }
}

impl IntoIndexes for ContextDoc {
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
            // Multikey pair index backing related-content (sub-sector, signal)
            // lookups
            (
                doc! { "sub_sectors": 1, "signal_categories": 1 },
                Some(
                    IndexOptions::builder()
                        .name("sub_sector_signal_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ContextDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_kind_wire_names() {
        let kind = ContainerKind::SlideCarousel;
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, "\"slide-carousel\"");
        assert_eq!(kind.as_str(), "slide-carousel");

        // Every variant's as_str matches its serde name
        for kind in [
            ContainerKind::ArticleCard,
            ContainerKind::SlideCarousel,
            ContainerKind::StatSpotlight,
            ContainerKind::QuoteBoard,
            ContainerKind::VideoFeature,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_slide_deck_truncates() {
        let mut ctx = ContextDoc::new("Title", "title", DateTime::now());
        let slides = (0..15)
            .map(|i| Slide {
                title: format!("Slide {i}"),
                description: String::new(),
            })
            .collect();
        ctx.set_slides(slides);
        assert_eq!(ctx.slides.len(), MAX_SLIDES);
        assert_eq!(ctx.slides[9].title, "Slide 9");
    }

    #[test]
    fn test_container_post_ids_filters_flag() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut ctx = ContextDoc::default();
        ctx.posts = vec![
            ContextPostRef {
                post_id: a,
                include_in_container: true,
            },
            ContextPostRef {
                post_id: b,
                include_in_container: false,
            },
        ];
        assert_eq!(ctx.container_post_ids(), vec![a]);
        assert_eq!(ctx.all_post_ids(), vec![a, b]);
    }

    #[test]
    fn test_missing_fields_deserialize_with_defaults() {
        // Documents written before newer fields existed still load
        let doc = doc! {
            "title": "Legacy",
            "slug": "legacy",
            "publish_date": DateTime::now(),
        };
        let ctx: ContextDoc = bson::from_document(doc).unwrap();
        assert_eq!(ctx.container_kind, ContainerKind::ArticleCard);
        assert!(!ctx.is_trending);
        assert!(ctx.posts.is_empty());
        assert!(ctx.pdf.is_none());
    }
}
