//! Theme document schema
//!
//! Themes are long-running narratives scored for trendiness. They are
//! tagged with sector/sub-sector ids only, which is what the two-tier
//! related-theme fallback keys on.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for themes
pub const THEME_COLLECTION: &str = "themes";

/// Titled prose section inside a theme's trend analysis
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct NarrativeBlock {
    pub heading: String,
    pub body: String,
}

/// Structured analysis attached to a theme
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TrendAnalysis {
    #[serde(default)]
    pub overall_summary: String,

    #[serde(default)]
    pub drivers: Vec<NarrativeBlock>,

    #[serde(default)]
    pub regional_insights: Vec<NarrativeBlock>,

    #[serde(default)]
    pub consumer_insights: Vec<NarrativeBlock>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ThemeDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    /// URL-safe identifier, unique across themes
    pub slug: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub is_trending: bool,

    /// Composite editorial score used to rank trending themes
    #[serde(default)]
    pub trending_score: f64,

    #[serde(default)]
    pub impact_score: f64,

    #[serde(default)]
    pub predictive_momentum_score: f64,

    #[serde(default)]
    pub sectors: Vec<ObjectId>,

    #[serde(default)]
    pub sub_sectors: Vec<ObjectId>,

    #[serde(default)]
    pub trend_analysis: TrendAnalysis,
}

impl ThemeDoc {
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            ..Default::default()
        }
    }
}

impl IntoIndexes for ThemeDoc {
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
            // Fallback tiers query trending themes by sub-sector, then sector
            (
                doc! { "is_trending": 1, "sub_sectors": 1 },
                Some(
                    IndexOptions::builder()
                        .name("trending_sub_sector_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "is_trending": 1, "sectors": 1 },
                Some(
                    IndexOptions::builder()
                        .name("trending_sector_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ThemeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_default_to_zero() {
        let doc = doc! { "title": "Bare", "slug": "bare" };
        let theme: ThemeDoc = bson::from_document(doc).unwrap();
        assert_eq!(theme.trending_score, 0.0);
        assert_eq!(theme.impact_score, 0.0);
        assert_eq!(theme.predictive_momentum_score, 0.0);
        assert!(!theme.is_trending);
        assert!(theme.trend_analysis.drivers.is_empty());
    }
}
