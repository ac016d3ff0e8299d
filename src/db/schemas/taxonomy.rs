//! Taxonomy document schemas
//!
//! A two-axis, two-level taxonomy categorizes all content:
//! sectors own sub-sectors, signals own sub-signals. Sub-entities reference
//! their parent by id. Sources are the publishers referenced by posts.
//!
//! All of these are created out-of-band and read-mostly here; names are
//! unique per collection and double as the human-readable filter values
//! accepted by the feed endpoint.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for sectors
pub const SECTOR_COLLECTION: &str = "sectors";
/// Collection name for sub-sectors
pub const SUB_SECTOR_COLLECTION: &str = "sub_sectors";
/// Collection name for signals
pub const SIGNAL_COLLECTION: &str = "signals";
/// Collection name for sub-signals
pub const SUB_SIGNAL_COLLECTION: &str = "sub_signals";
/// Collection name for sources
pub const SOURCE_COLLECTION: &str = "sources";

/// Top-level sector (e.g. "Retail", "Financial Services")
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SectorDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Display name, unique across sectors
    pub name: String,
}

impl SectorDoc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name: name.into(),
        }
    }
}

impl IntoIndexes for SectorDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("name_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for SectorDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Sub-sector belonging to one sector
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SubSectorDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Display name, unique across sub-sectors
    pub name: String,

    /// Parent sector id
    pub sector_id: ObjectId,
}

impl SubSectorDoc {
    pub fn new(name: impl Into<String>, sector_id: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name: name.into(),
            sector_id,
        }
    }
}

impl IntoIndexes for SubSectorDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("name_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "sector_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("sector_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for SubSectorDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Signal category (e.g. "Consumer Behavior", "Regulation")
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SignalDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Display name, unique across signals
    pub name: String,
}

impl SignalDoc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name: name.into(),
        }
    }
}

impl IntoIndexes for SignalDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("name_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for SignalDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Sub-signal belonging to one signal category
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SubSignalDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Display name, unique across sub-signals
    pub name: String,

    /// Parent signal id
    pub signal_id: ObjectId,
}

impl SubSignalDoc {
    pub fn new(name: impl Into<String>, signal_id: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name: name.into(),
            signal_id,
        }
    }
}

impl IntoIndexes for SubSignalDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("name_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "signal_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("signal_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for SubSignalDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Publisher referenced by posts
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SourceDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Publisher display name, unique across sources
    pub name: String,
}

impl SourceDoc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name: name.into(),
        }
    }
}

impl IntoIndexes for SourceDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("name_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for SourceDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
