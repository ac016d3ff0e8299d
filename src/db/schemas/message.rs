//! Message document schema
//!
//! Short editorial notes pinned to a calendar date. The feed response
//! includes the messages whose publish date falls inside the requested
//! page's day window.

use bson::{doc, DateTime, Document};
use bson::oid::ObjectId;
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for messages
pub const MESSAGE_COLLECTION: &str = "messages";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub body: String,

    /// Day the message belongs to in the feed
    pub publish_date: DateTime,
}

impl Default for MessageDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            title: None,
            body: String::new(),
            publish_date: DateTime::now(),
        }
    }
}

impl MessageDoc {
    pub fn new(body: impl Into<String>, publish_date: DateTime) -> Self {
        Self {
            body: body.into(),
            publish_date,
            ..Default::default()
        }
    }
}

impl IntoIndexes for MessageDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "publish_date": -1 },
            Some(
                IndexOptions::builder()
                    .name("publish_date_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for MessageDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
