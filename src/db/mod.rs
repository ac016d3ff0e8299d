//! Database layer
//!
//! MongoDB client wrapper plus the document schemas for content, taxonomy,
//! users, and OAuth state.

pub mod collections;
pub mod mongo;
pub mod schemas;

pub use collections::Collections;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
