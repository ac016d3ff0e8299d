//! Database schemas for Veerive
//!
//! Defines MongoDB document structures for taxonomy, content, users, and
//! OAuth state.

mod context;
mod message;
mod metadata;
mod oauth_state;
mod post;
mod taxonomy;
mod theme;
mod user;

pub use context::{
    ContainerKind, ContextDoc, ContextPostRef, PdfAttachment, Slide, CONTEXT_COLLECTION,
    MAX_SLIDES,
};
pub use message::{MessageDoc, MESSAGE_COLLECTION};
pub use metadata::Metadata;
pub use oauth_state::{OAuthStateDoc, OAUTH_STATE_COLLECTION};
pub use post::{PostDoc, PostKind, POST_COLLECTION};
pub use taxonomy::{
    SectorDoc, SignalDoc, SourceDoc, SubSectorDoc, SubSignalDoc, SECTOR_COLLECTION,
    SIGNAL_COLLECTION, SOURCE_COLLECTION, SUB_SECTOR_COLLECTION, SUB_SIGNAL_COLLECTION,
};
pub use theme::{NarrativeBlock, ThemeDoc, TrendAnalysis, THEME_COLLECTION};
pub use user::{AuthProvider, SavedItem, SavedKind, UserDoc, USER_COLLECTION};
