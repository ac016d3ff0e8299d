//! Typed collection handles
//!
//! Constructed once at startup so index creation runs a single time, then
//! shared through app state.

use super::mongo::{MongoClient, MongoCollection};
use super::schemas::{
    ContextDoc, MessageDoc, OAuthStateDoc, PostDoc, SectorDoc, SignalDoc, SourceDoc, SubSectorDoc,
    SubSignalDoc, ThemeDoc, UserDoc, CONTEXT_COLLECTION, MESSAGE_COLLECTION,
    OAUTH_STATE_COLLECTION, POST_COLLECTION, SECTOR_COLLECTION, SIGNAL_COLLECTION,
    SOURCE_COLLECTION, SUB_SECTOR_COLLECTION, SUB_SIGNAL_COLLECTION, THEME_COLLECTION,
    USER_COLLECTION,
};
use crate::types::Result;

/// One handle per collection, with schema indexes applied.
pub struct Collections {
    pub contexts: MongoCollection<ContextDoc>,
    pub posts: MongoCollection<PostDoc>,
    pub themes: MongoCollection<ThemeDoc>,
    pub messages: MongoCollection<MessageDoc>,
    pub sectors: MongoCollection<SectorDoc>,
    pub sub_sectors: MongoCollection<SubSectorDoc>,
    pub signals: MongoCollection<SignalDoc>,
    pub sub_signals: MongoCollection<SubSignalDoc>,
    pub sources: MongoCollection<SourceDoc>,
    pub users: MongoCollection<UserDoc>,
    pub oauth_states: MongoCollection<OAuthStateDoc>,
}

impl Collections {
    pub async fn init(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            contexts: client.collection(CONTEXT_COLLECTION).await?,
            posts: client.collection(POST_COLLECTION).await?,
            themes: client.collection(THEME_COLLECTION).await?,
            messages: client.collection(MESSAGE_COLLECTION).await?,
            sectors: client.collection(SECTOR_COLLECTION).await?,
            sub_sectors: client.collection(SUB_SECTOR_COLLECTION).await?,
            signals: client.collection(SIGNAL_COLLECTION).await?,
            sub_signals: client.collection(SUB_SIGNAL_COLLECTION).await?,
            sources: client.collection(SOURCE_COLLECTION).await?,
            users: client.collection(USER_COLLECTION).await?,
            oauth_states: client.collection(OAUTH_STATE_COLLECTION).await?,
        })
    }
}
