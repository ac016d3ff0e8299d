//! OAuth State Schema
//!
//! Stores CSRF state tokens for the provider login flow. A state token is
//! minted when the client is redirected to Google or LinkedIn and consumed
//! exactly once when the provider calls back. Tokens are short-lived
//! (10 minutes) and single-use.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::metadata::Metadata;
use super::user::AuthProvider;
use crate::db::mongo::{IntoIndexes, MutMetadata};

/// Collection name for OAuth state tokens
pub const OAUTH_STATE_COLLECTION: &str = "oauth_states";

/// CSRF state token for an in-flight provider login.
///
/// Created by GET /auth/oauth/{provider}/start, consumed by the matching
/// callback. The TTL index reaps expired tokens server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthStateDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Standard metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Random state token echoed back by the provider
    #[serde(default)]
    pub state: String,

    /// Which provider the login started against
    #[serde(default)]
    pub provider: AuthProvider,

    /// When the token expires (10 minutes from creation)
    #[serde(default = "default_expires_at")]
    pub expires_at: DateTime,

    /// Whether the token has been consumed (tokens are single-use)
    #[serde(default)]
    pub used: bool,
}

fn default_expires_at() -> DateTime {
    DateTime::now()
}

impl Default for OAuthStateDoc {
    fn default() -> Self {
        Self {
            id: None,
            metadata: Metadata::default(),
            state: String::new(),
            provider: AuthProvider::default(),
            expires_at: default_expires_at(),
            used: false,
        }
    }
}

/// How long a state token stays redeemable
pub const STATE_TTL_MINUTES: i64 = 10;

impl OAuthStateDoc {
    /// Create a new state token with 10-minute expiry.
    pub fn new(state: String, provider: AuthProvider) -> Self {
        Self {
            id: None,
            metadata: Metadata::new(),
            state,
            provider,
            expires_at: DateTime::from_chrono(
                chrono::Utc::now() + chrono::Duration::minutes(STATE_TTL_MINUTES),
            ),
            used: false,
        }
    }

    /// Check if the state token is still valid.
    pub fn is_valid(&self) -> bool {
        !self.used && !self.metadata.is_deleted && DateTime::now() < self.expires_at
    }
}

impl IntoIndexes for OAuthStateDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the state token
            (
                doc! { "state": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("state_unique".to_string())
                        .build(),
                ),
            ),
            // TTL index for automatic expiration cleanup
            (
                doc! { "expires_at": 1 },
                Some(
                    IndexOptions::builder()
                        .expire_after(std::time::Duration::from_secs(0))
                        .name("expires_at_ttl".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for OAuthStateDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_valid() {
        let state = OAuthStateDoc::new("state123".to_string(), AuthProvider::Google);
        assert!(state.is_valid());
    }

    #[test]
    fn test_used_state_is_invalid() {
        let mut state = OAuthStateDoc::new("state123".to_string(), AuthProvider::LinkedIn);
        state.used = true;
        assert!(!state.is_valid());
    }

    #[test]
    fn test_expired_state_is_invalid() {
        let mut state = OAuthStateDoc::new("state123".to_string(), AuthProvider::Google);
        state.expires_at =
            DateTime::from_chrono(chrono::Utc::now() - chrono::Duration::minutes(1));
        assert!(!state.is_valid());
    }
}
