//! User document schema
//!
//! Stores user credentials, OAuth identity mappings, and saved items.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// How the account authenticates
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Email + password
    #[default]
    Local,
    Google,
    LinkedIn,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
            AuthProvider::LinkedIn => "linkedin",
        }
    }
}

/// What a saved item points at
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SavedKind {
    Context,
    Post,
    Theme,
}

impl SavedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavedKind::Context => "context",
            SavedKind::Post => "post",
            SavedKind::Theme => "theme",
        }
    }
}

/// One bookmarked item in a user's saved list
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SavedItem {
    pub item_id: ObjectId,
    pub kind: SavedKind,
    pub saved_at: DateTime,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Login email, unique across users
    pub email: String,

    /// Argon2 password hash; absent for OAuth-only accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    #[serde(default)]
    pub auth_provider: AuthProvider,

    /// Provider-side subject id for OAuth accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_subject: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Bookmarks, mutated only through guarded $push / $pull updates
    #[serde(default)]
    pub saved_items: Vec<SavedItem>,

    /// Token version for invalidation (increment to invalidate all tokens)
    #[serde(default)]
    pub token_version: i32,

    /// Whether the user account is active
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a password-backed local account
    pub fn new_local(email: String, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            email,
            password_hash: Some(password_hash),
            auth_provider: AuthProvider::Local,
            provider_subject: None,
            display_name: None,
            saved_items: Vec::new(),
            token_version: 1,
            is_active: true,
        }
    }

    /// Create an OAuth-backed account with no local password
    pub fn new_oauth(
        email: String,
        provider: AuthProvider,
        provider_subject: String,
        display_name: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            email,
            password_hash: None,
            auth_provider: provider,
            provider_subject: Some(provider_subject),
            display_name,
            saved_items: Vec::new(),
            token_version: 1,
            is_active: true,
        }
    }

    pub fn has_saved(&self, item_id: &ObjectId, kind: SavedKind) -> bool {
        self.saved_items
            .iter()
            .any(|s| s.item_id == *item_id && s.kind == kind)
    }

    /// Document id as a hex string; empty for an unsaved document
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Index on provider subject for OAuth logins
            (
                doc! { "auth_provider": 1, "provider_subject": 1 },
                Some(
                    IndexOptions::builder()
                        .name("provider_subject_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_kind_wire_names() {
        for kind in [SavedKind::Context, SavedKind::Post, SavedKind::Theme] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_has_saved_matches_id_and_kind() {
        let id = ObjectId::new();
        let mut user = UserDoc::new_local("a@b.com".into(), "hash".into());
        user.saved_items.push(SavedItem {
            item_id: id,
            kind: SavedKind::Post,
            saved_at: DateTime::now(),
        });

        assert!(user.has_saved(&id, SavedKind::Post));
        // Same id under a different kind is a different bookmark
        assert!(!user.has_saved(&id, SavedKind::Context));
        assert!(!user.has_saved(&ObjectId::new(), SavedKind::Post));
    }

    #[test]
    fn test_oauth_account_has_no_password() {
        let user = UserDoc::new_oauth(
            "a@b.com".into(),
            AuthProvider::Google,
            "sub-123".into(),
            Some("Ana".into()),
        );
        assert!(user.password_hash.is_none());
        assert_eq!(user.auth_provider, AuthProvider::Google);
    }
}
