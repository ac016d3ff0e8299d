//! Saved-item endpoints
//!
//! - POST /api/saved/contexts - save or unsave a context bookmark
//! - POST /api/saved/posts    - save or unsave a post bookmark
//! - POST /api/saved/themes   - save or unsave a theme bookmark
//! - GET  /api/saved?email=   - the user's bookmarks joined with their
//!   documents, newest first
//!
//! Save and unsave are single atomic updates on the user document. Save is
//! a guarded `$push` whose filter excludes users already holding the
//! (id, kind) entry, so a duplicate save matches zero documents and stays a
//! no-op; unsave is a `$pull` that succeeds whether or not the entry
//! exists. There is no read-modify-write and no lost-update window.
//!
//! A bearer token is required and its email must match the requested email.
//! Dev mode skips the token requirement.

use bson::{doc, oid::ObjectId, DateTime};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{extract_token_from_header, JwtValidator};
use crate::db::collections::Collections;
use crate::db::schemas::{SavedKind, UserDoc};
use crate::server::AppState;
use crate::types::VeeriveError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAction {
    Save,
    Unsave,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub id: String,
    pub email: String,
    pub action: SaveAction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    /// Whether the item is saved after this call
    pub saved: bool,
    /// Set when a save found the entry already present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_saved: Option<bool>,
}

/// One bookmark joined with its document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEntry {
    pub id: String,
    pub kind: String,
    pub saved_at: String,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct SavedListResponse {
    pub items: Vec<SavedEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// =============================================================================
// Response Helpers
// =============================================================================

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(full_body(Bytes::new()))
        .unwrap()
}

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn error_response(status: StatusCode, error: impl Into<String>, code: Option<&str>) -> Response<BoxBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.into(),
            code: code.map(|c| c.to_string()),
        },
    )
}

fn db_unavailable() -> Response<BoxBody> {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "Database not available",
        Some("DB_UNAVAILABLE"),
    )
}

fn internal_error() -> Response<BoxBody> {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error", Some("DB_ERROR"))
}

async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, VeeriveError> {
    let body = req
        .collect()
        .await
        .map_err(|e| VeeriveError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > 10240 {
        return Err(VeeriveError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| VeeriveError::Http(format!("Invalid JSON: {}", e)))
}

// =============================================================================
// Auth Guard
// =============================================================================

/// Require a valid bearer token whose email matches `email`.
///
/// Dev mode skips the check entirely. The claims email comparison is
/// case-insensitive because stored emails are lowercased at registration.
fn authorize(
    auth_header: Option<&str>,
    state: &AppState,
    email: &str,
) -> Result<(), Response<BoxBody>> {
    if state.args.dev_mode {
        return Ok(());
    }

    let token = extract_token_from_header(auth_header).ok_or_else(|| {
        error_response(StatusCode::UNAUTHORIZED, "No token provided", None)
    })?;

    let jwt = match &state.args.jwt_secret {
        Some(secret) => JwtValidator::new(secret.clone(), state.args.jwt_expiry_seconds)
            .map_err(|e| {
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("JWT configuration error: {}", e),
                    Some("CONFIG_ERROR"),
                )
            })?,
        None => {
            return Err(error_response(
                StatusCode::NOT_IMPLEMENTED,
                "Authentication not enabled (missing JWT_SECRET)",
                Some("NOT_ENABLED"),
            ))
        }
    };

    let result = jwt.verify_token(token);
    if !result.valid {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            result.error.unwrap_or_else(|| "Invalid token".into()),
            Some("INVALID_TOKEN"),
        ));
    }

    let claims = result.claims.unwrap();
    if !claims.email.eq_ignore_ascii_case(email) {
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "Token does not match the requested account",
            None,
        ));
    }

    Ok(())
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Whether the bookmark target exists. Unsave skips this check: pulling a
/// reference to deleted content must still succeed.
async fn target_exists(
    collections: &Collections,
    kind: SavedKind,
    id: &ObjectId,
) -> Result<bool, VeeriveError> {
    let filter = doc! { "_id": id };
    let found = match kind {
        SavedKind::Context => collections.contexts.find_one(filter).await?.is_some(),
        SavedKind::Post => collections.posts.find_one(filter).await?.is_some(),
        SavedKind::Theme => collections.themes.find_one(filter).await?.is_some(),
    };
    Ok(found)
}

/// POST /api/saved/{contexts|posts|themes}
async fn handle_save_toggle(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    kind: SavedKind,
) -> Response<BoxBody> {
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let body: SaveRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e), None)
        }
    };

    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing required field: email", None);
    }

    let item_id = match ObjectId::parse_str(&body.id) {
        Ok(id) => id,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Malformed id: {}", body.id),
                None,
            )
        }
    };

    if let Err(resp) = authorize(auth_header.as_deref(), &state, &email) {
        return resp;
    }

    let collections = match &state.collections {
        Some(c) => c,
        None => return db_unavailable(),
    };

    match body.action {
        SaveAction::Save => {
            match target_exists(collections, kind, &item_id).await {
                Ok(true) => {}
                Ok(false) => {
                    return error_response(
                        StatusCode::NOT_FOUND,
                        format!("{} not found", kind.as_str()),
                        None,
                    )
                }
                Err(e) => {
                    warn!("Save target lookup failed: {}", e);
                    return internal_error();
                }
            }

            // The filter excludes users already holding this entry, so the
            // push can never duplicate even under concurrent saves
            let guard = doc! {
                "email": &email,
                "saved_items": {
                    "$not": { "$elemMatch": { "item_id": item_id, "kind": kind.as_str() } }
                },
            };
            let update = doc! {
                "$push": {
                    "saved_items": {
                        "item_id": item_id,
                        "kind": kind.as_str(),
                        "saved_at": DateTime::now(),
                    }
                },
                "$set": { "metadata.updated_at": DateTime::now() },
            };

            match collections.users.update_one(guard, update).await {
                Ok(r) if r.matched_count == 1 => {
                    debug!(email = %email, kind = kind.as_str(), "saved item");
                    json_response(
                        StatusCode::OK,
                        &SaveResponse {
                            saved: true,
                            already_saved: None,
                        },
                    )
                }
                Ok(_) => {
                    // Guard matched nothing: either the entry already exists
                    // or there is no such user
                    match collections.users.find_one(doc! { "email": &email }).await {
                        Ok(Some(_)) => json_response(
                            StatusCode::OK,
                            &SaveResponse {
                                saved: true,
                                already_saved: Some(true),
                            },
                        ),
                        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found", None),
                        Err(e) => {
                            warn!("User lookup failed for {}: {}", email, e);
                            internal_error()
                        }
                    }
                }
                Err(e) => {
                    warn!("Save update failed for {}: {}", email, e);
                    internal_error()
                }
            }
        }
        SaveAction::Unsave => {
            let update = doc! {
                "$pull": {
                    "saved_items": { "item_id": item_id, "kind": kind.as_str() }
                },
                "$set": { "metadata.updated_at": DateTime::now() },
            };

            match collections
                .users
                .update_one(doc! { "email": &email }, update)
                .await
            {
                Ok(r) if r.matched_count == 1 => {
                    // Pulling an absent entry still matches the user; the
                    // unsave is a no-op success either way
                    debug!(email = %email, kind = kind.as_str(), "unsaved item");
                    json_response(
                        StatusCode::OK,
                        &SaveResponse {
                            saved: false,
                            already_saved: None,
                        },
                    )
                }
                Ok(_) => error_response(StatusCode::NOT_FOUND, "User not found", None),
                Err(e) => {
                    warn!("Unsave update failed for {}: {}", email, e);
                    internal_error()
                }
            }
        }
    }
}

/// GET /api/saved?email=
async fn handle_saved_list(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let email = req
        .uri()
        .query()
        .and_then(|q| {
            q.split('&').find_map(|pair| {
                let (key, value) = pair.split_once('=')?;
                (key == "email").then(|| value.to_string())
            })
        })
        .and_then(|v| urlencoding::decode(&v).ok().map(|s| s.into_owned()))
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_default();

    if email.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing query parameter: email", None);
    }

    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if let Err(resp) = authorize(auth_header, &state, &email) {
        return resp;
    }

    let collections = match &state.collections {
        Some(c) => c,
        None => return db_unavailable(),
    };

    let user = match collections.users.find_one(doc! { "email": &email }).await {
        Ok(Some(u)) => u,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "User not found", None),
        Err(e) => {
            warn!("User lookup failed for {}: {}", email, e);
            return internal_error();
        }
    };

    match join_saved_items(collections, &user).await {
        Ok(items) => json_response(StatusCode::OK, &SavedListResponse { items }),
        Err(e) => {
            warn!("Saved-item join failed for {}: {}", email, e);
            internal_error()
        }
    }
}

/// Join the user's bookmarks with their documents, newest first.
///
/// Bookmarks of deleted content are skipped, not reported.
async fn join_saved_items(
    collections: &Collections,
    user: &UserDoc,
) -> Result<Vec<SavedEntry>, VeeriveError> {
    let ids_of = |kind: SavedKind| -> Vec<ObjectId> {
        user.saved_items
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.item_id)
            .collect()
    };
    let context_ids = ids_of(SavedKind::Context);
    let post_ids = ids_of(SavedKind::Post);
    let theme_ids = ids_of(SavedKind::Theme);

    let titles_projection = FindOptions::builder()
        .projection(doc! { "title": 1, "slug": 1, "metadata": 1, "publish_date": 1 })
        .build();

    let (contexts, posts, themes) = tokio::join!(
        async {
            if context_ids.is_empty() {
                return Ok(Vec::new());
            }
            collections
                .contexts
                .find_many_with_options(
                    doc! { "_id": { "$in": context_ids } },
                    Some(titles_projection.clone()),
                )
                .await
        },
        async {
            if post_ids.is_empty() {
                return Ok(Vec::new());
            }
            collections
                .posts
                .find_many(doc! { "_id": { "$in": post_ids } })
                .await
        },
        async {
            if theme_ids.is_empty() {
                return Ok(Vec::new());
            }
            collections
                .themes
                .find_many(doc! { "_id": { "$in": theme_ids } })
                .await
        },
    );

    let mut titles: HashMap<(SavedKind, ObjectId), (String, String)> = HashMap::new();
    for c in contexts? {
        if let Some(id) = c._id {
            titles.insert((SavedKind::Context, id), (c.title, c.slug));
        }
    }
    for p in posts? {
        if let Some(id) = p._id {
            titles.insert((SavedKind::Post, id), (p.title, p.slug));
        }
    }
    for t in themes? {
        if let Some(id) = t._id {
            titles.insert((SavedKind::Theme, id), (t.title, t.slug));
        }
    }

    let mut items: Vec<&crate::db::schemas::SavedItem> = user.saved_items.iter().collect();
    items.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let (title, slug) = titles.get(&(item.kind, item.item_id))?;
            Some(SavedEntry {
                id: item.item_id.to_hex(),
                kind: item.kind.as_str().to_string(),
                saved_at: item
                    .saved_at
                    .to_chrono()
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                title: title.clone(),
                slug: slug.clone(),
            })
        })
        .collect())
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle saved-item requests.
///
/// Returns Some(response) if request was handled, None if not a saved route.
pub async fn handle_saved_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();

    if path != "/api/saved" && !path.starts_with("/api/saved/") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (req.method(), path.as_str()) {
        (&Method::GET, "/api/saved") => handle_saved_list(req, state).await,
        (&Method::POST, "/api/saved/contexts") => {
            handle_save_toggle(req, state, SavedKind::Context).await
        }
        (&Method::POST, "/api/saved/posts") => {
            handle_save_toggle(req, state, SavedKind::Post).await
        }
        (&Method::POST, "/api/saved/themes") => {
            handle_save_toggle(req, state, SavedKind::Theme).await
        }
        (_, "/api/saved")
        | (_, "/api/saved/contexts")
        | (_, "/api/saved/posts")
        | (_, "/api/saved/themes") => error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
            None,
        ),
        _ => error_response(StatusCode::NOT_FOUND, "Saved endpoint not found", None),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_action_wire_names() {
        let save: SaveAction = serde_json::from_str("\"save\"").unwrap();
        assert!(matches!(save, SaveAction::Save));
        let unsave: SaveAction = serde_json::from_str("\"unsave\"").unwrap();
        assert!(matches!(unsave, SaveAction::Unsave));
        assert!(serde_json::from_str::<SaveAction>("\"toggle\"").is_err());
    }

    #[test]
    fn test_save_guard_excludes_existing_entry() {
        let id = ObjectId::new();
        let guard = doc! {
            "email": "a@b.com",
            "saved_items": {
                "$not": { "$elemMatch": { "item_id": id, "kind": "post" } }
            },
        };
        let elem = guard
            .get_document("saved_items")
            .unwrap()
            .get_document("$not")
            .unwrap()
            .get_document("$elemMatch")
            .unwrap();
        assert_eq!(elem.get_object_id("item_id").unwrap(), id);
        assert_eq!(elem.get_str("kind").unwrap(), "post");
    }

    #[test]
    fn test_save_response_shape() {
        let body = serde_json::to_value(SaveResponse {
            saved: true,
            already_saved: Some(true),
        })
        .unwrap();
        assert_eq!(body["saved"], true);
        assert_eq!(body["alreadySaved"], true);

        let body = serde_json::to_value(SaveResponse {
            saved: false,
            already_saved: None,
        })
        .unwrap();
        assert!(body.get("alreadySaved").is_none());
    }
}
