//! Paginated feed and filter metadata endpoints
//!
//! - POST /api/feed            - one calendar day of contexts per page
//! - GET  /api/filters/sectors - sector tree for the filter rail (cached)
//! - GET  /api/filters/signals - signal tree for the filter rail
//!
//! The feed resolves human-readable filter names to taxonomy ids, picks the
//! page's calendar day, then issues the day query and the sidebar queries
//! (messages, trending themes, expert posts) concurrently. A filter name
//! that matches nothing and a page beyond the last day are soft misses:
//! empty 200 bodies, never errors.

use bson::doc;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::schemas::PostKind;
use crate::feed::paginator::resolve_page;
use crate::feed::related::EXPERT_POST_LIMIT;
use crate::feed::views::feed_response;
use crate::feed::{load_view_data, resolve_filter, FeedFilterNames, FeedResponse, Resolution};
use crate::server::AppState;
use crate::types::VeeriveError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Trending themes shown beside the feed
const TRENDING_THEME_LIMIT: i64 = 5;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FeedRequest {
    pub page: u32,
    #[serde(flatten)]
    pub filters: FeedFilterNames,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// One node of the sector or signal tree
#[derive(Debug, Serialize)]
pub struct TaxonomyLeaf {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorNode {
    pub id: String,
    pub name: String,
    pub sub_sectors: Vec<TaxonomyLeaf>,
}

#[derive(Debug, Serialize)]
pub struct SectorTreeResponse {
    pub sectors: Vec<SectorNode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalNode {
    pub id: String,
    pub name: String,
    pub sub_signals: Vec<TaxonomyLeaf>,
}

#[derive(Debug, Serialize)]
pub struct SignalTreeResponse {
    pub signals: Vec<SignalNode>,
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

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn db_unavailable() -> Response<BoxBody> {
    json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        &ErrorResponse {
            error: "Database not available".into(),
            code: Some("DB_UNAVAILABLE".into()),
        },
    )
}

fn internal_error() -> Response<BoxBody> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorResponse {
            error: "Internal error".into(),
            code: Some("DB_ERROR".into()),
        },
    )
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
// Route Handlers
// =============================================================================

/// POST /api/feed
///
/// Body: `{page, sector?, subSector?, signalCategory?, signalSubCategory?}`.
/// Page numbers are 1-based; each page is one distinct calendar day of
/// contexts, most recent day first.
pub async fn handle_feed(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let request: FeedRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: format!("Invalid JSON body: {}", e),
                    code: None,
                },
            )
        }
    };

    let (mongo, collections) = match (&state.mongo, &state.collections) {
        (Some(m), Some(c)) => (m, c),
        _ => return db_unavailable(),
    };

    let snapshot = match state.taxonomy.snapshot(collections).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Taxonomy refresh failed: {}", e);
            return internal_error();
        }
    };

    // Signal lists are only needed when the request filters by signal name
    let (signals, sub_signals) = if request.filters.wants_signals() {
        let (signals, sub_signals) = tokio::join!(
            collections.signals.find_many(doc! {}),
            collections.sub_signals.find_many(doc! {}),
        );
        match (signals, sub_signals) {
            (Ok(s), Ok(ss)) => (s, ss),
            (s, ss) => {
                warn!(
                    "Signal list query failed: {:?} {:?}",
                    s.err().map(|e| e.to_string()),
                    ss.err().map(|e| e.to_string())
                );
                return internal_error();
            }
        }
    } else {
        (Vec::new(), Vec::new())
    };

    let filter = match resolve_filter(&request.filters, &snapshot, &signals, &sub_signals) {
        Resolution::Found(f) => f,
        Resolution::Empty(reason) => {
            debug!(reason = reason.as_str(), "feed filter matched no taxonomy");
            return json_response(StatusCode::OK, &FeedResponse::empty());
        }
    };

    let page = match resolve_page(mongo, collections, &filter, request.page).await {
        Ok(Resolution::Found(p)) => p,
        Ok(Resolution::Empty(reason)) => {
            debug!(
                page = request.page,
                reason = reason.as_str(),
                "feed page soft miss"
            );
            return json_response(StatusCode::OK, &FeedResponse::empty());
        }
        Err(VeeriveError::Validation(msg)) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: msg,
                    code: None,
                },
            )
        }
        Err(e) => {
            warn!("Feed page resolution failed: {}", e);
            return internal_error();
        }
    };

    // Sidebar queries and the reference join run concurrently with each other
    let messages_query = collections.messages.find_many_with_options(
        doc! { "publish_date": { "$gte": page.start, "$lte": page.end } },
        Some(
            FindOptions::builder()
                .sort(doc! { "publish_date": -1 })
                .build(),
        ),
    );

    // Trending themes narrow to the active filter when one is set
    let mut theme_filter = doc! { "is_trending": true };
    if let Some(sub_sector) = filter.sub_sector {
        theme_filter.insert("sub_sectors", sub_sector);
    } else if let Some(sector) = filter.sector {
        theme_filter.insert("sectors", sector);
    }
    let themes_query = collections.themes.find_many_with_options(
        theme_filter,
        Some(
            FindOptions::builder()
                .sort(doc! { "trending_score": -1 })
                .limit(TRENDING_THEME_LIMIT)
                .build(),
        ),
    );

    let experts_query = collections.posts.find_many_with_options(
        doc! {
            "post_type": PostKind::ExpertOpinion.as_str(),
            "is_trending": true,
        },
        Some(
            FindOptions::builder()
                .sort(doc! { "publish_date": -1 })
                .limit(EXPERT_POST_LIMIT as i64)
                .build(),
        ),
    );

    let (messages, trending_themes, expert_posts, data) = tokio::join!(
        messages_query,
        themes_query,
        experts_query,
        load_view_data(collections, &snapshot, &page.contexts),
    );

    let messages = match messages {
        Ok(v) => v,
        Err(e) => {
            warn!("Feed messages query failed: {}", e);
            return internal_error();
        }
    };
    let trending_themes = match trending_themes {
        Ok(v) => v,
        Err(e) => {
            warn!("Feed trending themes query failed: {}", e);
            return internal_error();
        }
    };
    let expert_posts = match expert_posts {
        Ok(v) => v,
        Err(e) => {
            warn!("Feed expert posts query failed: {}", e);
            return internal_error();
        }
    };
    let data = match data {
        Ok(v) => v,
        Err(e) => {
            warn!("Feed reference join failed: {}", e);
            return internal_error();
        }
    };

    debug!(
        day = %page.day,
        contexts = page.contexts.len(),
        has_more = page.has_more,
        "feed page resolved"
    );

    json_response(
        StatusCode::OK,
        &feed_response(&page, &messages, &trending_themes, &expert_posts, &data),
    )
}

/// GET /api/filters/sectors
///
/// Sector tree with nested sub-sectors, served from the taxonomy cache.
pub async fn handle_sector_filters(state: Arc<AppState>) -> Response<BoxBody> {
    let collections = match &state.collections {
        Some(c) => c,
        None => return db_unavailable(),
    };

    let snapshot = match state.taxonomy.snapshot(collections).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Taxonomy refresh failed: {}", e);
            return internal_error();
        }
    };

    let sectors = snapshot
        .sectors
        .iter()
        .filter_map(|sector| {
            let id = sector._id?;
            Some(SectorNode {
                id: id.to_hex(),
                name: sector.name.clone(),
                sub_sectors: snapshot
                    .children_of(&id)
                    .into_iter()
                    .filter_map(|sub| {
                        Some(TaxonomyLeaf {
                            id: sub._id?.to_hex(),
                            name: sub.name.clone(),
                        })
                    })
                    .collect(),
            })
        })
        .collect();

    json_response(StatusCode::OK, &SectorTreeResponse { sectors })
}

/// GET /api/filters/signals
///
/// Signal tree with nested sub-signals, queried directly.
pub async fn handle_signal_filters(state: Arc<AppState>) -> Response<BoxBody> {
    let collections = match &state.collections {
        Some(c) => c,
        None => return db_unavailable(),
    };

    let (signals, sub_signals) = tokio::join!(
        collections.signals.find_many(doc! {}),
        collections.sub_signals.find_many(doc! {}),
    );
    let (signals, sub_signals) = match (signals, sub_signals) {
        (Ok(s), Ok(ss)) => (s, ss),
        (s, ss) => {
            warn!(
                "Signal list query failed: {:?} {:?}",
                s.err().map(|e| e.to_string()),
                ss.err().map(|e| e.to_string())
            );
            return internal_error();
        }
    };

    let signals = signals
        .iter()
        .filter_map(|signal| {
            let id = signal._id?;
            Some(SignalNode {
                id: id.to_hex(),
                name: signal.name.clone(),
                sub_signals: sub_signals
                    .iter()
                    .filter(|sub| sub.signal_id == id)
                    .filter_map(|sub| {
                        Some(TaxonomyLeaf {
                            id: sub._id?.to_hex(),
                            name: sub.name.clone(),
                        })
                    })
                    .collect(),
            })
        })
        .collect();

    json_response(StatusCode::OK, &SignalTreeResponse { signals })
}
