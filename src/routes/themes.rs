//! Theme detail endpoint
//!
//! - GET /api/themes/{slug} - theme with its trend analysis plus related
//!   trending themes
//!
//! Related themes use the two-tier fallback: trending themes sharing a
//! sub-sector first, trending themes sharing a sector only when that tier
//! finds nothing. The source theme never appears in its own rail.

use bson::doc;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::feed::related::{related_trending_themes, MongoThemeLookup};
use crate::feed::views::{theme_summary, theme_view, ThemeSummary, ThemeView, ViewData};
use crate::server::AppState;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDetailResponse {
    pub theme: ThemeView,
    /// Trending themes sharing a sub-sector, or a sector when none do
    pub related_themes: Vec<ThemeSummary>,
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
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

/// GET /api/themes/{slug}
async fn handle_theme_detail(state: &Arc<AppState>, slug: &str) -> Response<BoxBody> {
    let collections = match &state.collections {
        Some(c) => c,
        None => return db_unavailable(),
    };

    let theme = match collections.themes.find_one(doc! { "slug": slug }).await {
        Ok(Some(t)) => t,
        Ok(None) => {
            return json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse {
                    error: "Theme not found".into(),
                    code: None,
                },
            )
        }
        Err(e) => {
            warn!("Theme lookup failed for {}: {}", slug, e);
            return internal_error();
        }
    };

    let snapshot = match state.taxonomy.snapshot(collections).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Taxonomy refresh failed: {}", e);
            return internal_error();
        }
    };

    let related = match related_trending_themes(
        &MongoThemeLookup {
            themes: &collections.themes,
        },
        &theme.sub_sectors,
        &theme.sectors,
        theme._id.as_ref(),
    )
    .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!("Related theme resolution failed for {}: {}", slug, e);
            return internal_error();
        }
    };

    let data = ViewData::from_snapshot(&snapshot);
    let theme = match theme_view(&theme, &data) {
        Some(v) => v,
        None => {
            warn!("Theme {} has no document id", slug);
            return internal_error();
        }
    };

    json_response(
        StatusCode::OK,
        &ThemeDetailResponse {
            theme,
            related_themes: related.iter().filter_map(theme_summary).collect(),
        },
    )
}

/// Handle theme detail requests.
///
/// Returns Some(response) if request was handled, None if not a theme route.
pub async fn handle_theme_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();

    if !path.starts_with("/api/themes/") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path);
    let slug = match path.strip_prefix("/api/themes/") {
        Some(s) if !s.is_empty() && !s.contains('/') => s,
        _ => {
            return Some(json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse {
                    error: "Theme not found".into(),
                    code: None,
                },
            ))
        }
    };

    let response = if req.method() == Method::GET {
        handle_theme_detail(&state, slug).await
    } else {
        json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
                code: None,
            },
        )
    };

    Some(response)
}
