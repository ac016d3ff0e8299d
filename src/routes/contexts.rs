//! Context detail endpoints
//!
//! - GET /api/contexts/{slug}     - display-ready context plus the related
//!   rails: pair-matched contexts, trending themes, expert opinions
//! - GET /api/contexts/{slug}/pdf - the embedded PDF attachment bytes
//!
//! Every other context query strips `pdf.data` in its projection; the pdf
//! route is the only place the full document is fetched. The attachment is
//! served with an ETag from the stored hash so clients can revalidate.

use bson::doc;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use mongodb::options::FindOptions;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

use crate::feed::related::{
    resolve_related, MongoContextLookup, MongoPostLookup, MongoThemeLookup,
};
use crate::feed::views::{context_view, post_view, theme_summary, ContextView, PostView, ThemeSummary};
use crate::feed::load_view_data;
use crate::server::AppState;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDetailResponse {
    pub context: ContextView,
    /// Contexts sharing a (sub-sector, signal-category) pair with the source
    pub related_contexts: Vec<ContextView>,
    pub trending_themes: Vec<ThemeSummary>,
    pub expert_posts: Vec<PostView>,
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
        .body(empty_body())
        .unwrap()
}

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
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

fn not_found(message: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: message.into(),
            code: None,
        },
    )
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /api/contexts/{slug}
async fn handle_context_detail(state: &Arc<AppState>, slug: &str) -> Response<BoxBody> {
    let collections = match &state.collections {
        Some(c) => c,
        None => return db_unavailable(),
    };

    // Indexed point read; the attachment payload stays in the database
    let options = FindOptions::builder()
        .projection(doc! { "pdf.data": 0 })
        .limit(1)
        .build();
    let mut matches = match collections
        .contexts
        .find_many_with_options(doc! { "slug": slug }, Some(options))
        .await
    {
        Ok(v) => v,
        Err(e) => {
            warn!("Context lookup failed for {}: {}", slug, e);
            return internal_error();
        }
    };
    let context = match matches.pop() {
        Some(c) => c,
        None => return not_found("Context not found"),
    };

    let snapshot = match state.taxonomy.snapshot(collections).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Taxonomy refresh failed: {}", e);
            return internal_error();
        }
    };

    let related = match resolve_related(
        &MongoContextLookup {
            contexts: &collections.contexts,
        },
        &MongoThemeLookup {
            themes: &collections.themes,
        },
        &MongoPostLookup {
            posts: &collections.posts,
        },
        &context,
    )
    .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!("Related content resolution failed for {}: {}", slug, e);
            return internal_error();
        }
    };
    let related_contexts = related.contexts.unwrap_or_default();

    // One reference join covers the source and everything related to it
    let mut all = Vec::with_capacity(related_contexts.len() + 1);
    all.push(context.clone());
    all.extend(related_contexts.iter().cloned());
    let data = match load_view_data(collections, &snapshot, &all).await {
        Ok(d) => d,
        Err(e) => {
            warn!("Reference join failed for {}: {}", slug, e);
            return internal_error();
        }
    };

    let context = match context_view(&context, &data) {
        Some(v) => v,
        None => {
            warn!("Context {} has no document id", slug);
            return internal_error();
        }
    };

    json_response(
        StatusCode::OK,
        &ContextDetailResponse {
            context,
            related_contexts: related_contexts
                .iter()
                .filter_map(|c| context_view(c, &data))
                .collect(),
            trending_themes: related
                .trending_themes
                .iter()
                .filter_map(theme_summary)
                .collect(),
            expert_posts: related
                .expert_posts
                .iter()
                .filter_map(|p| post_view(p, &data))
                .collect(),
        },
    )
}

/// GET /api/contexts/{slug}/pdf
async fn handle_context_pdf(
    req: &Request<hyper::body::Incoming>,
    state: &Arc<AppState>,
    slug: &str,
) -> Response<BoxBody> {
    let collections = match &state.collections {
        Some(c) => c,
        None => return db_unavailable(),
    };

    let context = match collections.contexts.find_one(doc! { "slug": slug }).await {
        Ok(Some(c)) => c,
        Ok(None) => return not_found("Context not found"),
        Err(e) => {
            warn!("Context lookup failed for {}: {}", slug, e);
            return internal_error();
        }
    };

    let pdf = match context.pdf {
        Some(p) if !p.data.bytes.is_empty() => p,
        _ => return not_found("Context has no PDF attachment"),
    };

    // Documents written before hashing carry an empty sha256
    let digest = if pdf.sha256.is_empty() {
        let mut hasher = Sha256::new();
        hasher.update(&pdf.data.bytes);
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    } else {
        pdf.sha256.clone()
    };
    let etag = format!("\"{}\"", digest);

    let revalidated = req
        .headers()
        .get(hyper::header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == etag || v == "*")
        .unwrap_or(false);
    if revalidated {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header("ETag", etag)
            .header("Access-Control-Allow-Origin", "*")
            .body(empty_body())
            .unwrap();
    }

    let content_type = if pdf.content_type.is_empty() {
        "application/pdf".to_string()
    } else {
        pdf.content_type.clone()
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header(
            "Content-Disposition",
            format!("inline; filename=\"{}\"", pdf.file_name.replace('"', "")),
        )
        .header("ETag", etag)
        .header("Cache-Control", "private, max-age=3600")
        .header("Access-Control-Allow-Origin", "*")
        .body(full_body(pdf.data.bytes))
        .unwrap()
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle context detail requests.
///
/// Returns Some(response) if request was handled, None if not a context route.
pub async fn handle_context_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();

    if !path.starts_with("/api/contexts/") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    // Remove query string for matching
    let path = path.split('?').next().unwrap_or(path);
    let rest = match path.strip_prefix("/api/contexts/") {
        Some(r) if !r.is_empty() => r,
        _ => return Some(not_found("Context not found")),
    };

    let mut parts = rest.splitn(2, '/');
    let slug = parts.next().unwrap_or("");
    let tail = parts.next();

    let response = match (req.method(), tail) {
        (&Method::GET, None) => handle_context_detail(&state, slug).await,
        (&Method::GET, Some("pdf")) => handle_context_pdf(&req, &state, slug).await,
        (_, None) | (_, Some("pdf")) => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
                code: None,
            },
        ),
        _ => not_found("Context endpoint not found"),
    };

    Some(response)
}
