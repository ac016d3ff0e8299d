//! Post detail endpoint
//!
//! - GET /api/posts/{slug} - post with its source name and the contexts
//!   it belongs to
//!
//! The owning-context list is compact (id, title, slug); clients follow
//! the slug to the full context detail. A context reference pointing at
//! a deleted context is skipped, matching the soft-skip policy of every
//! other reference join.

use bson::doc;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use mongodb::options::FindOptions;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::feed::views::{name_map, post_view, PostView, ViewData};
use crate::server::AppState;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Compact pointer to a context that carries this post
#[derive(Debug, Serialize)]
pub struct ContextRef {
    pub id: String,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetailResponse {
    pub post: PostView,
    pub contexts: Vec<ContextRef>,
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

/// GET /api/posts/{slug}
async fn handle_post_detail(state: &Arc<AppState>, slug: &str) -> Response<BoxBody> {
    let collections = match &state.collections {
        Some(c) => c,
        None => return db_unavailable(),
    };

    let post = match collections.posts.find_one(doc! { "slug": slug }).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse {
                    error: "Post not found".into(),
                    code: None,
                },
            )
        }
        Err(e) => {
            warn!("Post lookup failed for {}: {}", slug, e);
            return internal_error();
        }
    };

    let mut data = ViewData::default();
    if let Some(source_id) = post.source {
        match collections.sources.find_one(doc! { "_id": source_id }).await {
            Ok(Some(source)) => {
                data.source_names = name_map(&[source], |s| (s._id, s.name.as_str()));
            }
            // Dangling source reference renders without a publisher name
            Ok(None) => {}
            Err(e) => {
                warn!("Source lookup failed for {}: {}", slug, e);
                return internal_error();
            }
        }
    }

    let contexts = if post.contexts.is_empty() {
        Vec::new()
    } else {
        let options = FindOptions::builder()
            .projection(doc! { "title": 1, "slug": 1, "metadata": 1, "publish_date": 1 })
            .sort(doc! { "publish_date": -1 })
            .build();
        match collections
            .contexts
            .find_many_with_options(doc! { "_id": { "$in": post.contexts.clone() } }, Some(options))
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("Owning-context lookup failed for {}: {}", slug, e);
                return internal_error();
            }
        }
    };

    let post = match post_view(&post, &data) {
        Some(v) => v,
        None => {
            warn!("Post {} has no document id", slug);
            return internal_error();
        }
    };

    json_response(
        StatusCode::OK,
        &PostDetailResponse {
            post,
            contexts: contexts
                .iter()
                .filter_map(|c| {
                    Some(ContextRef {
                        id: c._id?.to_hex(),
                        title: c.title.clone(),
                        slug: c.slug.clone(),
                    })
                })
                .collect(),
        },
    )
}

/// Handle post detail requests.
///
/// Returns Some(response) if request was handled, None if not a post route.
pub async fn handle_post_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();

    if !path.starts_with("/api/posts/") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path);
    let slug = match path.strip_prefix("/api/posts/") {
        Some(s) if !s.is_empty() && !s.contains('/') => s,
        _ => {
            return Some(json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse {
                    error: "Post not found".into(),
                    code: None,
                },
            ))
        }
    };

    let response = if req.method() == Method::GET {
        handle_post_detail(&state, slug).await
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
