//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. One state struct is
//! shared across connections; each request is routed by method and path
//! through the handlers in `crate::routes`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::cache::TaxonomyCache;
use crate::config::Args;
use crate::db::{Collections, MongoClient};
use crate::routes;
use crate::types::VeeriveError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// MongoDB client; absent only in dev mode without a database
    pub mongo: Option<MongoClient>,
    /// Typed collection handles, created once so indexes apply once
    pub collections: Option<Collections>,
    /// TTL cache over the sector/sub-sector taxonomy
    pub taxonomy: TaxonomyCache,
    /// Outbound HTTP client for OAuth code exchange and profile fetch
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        args: Args,
        mongo: Option<MongoClient>,
        collections: Option<Collections>,
        taxonomy: TaxonomyCache,
    ) -> Self {
        Self {
            args,
            mongo,
            collections,
            taxonomy,
            http: reqwest::Client::new(),
        }
    }
}

/// Run the HTTP server until the process exits.
pub async fn run(state: Arc<AppState>) -> Result<(), VeeriveError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Veerive listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - auth checks relaxed");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    // Prefix routers consume their requests entirely
    if path.starts_with("/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    if path.starts_with("/api/contexts/") {
        if let Some(response) = routes::handle_context_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    if path.starts_with("/api/themes/") {
        if let Some(response) = routes::handle_theme_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    if path.starts_with("/api/posts/") {
        if let Some(response) = routes::handle_post_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    if path == "/api/saved" || path.starts_with("/api/saved/") {
        if let Some(response) = routes::handle_saved_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    let response = match (method, path.as_str()) {
        // Liveness probe - returns 200 if the service is running
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)).await)
        }

        // Readiness probe - gates on a MongoDB ping
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(Arc::clone(&state)).await)
        }

        // Version info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // Paginated daily feed
        (Method::POST, "/api/feed") => routes::handle_feed(req, Arc::clone(&state)).await,

        // Filter metadata trees
        (Method::GET, "/api/filters/sectors") => {
            routes::handle_sector_filters(Arc::clone(&state)).await
        }
        (Method::GET, "/api/filters/signals") => {
            routes::handle_signal_filters(Arc::clone(&state)).await
        }

        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        (_, "/api/feed") | (_, "/api/filters/sectors") | (_, "/api/filters/signals") => {
            to_boxed(method_not_allowed_response())
        }

        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a plain Full<Bytes> response into the boxed body the service
/// signature expects
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Method not allowed response
fn method_not_allowed_response() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Method not allowed",
    });

    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
