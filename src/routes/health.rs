//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - liveness probe (is the service running?)
//! - /ready, /readyz - readiness probe (is the service ready for traffic?)
//!
//! Liveness returns 200 whenever the process is up, regardless of database
//! status. Readiness gates on a MongoDB ping, UNLESS dev_mode is enabled
//! (the API can run without a database in dev mode, serving auth flows only).

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

/// Health response consumed by load balancers and the admin UI
///
/// - healthy: boolean - overall health status
/// - status: 'online' | 'degraded' - 'degraded' means no database connection
/// - databaseConnected: boolean - whether a MongoDB connection exists
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// Service status for UI display: 'online' or 'degraded'
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Operating mode
    pub mode: String,
    /// Node identifier
    pub node_id: String,
    /// Whether a MongoDB connection was established at startup
    pub database_connected: bool,
    /// Whether the taxonomy cache currently holds a fresh snapshot
    pub taxonomy_cache_warm: bool,
    /// Current timestamp
    pub timestamp: String,
    /// Error message if the database is not available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health response with current state
async fn build_health_response(state: &AppState) -> HealthResponse {
    let args = &state.args;

    let database_connected = state.mongo.is_some();
    let taxonomy_cache_warm = state.taxonomy.peek().await.is_some();

    // In dev mode the database is optional, so a missing connection is not
    // degraded operation
    let status = if database_connected || args.dev_mode {
        "online"
    } else {
        "degraded"
    };

    let error = if !database_connected && !args.dev_mode {
        Some("No MongoDB connection - content endpoints will fail".to_string())
    } else if !database_connected && args.dev_mode {
        Some("Dev mode: no MongoDB connection - content endpoints disabled".to_string())
    } else {
        None
    };

    HealthResponse {
        healthy: true, // Service is running
        status,
        version: env!("CARGO_PKG_VERSION"),
        mode: if args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: args.node_id.to_string(),
        database_connected,
        taxonomy_cache_warm,
        timestamp: chrono::Utc::now().to_rfc3339(),
        error,
    }
}

/// Handle liveness probe (/health, /healthz)
///
/// Returns 200 OK if the service is running. The body reports database
/// status for informational purposes; callers that need to verify database
/// connectivity should use the readiness probe instead.
pub async fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state).await;

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    // Liveness probe: always return 200 if service is running
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Handle readiness probe (/ready, /readyz)
///
/// Returns 200 OK only if the service can answer content queries: a MongoDB
/// ping must succeed. In dev mode the database is optional and the probe
/// always reports ready. Use this endpoint for load balancer health checks.
pub async fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let mut response = build_health_response(&state).await;

    let is_ready = match &state.mongo {
        Some(mongo) => match mongo.ping().await {
            Ok(()) => true,
            Err(e) => {
                response.error = Some(format!("MongoDB ping failed: {}", e));
                state.args.dev_mode
            }
        },
        None => state.args.dev_mode,
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":false,"error":"Serialization failed"}"#.to_string());

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

/// Handle version endpoint (/version)
///
/// Returns build information for deployment verification.
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "veerive-api",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
