//! HTTP Routes for Authentication
//!
//! Provides REST API endpoints for user authentication:
//! - POST /auth/register - Create an email/password account
//! - POST /auth/login    - Authenticate and get JWT token
//! - POST /auth/logout   - Invalidate token (optional, client-side mainly)
//! - POST /auth/refresh  - Refresh an expiring token
//! - GET  /auth/me       - Get current user info from token
//! - GET  /auth/oauth/{provider}/start    - Redirect to Google/LinkedIn
//! - GET  /auth/oauth/{provider}/callback - Complete the provider login

use bson::{doc, oid::ObjectId};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;

use crate::auth::{
    extract_token_from_header, hash_password, verify_password, CallbackQuery, JwtValidator,
    OAuthProvider, TokenInput,
};
use crate::db::schemas::{AuthProvider, OAuthStateDoc, UserDoc};
use crate::server::AppState;
use crate::types::VeeriveError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Optional display name; defaults to the mailbox part of the email
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    /// Longer-lived token for POST /auth/refresh
    pub refresh_token: String,
    pub email: String,
    pub user_id: String,
    pub expires_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub email: String,
    pub user_id: String,
    pub token_version: i32,
    pub expires_at: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
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

fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /auth/register
///
/// Create an email/password account.
///
/// Flow:
/// 1. Validate email and password strength
/// 2. Check if email already exists in MongoDB
/// 3. Hash password with argon2
/// 4. Store the user document
/// 5. Generate and return JWT token
async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(req).await {
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

    if body.email.is_empty() || body.password.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "Missing required fields: email, password".into(),
                code: None,
            },
        );
    }

    let email = body.email.trim().to_lowercase();
    if !email.contains('@') {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "Invalid email address".into(),
                code: None,
            },
        );
    }

    // Validate password strength (minimum 8 characters)
    if body.password.len() < 8 {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "Password must be at least 8 characters".into(),
                code: Some("WEAK_PASSWORD".into()),
            },
        );
    }

    let display_name = if body.display_name.is_empty() {
        email.split('@').next().map(|s| s.to_string())
    } else {
        Some(body.display_name.clone())
    };

    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    // In dev mode without MongoDB, use simplified flow
    if state.args.dev_mode && state.collections.is_none() {
        info!("Dev mode register (no MongoDB): {}", email);
        return generate_auth_response(
            &jwt,
            &email,
            &ObjectId::new().to_hex(),
            1,
            display_name,
            StatusCode::CREATED,
        );
    }

    // Production flow: store the account in MongoDB
    let collections = match &state.collections {
        Some(c) => c,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse {
                    error: "Database not available".into(),
                    code: Some("DB_UNAVAILABLE".into()),
                },
            )
        }
    };

    // Check for an existing account
    match collections.users.find_one(doc! { "email": &email }).await {
        Ok(Some(_)) => {
            return json_response(
                StatusCode::CONFLICT,
                &ErrorResponse {
                    error: "An account with this email already exists".into(),
                    code: Some("USER_EXISTS".into()),
                },
            )
        }
        Ok(None) => {}
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: format!("Database error: {}", e),
                    code: Some("DB_ERROR".into()),
                },
            )
        }
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            warn!("Password hashing failed: {}", e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: "Failed to process password".into(),
                    code: None,
                },
            );
        }
    };

    let mut user = UserDoc::new_local(email.clone(), password_hash);
    user.display_name = display_name.clone();
    let token_version = user.token_version;

    let user_id = match collections.users.insert_one(user).await {
        Ok(id) => id,
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: format!("Failed to create user: {}", e),
                    code: Some("DB_ERROR".into()),
                },
            )
        }
    };

    info!("Registered user: {}", email);

    generate_auth_response(
        &jwt,
        &email,
        &user_id.to_hex(),
        token_version,
        display_name,
        StatusCode::CREATED,
    )
}

/// POST /auth/login
///
/// Authenticate with email and password.
async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
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

    if body.email.is_empty() || body.password.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "Missing required fields: email, password".into(),
                code: None,
            },
        );
    }

    let email = body.email.trim().to_lowercase();

    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    // In dev mode without MongoDB, accept any credentials
    if state.args.dev_mode && state.collections.is_none() {
        info!("Dev mode login (no MongoDB): {}", email);
        return generate_auth_response(
            &jwt,
            &email,
            &ObjectId::new().to_hex(),
            1,
            None,
            StatusCode::OK,
        );
    }

    // Production flow: verify against MongoDB
    let collections = match &state.collections {
        Some(c) => c,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse {
                    error: "Database not available".into(),
                    code: Some("DB_UNAVAILABLE".into()),
                },
            )
        }
    };

    // Look up the account. Unknown email, OAuth-only account and wrong
    // password all answer the same way to prevent user enumeration.
    let user = match collections
        .users
        .find_one(doc! { "email": &email, "is_active": true })
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("Login failed - user not found: {}", email);
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "Invalid credentials".into(),
                    code: Some("INVALID_CREDENTIALS".into()),
                },
            );
        }
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: format!("Database error: {}", e),
                    code: Some("DB_ERROR".into()),
                },
            )
        }
    };

    let password_hash = match &user.password_hash {
        Some(h) => h,
        None => {
            warn!("Login failed - provider-only account: {}", email);
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "Invalid credentials".into(),
                    code: Some("INVALID_CREDENTIALS".into()),
                },
            );
        }
    };

    let password_valid = match verify_password(&body.password, password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            warn!("Password verification error: {}", e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: "Authentication error".into(),
                    code: Some("AUTH_ERROR".into()),
                },
            );
        }
    };

    if !password_valid {
        warn!("Login failed - invalid password: {}", email);
        return json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: "Invalid credentials".into(),
                code: Some("INVALID_CREDENTIALS".into()),
            },
        );
    }

    info!("Login: {}", email);

    let user_id = user.id_hex();
    generate_auth_response(
        &jwt,
        &user.email,
        &user_id,
        user.token_version,
        user.display_name.clone(),
        StatusCode::OK,
    )
}

/// POST /auth/logout
///
/// Logout is handled client-side by discarding the token. Token versioning
/// on the user document is the server-side revocation lever.
async fn handle_logout(
    _req: Request<hyper::body::Incoming>,
    _state: Arc<AppState>,
) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "Logged out successfully".into(),
        },
    )
}

/// POST /auth/refresh
///
/// Issue a fresh token pair for a valid presented token.
async fn handle_refresh(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let token = match extract_token_from_header(auth_header) {
        Some(t) => t,
        None => {
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "No token provided".into(),
                    code: None,
                },
            )
        }
    };

    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    let result = jwt.verify_token(token);
    if !result.valid {
        return json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: result.error.unwrap_or_else(|| "Invalid token".into()),
                code: Some("INVALID_TOKEN".into()),
            },
        );
    }

    let old_claims = result.claims.unwrap();

    // With a database, refuse tokens whose version the account has rotated
    // past and tokens for deactivated accounts
    let mut display_name = None;
    if let Some(collections) = &state.collections {
        let object_id = match ObjectId::parse_str(&old_claims.user_id) {
            Ok(id) => id,
            Err(_) => {
                return json_response(
                    StatusCode::UNAUTHORIZED,
                    &ErrorResponse {
                        error: "Invalid token".into(),
                        code: Some("INVALID_TOKEN".into()),
                    },
                )
            }
        };

        match collections
            .users
            .find_one(doc! { "_id": object_id, "is_active": true })
            .await
        {
            Ok(Some(user)) if user.token_version == old_claims.version => {
                display_name = user.display_name.clone();
            }
            Ok(_) => {
                warn!("Refresh refused - token revoked: {}", old_claims.email);
                return json_response(
                    StatusCode::UNAUTHORIZED,
                    &ErrorResponse {
                        error: "Token has been revoked".into(),
                        code: Some("INVALID_TOKEN".into()),
                    },
                );
            }
            Err(e) => {
                return json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &ErrorResponse {
                        error: format!("Database error: {}", e),
                        code: Some("DB_ERROR".into()),
                    },
                )
            }
        }
    }

    generate_auth_response(
        &jwt,
        &old_claims.email,
        &old_claims.user_id,
        old_claims.version,
        display_name,
        StatusCode::OK,
    )
}

/// GET /auth/me
///
/// Return the claims of the presented token.
async fn handle_me(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let token = match extract_token_from_header(auth_header) {
        Some(t) => t,
        None => {
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "No token provided".into(),
                    code: None,
                },
            )
        }
    };

    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    let result = jwt.verify_token(token);
    if !result.valid {
        return json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: result
                    .error
                    .unwrap_or_else(|| "Invalid or expired token".into()),
                code: None,
            },
        );
    }

    let claims = result.claims.unwrap();
    json_response(
        StatusCode::OK,
        &MeResponse {
            email: claims.email,
            user_id: claims.user_id,
            token_version: claims.version,
            expires_at: claims.exp,
        },
    )
}

// =============================================================================
// OAuth Handlers (Google, LinkedIn)
// =============================================================================

/// GET /auth/oauth/{provider}/start
///
/// Mint a single-use CSRF state token and redirect to the provider's
/// authorize URL. OAuth requires MongoDB even in dev mode because the
/// state token must survive to the callback.
async fn handle_oauth_start(state: Arc<AppState>, kind: AuthProvider) -> Response<BoxBody> {
    let provider = match OAuthProvider::from_args(&state.args, kind) {
        Some(p) => p,
        None => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: format!("OAuth provider not configured: {}", kind.as_str()),
                    code: Some("PROVIDER_NOT_CONFIGURED".into()),
                },
            )
        }
    };

    let collections = match &state.collections {
        Some(c) => c,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse {
                    error: "Database not available".into(),
                    code: Some("DB_UNAVAILABLE".into()),
                },
            )
        }
    };

    let raw: [u8; 32] = rand::thread_rng().gen();
    let token = URL_SAFE_NO_PAD.encode(raw);

    if let Err(e) = collections
        .oauth_states
        .insert_one(OAuthStateDoc::new(token.clone(), kind))
        .await
    {
        return json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &ErrorResponse {
                error: format!("Database error: {}", e),
                code: Some("DB_ERROR".into()),
            },
        );
    }

    info!("OAuth start: redirecting to {}", kind.as_str());

    Response::builder()
        .status(StatusCode::FOUND)
        .header("Location", provider.authorize_url(&token))
        .header("Cache-Control", "no-store")
        .body(empty_body())
        .unwrap()
}

/// GET /auth/oauth/{provider}/callback
///
/// Complete the provider login: claim the state token (single use),
/// exchange the code, fetch the profile, upsert the user, issue a token.
async fn handle_oauth_callback(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    kind: AuthProvider,
) -> Response<BoxBody> {
    let query: CallbackQuery = match serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
    {
        Ok(q) => q,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: format!("Invalid callback query: {}", e),
                    code: None,
                },
            )
        }
    };

    // The provider reports user denial and config problems via ?error=
    if let Some(err) = query.error {
        warn!("OAuth callback error from {}: {}", kind.as_str(), err);
        return json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: format!("Provider returned error: {}", err),
                code: Some("PROVIDER_DENIED".into()),
            },
        );
    }

    let (code, state_token) = match (query.code, query.state) {
        (Some(c), Some(s)) => (c, s),
        _ => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: "Missing code or state parameter".into(),
                    code: None,
                },
            )
        }
    };

    let provider = match OAuthProvider::from_args(&state.args, kind) {
        Some(p) => p,
        None => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: format!("OAuth provider not configured: {}", kind.as_str()),
                    code: Some("PROVIDER_NOT_CONFIGURED".into()),
                },
            )
        }
    };

    let collections = match &state.collections {
        Some(c) => c,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse {
                    error: "Database not available".into(),
                    code: Some("DB_UNAVAILABLE".into()),
                },
            )
        }
    };

    // Claim the state token. The guarded update is the single-use check:
    // a replayed or expired state matches zero documents.
    let claim = doc! {
        "state": &state_token,
        "provider": kind.as_str(),
        "used": false,
        "expires_at": { "$gt": bson::DateTime::now() },
    };
    match collections
        .oauth_states
        .update_one(claim, doc! { "$set": { "used": true } })
        .await
    {
        Ok(r) if r.matched_count == 1 => {}
        Ok(_) => {
            warn!("OAuth callback with invalid state for {}", kind.as_str());
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "Invalid or expired OAuth state".into(),
                    code: Some("INVALID_STATE".into()),
                },
            );
        }
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: format!("Database error: {}", e),
                    code: Some("DB_ERROR".into()),
                },
            )
        }
    }

    let access_token = match provider.exchange_code(&state.http, &code).await {
        Ok(t) => t,
        Err(e) => {
            warn!("OAuth code exchange failed for {}: {}", kind.as_str(), e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: "OAuth token exchange failed".into(),
                    code: Some("OAUTH_ERROR".into()),
                },
            );
        }
    };

    let profile = match provider.fetch_profile(&state.http, &access_token).await {
        Ok(p) => p,
        Err(e) => {
            warn!("OAuth profile fetch failed for {}: {}", kind.as_str(), e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: "OAuth profile fetch failed".into(),
                    code: Some("OAUTH_ERROR".into()),
                },
            );
        }
    };

    let email = match &profile.email {
        Some(e) if e.contains('@') => e.trim().to_lowercase(),
        _ => {
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "Provider profile did not include an email address".into(),
                    code: Some("OAUTH_ERROR".into()),
                },
            )
        }
    };

    // Upsert: match by (provider, subject) first, then by email so an
    // existing local account picks up the provider login
    let by_subject = collections
        .users
        .find_one(doc! {
            "auth_provider": kind.as_str(),
            "provider_subject": &profile.sub,
        })
        .await;

    let existing = match by_subject {
        Ok(Some(u)) => Some(u),
        Ok(None) => match collections.users.find_one(doc! { "email": &email }).await {
            Ok(u) => u,
            Err(e) => {
                return json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &ErrorResponse {
                        error: format!("Database error: {}", e),
                        code: Some("DB_ERROR".into()),
                    },
                )
            }
        },
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: format!("Database error: {}", e),
                    code: Some("DB_ERROR".into()),
                },
            )
        }
    };

    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    let (user, user_id) = match existing {
        Some(user) => {
            if !user.is_active {
                return json_response(
                    StatusCode::UNAUTHORIZED,
                    &ErrorResponse {
                        error: "Account is deactivated".into(),
                        code: None,
                    },
                );
            }
            let user_id = user.id_hex();
            (user, user_id)
        }
        None => {
            let mut user = UserDoc::new_oauth(
                email.clone(),
                kind,
                profile.sub.clone(),
                profile.name.clone(),
            );
            match collections.users.insert_one(user.clone()).await {
                Ok(id) => {
                    info!("Registered user via {}: {}", kind.as_str(), email);
                    user._id = Some(id);
                    (user, id.to_hex())
                }
                Err(e) => {
                    return json_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &ErrorResponse {
                            error: format!("Failed to create user: {}", e),
                            code: Some("DB_ERROR".into()),
                        },
                    )
                }
            }
        }
    };

    info!("OAuth login via {}: {}", kind.as_str(), email);

    generate_auth_response(
        &jwt,
        &user.email,
        &user_id,
        user.token_version,
        user.display_name.clone(),
        StatusCode::OK,
    )
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Resolve the JWT validator from configuration.
///
/// Dev mode uses a fixed insecure secret. Production requires JWT_SECRET,
/// which startup validation has already checked.
fn get_jwt_validator(state: &AppState) -> Result<JwtValidator, Response<BoxBody>> {
    if state.args.dev_mode {
        Ok(JwtValidator::new_dev())
    } else {
        match &state.args.jwt_secret {
            Some(secret) => {
                JwtValidator::new(secret.clone(), state.args.jwt_expiry_seconds).map_err(|e| {
                    json_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &ErrorResponse {
                            error: format!("JWT configuration error: {}", e),
                            code: Some("CONFIG_ERROR".into()),
                        },
                    )
                })
            }
            None => Err(json_response(
                StatusCode::NOT_IMPLEMENTED,
                &ErrorResponse {
                    error: "Authentication not enabled (missing JWT_SECRET)".into(),
                    code: Some("NOT_ENABLED".into()),
                },
            )),
        }
    }
}

/// Generate a successful auth response with access and refresh tokens
fn generate_auth_response(
    jwt: &JwtValidator,
    email: &str,
    user_id: &str,
    token_version: i32,
    display_name: Option<String>,
    status: StatusCode,
) -> Response<BoxBody> {
    let input = TokenInput {
        email: email.to_string(),
        user_id: user_id.to_string(),
        token_version,
    };

    let refresh_token = match jwt.generate_refresh_token(input.clone()) {
        Ok(t) => t,
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: format!("Failed to generate token: {}", e),
                    code: Some("TOKEN_ERROR".into()),
                },
            )
        }
    };

    match jwt.generate_token(input) {
        Ok(token) => {
            let claims = jwt.verify_token(&token);
            let expires_at = claims.claims.map(|c| c.exp).unwrap_or(0);

            json_response(
                status,
                &AuthResponse {
                    token,
                    refresh_token,
                    email: email.to_string(),
                    user_id: user_id.to_string(),
                    expires_at,
                    display_name,
                },
            )
        }
        Err(e) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &ErrorResponse {
                error: format!("Failed to generate token: {}", e),
                code: Some("TOKEN_ERROR".into()),
            },
        ),
    }
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle auth-related HTTP requests.
///
/// Returns Some(response) if request was handled, None if not an auth route.
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    // Only handle /auth/* routes
    if !path.starts_with("/auth") {
        return None;
    }

    // Handle CORS preflight
    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    // Remove query string for matching
    let path = path.split('?').next().unwrap_or(path);

    let response = match (method, path) {
        // Standard auth endpoints
        (&Method::POST, "/auth/register") => handle_register(req, state).await,
        (&Method::POST, "/auth/login") => handle_login(req, state).await,
        (&Method::POST, "/auth/logout") => handle_logout(req, state).await,
        (&Method::POST, "/auth/refresh") => handle_refresh(req, state).await,
        (&Method::GET, "/auth/me") => handle_me(req, state).await,

        // Provider login endpoints
        (&Method::GET, "/auth/oauth/google/start") => {
            handle_oauth_start(state, AuthProvider::Google).await
        }
        (&Method::GET, "/auth/oauth/linkedin/start") => {
            handle_oauth_start(state, AuthProvider::LinkedIn).await
        }
        (&Method::GET, "/auth/oauth/google/callback") => {
            handle_oauth_callback(req, state, AuthProvider::Google).await
        }
        (&Method::GET, "/auth/oauth/linkedin/callback") => {
            handle_oauth_callback(req, state, AuthProvider::LinkedIn).await
        }

        // Method not allowed
        (_, "/auth/register")
        | (_, "/auth/login")
        | (_, "/auth/logout")
        | (_, "/auth/refresh")
        | (_, "/auth/me")
        | (_, "/auth/oauth/google/start")
        | (_, "/auth/oauth/linkedin/start")
        | (_, "/auth/oauth/google/callback")
        | (_, "/auth/oauth/linkedin/callback") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
                code: None,
            },
        ),

        // Auth endpoint not found
        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Auth endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}
