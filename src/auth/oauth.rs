//! OAuth provider integration
//!
//! Implements the authorization-code flow against Google and LinkedIn.
//! Both providers speak OpenID Connect, so the callback side is shared:
//! exchange the code for an access token, then read the standard
//! userinfo endpoint for subject, email, and display name.
//!
//! Google authenticates the token exchange with HTTP Basic credentials
//! (client_secret_basic); LinkedIn only accepts credentials in the form
//! body (client_secret_post).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::config::Args;
use crate::db::schemas::AuthProvider;
use crate::types::VeeriveError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const LINKEDIN_AUTH_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const LINKEDIN_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const LINKEDIN_USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";

const OIDC_SCOPE: &str = "openid email profile";

/// How the provider wants client credentials on the token endpoint
enum TokenAuthStyle {
    /// Authorization: Basic base64(client_id:client_secret)
    Basic,
    /// client_id / client_secret as form fields
    Body,
}

/// One configured provider with its resolved redirect URI
pub struct OAuthProvider {
    pub kind: AuthProvider,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

/// Identity claims read from the provider's userinfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProfile {
    /// Provider-side stable subject id
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Query parameters a provider sends to the callback
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn basic_auth(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{client_id}:{client_secret}"))
    )
}

impl OAuthProvider {
    /// Build the provider from config; `None` when it is not configured.
    /// Only `Google` and `LinkedIn` are valid kinds here.
    pub fn from_args(args: &Args, kind: AuthProvider) -> Option<Self> {
        let (client_id, client_secret) = match kind {
            AuthProvider::Google => (
                args.google_client_id.clone()?,
                args.google_client_secret.clone()?,
            ),
            AuthProvider::LinkedIn => (
                args.linkedin_client_id.clone()?,
                args.linkedin_client_secret.clone()?,
            ),
            AuthProvider::Local => return None,
        };

        let redirect_uri = format!(
            "{}/auth/oauth/{}/callback",
            args.oauth_redirect_base.trim_end_matches('/'),
            kind.as_str()
        );

        Some(Self {
            kind,
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    fn auth_url(&self) -> &'static str {
        match self.kind {
            AuthProvider::LinkedIn => LINKEDIN_AUTH_URL,
            _ => GOOGLE_AUTH_URL,
        }
    }

    fn token_url(&self) -> &'static str {
        match self.kind {
            AuthProvider::LinkedIn => LINKEDIN_TOKEN_URL,
            _ => GOOGLE_TOKEN_URL,
        }
    }

    fn userinfo_url(&self) -> &'static str {
        match self.kind {
            AuthProvider::LinkedIn => LINKEDIN_USERINFO_URL,
            _ => GOOGLE_USERINFO_URL,
        }
    }

    fn token_auth_style(&self) -> TokenAuthStyle {
        match self.kind {
            AuthProvider::LinkedIn => TokenAuthStyle::Body,
            _ => TokenAuthStyle::Basic,
        }
    }

    /// Authorization URL the client is redirected to, carrying `state`.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.auth_url(),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OIDC_SCOPE),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
    ) -> Result<String, VeeriveError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let request = match self.token_auth_style() {
            TokenAuthStyle::Basic => http
                .post(self.token_url())
                .header(
                    "Authorization",
                    basic_auth(&self.client_id, &self.client_secret),
                )
                .form(&form),
            TokenAuthStyle::Body => {
                form.push(("client_id", self.client_id.as_str()));
                form.push(("client_secret", self.client_secret.as_str()));
                http.post(self.token_url()).form(&form)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| VeeriveError::Http(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(VeeriveError::Auth(format!(
                "Provider rejected code exchange: {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| VeeriveError::Http(format!("Malformed token response: {}", e)))?;

        Ok(token.access_token)
    }

    /// Fetch the user's identity claims with the access token.
    pub async fn fetch_profile(
        &self,
        http: &reqwest::Client,
        access_token: &str,
    ) -> Result<OAuthProfile, VeeriveError> {
        let response = http
            .get(self.userinfo_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| VeeriveError::Http(format!("Userinfo fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(VeeriveError::Auth(format!(
                "Provider rejected userinfo request: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| VeeriveError::Http(format!("Malformed userinfo response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn configured_args() -> Args {
        Args::parse_from([
            "veerive",
            "--jwt-secret",
            "test-secret-that-is-at-least-32-chars",
            "--google-client-id",
            "google-id",
            "--google-client-secret",
            "google-secret",
            "--oauth-redirect-base",
            "https://api.example.com/",
        ])
    }

    #[test]
    fn test_unconfigured_provider_is_none() {
        let args = configured_args();
        assert!(OAuthProvider::from_args(&args, AuthProvider::LinkedIn).is_none());
        assert!(OAuthProvider::from_args(&args, AuthProvider::Local).is_none());
        assert!(OAuthProvider::from_args(&args, AuthProvider::Google).is_some());
    }

    #[test]
    fn test_authorize_url_encodes_params() {
        let provider = OAuthProvider::from_args(&configured_args(), AuthProvider::Google).unwrap();
        let url = provider.authorize_url("st/ate");

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=google-id"));
        // Trailing slash on the base trimmed before the path joined
        assert!(url.contains(&urlencoding::encode(
            "https://api.example.com/auth/oauth/google/callback"
        )
        .into_owned()));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=st%2Fate"));
    }

    #[test]
    fn test_basic_auth_encoding() {
        // RFC 7617 example pair
        assert_eq!(
            basic_auth("Aladdin", "open sesame"),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn test_callback_query_parses_error_shape() {
        let query: CallbackQuery =
            serde_urlencoded::from_str("error=access_denied&state=abc").unwrap();
        assert_eq!(query.error.as_deref(), Some("access_denied"));
        assert_eq!(query.state.as_deref(), Some("abc"));
        assert!(query.code.is_none());

        let query: CallbackQuery = serde_urlencoded::from_str("code=xyz&state=abc").unwrap();
        assert_eq!(query.code.as_deref(), Some("xyz"));
    }
}
