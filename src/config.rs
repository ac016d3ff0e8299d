//! Configuration for Veerive
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Veerive - content intelligence API
///
/// Serves sectors, themes, contexts, and the daily feed over JSON/HTTP,
/// backed by MongoDB.
#[derive(Parser, Debug, Clone)]
#[command(name = "veerive")]
#[command(about = "Content intelligence API for sector, theme, and context browsing")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8300")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "veerive")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "86400")]
    pub jwt_expiry_seconds: u64,

    /// Sector/sub-sector taxonomy cache TTL in seconds
    #[arg(long, env = "TAXONOMY_CACHE_TTL_SECS", default_value = "300")]
    pub taxonomy_cache_ttl_secs: u64,

    /// Google OAuth client ID
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Google OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
    pub google_client_secret: Option<String>,

    /// LinkedIn OAuth client ID
    #[arg(long, env = "LINKEDIN_CLIENT_ID")]
    pub linkedin_client_id: Option<String>,

    /// LinkedIn OAuth client secret
    #[arg(long, env = "LINKEDIN_CLIENT_SECRET")]
    pub linkedin_client_secret: Option<String>,

    /// Public base URL used to build OAuth redirect URIs
    /// (e.g. "https://api.veerive.com"; callback paths are appended)
    #[arg(long, env = "OAUTH_REDIRECT_BASE", default_value = "http://localhost:8300")]
    pub oauth_redirect_base: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON (for log shippers)
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Enable development mode (JWT fallback secret, auth-optional saved routes,
    /// server boots without MongoDB)
    #[arg(
        long,
        env = "DEV_MODE",
        default_value = "false",
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set
    )]
    pub dev_mode: bool,
}

impl Args {
    /// Whether the Google OAuth provider is fully configured
    pub fn google_oauth_configured(&self) -> bool {
        self.google_client_id.is_some() && self.google_client_secret.is_some()
    }

    /// Whether the LinkedIn OAuth provider is fully configured
    pub fn linkedin_oauth_configured(&self) -> bool {
        self.linkedin_client_id.is_some() && self.linkedin_client_secret.is_some()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.jwt_secret {
            None if !self.dev_mode => {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            Some(secret) if secret.len() < 32 => {
                return Err("JWT_SECRET must be at least 32 characters".to_string());
            }
            _ => {}
        }

        if self.google_client_id.is_some() != self.google_client_secret.is_some() {
            return Err(
                "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set together".to_string(),
            );
        }

        if self.linkedin_client_id.is_some() != self.linkedin_client_secret.is_some() {
            return Err(
                "LINKEDIN_CLIENT_ID and LINKEDIN_CLIENT_SECRET must be set together".to_string(),
            );
        }

        if self.taxonomy_cache_ttl_secs == 0 {
            return Err("TAXONOMY_CACHE_TTL_SECS must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from([
            "veerive",
            "--jwt-secret",
            "test-secret-that-is-at-least-32-chars",
        ])
    }

    #[test]
    fn test_validate_requires_jwt_secret_in_production() {
        let args = Args::parse_from(["veerive"]);
        assert!(args.validate().is_err());

        let dev = Args::parse_from(["veerive", "--dev-mode", "true"]);
        assert!(dev.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_jwt_secret() {
        let args = Args::parse_from(["veerive", "--jwt-secret", "short"]);
        assert!(args.validate().is_err());
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_partial_oauth_config() {
        let mut args = base_args();
        args.google_client_id = Some("client".into());
        assert!(args.validate().is_err());

        args.google_client_secret = Some("secret".into());
        assert!(args.validate().is_ok());
        assert!(args.google_oauth_configured());
        assert!(!args.linkedin_oauth_configured());
    }

    #[test]
    fn test_validate_rejects_zero_cache_ttl() {
        let mut args = base_args();
        args.taxonomy_cache_ttl_secs = 0;
        assert!(args.validate().is_err());
    }
}
