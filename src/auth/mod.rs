//! Authentication for Veerive
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - OAuth authorization-code flows (Google, LinkedIn)

pub mod jwt;
pub mod oauth;
pub mod password;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use oauth::{CallbackQuery, OAuthProfile, OAuthProvider};
pub use password::{hash_password, verify_password};
