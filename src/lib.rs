//! Veerive - content intelligence API
//!
//! Serves the market/trend content platform over JSON/HTTP: sectors,
//! themes, contexts, posts, and expert opinions, browsable through a
//! day-paged feed and detail pages, with saved items and bearer-token
//! auth, backed by MongoDB.
//!
//! ## Modules
//!
//! - **feed**: related-content resolution, calendar-day pagination, and
//!   display-ready view assembly
//! - **db**: MongoDB client wrapper and document schemas
//! - **cache**: TTL cache over the sector/sub-sector taxonomy
//! - **auth**: JWT issue/verify, argon2 passwords, OAuth provider flows
//! - **routes** / **server**: hyper HTTP surface

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod feed;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, VeeriveError};
