//! HTTP routes for Veerive

pub mod auth_routes;
pub mod contexts;
pub mod feed_routes;
pub mod health;
pub mod posts;
pub mod saved;
pub mod themes;

pub use auth_routes::handle_auth_request;
pub use contexts::handle_context_request;
pub use feed_routes::{handle_feed, handle_sector_filters, handle_signal_filters};
pub use health::{health_check, readiness_check, version_info};
pub use posts::handle_post_request;
pub use saved::handle_saved_request;
pub use themes::handle_theme_request;
