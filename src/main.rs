//! Veerive - content intelligence API

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use veerive::{
    cache::TaxonomyCache,
    config::Args,
    db::{Collections, MongoClient},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("veerive={},info", args.log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Veerive - Content Intelligence API");
    info!("======================================");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"));
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    info!("Taxonomy cache TTL: {}s", args.taxonomy_cache_ttl_secs);
    info!(
        "OAuth providers: google={}, linkedin={}",
        args.google_oauth_configured(),
        args.linkedin_oauth_configured()
    );
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, continuing without): {}",
                    e
                );
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Build collection handles, applying schema indexes once at startup
    let collections = match &mongo {
        Some(client) => match Collections::init(client).await {
            Ok(c) => Some(c),
            Err(e) => {
                error!("Collection initialization failed: {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let taxonomy = TaxonomyCache::new(Duration::from_secs(args.taxonomy_cache_ttl_secs));

    let state = Arc::new(AppState::new(args, mongo, collections, taxonomy));

    server::run(state).await?;

    Ok(())
}
