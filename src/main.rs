//! Permit Tracker
//!
//! Tracks event permit applications through the district authority chain
//! (DC, SP, SDPO, OC) from submission to a final decision.
//!
//! ## Features
//!
//! - **Applications**: Create, edit and delete applications, optionally with a PDF
//! - **Authority workflow**: Stage inboxes and guarded forwarding, reporting and decisions
//! - **Documents**: Download or view the attached permit document

mod applications;
mod completeness;
mod config;
mod db;
mod documents;
mod error;
mod handlers;
mod models;
mod validation;
mod workflow;

use applications::ApplicationService;
use config::{Config, StorageBackend};
use db::ApplicationStore;
use documents::DocumentStore;
use handlers::AppState;
use std::path::PathBuf;
use tokio::fs;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workflow::WorkflowEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "permit_tracker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Starting Permit Tracker");
    tracing::info!("Environment: {:?}", config.environment);

    // Ensure upload directory exists
    let upload_dir = PathBuf::from(&config.upload_dir);
    fs::create_dir_all(&upload_dir).await?;
    tracing::info!("Upload directory: {:?}", upload_dir);

    match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for the postgres backend")?;

            tracing::info!("Connecting to database...");
            let pool = db::create_pool(database_url).await?;
            tracing::info!("Database connected");

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            serve(&config, upload_dir, db::PgStore::new(pool)).await
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; applications are lost on restart");
            serve(&config, upload_dir, db::MemoryStore::accepting_any_user()).await
        }
    }
}

async fn serve<S: ApplicationStore>(
    config: &Config,
    upload_dir: PathBuf,
    store: S,
) -> Result<(), Box<dyn std::error::Error>> {
    // Create application state
    let documents = DocumentStore::new(upload_dir, config.max_upload_size);
    let state = AppState {
        applications: ApplicationService::new(store.clone(), documents),
        workflow: WorkflowEngine::new(store, config.role_stage_access.clone()),
        is_production: config.is_production(),
    };

    // Build CORS layer
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_origin(
                config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(handlers::body_limit(
            config.max_upload_size,
        )))
        .layer(cors);

    // Start server
    let addr = config.server_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
