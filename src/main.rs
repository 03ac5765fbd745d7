//! Wardrobe Server - clothing lending library
//!
//! REST API server for browsing, lending and sharing a garment catalog.

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wardrobe_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::Services,
    storage::LocalObjectStorage,
    AppState,
};

const MAX_UPLOAD_BYTES: usize = 12 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wardrobe_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Wardrobe Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let storage = Arc::new(LocalObjectStorage::new(&config.storage));
    tracing::info!(root = %config.storage.root_dir, "Object storage ready");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, storage, &config);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Identity & roles
        .route("/auth/me", get(api::auth::me))
        .route("/users/promote", post(api::users::promote))
        .route("/patrons/me", put(api::users::update_my_profile))
        .route("/patrons/me/image", put(api::users::upload_my_image))
        .route("/patrons/me/image", delete(api::users::delete_my_image))
        // Browse
        .route("/browse", get(api::browse::browse))
        .route("/categories", get(api::browse::list_categories))
        // Collections
        .route("/collections", post(api::collections::create_collection))
        .route("/collections/:id", get(api::collections::get_collection))
        .route("/collections/:id", put(api::collections::update_collection))
        .route("/collections/:id", delete(api::collections::delete_collection))
        .route("/collections/:id/items/:item_id", delete(api::collections::remove_item))
        .route("/collections/:id/patrons/:patron_id", delete(api::collections::remove_patron))
        .route("/collections/:id/invites", post(api::collections::request_invite))
        // Invites
        .route("/invites/mine", get(api::invites::my_invites))
        .route("/invites/queue", get(api::invites::invite_queue))
        .route("/invites/:id/manage", post(api::invites::manage_invite))
        // Items
        .route("/items", post(api::items::create_item))
        .route("/items/:id", get(api::items::get_item))
        .route("/items/:id", put(api::items::update_item))
        .route("/items/:id", delete(api::items::delete_item))
        .route("/items/:id/image", put(api::items::upload_item_image))
        .route("/items/:id/collections", post(api::items::add_to_collections))
        .route("/items/:id/borrow", post(api::lendings::request_borrow))
        .route("/items/:id/ratings", post(api::ratings::rate_item))
        .route("/items/:id/ratings", get(api::ratings::list_ratings))
        // Lendings
        .route("/lendings/mine", get(api::lendings::my_lendings))
        .route("/lendings/queue", get(api::lendings::lending_queue))
        .route("/lendings/:id/manage", post(api::lendings::manage_lending))
        .route("/lendings/:id/request-return", post(api::lendings::request_return))
        // Ratings
        .route("/ratings/:id", put(api::ratings::update_rating))
        .route("/ratings/:id", delete(api::ratings::delete_rating))
        // Media
        .route("/media/*key", get(api::media::get_media))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
