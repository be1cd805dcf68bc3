//! Boardd Backend
//!
//! Updates board member profiles stored in the site repository and publishes
//! each change as a GitHub pull request.

mod api;
mod boardd;
mod config;
mod errors;
mod github;
mod models;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use boardd::Boardd;
use config::Config;
use github::{GitHubClient, HttpAssetFetcher};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub boardd: Arc<Boardd>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Boardd Backend");
    tracing::info!("Repository: {}/{}", config.repo_owner, config.repo_name);
    tracing::info!("Data path: {}", config.data_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    match &config.base_branch {
        Some(base) => tracing::info!("Pull request base: {}", base),
        None => tracing::info!("Pull request base: repository default branch"),
    }

    // GitHub client serves both the git data and pull request calls
    let github = Arc::new(GitHubClient::new(
        config.repository(),
        config.github_api_url.clone(),
    )?);
    let assets = Arc::new(HttpAssetFetcher::new()?);

    let boardd = Arc::new(Boardd::new(
        github.clone(),
        github,
        assets,
        config.boardd_settings(),
    ));

    // Create application state
    let state = AppState { boardd };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new().route("/boardd", post(api::update_board_member));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
