//! All Circles Server - HTTP API for the rules engine
//!
//! This crate provides the web backend:
//! - REST API for game operations (new, turn, targets, save, load, close)
//! - Catalog and status endpoints
//! - Static file serving for a browser client

mod error;
mod routes;
mod state;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use circles_core::{Catalog, GameConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub use error::ApiError;
pub use state::{GameId, ServerState};

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: String,
    /// Defaults for every new game
    pub game: GameConfig,
    /// Catalog file; the built-in catalog when unset
    pub catalog_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8002,
            static_dir: "client".to_string(),
            game: GameConfig::default(),
            catalog_path: None,
        }
    }
}

/// Create the router with all routes
pub fn create_router(config: &ServerConfig, state: Arc<ServerState>) -> Router {
    let static_service = ServeDir::new(&config.static_dir);

    Router::new()
        .route("/api/status", get(routes::status::status_handler))
        .route("/api/catalog", get(routes::catalog::get_catalog))
        // Game API
        .route("/api/game/new", post(routes::game::new_game))
        .route("/api/game/turn", post(routes::game::make_turn))
        .route("/api/game/load", post(routes::game::load_game))
        .route("/api/game/close", post(routes::game::close_game))
        .route("/api/game/:id", get(routes::game::get_game))
        .route("/api/game/:id/board", get(routes::game::get_board))
        .route("/api/game/:id/save", get(routes::game::save_game))
        .route(
            "/api/game/:id/targets/:action",
            get(routes::game::get_targets),
        )
        .with_state(state)
        // Static file serving (must be last)
        .fallback_service(static_service)
        .layer(CorsLayer::permissive())
}

/// Load the catalog and build the shared registry
pub fn build_state(config: &ServerConfig) -> anyhow::Result<Arc<ServerState>> {
    config
        .game
        .validate()
        .context("invalid default game settings")?;
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::default(),
    };
    Ok(Arc::new(ServerState::new(
        Arc::new(catalog),
        config.game.clone(),
    )))
}

/// Start the HTTP server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = build_state(&config)?;
    let router = create_router(&config, state);

    tracing::info!("All Circles server starting on http://0.0.0.0:{}", config.port);
    tracing::info!("Static files served from: {}", config.static_dir);
    if let Some(path) = &config.catalog_path {
        tracing::info!("Catalog loaded from: {}", path.display());
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_file(name: &str, catalog: &Catalog) -> PathBuf {
        let path = std::env::temp_dir().join(format!("circles-{}-{}.json", name, std::process::id()));
        catalog.save(&path).unwrap();
        path
    }

    #[test]
    fn test_build_state_loads_catalog_file() {
        let mut catalog = Catalog::default();
        catalog.hero.stats.health = 80;
        let config = ServerConfig {
            catalog_path: Some(catalog_file("valid", &catalog)),
            ..Default::default()
        };

        let state = build_state(&config).unwrap();
        assert_eq!(state.catalog.hero.stats.health, 80);
    }

    #[test]
    fn test_build_state_rejects_invalid_catalog_file() {
        let mut catalog = Catalog::default();
        catalog.structures.retain(|s| s.code_name != "exit");
        let config = ServerConfig {
            catalog_path: Some(catalog_file("no-exit", &catalog)),
            ..Default::default()
        };

        let err = build_state(&config).unwrap_err();
        assert!(err.to_string().contains("exit"), "{}", err);
    }
}
