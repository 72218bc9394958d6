//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::monitor::Monitor;
use crate::status::StatusService;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub monitor: Arc<Monitor>,
    pub status: Arc<StatusService>,
}

/// Web server for SiteWatch.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(
        config: ServerConfig,
        store: Arc<Store>,
        monitor: Arc<Monitor>,
        status: Arc<StatusService>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                store,
                monitor,
                status,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route("/api/health", get(handlers::handle_health))
            // Registry
            .route("/api/sites", get(handlers::handle_list_sites))
            .route("/api/sites", post(handlers::handle_create_site))
            .route("/api/sites/{id}", get(handlers::handle_get_site))
            .route("/api/sites/{id}", put(handlers::handle_update_site))
            .route("/api/sites/{id}", delete(handlers::handle_delete_site))
            // Aggregates
            .route("/api/sites/{id}/status", get(handlers::handle_site_status))
            .route("/api/sites/{id}/checks", get(handlers::handle_site_checks))
            .route("/api/sites/{id}/uptime", get(handlers::handle_site_uptime))
            // Probing
            .route("/api/sites/{id}/check", post(handlers::handle_run_check))
            .route("/api/sweep", post(handlers::handle_run_sweep))
            .layer(cors)
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
