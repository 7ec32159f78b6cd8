//! # HTTP Server
//!
//! Combines the health route and the record API into one axum router with
//! permissive CORS and request tracing, and serves it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::rest_api::{records_router, ApiState};

use super::config::HttpServerConfig;
use super::observability_routes::health_routes;

/// HTTP server for the record API
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server over prepared API state
    pub fn new(config: HttpServerConfig, state: ApiState) -> Self {
        let router = build_router(Arc::new(state));
        Self { config, router }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Bind and serve until the process is stopped
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        info!(
            addr = %addr,
            prefix = %self.config.path_prefix,
            "jsonstore listening"
        );
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}

/// Build the combined router
///
/// Any origin, method and header is allowed cross-origin.
pub fn build_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health_routes())
        .merge(records_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
