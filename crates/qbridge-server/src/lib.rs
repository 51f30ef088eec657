//! HTTP server for the qbridge OAuth broker.
//!
//! # Routes
//!
//! - `GET /auth/start`: redirect to the provider's authorization page
//! - `GET /callback`: provider redirect target; exchanges the code and stores tokens
//! - `GET /tools/discover`: advertise the `search` and `fetch` tools
//! - `POST /tools/execute`: run a tool for a tenant
//! - `GET /health`: liveness
//!
//! # Example
//!
//! ```ignore
//! use qbridge_server::{AppState, Server, ServerConfig};
//!
//! let state = AppState::new(api_client, ServerConfig::default());
//! Server::from_state(state).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{Router, extract::DefaultBodyLimit, http::HeaderValue};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// The qbridge HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .merge(routes::auth_routes())
            .merge(routes::tool_routes())
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router.with_state(self.state.clone())
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins = &self.state.config.cors_origins;
        if origins.is_empty() {
            return None;
        }
        if origins.iter().any(|o| o == "*") {
            return Some(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
        }

        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        Some(
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    }

    /// Run the server on the configured address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Failed to read local address: {}", e)))?;

        info!(addr = %local_addr, "Starting server");

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_server_health_endpoint() {
        let server = Server::from_state(test_state("http://provider.test"));
        let app = server.router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_router_mounts_all_routes() {
        let server = Server::from_state(test_state("http://provider.test"));

        for (method, uri, expected) in [
            ("GET", "/auth/start", StatusCode::FOUND),
            ("GET", "/tools/discover", StatusCode::OK),
            ("GET", "/callback", StatusCode::BAD_REQUEST),
            ("GET", "/nope", StatusCode::NOT_FOUND),
        ] {
            let response = server
                .router()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_cors_preflight_when_configured() {
        let mut state = test_state("http://provider.test");
        state.config = std::sync::Arc::new(
            ServerConfig::default().with_cors_origins(vec!["https://app.test".to_string()]),
        );
        let server = Server::from_state(state);

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/tools/discover")
                    .header("origin", "https://app.test")
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://app.test"
        );
    }
}
