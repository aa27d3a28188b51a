//! # Roster API Server
//!
//! REST API over the Roster user service.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and basic counters
//! - `POST /api/v1/users` - Register the caller (`x-login-id` header)
//! - `GET /api/v1/users/:user_key` - Look up a user
//! - `GET /api/v1/users` - List users, paged
//! - `DELETE /api/v1/users/:user_key` - Soft-delete a user
//! - `GET /api/v1/users/stats` - User and cache statistics
//!
//! ## Example
//!
//! ```rust,ignore
//! use roster_api::{ApiServer, ApiConfig};
//!
//! let server = ApiServer::from_config(ApiConfig::from_env()).await?;
//! server.run(([0, 0, 0, 0], 3001)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use handlers::LOGIN_ID_HEADER;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use roster_core::error::Result;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// API server for Roster.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server around prepared state.
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Wires the state from configuration and creates the server.
    pub async fn from_config(config: ApiConfig) -> Result<Self> {
        Ok(Self::new(AppState::from_config(config).await?))
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address until Ctrl-C.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("Roster API server listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Shutting down");
        self.state.flush().await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Starts the API server with configuration from the environment.
pub async fn start_server(port: u16) -> Result<()> {
    let server = ApiServer::from_config(ApiConfig::from_env()).await?;
    server.run(([0, 0, 0, 0], port)).await
}
