//! Loopback frame server.
//!
//! Serves the transaction frame protocol over WebSocket at
//! `GET /transaction`, with a `GET /health` probe. What the server answers
//! is decided by a [`FrameHandler`]; each connection gets its own handler
//! from the [`HandlerFactory`], so per-transaction state lives in the
//! handler.
//!
//! ```text
//! client ──ws──▶ /transaction ──▶ run_connection ──▶ FrameHandler::handle
//!        ◀────── response frames ◀──────────────────┘
//! ```

pub mod connection;
pub mod handler;
pub mod health;

use std::fmt;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use handler::{FrameHandler, HandlerFactory};

/// Shared state available to the server's handlers.
#[derive(Clone)]
pub struct ServerState {
    /// Builds one frame handler per connection.
    pub factory: Arc<dyn HandlerFactory>,
}

impl fmt::Debug for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerState").finish_non_exhaustive()
    }
}

/// Builds the server router.
pub fn build_router(factory: Arc<dyn HandlerFactory>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/transaction", get(handler::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState { factory })
}

/// Serves the router on `listener` until the task is dropped.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(listener: TcpListener, factory: Arc<dyn HandlerFactory>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "frame server listening");
    }
    axum::serve(listener, build_router(factory)).await
}
