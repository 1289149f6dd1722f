//! Frame handler seam and the WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::ServerState;
use super::connection::run_connection;
use crate::protocol::{RequestFrame, ResponseFrame};

/// Produces the responses to each request frame of one connection.
///
/// Returned frames are written in order. Returning nothing is allowed, for
/// example for a request the handler wants to leave unanswered.
pub trait FrameHandler: Send + 'static {
    /// Handles one request frame.
    fn handle(&mut self, frame: RequestFrame) -> Vec<ResponseFrame>;
}

impl<F> FrameHandler for F
where
    F: FnMut(RequestFrame) -> Vec<ResponseFrame> + Send + 'static,
{
    fn handle(&mut self, frame: RequestFrame) -> Vec<ResponseFrame> {
        self(frame)
    }
}

/// Builds a fresh [`FrameHandler`] for every connection.
pub trait HandlerFactory: Send + Sync + 'static {
    /// Creates the handler for a new connection.
    fn create(&self) -> Box<dyn FrameHandler>;
}

impl<F> HandlerFactory for F
where
    F: Fn() -> Box<dyn FrameHandler> + Send + Sync + 'static,
{
    fn create(&self) -> Box<dyn FrameHandler> {
        self()
    }
}

/// `GET /transaction`: upgrades to a WebSocket carrying one transaction.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    let handler = state.factory.create();
    ws.on_upgrade(move |socket| run_connection(socket, handler))
}
