//! Read/write loop for one transaction connection.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::handler::FrameHandler;
use crate::protocol::{RequestFrame, RequestId, Response, ResponseFrame};

/// Runs the read/write loop for a single WebSocket connection.
///
/// Each text message is parsed as a [`RequestFrame`] and handed to
/// `handler`; its responses are written back in order. The loop ends when
/// the client closes the socket or a write fails.
pub async fn run_connection(socket: WebSocket, mut handler: Box<dyn FrameHandler>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    while let Some(message) = ws_rx.next().await {
        let replies = match message {
            Ok(Message::Text(text)) => handle_text(text.as_str(), handler.as_mut()),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(error = %err, "ws receive failed");
                break;
            }
        };

        for reply in replies {
            let json = match serde_json::to_string(&reply) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(request_id = %reply.id, error = %err, "dropping unserializable response");
                    continue;
                }
            };
            if ws_tx.send(Message::text(json)).await.is_err() {
                tracing::debug!("ws client gone mid-reply");
                return;
            }
        }
    }

    tracing::debug!("transaction connection closed");
}

/// Parses one text message and runs it through the handler.
fn handle_text(text: &str, handler: &mut dyn FrameHandler) -> Vec<ResponseFrame> {
    match serde_json::from_str::<RequestFrame>(text) {
        Ok(frame) => {
            tracing::trace!(request_id = %frame.id, kind = frame.body.kind_str(), "request received");
            handler.handle(frame)
        }
        Err(err) => vec![ResponseFrame::new(
            RequestId::UNATTRIBUTED,
            Response::error(format!("malformed JSON: {err}")),
        )],
    }
}
