//! WebSocket transport: one JSON text message per frame.

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::{Connector, Duplex};
use crate::error::TransactionError;
use crate::protocol::{RequestFrame, ResponseFrame};

/// Opens one WebSocket connection per transaction.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    /// Creates a connector for the given `ws://` or `wss://` URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Duplex, TransactionError>> {
        Box::pin(async move {
            let (socket, _) = connect_async(self.url.as_str()).await?;
            tracing::debug!(url = %self.url, "transaction stream connected");
            let (write, read) = socket.split();

            let sink = write
                .sink_map_err(TransactionError::from)
                .with(|frame: RequestFrame| async move {
                    let json = serde_json::to_string(&frame)?;
                    Ok::<_, TransactionError>(Message::text(json))
                });
            let source = read.filter_map(|message| async move { decode(message) });

            Ok(Duplex {
                sink: Box::pin(sink),
                source: Box::pin(source),
            })
        })
    }
}

/// Maps one WebSocket message to an inbound item; control and binary
/// messages are skipped.
fn decode(
    message: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<ResponseFrame, TransactionError>> {
    match message {
        Ok(Message::Text(text)) => Some(
            serde_json::from_str::<ResponseFrame>(text.as_str()).map_err(|err| {
                TransactionError::TransportError(format!("malformed response frame: {err}"))
            }),
        ),
        Ok(Message::Binary(_)) => {
            tracing::warn!("ignoring binary message on transaction stream");
            None
        }
        Ok(_) => None,
        Err(err) => Some(Err(err.into())),
    }
}
