//! In-process transport over tokio channels.
//!
//! [`channel`] returns a connector and an acceptor. Every
//! [`MemoryConnector::connect`] hands a fresh [`MemoryPeer`] (the server end
//! of the new stream) to the acceptor. Dropping the peer closes the stream
//! from the server side; [`MemoryPeer::fail`] injects a transport error.

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use super::{Connector, Duplex};
use crate::error::TransactionError;
use crate::protocol::{RequestFrame, ResponseFrame};

type Inbound = Result<ResponseFrame, TransactionError>;

/// Creates a connected connector/acceptor pair.
#[must_use]
pub fn channel() -> (MemoryConnector, MemoryAcceptor) {
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    (
        MemoryConnector { accept_tx },
        MemoryAcceptor { accept_rx },
    )
}

/// Client side: opens in-memory streams.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
}

/// Server side: receives one [`MemoryPeer`] per opened stream.
#[derive(Debug)]
pub struct MemoryAcceptor {
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryAcceptor {
    /// Waits for the next stream. Returns `None` once every connector is gone.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }
}

/// Server end of one in-memory stream.
#[derive(Debug)]
pub struct MemoryPeer {
    requests: mpsc::UnboundedReceiver<RequestFrame>,
    responses: mpsc::UnboundedSender<Inbound>,
}

impl MemoryPeer {
    /// Receives the next request frame. Returns `None` once the client has
    /// closed its side.
    pub async fn recv(&mut self) -> Option<RequestFrame> {
        self.requests.recv().await
    }

    /// Sends a response frame. Returns `false` if the client is gone.
    pub fn send(&self, frame: ResponseFrame) -> bool {
        self.responses.send(Ok(frame)).is_ok()
    }

    /// Emits a transport error on the client's source.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.responses
            .send(Err(TransactionError::TransportError(message.into())))
            .is_ok()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Duplex, TransactionError>> {
        Box::pin(async move {
            let (request_tx, request_rx) = mpsc::unbounded_channel::<RequestFrame>();
            let (response_tx, response_rx) = mpsc::unbounded_channel::<Inbound>();

            let peer = MemoryPeer {
                requests: request_rx,
                responses: response_tx,
            };
            self.accept_tx.send(peer).map_err(|_| {
                TransactionError::TransportError("no acceptor for in-memory stream".to_string())
            })?;

            let sink = futures_util::sink::unfold(
                request_tx,
                |request_tx, frame: RequestFrame| async move {
                    request_tx.send(frame).map_err(|_| {
                        TransactionError::TransportError("peer hung up".to_string())
                    })?;
                    Ok::<_, TransactionError>(request_tx)
                },
            );
            let source = futures_util::stream::unfold(response_rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });

            Ok(Duplex {
                sink: Box::pin(sink),
                source: Box::pin(source),
            })
        })
    }
}
