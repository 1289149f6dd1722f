//! Per-request response buffers.
//!
//! A collector is a pair: the [`ResponseCollector`] half lives in the
//! registry and receives routed frames; the [`ResponseQueue`] half belongs
//! to the caller, which suspends in [`ResponseQueue::take`] until the next
//! frame (or a failure) is available.

use tokio::sync::mpsc;

use crate::error::TransactionError;
use crate::protocol::{RequestId, Response, StreamState};

type Delivery = Result<Response, TransactionError>;

/// How many frames a request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectorKind {
    /// Exactly one frame completes the request.
    Single,
    /// Frames until a `done` marker or an error.
    Streaming,
}

/// Registry-side half: appends frames to the buffer.
#[derive(Debug)]
pub(crate) struct ResponseCollector {
    kind: CollectorKind,
    sender: mpsc::UnboundedSender<Delivery>,
}

/// Caller-side half: takes frames from the buffer.
#[derive(Debug)]
pub(crate) struct ResponseQueue {
    id: RequestId,
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

/// Creates both halves of a collector for request `id`.
pub(crate) fn collector(id: RequestId, kind: CollectorKind) -> (ResponseCollector, ResponseQueue) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        ResponseCollector { kind, sender },
        ResponseQueue { id, receiver },
    )
}

impl ResponseCollector {
    /// Buffers a frame. Fails if the caller has gone away.
    pub(crate) fn add(&self, response: Response) -> Result<(), Response> {
        self.sender.send(Ok(response)).map_err(|rejected| match rejected.0 {
            Ok(response) => response,
            Err(_) => Response::error("collector closed"),
        })
    }

    /// Delivers a failure instead of a frame.
    pub(crate) fn fail(&self, error: TransactionError) {
        let _ = self.sender.send(Err(error));
    }

    /// Returns `true` if `response` is the last frame this request expects.
    pub(crate) const fn completes_with(&self, response: &Response) -> bool {
        match self.kind {
            CollectorKind::Single => true,
            CollectorKind::Streaming => matches!(
                response,
                Response::StreamState {
                    state: StreamState::Done
                } | Response::Error { .. }
            ),
        }
    }
}

impl ResponseCollector {
    /// Returns `true` if no further frame follows `response` until the
    /// client asks for one: the request completed, or a streamed batch
    /// ended with `continue`.
    pub(crate) const fn pauses_with(&self, response: &Response) -> bool {
        self.completes_with(response)
            || matches!(
                response,
                Response::StreamState {
                    state: StreamState::Continue
                }
            )
    }
}

impl ResponseQueue {
    /// Request this queue belongs to.
    pub(crate) const fn id(&self) -> RequestId {
        self.id
    }

    /// Waits for the next frame.
    ///
    /// Resolves with the failure the registry delivered, or with
    /// [`TransactionError::TransactionClosed`] if the collector was dropped
    /// without one.
    pub(crate) async fn take(&mut self) -> Delivery {
        self.receiver
            .recv()
            .await
            .unwrap_or(Err(TransactionError::TransactionClosed))
    }

    /// Returns a failure already delivered to the buffer, without waiting.
    pub(crate) fn try_failure(&mut self) -> Option<TransactionError> {
        match self.receiver.try_recv() {
            Ok(Err(error)) => Some(error),
            _ => None,
        }
    }
}
