//! The physical stream behind a transaction and the two tasks that pump it.
//!
//! The writer task drains an mpsc queue into the transport sink, so callers
//! never contend on the sink. The reader task routes every inbound frame
//! through the [`CollectorRegistry`] and fails the registry when the stream
//! errors or ends.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::registry::CollectorRegistry;
use crate::error::TransactionError;
use crate::protocol::RequestFrame;
use crate::transport::{Duplex, FrameSink, FrameSource};

/// A connected physical stream. Released exactly once.
#[derive(Debug)]
pub(crate) struct StreamLink {
    outbound: mpsc::Sender<RequestFrame>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl StreamLink {
    /// Starts the writer and reader tasks for `duplex`.
    pub(crate) fn spawn(
        duplex: Duplex,
        registry: &Arc<CollectorRegistry>,
        outbound_capacity: usize,
        strict_routing: bool,
    ) -> Self {
        let (outbound, queue) = mpsc::channel(outbound_capacity.max(1));
        let writer = tokio::spawn(write_frames(duplex.sink, queue, Arc::clone(registry)));
        let reader = tokio::spawn(route_frames(
            duplex.source,
            Arc::clone(registry),
            strict_routing,
        ));
        Self {
            outbound,
            writer,
            reader,
        }
    }

    /// Returns a handle for queueing request frames.
    pub(crate) fn outbound(&self) -> mpsc::Sender<RequestFrame> {
        self.outbound.clone()
    }

    /// Closes the outbound queue, lets the writer flush and close the sink
    /// (bounded by `timeout`), then stops the reader.
    pub(crate) async fn release(self, timeout: Duration) {
        let Self {
            outbound,
            mut writer,
            reader,
        } = self;
        drop(outbound);

        if tokio::time::timeout(timeout, &mut writer).await.is_err() {
            tracing::warn!(timeout_ms = timeout.as_millis(), "writer did not finish; aborting");
            writer.abort();
        }
        reader.abort();
    }

    /// Stops the reader without waiting. The writer ends on its own once
    /// the outbound queue is dropped.
    pub(crate) fn abort_reader(&self) {
        self.reader.abort();
    }
}

async fn write_frames(
    mut sink: FrameSink,
    mut queue: mpsc::Receiver<RequestFrame>,
    registry: Arc<CollectorRegistry>,
) {
    while let Some(frame) = queue.recv().await {
        let id = frame.id;
        let kind = frame.body.kind_str();
        tracing::trace!(request_id = %id, kind, "writing request frame");
        if let Err(error) = sink.send(frame).await {
            tracing::error!(request_id = %id, %error, "failed to write request frame");
            let failed = registry.fail_all(error.into_transport()).await;
            tracing::debug!(failed, "pending requests failed after write error");
            return;
        }
    }

    if let Err(error) = sink.close().await {
        tracing::debug!(%error, "error while closing transaction stream");
    }
}

/// What the reader does with a frame no collector claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orphan {
    /// The transaction already closed; late frames are expected.
    AfterClose,
    /// Lenient routing: drop the frame and keep going.
    Discard,
    /// Strict routing: fail the transaction.
    Desynchronized,
}

const fn classify_orphan(closed: bool, strict_routing: bool) -> Orphan {
    match (closed, strict_routing) {
        (true, _) => Orphan::AfterClose,
        (false, false) => Orphan::Discard,
        (false, true) => Orphan::Desynchronized,
    }
}

async fn route_frames(
    mut source: FrameSource,
    registry: Arc<CollectorRegistry>,
    strict_routing: bool,
) {
    while let Some(item) = source.next().await {
        match item {
            Ok(frame) => {
                let id = frame.id;
                let kind = frame.body.kind_str();
                let Err(error) = registry.dispatch(frame).await else {
                    continue;
                };
                match classify_orphan(registry.is_closed(), strict_routing) {
                    Orphan::AfterClose => {
                        tracing::debug!(request_id = %id, kind, "discarding frame after close");
                    }
                    Orphan::Discard => {
                        tracing::warn!(request_id = %id, kind, %error, "discarding response frame");
                    }
                    Orphan::Desynchronized => {
                        tracing::warn!(request_id = %id, kind, %error, "stream desynchronized");
                        registry.fail_all(error).await;
                        return;
                    }
                }
            }
            Err(error) => {
                let error = error.into_transport();
                let failed = registry.fail_all(error.clone()).await;
                tracing::error!(%error, failed, "transaction stream failed");
                return;
            }
        }
    }

    let failed = registry
        .fail_all(TransactionError::TransportError(
            "stream closed by server".to_string(),
        ))
        .await;
    if failed > 0 {
        tracing::warn!(failed, "transaction stream closed with requests pending");
    }
}
