//! Request id → collector routing table.
//!
//! One [`tokio::sync::Mutex`] guards the whole map; every mutation is a
//! single insert, lookup, or removal. Entries leave the map when their
//! request completes, or when the registry is failed as a whole. An entry
//! whose caller went away stays until its current batch ends, so the rest
//! of that batch is never mistaken for orphaned frames.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use super::collector::{self, CollectorKind, ResponseCollector, ResponseQueue};
use crate::error::TransactionError;
use crate::protocol::{RequestId, ResponseFrame};

/// Routing table shared by a transaction and its reader task.
#[derive(Debug, Default)]
pub(crate) struct CollectorRegistry {
    collectors: Mutex<HashMap<RequestId, ResponseCollector>>,
    closed: AtomicBool,
}

impl CollectorRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates the collector for `id` and returns the caller's queue.
    ///
    /// Fails with [`TransactionError::TransactionClosed`] once the registry
    /// has been failed, and with [`TransactionError::InvalidRequest`] if `id`
    /// is already pending.
    pub(crate) async fn register(
        &self,
        id: RequestId,
        kind: CollectorKind,
    ) -> Result<ResponseQueue, TransactionError> {
        let mut collectors = self.collectors.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(TransactionError::TransactionClosed);
        }
        if collectors.contains_key(&id) {
            return Err(TransactionError::InvalidRequest(format!(
                "request {id} is already pending"
            )));
        }
        let (collector, queue) = collector::collector(id, kind);
        collectors.insert(id, collector);
        Ok(queue)
    }

    /// Routes an inbound frame to its collector.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::StreamDesynchronized`] if no collector
    /// is registered for the frame's id; the frame is discarded.
    pub(crate) async fn dispatch(&self, frame: ResponseFrame) -> Result<(), TransactionError> {
        let ResponseFrame { id, body } = frame;
        let mut collectors = self.collectors.lock().await;
        let Some(collector) = collectors.get(&id) else {
            return Err(TransactionError::StreamDesynchronized { request_id: id });
        };

        let completes = collector.completes_with(&body);
        match collector.add(body) {
            Ok(()) if completes => {
                collectors.remove(&id);
            }
            Ok(()) => {}
            Err(dropped) if collector.pauses_with(&dropped) => {
                tracing::debug!(
                    request_id = %id,
                    kind = dropped.kind_str(),
                    "caller gone; dropping collector"
                );
                collectors.remove(&id);
            }
            Err(dropped) => {
                tracing::trace!(
                    request_id = %id,
                    kind = dropped.kind_str(),
                    "caller gone; draining batch"
                );
            }
        }
        Ok(())
    }

    /// Removes the collector for `id`, if any.
    pub(crate) async fn discard(&self, id: RequestId) {
        self.collectors.lock().await.remove(&id);
    }

    /// Fails every pending collector with `error` and refuses further
    /// registrations. Returns how many collectors were failed; `0` if the
    /// registry was already failed.
    pub(crate) async fn fail_all(&self, error: TransactionError) -> usize {
        let mut collectors = self.collectors.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let failed = collectors.len();
        for (_, collector) in collectors.drain() {
            collector.fail(error.clone());
        }
        failed
    }

    /// Returns `true` once [`Self::fail_all`] has run.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of requests still awaiting frames.
    pub(crate) async fn pending(&self) -> usize {
        self.collectors.lock().await.len()
    }
}
