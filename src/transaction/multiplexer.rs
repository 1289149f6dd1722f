//! [`Transaction`]: many logical requests over one physical stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};

use super::answer_stream::AnswerStream;
use super::collector::CollectorKind;
use super::link::StreamLink;
use super::registry::CollectorRegistry;
use crate::config::ClientConfig;
use crate::error::TransactionError;
use crate::manager::{ConceptManager, LogicManager, QueryManager};
use crate::protocol::{
    Answer, Request, RequestFrame, RequestId, RequestIdGenerator, Response, SessionBinding,
    TransactionOptions, TransactionType,
};
use crate::transport::Connector;

/// State of the physical stream.
#[derive(Debug)]
enum Link {
    /// Not connected yet; the first request connects.
    Idle,
    /// Connected and pumping.
    Connected(StreamLink),
    /// Released by `close`, or never to be connected again.
    Released,
}

#[derive(Debug)]
struct Inner {
    transaction_type: TransactionType,
    connector: Arc<dyn Connector>,
    config: ClientConfig,
    ids: RequestIdGenerator,
    registry: Arc<CollectorRegistry>,
    link: Mutex<Link>,
    opened: AtomicBool,
    network_latency_millis: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Link::Connected(link) = self.link.get_mut() {
            link.abort_reader();
        }
    }
}

/// A logical unit of work bound to one bidirectional stream.
///
/// Cloning yields another handle to the same transaction. Requests issued
/// concurrently from any handle share the stream; each response frame is
/// routed back to the request whose id it carries. The stream is connected
/// lazily by the first request and released exactly once, by [`Self::close`]
/// or when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct Transaction {
    inner: Arc<Inner>,
}

impl Transaction {
    /// Creates an unopened transaction. Nothing is connected until the
    /// first request.
    #[must_use]
    pub fn new(
        connector: Arc<dyn Connector>,
        transaction_type: TransactionType,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transaction_type,
                connector,
                config: config.clone(),
                ids: RequestIdGenerator::new(),
                registry: Arc::new(CollectorRegistry::new()),
                link: Mutex::new(Link::Idle),
                opened: AtomicBool::new(false),
                network_latency_millis: AtomicU64::new(0),
            }),
        }
    }

    /// Transaction type.
    #[must_use]
    pub fn transaction_type(&self) -> TransactionType {
        self.inner.transaction_type
    }

    /// Returns `true` between a successful [`Self::open`] and the
    /// transaction closing (explicitly, by commit, or by stream failure).
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.opened.load(Ordering::Acquire) && !self.inner.registry.is_closed()
    }

    /// Network latency measured while opening: round trip minus the
    /// server's reported processing time.
    #[must_use]
    pub fn network_latency(&self) -> Duration {
        Duration::from_millis(self.inner.network_latency_millis.load(Ordering::Relaxed))
    }

    /// Number of requests still waiting for frames.
    pub async fn pending_requests(&self) -> usize {
        self.inner.registry.pending().await
    }

    /// Query operations.
    #[must_use]
    pub fn query(&self) -> QueryManager<'_> {
        QueryManager::new(self)
    }

    /// Concept lookups and schema writes.
    #[must_use]
    pub fn concepts(&self) -> ConceptManager<'_> {
        ConceptManager::new(self)
    }

    /// Rule lookups and writes.
    #[must_use]
    pub fn logic(&self) -> LogicManager<'_> {
        LogicManager::new(self)
    }

    /// Opens the transaction in `session`. Unset `options` fall back to the
    /// configured defaults.
    ///
    /// A failed open closes the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::InvalidRequest`] if the transaction was
    /// already opened or its type is not allowed in the session, and any
    /// error of [`Self::execute`].
    pub async fn open(
        &self,
        session: &SessionBinding,
        options: TransactionOptions,
    ) -> Result<(), TransactionError> {
        let transaction_type = self.inner.transaction_type;
        if !transaction_type.allowed_in(session.session_type) {
            return Err(TransactionError::InvalidRequest(format!(
                "{transaction_type} transactions require a schema session"
            )));
        }
        if self.inner.opened.swap(true, Ordering::AcqRel) {
            return Err(TransactionError::InvalidRequest(
                "transaction already opened".to_string(),
            ));
        }

        let request = Request::Open {
            session: session.clone(),
            transaction_type,
            options: options.or(&self.inner.config.default_options),
        };
        let started = Instant::now();
        let opened = self
            .execute(request, |response| match response {
                Response::Open {
                    processing_time_millis,
                } => Ok(processing_time_millis),
                other => Err(TransactionError::unexpected("open", &other)),
            })
            .await;

        let processing_millis = match opened {
            Ok(millis) => millis,
            Err(error) => {
                self.close().await;
                return Err(error);
            }
        };
        let round_trip = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let latency = round_trip.saturating_sub(processing_millis);
        self.inner
            .network_latency_millis
            .store(latency, Ordering::Relaxed);

        tracing::debug!(
            session = %session.id,
            %transaction_type,
            latency_ms = latency,
            "transaction opened"
        );
        Ok(())
    }

    /// Commits, then closes the transaction whether or not the commit
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns the commit's error, if any.
    pub async fn commit(&self) -> Result<(), TransactionError> {
        let committed = self
            .execute(Request::Commit, |response| match response {
                Response::Commit => Ok(()),
                other => Err(TransactionError::unexpected("commit", &other)),
            })
            .await;
        self.close().await;
        committed
    }

    /// Discards uncommitted writes. The transaction stays open.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Self::execute`].
    pub async fn rollback(&self) -> Result<(), TransactionError> {
        self.execute(Request::Rollback, |response| match response {
            Response::Rollback => Ok(()),
            other => Err(TransactionError::unexpected("rollback", &other)),
        })
        .await
    }

    /// Closes the transaction.
    ///
    /// Every pending `execute`/`stream` call fails with
    /// [`TransactionError::TransactionClosed`], and the physical stream is
    /// released. Idempotent: later or concurrent calls find nothing to do.
    pub async fn close(&self) {
        let failed = self
            .inner
            .registry
            .fail_all(TransactionError::TransactionClosed)
            .await;

        let previous = {
            let mut link = self.inner.link.lock().await;
            std::mem::replace(&mut *link, Link::Released)
        };
        if let Link::Connected(stream) = previous {
            stream.release(self.inner.config.close_timeout).await;
            tracing::debug!(failed, "transaction closed");
        }
    }

    /// Sends `request` and resolves with `transform` applied to the single
    /// response frame carrying its id.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::TransactionClosed`] if the transaction is
    ///   closed before or while waiting.
    /// - [`TransactionError::RemoteError`] if the server answers with an
    ///   error frame.
    /// - [`TransactionError::TransportError`] if the stream breaks.
    /// - Whatever `transform` returns.
    pub async fn execute<T, F>(&self, request: Request, transform: F) -> Result<T, TransactionError>
    where
        F: FnOnce(Response) -> Result<T, TransactionError>,
    {
        let id = self.inner.ids.next_id();
        let mut queue = self
            .inner
            .registry
            .register(id, CollectorKind::Single)
            .await?;
        self.send_registered(id, request).await?;

        match queue.take().await? {
            Response::Error { message } => Err(TransactionError::RemoteError(message)),
            response => transform(response),
        }
    }

    /// Sends `request` and returns its answers as a lazy [`AnswerStream`].
    /// `transform` maps each streamed batch to items.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::TransactionClosed`] if the transaction is
    /// closed, or a transport error if the request cannot be sent. Errors
    /// after that surface through the stream.
    pub async fn stream<T, F>(
        &self,
        request: Request,
        transform: F,
    ) -> Result<AnswerStream<T>, TransactionError>
    where
        F: FnMut(Answer) -> Result<Vec<T>, TransactionError> + Send + 'static,
    {
        let id = self.inner.ids.next_id();
        let queue = self
            .inner
            .registry
            .register(id, CollectorKind::Streaming)
            .await?;
        self.send_registered(id, request).await?;
        Ok(AnswerStream::new(self.clone(), queue, Box::new(transform)))
    }

    /// Queues a frame on the physical stream, connecting it first if needed.
    pub(crate) async fn send(&self, frame: RequestFrame) -> Result<(), TransactionError> {
        let outbound = self.outbound().await?;
        outbound
            .send(frame)
            .await
            .map_err(|_| TransactionError::TransactionClosed)
    }

    /// Removes the collector for `id`, if still registered.
    pub(crate) async fn discard(&self, id: RequestId) {
        self.inner.registry.discard(id).await;
    }

    async fn send_registered(&self, id: RequestId, request: Request) -> Result<(), TransactionError> {
        tracing::trace!(request_id = %id, kind = request.kind_str(), "sending request");
        let sent = self.send(RequestFrame::new(id, request)).await;
        if sent.is_err() {
            self.discard(id).await;
        }
        sent
    }

    async fn outbound(&self) -> Result<mpsc::Sender<RequestFrame>, TransactionError> {
        let mut link = self.inner.link.lock().await;
        match &*link {
            Link::Connected(stream) => return Ok(stream.outbound()),
            Link::Released => return Err(TransactionError::TransactionClosed),
            Link::Idle => {}
        }
        if self.inner.registry.is_closed() {
            *link = Link::Released;
            return Err(TransactionError::TransactionClosed);
        }

        let duplex = match self.inner.connector.connect().await {
            Ok(duplex) => duplex,
            Err(error) => {
                let error = error.into_transport();
                tracing::error!(%error, "failed to open transaction stream");
                *link = Link::Released;
                self.inner.registry.fail_all(error.clone()).await;
                return Err(error);
            }
        };
        let stream = StreamLink::spawn(
            duplex,
            &self.inner.registry,
            self.inner.config.outbound_capacity,
            self.inner.config.strict_routing,
        );
        let outbound = stream.outbound();
        *link = Link::Connected(stream);
        tracing::debug!(transaction_type = %self.inner.transaction_type, "transaction stream opened");
        Ok(outbound)
    }
}
