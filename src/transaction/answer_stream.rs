//! Lazy, pull-based answers of a streamed request.

use std::collections::VecDeque;
use std::fmt;

use futures_util::Stream;

use super::collector::ResponseQueue;
use super::multiplexer::Transaction;
use crate::error::TransactionError;
use crate::protocol::{Answer, Request, RequestFrame, RequestId, Response, StreamState};

/// Maps one streamed batch to the caller's items.
pub(crate) type Transform<T> = Box<dyn FnMut(Answer) -> Result<Vec<T>, TransactionError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullState {
    /// Frames of the current batch are on their way.
    Reading,
    /// The server paused after a batch; the next empty-buffer pull asks for more.
    NeedsContinue,
    /// Done marker, error, or close observed. Nothing more will be read.
    Finished,
}

/// Answers of a streamed request, pulled one at a time.
///
/// Each pull that finds the local buffer empty reads one batch from the
/// request's collector. When the previous batch ended with a `continue`
/// marker, a `stream` request carrying the same id is sent first. Once a
/// `done` marker (or an error) has been seen, every further pull returns
/// `None` without touching the stream. Not restartable.
pub struct AnswerStream<T> {
    transaction: Transaction,
    id: RequestId,
    queue: Option<ResponseQueue>,
    transform: Transform<T>,
    buffer: VecDeque<T>,
    failure: Option<TransactionError>,
    state: PullState,
}

impl<T> AnswerStream<T> {
    pub(crate) fn new(transaction: Transaction, queue: ResponseQueue, transform: Transform<T>) -> Self {
        Self {
            transaction,
            id: queue.id(),
            queue: Some(queue),
            transform,
            buffer: VecDeque::new(),
            failure: None,
            state: PullState::Reading,
        }
    }

    /// Request id shared by the initial request and its continuations.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.id
    }

    /// Returns `true` once the stream can yield nothing beyond its buffer.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == PullState::Finished
    }

    /// Pulls the next answer.
    ///
    /// Returns `None` when the stream is exhausted. An `Err` item ends the
    /// stream, after any answers that arrived before it: a
    /// [`TransactionError::RemoteError`] for server-reported failures,
    /// [`TransactionError::TransactionClosed`] or
    /// [`TransactionError::TransportError`] if the transaction went away.
    pub async fn next(&mut self) -> Option<Result<T, TransactionError>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if let Some(error) = self.failure.take() {
                return Some(Err(error));
            }
            let step = match self.state {
                PullState::Finished => return None,
                PullState::NeedsContinue => self.request_next_batch().await,
                PullState::Reading => self.read_batch().await,
            };
            if let Err(error) = step {
                self.abandon();
                self.failure = Some(error);
            }
        }
    }

    /// Drains the stream into a vector, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error the stream yields.
    pub async fn collect(mut self) -> Result<Vec<T>, TransactionError> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Adapts this into a [`futures_util::Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<T, TransactionError>> {
        futures_util::stream::unfold(self, |mut answers| async move {
            answers.next().await.map(|item| (item, answers))
        })
    }

    async fn request_next_batch(&mut self) -> Result<(), TransactionError> {
        tracing::trace!(request_id = %self.id, "requesting next batch");
        let sent = self
            .transaction
            .send(RequestFrame::new(self.id, Request::Stream))
            .await;
        if let Err(error) = sent {
            let delivered = self.queue.as_mut().and_then(ResponseQueue::try_failure);
            return Err(delivered.unwrap_or(error));
        }
        self.state = PullState::Reading;
        Ok(())
    }

    /// Reads frames up to the next batch boundary.
    async fn read_batch(&mut self) -> Result<(), TransactionError> {
        loop {
            let Some(queue) = self.queue.as_mut() else {
                self.state = PullState::Finished;
                return Ok(());
            };
            match queue.take().await? {
                Response::Part { answer } => {
                    let items = (self.transform)(answer)?;
                    self.buffer.extend(items);
                }
                Response::StreamState {
                    state: StreamState::Continue,
                } => {
                    self.state = PullState::NeedsContinue;
                    return Ok(());
                }
                Response::StreamState {
                    state: StreamState::Done,
                } => {
                    self.finish().await;
                    return Ok(());
                }
                Response::Error { message } => return Err(TransactionError::RemoteError(message)),
                other => return Err(TransactionError::unexpected("part", &other)),
            }
        }
    }

    async fn finish(&mut self) {
        self.state = PullState::Finished;
        if self.queue.take().is_some() {
            self.transaction.discard(self.id).await;
        }
    }

    /// Stops reading without touching the registry. Frames the server
    /// still sends for this batch are drained there until it ends.
    fn abandon(&mut self) {
        self.state = PullState::Finished;
        self.queue = None;
    }
}

impl<T> fmt::Debug for AnswerStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerStream")
            .field("id", &self.id)
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;

    use super::*;
    use crate::config::ClientConfig;
    use crate::protocol::{ConceptMap, QueryRequest, TransactionOptions, TransactionType};
    use crate::transaction::test_support::{
        accept, cont, done, maps_part, memory_transaction, next_request, reply,
    };
    use crate::transport::MemoryPeer;

    const QUIET: Duration = Duration::from_millis(50);

    fn match_request() -> Request {
        Request::Query {
            options: TransactionOptions::default(),
            query: QueryRequest::Match {
                query: "match $x sub thing;".to_string(),
            },
        }
    }

    fn labels(answer: Answer) -> Result<Vec<String>, TransactionError> {
        match answer {
            Answer::ConceptMaps { maps } => Ok(maps
                .iter()
                .filter_map(|map: &ConceptMap| map.get("x").and_then(|c| c.label.clone()))
                .collect()),
            other => Err(TransactionError::UnexpectedResponse {
                expected: "concept_maps",
                received: other.kind_str(),
            }),
        }
    }

    async fn expect_quiet(peer: &mut MemoryPeer) {
        let next = tokio::time::timeout(QUIET, peer.recv()).await;
        assert!(next.is_err(), "unexpected frame: {next:?}");
    }

    #[tokio::test]
    async fn three_batches_then_done() {
        let (tx, mut acceptor) = memory_transaction(TransactionType::Read, &ClientConfig::default());
        let Ok(answers) = tx.stream(match_request(), labels).await else {
            panic!("stream request failed");
        };

        let server = tokio::spawn(async move {
            let mut peer = accept(&mut acceptor).await;
            let first = next_request(&mut peer).await;
            reply(&peer, &first, maps_part(&["person", "company"]));
            reply(&peer, &first, cont());

            let second = next_request(&mut peer).await;
            assert_eq!(second.id, first.id);
            assert_eq!(second.body, Request::Stream);
            reply(&peer, &second, maps_part(&["employment"]));
            reply(&peer, &second, cont());

            let third = next_request(&mut peer).await;
            assert_eq!(third.id, first.id);
            reply(&peer, &third, maps_part(&["name"]));
            reply(&peer, &third, maps_part(&["age"]));
            reply(&peer, &third, done());
            peer
        });

        let Ok(collected) = answers.collect().await else {
            panic!("stream failed");
        };
        assert_eq!(collected, ["person", "company", "employment", "name", "age"]);

        let Ok(mut peer) = server.await else {
            panic!("server script failed");
        };
        expect_quiet(&mut peer).await;
        assert_eq!(tx.pending_requests().await, 0);
    }

    #[tokio::test]
    async fn continuation_waits_for_an_empty_buffer() {
        let (tx, mut acceptor) = memory_transaction(TransactionType::Read, &ClientConfig::default());
        let Ok(mut answers) = tx.stream(match_request(), labels).await else {
            panic!("stream request failed");
        };
        let mut peer = accept(&mut acceptor).await;
        let first = next_request(&mut peer).await;
        reply(&peer, &first, maps_part(&["a", "b"]));
        reply(&peer, &first, cont());

        assert!(matches!(answers.next().await, Some(Ok(label)) if label == "a"));
        assert!(matches!(answers.next().await, Some(Ok(label)) if label == "b"));
        expect_quiet(&mut peer).await;

        let pull = tokio::spawn(async move {
            let item = answers.next().await;
            (item, answers)
        });
        let continuation = next_request(&mut peer).await;
        assert_eq!(continuation.body, Request::Stream);
        reply(&peer, &continuation, maps_part(&["c"]));
        reply(&peer, &continuation, done());

        let Ok((item, mut answers)) = pull.await else {
            panic!("pull task failed");
        };
        assert!(matches!(item, Some(Ok(label)) if label == "c"));
        assert!(answers.next().await.is_none());
        assert!(answers.is_finished());
    }

    #[tokio::test]
    async fn exhausted_stream_is_a_no_op() {
        let (tx, mut acceptor) = memory_transaction(TransactionType::Read, &ClientConfig::default());
        let Ok(mut answers) = tx.stream(match_request(), labels).await else {
            panic!("stream request failed");
        };
        let mut peer = accept(&mut acceptor).await;
        let first = next_request(&mut peer).await;
        reply(&peer, &first, done());

        assert!(answers.next().await.is_none());
        assert!(answers.next().await.is_none());
        expect_quiet(&mut peer).await;
    }

    #[tokio::test]
    async fn empty_continue_batch_pulls_again() {
        let (tx, mut acceptor) = memory_transaction(TransactionType::Read, &ClientConfig::default());
        let Ok(answers) = tx.stream(match_request(), labels).await else {
            panic!("stream request failed");
        };
        let server = tokio::spawn(async move {
            let mut peer = accept(&mut acceptor).await;
            let first = next_request(&mut peer).await;
            reply(&peer, &first, cont());
            let second = next_request(&mut peer).await;
            reply(&peer, &second, maps_part(&["only"]));
            reply(&peer, &second, done());
            peer
        });

        let Ok(collected) = answers.collect().await else {
            panic!("stream failed");
        };
        assert_eq!(collected, ["only"]);
        assert!(server.await.is_ok());
    }

    #[tokio::test]
    async fn remote_error_ends_stream() {
        let (tx, mut acceptor) = memory_transaction(TransactionType::Read, &ClientConfig::default());
        let Ok(mut answers) = tx.stream(match_request(), labels).await else {
            panic!("stream request failed");
        };
        let mut peer = accept(&mut acceptor).await;
        let first = next_request(&mut peer).await;
        reply(&peer, &first, maps_part(&["a"]));
        reply(&peer, &first, Response::error("query timed out"));

        assert!(matches!(answers.next().await, Some(Ok(label)) if label == "a"));
        assert_eq!(
            answers.next().await,
            Some(Err(TransactionError::RemoteError("query timed out".to_string())))
        );
        assert!(answers.next().await.is_none());
        assert_eq!(tx.pending_requests().await, 0);
    }

    async fn wait_for_pending(tx: &Transaction, expected: usize) {
        for _ in 0..100 {
            if tx.pending_requests().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("pending requests never reached {expected}");
    }

    #[tokio::test]
    async fn unexpected_frame_kind_is_reported() {
        let (tx, mut acceptor) = memory_transaction(TransactionType::Read, &ClientConfig::default());
        let Ok(mut answers) = tx.stream(match_request(), labels).await else {
            panic!("stream request failed");
        };
        let mut peer = accept(&mut acceptor).await;
        let first = next_request(&mut peer).await;
        reply(&peer, &first, Response::Commit);

        assert_eq!(
            answers.next().await,
            Some(Err(TransactionError::UnexpectedResponse {
                expected: "part",
                received: "commit",
            }))
        );
        assert!(answers.next().await.is_none());

        reply(&peer, &first, done());
        wait_for_pending(&tx, 0).await;
    }

    #[tokio::test]
    async fn local_failure_mid_batch_keeps_strict_transaction_usable() {
        let config = ClientConfig {
            strict_routing: true,
            ..ClientConfig::default()
        };
        let (tx, mut acceptor) = memory_transaction(TransactionType::Read, &config);
        let rejecting = |answer: Answer| -> Result<Vec<String>, TransactionError> {
            let items = labels(answer)?;
            if items.iter().any(|label| label == "bad") {
                return Err(TransactionError::InvalidRequest("bad item".to_string()));
            }
            Ok(items)
        };
        let Ok(mut answers) = tx.stream(match_request(), rejecting).await else {
            panic!("stream request failed");
        };
        let mut peer = accept(&mut acceptor).await;
        let first = next_request(&mut peer).await;
        reply(&peer, &first, maps_part(&["bad"]));

        assert_eq!(
            answers.next().await,
            Some(Err(TransactionError::InvalidRequest("bad item".to_string())))
        );
        assert!(answers.next().await.is_none());

        reply(&peer, &first, maps_part(&["b"]));
        reply(&peer, &first, done());

        let rollback = tokio::spawn({
            let tx = tx.clone();
            async move {
                tx.execute(Request::Rollback, |response| match response {
                    Response::Rollback => Ok(()),
                    other => Err(TransactionError::unexpected("rollback", &other)),
                })
                .await
            }
        });
        let frame = next_request(&mut peer).await;
        assert_eq!(frame.body, Request::Rollback);
        reply(&peer, &frame, Response::Rollback);

        assert_eq!(rollback.await.ok(), Some(Ok(())));
        wait_for_pending(&tx, 0).await;
    }

    #[tokio::test]
    async fn adapts_to_futures_stream() {
        let (tx, mut acceptor) = memory_transaction(TransactionType::Read, &ClientConfig::default());
        let Ok(answers) = tx.stream(match_request(), labels).await else {
            panic!("stream request failed");
        };
        let mut peer = accept(&mut acceptor).await;
        let first = next_request(&mut peer).await;
        reply(&peer, &first, maps_part(&["x", "y"]));
        reply(&peer, &first, done());

        let items: Vec<_> = answers.into_stream().collect().await;
        assert_eq!(items, vec![Ok("x".to_string()), Ok("y".to_string())]);
    }
}
