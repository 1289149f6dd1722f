//! Helpers for driving a transaction against a scripted in-memory server.

#![allow(clippy::panic)]

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::protocol::{
    Answer, Concept, ConceptEncoding, ConceptMap, RequestFrame, Response, ResponseFrame,
    SessionBinding, SessionId, SessionType, StreamState, TransactionType,
};
use crate::transport::memory::{self, MemoryAcceptor, MemoryPeer};

use super::Transaction;

/// A transaction over a fresh in-memory transport.
pub(crate) fn memory_transaction(
    transaction_type: TransactionType,
    config: &ClientConfig,
) -> (Transaction, MemoryAcceptor) {
    let (connector, acceptor) = memory::channel();
    (
        Transaction::new(Arc::new(connector), transaction_type, config),
        acceptor,
    )
}

/// Waits for the transaction to connect.
pub(crate) async fn accept(acceptor: &mut MemoryAcceptor) -> MemoryPeer {
    let Some(peer) = acceptor.accept().await else {
        panic!("transaction never connected");
    };
    peer
}

/// Receives the next request frame or panics.
pub(crate) async fn next_request(peer: &mut MemoryPeer) -> RequestFrame {
    let Some(frame) = peer.recv().await else {
        panic!("client closed the stream");
    };
    frame
}

/// Answers `frame` with `body`.
pub(crate) fn reply(peer: &MemoryPeer, frame: &RequestFrame, body: Response) {
    assert!(peer.send(ResponseFrame::new(frame.id, body)), "client gone");
}

/// A data session binding for tests.
pub(crate) fn data_session() -> SessionBinding {
    SessionBinding {
        id: SessionId::new(),
        database: "social".to_string(),
        session_type: SessionType::Data,
    }
}

/// A concept map binding `x` to an entity type named `label`.
pub(crate) fn concept_map(label: &str) -> ConceptMap {
    [(
        "x".to_string(),
        Concept::new_type(label, ConceptEncoding::EntityType),
    )]
    .into_iter()
    .collect()
}

/// A stream part holding concept maps for `labels`.
pub(crate) fn maps_part(labels: &[&str]) -> Response {
    Response::part(Answer::ConceptMaps {
        maps: labels.iter().map(|label| concept_map(label)).collect(),
    })
}

/// `continue` marker.
pub(crate) const fn cont() -> Response {
    Response::StreamState {
        state: StreamState::Continue,
    }
}

/// `done` marker.
pub(crate) const fn done() -> Response {
    Response::StreamState {
        state: StreamState::Done,
    }
}
