//! Physical stream transports.
//!
//! A transaction only needs two primitives from its transport: a sink that
//! accepts [`RequestFrame`]s and a source that yields [`ResponseFrame`]s.
//! An `Err` item on the source is the stream's error event; the end of the
//! source is its close event.

pub mod memory;
pub mod websocket;

use std::fmt;
use std::pin::Pin;

use futures_util::future::BoxFuture;
use futures_util::{Sink, Stream};

use crate::error::TransactionError;
use crate::protocol::{RequestFrame, ResponseFrame};

pub use memory::{MemoryAcceptor, MemoryConnector, MemoryPeer};
pub use websocket::WebSocketConnector;

/// Outbound half of a physical stream.
pub type FrameSink = Pin<Box<dyn Sink<RequestFrame, Error = TransactionError> + Send>>;

/// Inbound half of a physical stream.
pub type FrameSource = Pin<Box<dyn Stream<Item = Result<ResponseFrame, TransactionError>> + Send>>;

/// An established bidirectional stream.
pub struct Duplex {
    /// Request frames go here.
    pub sink: FrameSink,
    /// Response frames come from here.
    pub source: FrameSource,
}

impl fmt::Debug for Duplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Duplex").finish_non_exhaustive()
    }
}

/// Opens physical streams. One call per transaction.
pub trait Connector: fmt::Debug + Send + Sync {
    /// Establishes a new bidirectional stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::TransportError`] if the stream cannot be
    /// established.
    fn connect(&self) -> BoxFuture<'_, Result<Duplex, TransactionError>>;
}
