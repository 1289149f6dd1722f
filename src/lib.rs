//! # grakn-tx
//!
//! Client for a graph database's transaction protocol, built around a
//! transaction stream multiplexer.
//!
//! A [`Transaction`] owns exactly one bidirectional stream and lets any
//! number of concurrent callers issue requests over it. Every request gets
//! a [`RequestId`]; the server echoes that id on each response frame, and a
//! background reader routes the frame to the waiting caller. Single-answer
//! requests resolve through [`Transaction::execute`]; paged requests come
//! back as a lazy [`AnswerStream`] that asks for the next batch only when
//! the caller has drained the current one.
//!
//! ## Architecture
//!
//! ```text
//! Session (session.rs)
//!     │
//!     ├── Transaction (transaction/)
//!     │     ├── QueryManager / ConceptManager / LogicManager (manager/)
//!     │     ├── CollectorRegistry + ResponseCollectors
//!     │     └── writer / reader tasks
//!     │
//!     ├── Connector → Duplex (transport/)
//!     │     ├── WebSocketConnector
//!     │     └── MemoryConnector
//!     │
//!     └── Frames and answers (protocol/)
//!
//! Loopback frame server (server/): axum WebSocket endpoint + /health
//! ```
//!
//! [`Transaction`]: transaction::Transaction
//! [`Transaction::execute`]: transaction::Transaction::execute
//! [`AnswerStream`]: transaction::AnswerStream
//! [`RequestId`]: protocol::RequestId

pub mod config;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transaction;
pub mod transport;

pub use config::ClientConfig;
pub use error::TransactionError;
pub use session::Session;
pub use transaction::{AnswerStream, Transaction};
