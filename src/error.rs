//! Transaction error types.
//!
//! [`TransactionError`] is the single error type surfaced by the
//! multiplexer, the transports, and the managers. It is `Clone` because a
//! transport failure is fanned out to every pending request on the stream.

use crate::protocol::{RequestId, Response};

/// Failure of a transaction operation.
///
/// # Error Code Ranges
///
/// | Range     | Category                          |
/// |-----------|-----------------------------------|
/// | 1000–1999 | Caller error (bad request)        |
/// | 2000–2999 | Transaction state                 |
/// | 3000–3999 | Protocol / transport              |
/// | 4000–4999 | Server-reported                   |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// Operation attempted on (or pending during) a closed transaction.
    #[error("transaction closed")]
    TransactionClosed,

    /// A response frame arrived for a request id with no collector.
    #[error("stream desynchronized: no pending request with id {request_id}")]
    StreamDesynchronized {
        /// Identifier carried by the orphaned frame.
        request_id: RequestId,
    },

    /// The server reported a failure for this request.
    #[error("remote error: {0}")]
    RemoteError(String),

    /// The physical stream broke or could not be established.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The request was rejected before being sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A response of the wrong type arrived for the request.
    #[error("unexpected response: expected {expected}, received {received}")]
    UnexpectedResponse {
        /// What the caller was waiting for.
        expected: &'static str,
        /// What actually arrived.
        received: &'static str,
    },

    /// A frame could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TransactionError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::TransactionClosed => 2001,
            Self::StreamDesynchronized { .. } => 3001,
            Self::TransportError(_) => 3002,
            Self::UnexpectedResponse { .. } => 3003,
            Self::Serialization(_) => 3004,
            Self::RemoteError(_) => 4001,
        }
    }

    /// Returns `true` if this error leaves the transaction unusable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TransactionClosed | Self::TransportError(_) | Self::StreamDesynchronized { .. }
        )
    }

    /// Converts any error into a [`Self::TransportError`], keeping
    /// transport errors as they are.
    #[must_use]
    pub fn into_transport(self) -> Self {
        match self {
            transport @ Self::TransportError(_) => transport,
            other => Self::TransportError(other.to_string()),
        }
    }

    /// Builds an [`Self::UnexpectedResponse`] for `response`.
    #[must_use]
    pub const fn unexpected(expected: &'static str, response: &Response) -> Self {
        Self::UnexpectedResponse {
            expected,
            received: response.kind_str(),
        }
    }
}

impl From<serde_json::Error> for TransactionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransactionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::TransportError(err.to_string())
    }
}
