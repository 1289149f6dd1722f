//! Inbound frames.

use serde::{Deserialize, Serialize};

use super::answer::Answer;
use super::request_id::RequestId;

/// A response frame as read from the transaction stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Identifier of the originating request.
    pub id: RequestId,
    /// Response body.
    #[serde(flatten)]
    pub body: Response,
}

impl ResponseFrame {
    /// Creates a frame for the given request.
    #[must_use]
    pub const fn new(id: RequestId, body: Response) -> Self {
        Self { id, body }
    }
}

/// Batch boundary marker for streamed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    /// More answers are available; send a `stream` request to get them.
    Continue,
    /// The stream is exhausted.
    Done,
}

/// Response body, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Transaction opened.
    Open {
        /// Time the server spent opening the transaction.
        processing_time_millis: u64,
    },
    /// Transaction committed.
    Commit,
    /// Transaction rolled back.
    Rollback,
    /// Single answer to a single-response request.
    Answer {
        /// The answer.
        answer: Answer,
    },
    /// One batch of a streamed request.
    Part {
        /// The batch.
        answer: Answer,
    },
    /// Batch boundary of a streamed request.
    StreamState {
        /// Whether more batches follow.
        state: StreamState,
    },
    /// Server-reported failure of the request.
    Error {
        /// Server error message.
        message: String,
    },
}

impl Response {
    /// Returns the response type as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::Answer { .. } => "answer",
            Self::Part { .. } => "part",
            Self::StreamState { .. } => "stream_state",
            Self::Error { .. } => "error",
        }
    }

    /// Shorthand for a `Part` carrying `answer`.
    #[must_use]
    pub const fn part(answer: Answer) -> Self {
        Self::Part { answer }
    }

    /// Shorthand for an `Answer` carrying `answer`.
    #[must_use]
    pub const fn answer(answer: Answer) -> Self {
        Self::Answer { answer }
    }

    /// Shorthand for an `Error` with the given message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
