//! Session identity and transaction kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier of a database session.
///
/// Wraps a UUID v4 so that session identifiers cannot be confused with
/// other UUIDs travelling through the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Creates a new random `SessionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `SessionId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a session reads and writes data or schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Data session: instances may be read and written.
    Data,
    /// Schema session: types and rules may be defined.
    Schema,
}

/// Kind of work a transaction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Read-only transaction.
    Read,
    /// Data write transaction.
    Write,
    /// Schema write transaction; only valid inside a schema session.
    Schema,
}

impl TransactionType {
    /// Returns `true` if this transaction type may be opened in a session
    /// of the given type.
    #[must_use]
    pub const fn allowed_in(self, session_type: SessionType) -> bool {
        !matches!(
            (self, session_type),
            (Self::Schema, SessionType::Data)
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Schema => "schema",
        })
    }
}

/// The session a transaction belongs to, sent with the open request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBinding {
    /// Session identifier.
    pub id: SessionId,
    /// Database the session is bound to.
    pub database: String,
    /// Session type.
    pub session_type: SessionType,
}
