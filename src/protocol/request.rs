//! Outbound frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answer::ValueType;
use super::options::TransactionOptions;
use super::request_id::RequestId;
use super::session::{SessionBinding, TransactionType};

/// A request frame as written to the transaction stream.
///
/// ```json
/// { "id": 3, "sent_at": "2026-10-19T09:12:44Z", "type": "query",
///   "options": {}, "query": { "kind": "match", "query": "match $x sub thing;" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Identifier echoed by every response frame for this request.
    pub id: RequestId,
    /// Client timestamp.
    pub sent_at: DateTime<Utc>,
    /// Request body.
    #[serde(flatten)]
    pub body: Request,
}

impl RequestFrame {
    /// Creates a frame stamped with the current time.
    #[must_use]
    pub fn new(id: RequestId, body: Request) -> Self {
        Self {
            id,
            sent_at: Utc::now(),
            body,
        }
    }
}

/// Request body, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Opens the transaction.
    Open {
        /// Session the transaction belongs to.
        session: SessionBinding,
        /// Transaction type.
        transaction_type: TransactionType,
        /// Transaction-wide options.
        #[serde(default)]
        options: TransactionOptions,
    },
    /// Commits the transaction.
    Commit,
    /// Discards uncommitted writes; the transaction stays open.
    Rollback,
    /// Runs a query.
    Query {
        /// Per-query options, merged over the transaction's.
        #[serde(default)]
        options: TransactionOptions,
        /// The query.
        query: QueryRequest,
    },
    /// Looks up or creates a concept.
    Concept {
        /// The concept operation.
        request: ConceptRequest,
    },
    /// Looks up or creates a rule.
    Logic {
        /// The logic operation.
        request: LogicRequest,
    },
    /// Asks for the next batch of a streamed request (same id).
    Stream,
}

impl Request {
    /// Returns the request type as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::Query { .. } => "query",
            Self::Concept { .. } => "concept",
            Self::Logic { .. } => "logic",
            Self::Stream => "stream",
        }
    }
}

/// Query operations, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryRequest {
    /// `match` query; streamed concept maps.
    Match {
        /// Query text.
        query: String,
    },
    /// `match ... ; count;` style aggregate; single numeric answer.
    MatchAggregate {
        /// Query text.
        query: String,
    },
    /// `insert` query; streamed concept maps.
    Insert {
        /// Query text.
        query: String,
    },
    /// `match ... delete` query; single acknowledgement.
    Delete {
        /// Query text.
        query: String,
    },
    /// `match ... delete ... insert` query; streamed concept maps.
    Update {
        /// Query text.
        query: String,
    },
    /// `define` query; single acknowledgement.
    Define {
        /// Query text.
        query: String,
    },
    /// `undefine` query; single acknowledgement.
    Undefine {
        /// Query text.
        query: String,
    },
}

/// Concept manager operations, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConceptRequest {
    /// Finds a type by label.
    GetThingType {
        /// Type label.
        label: String,
    },
    /// Finds an instance by iid.
    GetThing {
        /// Instance iid.
        iid: String,
    },
    /// Creates (or returns) an entity type.
    PutEntityType {
        /// Type label.
        label: String,
    },
    /// Creates (or returns) a relation type.
    PutRelationType {
        /// Type label.
        label: String,
    },
    /// Creates (or returns) an attribute type.
    PutAttributeType {
        /// Type label.
        label: String,
        /// Value type of the attribute.
        value_type: ValueType,
    },
}

/// Logic manager operations, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogicRequest {
    /// Finds a rule by label.
    GetRule {
        /// Rule label.
        label: String,
    },
    /// Streams every rule.
    GetRules,
    /// Creates (or replaces) a rule.
    PutRule {
        /// Rule label.
        label: String,
        /// `when` pattern.
        when: String,
        /// `then` pattern.
        then: String,
    },
}
