//! Wire model: request identifiers, frames, answers, and options.
//!
//! Frames are JSON objects. Both directions carry the request `id` and a
//! `type` discriminator; bodies are flattened into the frame.

pub mod answer;
pub mod options;
pub mod request;
pub mod request_id;
pub mod response;
pub mod session;

pub use answer::{Answer, Concept, ConceptEncoding, ConceptMap, Numeric, Rule, ValueType};
pub use options::TransactionOptions;
pub use request::{ConceptRequest, LogicRequest, QueryRequest, Request, RequestFrame};
pub use request_id::{RequestId, RequestIdGenerator};
pub use response::{Response, ResponseFrame, StreamState};
pub use session::{SessionBinding, SessionId, SessionType, TransactionType};
