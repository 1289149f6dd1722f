//! Typed façades over [`Transaction::execute`] and [`Transaction::stream`].
//!
//! Each manager borrows its transaction and builds the request body for one
//! family of operations, then maps the response back into answer types.

pub mod concept;
pub mod logic;
pub mod query;

pub use concept::ConceptManager;
pub use logic::LogicManager;
pub use query::QueryManager;

use crate::error::TransactionError;
use crate::protocol::{Answer, Response};

#[cfg(doc)]
use crate::transaction::Transaction;

/// Unwraps the answer of a single-response request.
fn single_answer(response: Response) -> Result<Answer, TransactionError> {
    match response {
        Response::Answer { answer } => Ok(answer),
        other => Err(TransactionError::unexpected("answer", &other)),
    }
}

/// Builds the error for an answer of the wrong kind.
const fn wrong_answer(expected: &'static str, answer: &Answer) -> TransactionError {
    TransactionError::UnexpectedResponse {
        expected,
        received: answer.kind_str(),
    }
}
