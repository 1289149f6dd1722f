//! Query operations.

use super::{single_answer, wrong_answer};
use crate::error::TransactionError;
use crate::protocol::{Answer, ConceptMap, Numeric, QueryRequest, Request, TransactionOptions};
use crate::transaction::{AnswerStream, Transaction};

/// Runs queries inside a transaction.
///
/// Streaming queries (`match`, `insert`, `update`) return an
/// [`AnswerStream`] of [`ConceptMap`]s; the rest resolve once. Each query
/// consumes the manager, so concurrent queries each take their own
/// `tx.query()`.
#[derive(Debug, Clone)]
pub struct QueryManager<'a> {
    transaction: &'a Transaction,
    options: TransactionOptions,
}

impl<'a> QueryManager<'a> {
    pub(crate) fn new(transaction: &'a Transaction) -> Self {
        Self {
            transaction,
            options: TransactionOptions::default(),
        }
    }

    /// Attaches per-query options to every query issued through the
    /// returned manager.
    #[must_use]
    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs a `match` query.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be sent; later errors surface through
    /// the stream.
    pub async fn match_(self, query: &str) -> Result<AnswerStream<ConceptMap>, TransactionError> {
        self.streamed(QueryRequest::Match {
            query: query.to_string(),
        })
        .await
    }

    /// Runs an aggregate `match` query.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`], or
    /// [`TransactionError::UnexpectedResponse`] if the answer is not numeric.
    pub async fn match_aggregate(self, query: &str) -> Result<Numeric, TransactionError> {
        let answer = self
            .single(QueryRequest::MatchAggregate {
                query: query.to_string(),
            })
            .await?;
        match answer {
            Answer::Numeric { value } => Ok(value),
            other => Err(wrong_answer("numeric", &other)),
        }
    }

    /// Runs an `insert` query.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be sent.
    pub async fn insert(self, query: &str) -> Result<AnswerStream<ConceptMap>, TransactionError> {
        self.streamed(QueryRequest::Insert {
            query: query.to_string(),
        })
        .await
    }

    /// Runs a `match ... delete` query.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`].
    pub async fn delete(self, query: &str) -> Result<(), TransactionError> {
        self.acknowledged(QueryRequest::Delete {
            query: query.to_string(),
        })
        .await
    }

    /// Runs a `match ... delete ... insert` query.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be sent.
    pub async fn update(self, query: &str) -> Result<AnswerStream<ConceptMap>, TransactionError> {
        self.streamed(QueryRequest::Update {
            query: query.to_string(),
        })
        .await
    }

    /// Runs a `define` query.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`].
    pub async fn define(self, query: &str) -> Result<(), TransactionError> {
        self.acknowledged(QueryRequest::Define {
            query: query.to_string(),
        })
        .await
    }

    /// Runs an `undefine` query.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`].
    pub async fn undefine(self, query: &str) -> Result<(), TransactionError> {
        self.acknowledged(QueryRequest::Undefine {
            query: query.to_string(),
        })
        .await
    }

    fn request(&self, query: QueryRequest) -> Request {
        Request::Query {
            options: self.options.clone(),
            query,
        }
    }

    async fn streamed(
        self,
        query: QueryRequest,
    ) -> Result<AnswerStream<ConceptMap>, TransactionError> {
        self.transaction
            .stream(self.request(query), |answer| match answer {
                Answer::ConceptMaps { maps } => Ok(maps),
                other => Err(wrong_answer("concept_maps", &other)),
            })
            .await
    }

    async fn single(self, query: QueryRequest) -> Result<Answer, TransactionError> {
        self.transaction
            .execute(self.request(query), single_answer)
            .await
    }

    async fn acknowledged(self, query: QueryRequest) -> Result<(), TransactionError> {
        match self.single(query).await? {
            Answer::Unit => Ok(()),
            other => Err(wrong_answer("unit", &other)),
        }
    }
}
