//! Concept lookups and schema writes.

use super::{single_answer, wrong_answer};
use crate::error::TransactionError;
use crate::protocol::{Answer, Concept, ConceptEncoding, ConceptRequest, Request, ValueType};
use crate::transaction::Transaction;

/// Looks up and creates concepts inside a transaction.
#[derive(Debug, Clone, Copy)]
pub struct ConceptManager<'a> {
    transaction: &'a Transaction,
}

impl<'a> ConceptManager<'a> {
    pub(crate) const fn new(transaction: &'a Transaction) -> Self {
        Self { transaction }
    }

    /// Finds a type of any kind by label.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`].
    pub async fn get_thing_type(self, label: &str) -> Result<Option<Concept>, TransactionError> {
        self.lookup(ConceptRequest::GetThingType {
            label: label.to_string(),
        })
        .await
    }

    /// Finds an entity type by label. `None` if absent or not an entity type.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`].
    pub async fn get_entity_type(self, label: &str) -> Result<Option<Concept>, TransactionError> {
        self.typed_lookup(label, ConceptEncoding::EntityType).await
    }

    /// Finds a relation type by label. `None` if absent or not a relation type.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`].
    pub async fn get_relation_type(self, label: &str) -> Result<Option<Concept>, TransactionError> {
        self.typed_lookup(label, ConceptEncoding::RelationType).await
    }

    /// Finds an attribute type by label. `None` if absent or not an
    /// attribute type.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`].
    pub async fn get_attribute_type(
        self,
        label: &str,
    ) -> Result<Option<Concept>, TransactionError> {
        self.typed_lookup(label, ConceptEncoding::AttributeType).await
    }

    /// Finds an instance by iid.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`].
    pub async fn get_thing(self, iid: &str) -> Result<Option<Concept>, TransactionError> {
        self.lookup(ConceptRequest::GetThing {
            iid: iid.to_string(),
        })
        .await
    }

    /// Creates an entity type, or returns the existing one.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`], or
    /// [`TransactionError::UnexpectedResponse`] if the server returns no
    /// concept.
    pub async fn put_entity_type(self, label: &str) -> Result<Concept, TransactionError> {
        self.put(ConceptRequest::PutEntityType {
            label: label.to_string(),
        })
        .await
    }

    /// Creates a relation type, or returns the existing one.
    ///
    /// # Errors
    ///
    /// As [`Self::put_entity_type`].
    pub async fn put_relation_type(self, label: &str) -> Result<Concept, TransactionError> {
        self.put(ConceptRequest::PutRelationType {
            label: label.to_string(),
        })
        .await
    }

    /// Creates an attribute type, or returns the existing one.
    ///
    /// # Errors
    ///
    /// As [`Self::put_entity_type`].
    pub async fn put_attribute_type(
        self,
        label: &str,
        value_type: ValueType,
    ) -> Result<Concept, TransactionError> {
        self.put(ConceptRequest::PutAttributeType {
            label: label.to_string(),
            value_type,
        })
        .await
    }

    async fn typed_lookup(
        self,
        label: &str,
        encoding: ConceptEncoding,
    ) -> Result<Option<Concept>, TransactionError> {
        let found = self.get_thing_type(label).await?;
        Ok(found.filter(|concept| concept.encoding == encoding))
    }

    async fn lookup(self, request: ConceptRequest) -> Result<Option<Concept>, TransactionError> {
        let answer = self
            .transaction
            .execute(Request::Concept { request }, single_answer)
            .await?;
        match answer {
            Answer::Concept { concept } => Ok(concept),
            other => Err(wrong_answer("concept", &other)),
        }
    }

    async fn put(self, request: ConceptRequest) -> Result<Concept, TransactionError> {
        self.lookup(request)
            .await?
            .ok_or(TransactionError::UnexpectedResponse {
                expected: "concept",
                received: "empty concept",
            })
    }
}
