//! Database sessions: the factory for transactions.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::TransactionError;
use crate::protocol::{SessionBinding, SessionId, SessionType, TransactionOptions, TransactionType};
use crate::transaction::Transaction;
use crate::transport::Connector;

/// A session against one database.
///
/// Every transaction created from a session gets its own physical stream
/// from the session's [`Connector`] and is opened with the session's
/// binding.
#[derive(Debug, Clone)]
pub struct Session {
    binding: SessionBinding,
    connector: Arc<dyn Connector>,
    config: ClientConfig,
}

impl Session {
    /// Creates a session with a fresh [`SessionId`].
    #[must_use]
    pub fn new(
        connector: Arc<dyn Connector>,
        database: impl Into<String>,
        session_type: SessionType,
        config: ClientConfig,
    ) -> Self {
        let binding = SessionBinding {
            id: SessionId::new(),
            database: database.into(),
            session_type,
        };
        tracing::debug!(session = %binding.id, database = %binding.database, "session created");
        Self {
            binding,
            connector,
            config,
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.binding.id
    }

    /// Database name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.binding.database
    }

    /// Session type.
    #[must_use]
    pub const fn session_type(&self) -> SessionType {
        self.binding.session_type
    }

    /// What the server sees when a transaction opens.
    #[must_use]
    pub const fn binding(&self) -> &SessionBinding {
        &self.binding
    }

    /// Creates and opens a transaction with the configured default options.
    ///
    /// # Errors
    ///
    /// See [`Self::transaction_with`].
    pub async fn transaction(
        &self,
        transaction_type: TransactionType,
    ) -> Result<Transaction, TransactionError> {
        self.transaction_with(transaction_type, TransactionOptions::default())
            .await
    }

    /// Creates and opens a transaction. Unset `options` fall back to the
    /// configured defaults.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::InvalidRequest`] for a schema transaction in a
    ///   data session. Nothing is connected in that case.
    /// - Any error of [`Transaction::open`].
    pub async fn transaction_with(
        &self,
        transaction_type: TransactionType,
        options: TransactionOptions,
    ) -> Result<Transaction, TransactionError> {
        if !transaction_type.allowed_in(self.binding.session_type) {
            return Err(TransactionError::InvalidRequest(format!(
                "{transaction_type} transactions require a schema session"
            )));
        }
        let transaction = Transaction::new(
            Arc::clone(&self.connector),
            transaction_type,
            &self.config,
        );
        transaction.open(&self.binding, options).await?;
        Ok(transaction)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::protocol::{Request, Response};
    use crate::transaction::test_support::{accept, next_request, reply};
    use crate::transport::memory;

    #[tokio::test]
    async fn transaction_opens_with_session_binding_and_defaults() {
        let (connector, mut acceptor) = memory::channel();
        let session = Session::new(
            Arc::new(connector),
            "social",
            SessionType::Data,
            ClientConfig::default(),
        );
        let opening = tokio::spawn({
            let session = session.clone();
            async move { session.transaction(TransactionType::Write).await }
        });

        let mut peer = accept(&mut acceptor).await;
        let frame = next_request(&mut peer).await;
        let Request::Open {
            session: binding,
            transaction_type,
            options,
        } = &frame.body
        else {
            panic!("expected open, got {:?}", frame.body);
        };
        assert_eq!(binding, session.binding());
        assert_eq!(*transaction_type, TransactionType::Write);
        assert_eq!(options, &ClientConfig::default().default_options);
        reply(
            &peer,
            &frame,
            Response::Open {
                processing_time_millis: 0,
            },
        );

        let Ok(Ok(tx)) = opening.await else {
            panic!("open failed");
        };
        assert!(tx.is_open());
        assert_eq!(tx.transaction_type(), TransactionType::Write);
    }

    #[tokio::test]
    async fn schema_transaction_in_data_session_never_connects() {
        let (connector, mut acceptor) = memory::channel();
        let session = Session::new(
            Arc::new(connector),
            "social",
            SessionType::Data,
            ClientConfig::default(),
        );
        let result = session.transaction(TransactionType::Schema).await;
        assert!(matches!(result, Err(TransactionError::InvalidRequest(_))));

        drop(session);
        assert!(acceptor.accept().await.is_none());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let (connector, _acceptor) = memory::channel();
        let connector: Arc<dyn Connector> = Arc::new(connector);
        let a = Session::new(
            Arc::clone(&connector),
            "db",
            SessionType::Schema,
            ClientConfig::default(),
        );
        let b = Session::new(connector, "db", SessionType::Schema, ClientConfig::default());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.database(), "db");
        assert_eq!(a.session_type(), SessionType::Schema);
    }
}
