//! Rule lookups and writes.

use super::{single_answer, wrong_answer};
use crate::error::TransactionError;
use crate::protocol::{Answer, LogicRequest, Request, Rule};
use crate::transaction::{AnswerStream, Transaction};

/// Reads and writes inference rules inside a transaction.
#[derive(Debug, Clone, Copy)]
pub struct LogicManager<'a> {
    transaction: &'a Transaction,
}

impl<'a> LogicManager<'a> {
    pub(crate) const fn new(transaction: &'a Transaction) -> Self {
        Self { transaction }
    }

    /// Finds a rule by label.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`].
    pub async fn get_rule(self, label: &str) -> Result<Option<Rule>, TransactionError> {
        self.single_rule(LogicRequest::GetRule {
            label: label.to_string(),
        })
        .await
    }

    /// Streams every rule in the schema.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be sent.
    pub async fn get_rules(self) -> Result<AnswerStream<Rule>, TransactionError> {
        self.transaction
            .stream(
                Request::Logic {
                    request: LogicRequest::GetRules,
                },
                |answer| match answer {
                    Answer::Rules { rules } => Ok(rules),
                    other => Err(wrong_answer("rules", &other)),
                },
            )
            .await
    }

    /// Creates or replaces a rule.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Transaction::execute`], or
    /// [`TransactionError::UnexpectedResponse`] if no rule comes back.
    pub async fn put_rule(
        self,
        label: &str,
        when: &str,
        then: &str,
    ) -> Result<Rule, TransactionError> {
        self.single_rule(LogicRequest::PutRule {
            label: label.to_string(),
            when: when.to_string(),
            then: then.to_string(),
        })
        .await?
        .ok_or(TransactionError::UnexpectedResponse {
            expected: "rule",
            received: "empty rule",
        })
    }

    async fn single_rule(self, request: LogicRequest) -> Result<Option<Rule>, TransactionError> {
        let answer = self
            .transaction
            .execute(Request::Logic { request }, single_answer)
            .await?;
        match answer {
            Answer::Rule { rule } => Ok(rule),
            other => Err(wrong_answer("rule", &other)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::protocol::{Response, TransactionType};
    use crate::transaction::test_support::{
        accept, cont, done, memory_transaction, next_request, reply,
    };

    fn rule(label: &str) -> Rule {
        Rule {
            label: label.to_string(),
            when: "{ $x isa person; }".to_string(),
            then: "{ $x has name \"anon\"; }".to_string(),
        }
    }

    #[tokio::test]
    async fn get_rules_streams_across_batches() {
        let (tx, mut acceptor) = memory_transaction(TransactionType::Read, &ClientConfig::default());
        let Ok(rules) = tx.logic().get_rules().await else {
            panic!("get_rules failed");
        };
        let server = tokio::spawn(async move {
            let mut peer = accept(&mut acceptor).await;
            let first = next_request(&mut peer).await;
            assert_eq!(
                first.body,
                Request::Logic {
                    request: LogicRequest::GetRules
                }
            );
            reply(
                &peer,
                &first,
                Response::part(Answer::Rules {
                    rules: vec![rule("r1")],
                }),
            );
            reply(&peer, &first, cont());
            let second = next_request(&mut peer).await;
            reply(
                &peer,
                &second,
                Response::part(Answer::Rules {
                    rules: vec![rule("r2")],
                }),
            );
            reply(&peer, &second, done());
        });

        let Ok(collected) = rules.collect().await else {
            panic!("rule stream failed");
        };
        assert_eq!(collected, vec![rule("r1"), rule("r2")]);
        assert!(server.await.is_ok());
    }

    #[tokio::test]
    async fn put_rule_returns_created_rule() {
        let (tx, mut acceptor) = memory_transaction(TransactionType::Schema, &ClientConfig::default());
        let call = tokio::spawn({
            let tx = tx.clone();
            async move {
                tx.logic()
                    .put_rule("r1", "{ $x isa person; }", "{ $x has name \"anon\"; }")
                    .await
            }
        });
        let mut peer = accept(&mut acceptor).await;
        let frame = next_request(&mut peer).await;
        reply(
            &peer,
            &frame,
            Response::answer(Answer::Rule {
                rule: Some(rule("r1")),
            }),
        );
        assert_eq!(call.await.ok(), Some(Ok(rule("r1"))));
    }
}
