//! Per-transaction and per-query options.

use serde::{Deserialize, Serialize};

/// Options sent with the open request and, optionally, with individual
/// queries. Unset fields defer to the server's (or the transaction's)
/// defaults and are omitted from the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOptions {
    /// Enable rule inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infer: Option<bool>,
    /// Record explanations for inferred answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<bool>,
    /// Number of answers the server sends per stream batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    /// Log inference traces on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_inference: Option<bool>,
    /// Server-side transaction timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_timeout_millis: Option<u64>,
}

impl TransactionOptions {
    /// Creates an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets [`Self::infer`].
    #[must_use]
    pub const fn with_infer(mut self, infer: bool) -> Self {
        self.infer = Some(infer);
        self
    }

    /// Sets [`Self::explain`].
    #[must_use]
    pub const fn with_explain(mut self, explain: bool) -> Self {
        self.explain = Some(explain);
        self
    }

    /// Sets [`Self::batch_size`].
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Sets [`Self::trace_inference`].
    #[must_use]
    pub const fn with_trace_inference(mut self, trace: bool) -> Self {
        self.trace_inference = Some(trace);
        self
    }

    /// Sets [`Self::transaction_timeout_millis`].
    #[must_use]
    pub const fn with_transaction_timeout_millis(mut self, millis: u64) -> Self {
        self.transaction_timeout_millis = Some(millis);
        self
    }

    /// Returns these options with every unset field filled from `defaults`.
    #[must_use]
    pub fn or(self, defaults: &Self) -> Self {
        Self {
            infer: self.infer.or(defaults.infer),
            explain: self.explain.or(defaults.explain),
            batch_size: self.batch_size.or(defaults.batch_size),
            trace_inference: self.trace_inference.or(defaults.trace_inference),
            transaction_timeout_millis: self
                .transaction_timeout_millis
                .or(defaults.transaction_timeout_millis),
        }
    }

    /// Returns `true` if no option is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.infer.is_none()
            && self.explain.is_none()
            && self.batch_size.is_none()
            && self.trace_inference.is_none()
            && self.transaction_timeout_millis.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_are_omitted() {
        let json = serde_json::to_string(&TransactionOptions::new().with_infer(true))
            .unwrap_or_default();
        assert_eq!(json, r#"{"infer":true}"#);
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let defaults = TransactionOptions::new()
            .with_infer(false)
            .with_batch_size(50);
        let merged = TransactionOptions::new().with_infer(true).or(&defaults);
        assert_eq!(merged.infer, Some(true));
        assert_eq!(merged.batch_size, Some(50));
        assert_eq!(merged.explain, None);
    }

    #[test]
    fn empty_detection() {
        assert!(TransactionOptions::new().is_empty());
        assert!(!TransactionOptions::new().with_explain(true).is_empty());
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let parsed: TransactionOptions = serde_json::from_str("{}").unwrap_or_default();
        assert!(parsed.is_empty());
    }
}
