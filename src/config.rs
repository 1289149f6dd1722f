//! Client configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Every key has a default, so an empty environment yields a
//! client pointed at a local server.

use std::str::FromStr;
use std::time::Duration;

use crate::protocol::TransactionOptions;

/// Default server endpoint for the WebSocket transport.
pub const DEFAULT_ADDRESS: &str = "ws://127.0.0.1:1729/transaction";

/// Top-level client configuration.
///
/// Loaded once at startup via [`ClientConfig::from_env`], or built with
/// [`ClientConfig::default`] and adjusted field by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server endpoint (`GRAKN_ADDRESS`).
    pub address: String,

    /// Capacity of each transaction's outbound request queue
    /// (`GRAKN_OUTBOUND_CAPACITY`).
    pub outbound_capacity: usize,

    /// How long `close` waits for the writer to flush and close the stream
    /// (`GRAKN_CLOSE_TIMEOUT_MS`).
    pub close_timeout: Duration,

    /// Fail the whole transaction when a frame arrives for an unknown
    /// request id, instead of discarding it (`GRAKN_STRICT_ROUTING`).
    pub strict_routing: bool,

    /// Options sent when opening transactions (`GRAKN_BATCH_SIZE`,
    /// `GRAKN_INFER`).
    pub default_options: TransactionOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            outbound_capacity: 256,
            close_timeout: Duration::from_millis(5_000),
            strict_routing: false,
            default_options: TransactionOptions::new()
                .with_batch_size(50)
                .with_infer(false),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the [`Default`] value of each field when a variable is
    /// missing or unparsable. Calls `dotenvy::dotenv().ok()` to optionally
    /// load a `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from `lookup`, which maps a variable name to
    /// its value.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str| lookup(key).and_then(|raw| parse_bool(&raw));

        let close_timeout = parse_var(&lookup, "GRAKN_CLOSE_TIMEOUT_MS")
            .map_or(defaults.close_timeout, Duration::from_millis);
        let mut default_options = defaults.default_options;
        default_options.batch_size =
            parse_var(&lookup, "GRAKN_BATCH_SIZE").or(default_options.batch_size);
        default_options.infer = flag("GRAKN_INFER").or(default_options.infer);

        Self {
            address: lookup("GRAKN_ADDRESS").unwrap_or(defaults.address),
            outbound_capacity: parse_var(&lookup, "GRAKN_OUTBOUND_CAPACITY")
                .unwrap_or(defaults.outbound_capacity)
                .max(1),
            close_timeout,
            strict_routing: flag("GRAKN_STRICT_ROUTING").unwrap_or(defaults.strict_routing),
            default_options,
        }
    }
}

/// Parses the variable `key` as `T`. `None` if missing or invalid.
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|raw| raw.parse().ok())
}

/// Accepts `"true"`, `"1"`, `"false"`, `"0"` (case-insensitive).
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
