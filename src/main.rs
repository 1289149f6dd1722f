//! grakn-tx command-line client.
//!
//! Opens a session, runs one query in a fresh transaction, and prints each
//! answer as a JSON line on stdout.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use grakn_tx::protocol::{SessionType, TransactionOptions, TransactionType};
use grakn_tx::transport::WebSocketConnector;
use grakn_tx::{AnswerStream, ClientConfig, Session, Transaction};

/// Run queries against a graph database over a multiplexed transaction stream.
#[derive(Parser)]
#[command(name = "grakn-tx")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Server endpoint
    #[arg(long, env = "GRAKN_ADDRESS", global = true)]
    address: Option<String>,

    /// Database name
    #[arg(short, long, env = "GRAKN_DATABASE", default_value = "grakn", global = true)]
    database: String,

    /// Enable rule inference for read queries
    #[arg(long, global = true)]
    infer: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run a `match` query in a read transaction
    Match {
        /// Query text
        query: String,
    },
    /// Run an aggregate `match` query in a read transaction
    Aggregate {
        /// Query text
        query: String,
    },
    /// Run an `insert` query in a write transaction and commit
    Insert {
        /// Query text
        query: String,
    },
    /// Run a `match ... delete` query in a write transaction and commit
    Delete {
        /// Query text
        query: String,
    },
    /// Run a `define` query in a schema transaction and commit
    Define {
        /// Query text
        query: String,
    },
    /// Run an `undefine` query in a schema transaction and commit
    Undefine {
        /// Query text
        query: String,
    },
    /// List every rule in the schema
    Rules,
}

impl Command {
    const fn session_type(&self) -> SessionType {
        match self {
            Self::Define { .. } | Self::Undefine { .. } => SessionType::Schema,
            _ => SessionType::Data,
        }
    }

    const fn transaction_type(&self) -> TransactionType {
        match self {
            Self::Match { .. } | Self::Aggregate { .. } | Self::Rules => TransactionType::Read,
            Self::Insert { .. } | Self::Delete { .. } => TransactionType::Write,
            Self::Define { .. } | Self::Undefine { .. } => TransactionType::Schema,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        logs.json().init();
    } else {
        logs.init();
    }

    let mut config = ClientConfig::from_env();
    if let Some(address) = cli.address {
        config.address = address;
    }
    let connector = Arc::new(WebSocketConnector::new(config.address.clone()));
    tracing::info!(address = %config.address, database = %cli.database, "connecting");

    let session = Session::new(
        connector,
        cli.database,
        cli.command.session_type(),
        config,
    );
    let mut options = TransactionOptions::new();
    if cli.infer {
        options = options.with_infer(true);
    }
    let tx = session
        .transaction_with(cli.command.transaction_type(), options)
        .await
        .context("failed to open transaction")?;
    tracing::debug!(latency = ?tx.network_latency(), "transaction open");

    let outcome = run(&tx, cli.command).await;
    tx.close().await;
    outcome
}

async fn run(tx: &Transaction, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Match { query } => print_all(tx.query().match_(&query).await?).await,
        Command::Aggregate { query } => print_line(&tx.query().match_aggregate(&query).await?),
        Command::Insert { query } => {
            print_all(tx.query().insert(&query).await?).await?;
            tx.commit().await.context("commit failed")
        }
        Command::Delete { query } => {
            tx.query().delete(&query).await?;
            tx.commit().await.context("commit failed")
        }
        Command::Define { query } => {
            tx.query().define(&query).await?;
            tx.commit().await.context("commit failed")
        }
        Command::Undefine { query } => {
            tx.query().undefine(&query).await?;
            tx.commit().await.context("commit failed")
        }
        Command::Rules => print_all(tx.logic().get_rules().await?).await,
    }
}

async fn print_all<T: Serialize>(mut answers: AnswerStream<T>) -> anyhow::Result<()> {
    let mut count = 0_usize;
    while let Some(answer) = answers.next().await {
        print_line(&answer?)?;
        count += 1;
    }
    tracing::info!(count, "answers received");
    Ok(())
}

fn print_line<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
