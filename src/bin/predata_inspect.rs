//!
//! predata inspect binary
//! ----------------------
//! Connects with the environment configuration, reads every pre-data object
//! kind inside one read-only REPEATABLE READ transaction and prints the
//! resulting snapshot as JSON on stdout.

use anyhow::{Context, Result};
use tokio_postgres::{IsolationLevel, NoTls};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use predata::config::InspectConfig;
use predata::extract_all;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid RUST_LOG")?;
    // Logs go to stderr so stdout stays valid JSON
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cfg = InspectConfig::from_env()?;
    let pg: tokio_postgres::Config = cfg.dsn.parse().context("invalid PREDATA_DSN")?;
    let (mut client, connection) = pg.connect(NoTls).await.context("failed to connect")?;
    // drive the connection in background
    tokio::spawn(async move {
        if let Err(e) = connection.await { tracing::error!(target: "predata::connection", "connection error: {e}"); }
    });

    let txn = client
        .build_transaction()
        .isolation_level(IsolationLevel::RepeatableRead)
        .read_only(true)
        .start()
        .await
        .context("failed to open snapshot transaction")?;
    let snapshot = extract_all(&txn, &cfg.filter).await.context("catalog extraction failed")?;
    txn.rollback().await.context("failed to close snapshot transaction")?;

    info!(target: "predata::snapshot", "server_version_num={}, objects={}", snapshot.server_version.0, snapshot.object_count());
    let out = if cfg.pretty { serde_json::to_string_pretty(&snapshot)? } else { serde_json::to_string(&snapshot)? };
    println!("{out}");
    Ok(())
}
