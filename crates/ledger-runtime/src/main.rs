//! # Civic Ledger Runtime
//!
//! ```text
//! ledger-runtime --network localhost --snapshot state.json
//! ledger-runtime --offline
//! ```
//!
//! The signer key is read from `CL_PRIVATE_KEY`; without it the runtime can
//! still read from a live network but write operations need an explicit
//! sender.

use anyhow::Result;
use civic_telemetry::{init_telemetry, TelemetryConfig};
use cl_ledger_gateway::adapters::HttpConnector;
use cl_ledger_gateway::GatewayConfig;
use clap::Parser;
use ledger_runtime::{LedgerRuntime, RuntimeOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ledger-runtime", version, about = "Civic ledger gateway runtime")]
struct Args {
    /// Network profile (localhost, hardhat, mumbai, polygon)
    #[arg(long, env = "CL_NETWORK", default_value = "localhost")]
    network: String,

    /// Run on the in-process emulation without contacting any node
    #[arg(long, env = "CL_OFFLINE")]
    offline: bool,

    /// Emulation snapshot restored at start and written on exit
    #[arg(long, env = "CL_SNAPSHOT")]
    snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_telemetry(&TelemetryConfig::from_env())?;

    let config = GatewayConfig::from_env();
    let connector = Arc::new(HttpConnector::new(config.connection.attempt_timeout));
    let options = RuntimeOptions {
        network: args.network,
        credential: std::env::var("CL_PRIVATE_KEY").ok(),
        force_offline: args.offline,
        snapshot: args.snapshot,
    };

    let runtime = LedgerRuntime::new(config, connector, options);
    runtime.start().await?;

    info!("Ledger runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await
}
