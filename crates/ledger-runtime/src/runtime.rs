//! # Ledger Runtime
//!
//! Owns the gateway for the life of the process.
//!
//! ## Shutdown Sequence
//!
//! 1. Persist the emulation snapshot (when a path is configured)
//! 2. Signal the audit handler to stop
//! 3. Drop live handles and return the gateway to `Uninitialized`

use crate::audit::AuditLogHandler;
use anyhow::{Context, Result};
use cl_ledger_gateway::{GatewayConfig, LedgerGateway, RpcConnector};
use shared_bus::{EventFilter, InMemoryEventBus};
use shared_types::ConnectionState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// How the runtime brings the gateway up.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Network profile name.
    pub network: String,
    /// Hex private key for the signer, if any.
    pub credential: Option<String>,
    /// Skip the network entirely.
    pub force_offline: bool,
    /// Emulation snapshot restored at start and written at shutdown.
    pub snapshot: Option<PathBuf>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            network: "localhost".to_string(),
            credential: None,
            force_offline: false,
            snapshot: None,
        }
    }
}

/// The running ledger service.
pub struct LedgerRuntime {
    gateway: Arc<LedgerGateway>,
    options: RuntimeOptions,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl LedgerRuntime {
    pub fn new(
        config: GatewayConfig,
        connector: Arc<dyn RpcConnector>,
        options: RuntimeOptions,
    ) -> Self {
        info!("Creating civic ledger runtime");
        let bus = Arc::new(InMemoryEventBus::with_capacity(config.event_capacity));
        let gateway = Arc::new(LedgerGateway::new(config, connector, bus));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            gateway,
            options,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Restore state, start the audit handler and initialize the gateway.
    pub async fn start(&self) -> Result<ConnectionState> {
        info!("===========================================");
        info!("  Civic Ledger Runtime v{}", cl_ledger_gateway::VERSION);
        info!("===========================================");

        if let Some(path) = self.options.snapshot.as_deref() {
            if path.exists() {
                self.gateway
                    .import_from(path)
                    .with_context(|| format!("restoring snapshot {}", path.display()))?;
            } else {
                info!("No snapshot at {}; starting fresh", path.display());
            }
        }

        self.start_audit_handler();

        let state = self
            .gateway
            .initialize(
                &self.options.network,
                self.options.credential.as_deref(),
                self.options.force_offline,
            )
            .await;

        let status = self.gateway.status();
        match state {
            ConnectionState::Online => info!(
                "Ledger online: network={} chain_id={:?} signer={}",
                self.options.network, status.chain_id, status.has_signer
            ),
            _ => warn!(
                "Ledger running on emulation: {}",
                status.offline_reason.as_deref().unwrap_or("unknown")
            ),
        }
        Ok(state)
    }

    fn start_audit_handler(&self) {
        let handler = AuditLogHandler::new(self.gateway.subscribe(EventFilter::all()));
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = handler.run() => {}
                _ = shutdown.changed() => {
                    info!("[audit] Shutdown signal received");
                }
            }
        });
    }

    /// Persist, stop handlers and release the gateway's live handles.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        if let Some(path) = self.options.snapshot.as_deref() {
            self.gateway
                .export_to(path)
                .with_context(|| format!("writing snapshot {}", path.display()))?;
            info!("Snapshot written to {}", path.display());
        }

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        self.gateway.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    pub fn gateway(&self) -> Arc<LedgerGateway> {
        Arc::clone(&self.gateway)
    }
}
