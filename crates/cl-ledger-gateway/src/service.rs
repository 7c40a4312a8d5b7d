//! # Ledger Gateway Service
//!
//! Facade that wires the connection manager, provisioning, the emulation and
//! the live registries together. Callers ask for a registry and get the live
//! or the emulated implementation depending on the current mode.

use crate::adapters::emulated::{
    fixtures, EmulatedCitizenRegistry, EmulatedDocumentRegistry, EmulatedGrievanceRegistry,
    Emulation,
};
use crate::adapters::live::{
    ContractHandle, LiveCitizenRegistry, LiveContext, LiveDocumentRegistry, LiveGrievanceRegistry,
};
use crate::config::GatewayConfig;
use crate::connection::ConnectionManager;
use crate::domain::{
    Deployment, EmulationSnapshot, EmulationStats, GatewayStatus, LedgerError, LedgerResult,
};
use crate::metrics::GatewayMetrics;
use crate::ports::inbound::{CitizenRegistry, DocumentRegistry, GrievanceRegistry};
use crate::ports::outbound::RpcConnector;
use crate::provisioning::ContractProvisioning;
use parking_lot::RwLock;
use primitive_types::U256;
use rand::Rng;
use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus, LedgerEvent, Subscription};
use shared_types::{Address, ConnectionState, RegistryKind};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

struct LiveRegistries {
    citizens: Arc<LiveCitizenRegistry>,
    documents: Arc<LiveDocumentRegistry>,
    grievances: Arc<LiveGrievanceRegistry>,
}

/// The gateway.
pub struct LedgerGateway {
    bus: Arc<InMemoryEventBus>,
    metrics: Arc<GatewayMetrics>,
    connection: ConnectionManager,
    provisioning: Arc<ContractProvisioning>,
    emulation: Emulation,
    emulated_citizens: Arc<EmulatedCitizenRegistry>,
    emulated_documents: Arc<EmulatedDocumentRegistry>,
    emulated_grievances: Arc<EmulatedGrievanceRegistry>,
    live: RwLock<Option<LiveRegistries>>,
}

impl LedgerGateway {
    /// Build an uninitialized gateway. Seeds the emulation when configured.
    pub fn new(
        config: GatewayConfig,
        connector: Arc<dyn RpcConnector>,
        bus: Arc<InMemoryEventBus>,
    ) -> Self {
        let metrics = Arc::new(GatewayMetrics::new());
        let publisher: Arc<dyn EventPublisher> = bus.clone();

        let emulation = Emulation::with_metrics(
            Arc::clone(&publisher),
            config.emulation.clone(),
            Arc::clone(&metrics),
        );
        if config.emulation.seed_fixtures {
            if let Err(e) = fixtures::seed(&emulation.store) {
                warn!("[cl-gateway] Could not seed sample records: {}", e);
            }
        }

        let connection = ConnectionManager::new(
            config.connection.clone(),
            config.networks.clone(),
            connector,
            publisher,
            Arc::clone(&metrics),
        );
        let provisioning = Arc::new(ContractProvisioning::new(
            config,
            Arc::clone(&metrics),
            emulation.clone(),
        ));

        Self {
            bus,
            metrics,
            connection,
            provisioning,
            emulated_citizens: Arc::new(EmulatedCitizenRegistry::new(emulation.clone())),
            emulated_documents: Arc::new(EmulatedDocumentRegistry::new(emulation.clone())),
            emulated_grievances: Arc::new(EmulatedGrievanceRegistry::new(emulation.clone())),
            emulation,
            live: RwLock::new(None),
        }
    }

    /// Connect to `network` and provision its registries, or fall back to
    /// emulation. Never fails; the returned state says which mode won.
    pub async fn initialize(
        &self,
        network: &str,
        credential: Option<&str>,
        force_offline: bool,
    ) -> ConnectionState {
        *self.live.write() = None;
        self.provisioning.detach();

        let state = self
            .connection
            .initialize(network, credential, force_offline, |session| async move {
                let signer = session.signer;
                self.provisioning.attach(session.rpc, signer);
                if let Err(e) = self.provisioning.load_definitions() {
                    self.provisioning.detach();
                    return Err(e);
                }
                for deployment in self.provisioning.provision_missing().await {
                    self.bus
                        .publish(LedgerEvent::Transaction(deployment.receipt))
                        .await;
                }
                // Installed before the state turns Online and `connected` fires.
                *self.live.write() = Some(self.live_registries(signer));
                Ok(())
            })
            .await;

        if state != ConnectionState::Online {
            *self.live.write() = None;
            self.provisioning.detach();
            match self.provisioning.load_definitions() {
                Ok(count) => info!("[cl-gateway] {} contract definitions retained offline", count),
                Err(e) => warn!("[cl-gateway] Contract definitions unavailable: {}", e),
            }
        }
        state
    }

    fn live_registries(&self, signer: Option<Address>) -> LiveRegistries {
        let ctx = LiveContext {
            provisioning: Arc::clone(&self.provisioning),
            signer,
            publisher: self.bus.clone(),
            metrics: Arc::clone(&self.metrics),
        };
        LiveRegistries {
            citizens: Arc::new(LiveCitizenRegistry::new(ctx.clone())),
            documents: Arc::new(LiveDocumentRegistry::new(ctx.clone())),
            grievances: Arc::new(LiveGrievanceRegistry::new(ctx)),
        }
    }

    /// Drop live handles and return to `Uninitialized`.
    ///
    /// Emulated records survive; pending confirmation events still fire.
    pub fn shutdown(&self) {
        *self.live.write() = None;
        self.provisioning.detach();
        self.connection.shutdown();
        info!("[cl-gateway] Gateway shut down");
    }

    // =========================================================================
    // REGISTRIES
    // =========================================================================

    pub fn citizens(&self) -> Arc<dyn CitizenRegistry> {
        match &*self.live.read() {
            Some(live) => live.citizens.clone(),
            None => self.emulated_citizens.clone(),
        }
    }

    pub fn documents(&self) -> Arc<dyn DocumentRegistry> {
        match &*self.live.read() {
            Some(live) => live.documents.clone(),
            None => self.emulated_documents.clone(),
        }
    }

    pub fn grievances(&self) -> Arc<dyn GrievanceRegistry> {
        match &*self.live.read() {
            Some(live) => live.grievances.clone(),
            None => self.emulated_grievances.clone(),
        }
    }

    /// Bound contract for `kind`. `ContractUnavailable` unless online.
    pub fn contract(&self, kind: RegistryKind) -> LedgerResult<Arc<ContractHandle>> {
        if !self.connection.is_online() {
            return Err(LedgerError::ContractUnavailable {
                registry: kind,
                reason: "ledger offline".into(),
            });
        }
        self.provisioning.contract(kind)
    }

    /// Deploy a registry contract; synthetic while offline.
    pub async fn deploy(&self, kind: RegistryKind) -> LedgerResult<Deployment> {
        let deployment = self.metrics.track(self.provisioning.deploy(kind).await)?;
        if !deployment.receipt.synthetic {
            self.bus
                .publish(LedgerEvent::Transaction(deployment.receipt.clone()))
                .await;
        }
        Ok(deployment)
    }

    // =========================================================================
    // STATUS
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connection.is_online()
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.connection.is_offline()
    }

    #[must_use]
    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            initialized: self.connection.state().is_settled(),
            online: self.connection.is_online(),
            offline: self.connection.is_offline(),
            has_rpc: self.connection.has_rpc(),
            has_signer: self.connection.has_signer(),
            network: self.connection.network(),
            chain_id: self.connection.chain_id(),
            offline_reason: self.connection.offline_reason(),
            bound_contracts: self.provisioning.bound_contracts(),
            collection_sizes: self.emulation.store.sizes(),
            transactions_emitted: self.metrics.get_transactions_emitted(),
            live_calls: self.metrics.get_live_calls(),
            mode_transitions: self.metrics.get_mode_transitions(),
            registry_failures: self.metrics.get_registry_failures(),
        }
    }

    /// Emulation counters; `None` while online.
    #[must_use]
    pub fn emulation_stats(&self) -> Option<EmulationStats> {
        (!self.connection.is_online()).then(|| self.emulation.store.stats())
    }

    /// Ether balance of `address` (default: the signer).
    ///
    /// Offline this is a random placeholder between 1 and 11.
    pub async fn balance(&self, address: Option<Address>) -> LedgerResult<String> {
        let rpc = match self.connection.rpc() {
            Some(rpc) if self.connection.is_online() => rpc,
            _ => {
                let placeholder: f64 = rand::thread_rng().gen_range(1.0..11.0);
                return Ok(format!("{placeholder:.4}"));
            }
        };
        let account = address
            .or_else(|| self.connection.signer_address())
            .ok_or_else(|| LedgerError::SignerUnavailable("balance query".into()))?;
        self.metrics.record_live_call();
        let wei = rpc.balance(account).await?;
        Ok(format_ether(wei))
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    #[must_use]
    pub fn export_state(&self) -> EmulationSnapshot {
        self.emulation.store.snapshot()
    }

    pub fn import_state(&self, snapshot: EmulationSnapshot) {
        info!(
            "[cl-gateway] Importing {} citizens, {} documents, {} grievances",
            snapshot.citizens.len(),
            snapshot.documents.len(),
            snapshot.grievances.len()
        );
        self.emulation.store.restore(snapshot);
    }

    /// Write the emulation snapshot to `path` as JSON.
    pub fn export_to(&self, path: &Path) -> LedgerResult<()> {
        let text = serde_json::to_string_pretty(&self.export_state())?;
        std::fs::write(path, text)
            .map_err(|e| LedgerError::Snapshot(format!("{}: {}", path.display(), e)))
    }

    /// Replace the emulation state with the snapshot at `path`.
    pub fn import_from(&self, path: &Path) -> LedgerResult<()> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Snapshot(format!("{}: {}", path.display(), e)))?;
        let snapshot: EmulationSnapshot = serde_json::from_str(&text)?;
        self.import_state(snapshot);
        Ok(())
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// Wei as a decimal ether string, always with a fractional part (`1.0`).
fn format_ether(wei: U256) -> String {
    let unit = U256::exp10(18);
    let whole = wei / unit;
    let fraction = format!("{:0>18}", (wei % unit).to_string());
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}
