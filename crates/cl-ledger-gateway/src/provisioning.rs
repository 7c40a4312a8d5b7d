//! Contract Provisioning
//!
//! Loads registry definitions from build artifacts, binds live handles for
//! configured addresses and deploys the missing registries when a signer is
//! available.

use crate::abi::Artifact;
use crate::adapters::emulated::Emulation;
use crate::adapters::live::{canonical_receipt, wait_for_receipt, ContractHandle};
use crate::config::GatewayConfig;
use crate::domain::{Deployment, LedgerError, LedgerResult};
use crate::metrics::GatewayMetrics;
use crate::ports::outbound::{CallRequest, LedgerRpc};
use parking_lot::RwLock;
use shared_types::{Address, OperationType, RegistryKind};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Live network access granted by the connection manager.
struct Session {
    rpc: Arc<dyn LedgerRpc>,
    signer: Option<Address>,
}

#[derive(Default)]
struct ProvisioningState {
    definitions: BTreeMap<RegistryKind, Arc<Artifact>>,
    bound: BTreeMap<RegistryKind, Arc<ContractHandle>>,
    session: Option<Session>,
}

/// Owns registry definitions and bound contract handles.
pub struct ContractProvisioning {
    config: GatewayConfig,
    metrics: Arc<GatewayMetrics>,
    emulation: Emulation,
    state: RwLock<ProvisioningState>,
}

impl ContractProvisioning {
    pub fn new(config: GatewayConfig, metrics: Arc<GatewayMetrics>, emulation: Emulation) -> Self {
        Self {
            config,
            metrics,
            emulation,
            state: RwLock::new(ProvisioningState::default()),
        }
    }

    /// Start binding against a live network.
    pub fn attach(&self, rpc: Arc<dyn LedgerRpc>, signer: Option<Address>) {
        let mut state = self.state.write();
        state.bound.clear();
        state.session = Some(Session { rpc, signer });
    }

    /// Drop the network session and every bound handle.
    pub fn detach(&self) {
        let mut state = self.state.write();
        state.bound.clear();
        state.session = None;
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.read().session.is_some()
    }

    /// Read every registry artifact and bind those with a configured address.
    ///
    /// A missing artifact is skipped. An unparseable one is skipped offline
    /// and fails the whole load online. Returns the number of definitions
    /// loaded.
    pub fn load_definitions(&self) -> LedgerResult<usize> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let online = state.session.is_some();
        let mut loaded = 0;

        for kind in RegistryKind::ALL {
            let path = self.config.artifact_path(kind);
            if !path.exists() {
                warn!("[cl-gateway] No artifact for {} at {}", kind, path.display());
                continue;
            }

            let artifact = match Artifact::load(&path) {
                Ok(artifact) => Arc::new(artifact),
                Err(e) if online => return Err(e),
                Err(e) => {
                    warn!("[cl-gateway] Skipping {}: {}", kind, e);
                    continue;
                }
            };
            loaded += 1;
            state.definitions.insert(kind, Arc::clone(&artifact));

            let (Some(session), Some(address)) =
                (&state.session, self.config.contract_addresses.get(&kind))
            else {
                continue;
            };
            let handle = self.handle(kind, *address, artifact, &session.rpc);
            state.bound.insert(kind, Arc::new(handle));
            info!("[cl-gateway] {} bound at {}", kind, address);
        }

        Ok(loaded)
    }

    /// Deploy every registry that has a definition but no binding.
    ///
    /// Needs a live session with a signer. Failures are logged and skipped.
    pub async fn provision_missing(&self) -> Vec<Deployment> {
        let pending: Vec<RegistryKind> = {
            let state = self.state.read();
            match &state.session {
                Some(Session {
                    signer: Some(_), ..
                }) => {}
                _ => {
                    info!("[cl-gateway] No signer; skipping contract deployment");
                    return Vec::new();
                }
            }
            RegistryKind::ALL
                .into_iter()
                .filter(|kind| !state.bound.contains_key(kind))
                .collect()
        };

        let mut deployed = Vec::new();
        for kind in pending {
            match self.deploy_live(kind).await {
                Ok(deployment) => deployed.push(deployment),
                Err(e) => warn!("[cl-gateway] Could not deploy {}: {}", kind, e),
            }
        }
        deployed
    }

    /// Bound handle for `kind`. Always fails while offline.
    pub fn contract(&self, kind: RegistryKind) -> LedgerResult<Arc<ContractHandle>> {
        let state = self.state.read();
        if state.session.is_none() {
            return Err(LedgerError::ContractUnavailable {
                registry: kind,
                reason: "ledger offline".into(),
            });
        }
        state.bound.get(&kind).cloned().ok_or_else(|| {
            let reason = if state.definitions.contains_key(&kind) {
                "not deployed"
            } else {
                "no contract definition"
            };
            LedgerError::ContractUnavailable {
                registry: kind,
                reason: reason.into(),
            }
        })
    }

    /// Deploy `kind`; synthetic while offline.
    pub async fn deploy(&self, kind: RegistryKind) -> LedgerResult<Deployment> {
        if self.is_attached() {
            return self.deploy_live(kind).await;
        }

        let (address, receipt) = self.emulation.generator.mock_deployment();
        info!("[cl-gateway] Emulated {} deployment at {}", kind, address);
        Ok(Deployment {
            registry: kind,
            address,
            receipt,
        })
    }

    /// Registries with a bound handle.
    #[must_use]
    pub fn bound_contracts(&self) -> Vec<RegistryKind> {
        self.state.read().bound.keys().copied().collect()
    }

    /// Registries with a loaded definition.
    #[must_use]
    pub fn definitions(&self) -> Vec<RegistryKind> {
        self.state.read().definitions.keys().copied().collect()
    }

    async fn deploy_live(&self, kind: RegistryKind) -> LedgerResult<Deployment> {
        let (rpc, signer, artifact) = {
            let state = self.state.read();
            let session = state
                .session
                .as_ref()
                .ok_or_else(|| LedgerError::ContractUnavailable {
                    registry: kind,
                    reason: "ledger offline".into(),
                })?;
            let signer = session
                .signer
                .ok_or_else(|| LedgerError::SignerUnavailable(format!("deploying {kind}")))?;
            let artifact = state
                .definitions
                .get(&kind)
                .cloned()
                .ok_or_else(|| LedgerError::Artifact(format!("no definition loaded for {kind}")))?;
            (Arc::clone(&session.rpc), signer, artifact)
        };

        let request = CallRequest {
            from: Some(signer),
            to: None,
            data: artifact.bytecode_bytes()?,
            gas: None,
        };
        info!("[cl-gateway] Deploying {} from {}", kind, signer);
        self.metrics.record_live_call();
        let hash = rpc.send_transaction(&request).await?;
        let mined = wait_for_receipt(rpc.as_ref(), hash, &self.config.connection).await?;
        if !mined.status {
            return Err(LedgerError::RevertedOperation(format!(
                "deployment of {kind} reverted"
            )));
        }
        let address = mined
            .contract_address
            .ok_or_else(|| LedgerError::Rpc(format!("receipt for {hash} has no contract address")))?;
        self.metrics.record_transaction(mined.gas_used, false);
        let receipt =
            canonical_receipt(rpc.as_ref(), &mined, OperationType::Deployment, None).await;

        let handle = self.handle(kind, address, artifact, &rpc);
        self.state.write().bound.insert(kind, Arc::new(handle));
        info!("[cl-gateway] {} deployed at {}", kind, address);
        info!("[cl-gateway] {}={}", kind.address_env_var(), address);

        Ok(Deployment {
            registry: kind,
            address,
            receipt,
        })
    }

    fn handle(
        &self,
        kind: RegistryKind,
        address: Address,
        artifact: Arc<Artifact>,
        rpc: &Arc<dyn LedgerRpc>,
    ) -> ContractHandle {
        ContractHandle::new(
            kind,
            address,
            artifact,
            Arc::clone(rpc),
            Arc::clone(&self.metrics),
            self.config.connection.clone(),
        )
    }
}
