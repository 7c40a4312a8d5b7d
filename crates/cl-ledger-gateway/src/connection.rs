//! # Connection Manager
//!
//! Drives the gateway's mode state machine:
//!
//! ```text
//! Uninitialized ──► Connecting ──► Online
//!       │                │
//!       └────────────────┴──────► Offline
//! ```
//!
//! Connection failures never reach the caller. They end in `Offline` with
//! the last failure recorded as the reason, and the registries switch to the
//! in-process emulation.

use crate::adapters::signer::SignerIdentity;
use crate::config::{ConnectionConfig, NetworkProfile, NetworkProfiles};
use crate::domain::{LedgerError, LedgerResult};
use crate::metrics::GatewayMetrics;
use crate::ports::outbound::{LedgerRpc, RpcConnector};
use parking_lot::RwLock;
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{Address, ConnectionState};
use std::future::Future;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Reason recorded when the caller skips the network entirely.
pub const FORCED_OFFLINE: &str = "forced offline";

/// Network access handed to provisioning once a trial succeeds.
#[derive(Clone)]
pub struct LiveSession {
    pub rpc: Arc<dyn LedgerRpc>,
    pub signer: Option<Address>,
    pub network: String,
    pub chain_id: u64,
}

#[derive(Default)]
struct Inner {
    state: ConnectionState,
    rpc: Option<Arc<dyn LedgerRpc>>,
    signer: Option<SignerIdentity>,
    network: Option<String>,
    chain_id: Option<u64>,
    offline_reason: Option<String>,
}

/// Owns the connection state and the live network handles.
pub struct ConnectionManager {
    config: ConnectionConfig,
    networks: NetworkProfiles,
    connector: Arc<dyn RpcConnector>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<GatewayMetrics>,
    inner: RwLock<Inner>,
}

impl ConnectionManager {
    pub fn new(
        config: ConnectionConfig,
        networks: NetworkProfiles,
        connector: Arc<dyn RpcConnector>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            config,
            networks,
            connector,
            publisher,
            metrics,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Connect to `network`, or settle in `Offline`.
    ///
    /// `provision` runs after a successful trial and before the state turns
    /// `Online`; its error sends the gateway offline instead. Calling this
    /// again starts over from `Uninitialized`.
    pub async fn initialize<F, Fut>(
        &self,
        network: &str,
        credential: Option<&str>,
        force_offline: bool,
        provision: F,
    ) -> ConnectionState
    where
        F: FnOnce(LiveSession) -> Fut,
        Fut: Future<Output = LedgerResult<()>>,
    {
        self.reset();
        {
            let mut inner = self.inner.write();
            inner.network = Some(network.to_string());
        }

        if force_offline {
            info!("[cl-gateway] Offline mode forced; skipping network");
            return self.go_offline(FORCED_OFFLINE.to_string()).await;
        }

        let Some(profile) = self.networks.get(network).cloned() else {
            let err = LedgerError::UnknownNetwork(network.to_string());
            warn!("[cl-gateway] {}", err);
            return self.go_offline(err.to_string()).await;
        };

        let signer = match credential.map(SignerIdentity::from_private_key).transpose() {
            Ok(signer) => signer,
            Err(e) => {
                warn!("[cl-gateway] Rejecting credential: {}", e);
                return self.go_offline(e.to_string()).await;
            }
        };

        self.transition(ConnectionState::Connecting);
        info!(
            "[cl-gateway] Connecting to {} ({}, chain {})",
            profile.name, profile.rpc_url, profile.chain_id
        );

        let (rpc, chain_id) = match self.connect_with_retry(&profile, signer).await {
            Ok(connected) => connected,
            Err(e) => return self.go_offline(e.to_string()).await,
        };

        let session = LiveSession {
            rpc: Arc::clone(&rpc),
            signer: signer.map(|s| s.address()),
            network: profile.name.clone(),
            chain_id,
        };
        if let Err(e) = provision(session).await {
            warn!("[cl-gateway] Provisioning failed: {}", e);
            return self.go_offline(e.to_string()).await;
        }

        {
            let mut inner = self.inner.write();
            inner.rpc = Some(rpc);
            inner.signer = signer;
            inner.chain_id = Some(chain_id);
            inner.offline_reason = None;
        }
        self.transition(ConnectionState::Online);
        info!(
            "[cl-gateway] Online: {} (chain {}), signer {}",
            profile.name,
            chain_id,
            signer.map_or_else(|| "none".to_string(), |s| s.address().to_string())
        );
        self.publisher
            .publish(LedgerEvent::Connected {
                network: profile.name,
                chain_id,
            })
            .await;
        ConnectionState::Online
    }

    async fn connect_with_retry(
        &self,
        profile: &NetworkProfile,
        signer: Option<SignerIdentity>,
    ) -> LedgerResult<(Arc<dyn LedgerRpc>, u64)> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error = LedgerError::ConnectionUnavailable("no attempt made".into());

        for attempt in 1..=attempts {
            match self.trial(profile, signer).await {
                Ok(connected) => return Ok(connected),
                Err(e) => {
                    warn!(
                        "[cl-gateway] Connection attempt {}/{} failed: {}",
                        attempt, attempts, e
                    );
                    last_error = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay * attempt).await;
            }
        }

        Err(last_error)
    }

    async fn trial(
        &self,
        profile: &NetworkProfile,
        signer: Option<SignerIdentity>,
    ) -> LedgerResult<(Arc<dyn LedgerRpc>, u64)> {
        let rpc = self
            .bounded("connect", self.connector.connect(&profile.rpc_url))
            .await?;

        let chain_id = self.bounded("eth_chainId", rpc.chain_id()).await?;
        if chain_id != profile.chain_id {
            return Err(LedgerError::ChainIdentityMismatch {
                expected: profile.chain_id,
                actual: chain_id,
            });
        }

        if let Some(signer) = signer {
            let balance = self
                .bounded("eth_getBalance", rpc.balance(signer.address()))
                .await?;
            debug!("[cl-gateway] Signer {} balance {} wei", signer.address(), balance);
        }

        Ok((rpc, chain_id))
    }

    async fn bounded<T>(
        &self,
        what: &str,
        request: impl Future<Output = LedgerResult<T>>,
    ) -> LedgerResult<T> {
        let limit = self.config.attempt_timeout;
        timeout(limit, request)
            .await
            .map_err(|_| LedgerError::Timeout(format!("{what} after {limit:?}")))?
    }

    async fn go_offline(&self, reason: String) -> ConnectionState {
        {
            let mut inner = self.inner.write();
            inner.rpc = None;
            inner.signer = None;
            inner.chain_id = None;
            inner.offline_reason = Some(reason.clone());
        }
        self.transition(ConnectionState::Offline);
        info!("[cl-gateway] Offline ({}); using emulation", reason);
        self.publisher.publish(LedgerEvent::Offline { reason }).await;
        ConnectionState::Offline
    }

    fn transition(&self, next: ConnectionState) {
        let mut inner = self.inner.write();
        let current = inner.state;
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            warn!("[cl-gateway] Unexpected transition {} -> {}", current, next);
        }
        inner.state = next;
        drop(inner);

        self.metrics.record_transition();
        debug!("[cl-gateway] Connection {} -> {}", current, next);
    }

    fn reset(&self) {
        {
            let mut inner = self.inner.write();
            inner.rpc = None;
            inner.signer = None;
            inner.network = None;
            inner.chain_id = None;
            inner.offline_reason = None;
        }
        self.transition(ConnectionState::Uninitialized);
    }

    /// Drop every handle and return to `Uninitialized`.
    pub fn shutdown(&self) {
        self.reset();
        info!("[cl-gateway] Connection shut down");
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.read().state
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state() == ConnectionState::Online
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.state() == ConnectionState::Offline
    }

    #[must_use]
    pub fn has_signer(&self) -> bool {
        self.inner.read().signer.is_some()
    }

    #[must_use]
    pub fn has_rpc(&self) -> bool {
        self.inner.read().rpc.is_some()
    }

    #[must_use]
    pub fn signer_address(&self) -> Option<Address> {
        self.inner.read().signer.map(|s| s.address())
    }

    #[must_use]
    pub fn rpc(&self) -> Option<Arc<dyn LedgerRpc>> {
        self.inner.read().rpc.clone()
    }

    /// Profile name of the last `initialize`.
    #[must_use]
    pub fn network(&self) -> Option<String> {
        self.inner.read().network.clone()
    }

    #[must_use]
    pub fn chain_id(&self) -> Option<u64> {
        self.inner.read().chain_id
    }

    #[must_use]
    pub fn offline_reason(&self) -> Option<String> {
        self.inner.read().offline_reason.clone()
    }
}
