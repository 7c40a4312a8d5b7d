//! Mock Transaction Generator
//!
//! Fabricates receipts for emulated operations and publishes confirmation
//! events from detached tasks. Callers never wait on the delay.

use super::store::EmulatedStore;
use crate::config::EmulationConfig;
use crate::metrics::GatewayMetrics;
use rand::Rng;
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{unix_now, Address, OperationType, TransactionReceipt, TxHash};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Produces synthetic receipts and delayed events.
pub struct TransactionGenerator {
    store: Arc<EmulatedStore>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<GatewayMetrics>,
    config: EmulationConfig,
}

impl TransactionGenerator {
    pub fn new(
        store: Arc<EmulatedStore>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<GatewayMetrics>,
        config: EmulationConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            metrics,
            config,
        }
    }

    /// Fabricate a receipt for `operation` and schedule its `transaction` event.
    pub fn mock_transaction(
        &self,
        operation: OperationType,
        gas: u64,
        entity_id: Option<u64>,
    ) -> TransactionReceipt {
        self.fabricate(operation, gas, entity_id, None)
    }

    /// Synthetic contract deployment at a random address.
    pub fn mock_deployment(&self) -> (Address, TransactionReceipt) {
        let operation = OperationType::Deployment;
        let address = random_address();
        let receipt = self.fabricate(operation, operation.emulated_gas(), None, Some(address));
        (address, receipt)
    }

    fn fabricate(
        &self,
        operation: OperationType,
        gas: u64,
        entity_id: Option<u64>,
        contract_address: Option<Address>,
    ) -> TransactionReceipt {
        let mut rng = rand::thread_rng();
        let (hash, block_hash): ([u8; 32], [u8; 32]) = (rng.gen(), rng.gen());
        let receipt = self.store.append_transaction(|block_number| TransactionReceipt {
            hash: TxHash(hash),
            block_number,
            block_hash: TxHash(block_hash),
            gas_used: gas,
            gas_price: self.config.gas_price_wei,
            timestamp: unix_now(),
            operation,
            entity_id,
            contract_address,
            synthetic: true,
        });
        self.metrics.record_transaction(gas, true);
        debug!(
            "[cl-gateway] Mock {} tx {} in block {}",
            operation, receipt.hash, receipt.block_number
        );

        let delay = self.confirmation_delay(&mut rng);
        self.schedule(LedgerEvent::Transaction(receipt.clone()), delay);
        receipt
    }

    /// Publish `event` after `delay` from a detached task.
    pub fn schedule(&self, event: LedgerEvent, delay: Duration) {
        let publisher = Arc::clone(&self.publisher);
        let name = event.name();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    publisher.publish(event).await;
                });
            }
            Err(_) => warn!("[cl-gateway] No async runtime; dropping `{}` event", name),
        }
    }

    /// Schedule the domain event for `operation` after its fixed delay.
    ///
    /// Operations without a domain event drop it silently.
    pub fn announce(&self, operation: OperationType, event: LedgerEvent) {
        if let Some(delay) = operation.event_delay() {
            self.schedule(event, delay);
        }
    }

    fn confirmation_delay(&self, rng: &mut impl Rng) -> Duration {
        let min = self.config.confirmation_min.as_millis() as u64;
        let max = (self.config.confirmation_max.as_millis() as u64).max(min);
        Duration::from_millis(rng.gen_range(min..=max))
    }
}

/// A random account address, standing in for an absent verifier or owner.
pub fn random_address() -> Address {
    Address(rand::thread_rng().gen())
}
