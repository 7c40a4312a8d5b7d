//! In-process ledger emulation.
//!
//! Used whenever the gateway is offline. Registries mutate the
//! [`EmulatedStore`] synchronously; the [`TransactionGenerator`] fabricates
//! receipts and publishes confirmation events later.

pub mod fixtures;
pub mod registries;
pub mod store;
pub mod tx_generator;

pub use registries::{EmulatedCitizenRegistry, EmulatedDocumentRegistry, EmulatedGrievanceRegistry};
pub use store::{Collection, EmulatedStore};
pub use tx_generator::{random_address, TransactionGenerator};

use crate::config::EmulationConfig;
use crate::metrics::GatewayMetrics;
use shared_bus::EventPublisher;
use shared_types::{OperationType, TransactionReceipt};
use std::sync::Arc;

/// Shared handles for the emulated registries.
#[derive(Clone)]
pub struct Emulation {
    pub store: Arc<EmulatedStore>,
    pub generator: Arc<TransactionGenerator>,
    pub metrics: Arc<GatewayMetrics>,
}

impl Emulation {
    /// Fresh store and generator with their own metrics.
    pub fn new(publisher: Arc<dyn EventPublisher>, config: EmulationConfig) -> Self {
        Self::with_metrics(publisher, config, Arc::new(GatewayMetrics::new()))
    }

    pub fn with_metrics(
        publisher: Arc<dyn EventPublisher>,
        config: EmulationConfig,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        let store = Arc::new(EmulatedStore::new(config.initial_block));
        let generator = Arc::new(TransactionGenerator::new(
            Arc::clone(&store),
            publisher,
            Arc::clone(&metrics),
            config,
        ));
        Self {
            store,
            generator,
            metrics,
        }
    }

    /// Mock receipt for `operation` with its standard gas figure.
    pub fn emit(&self, operation: OperationType, entity_id: Option<u64>) -> TransactionReceipt {
        self.generator
            .mock_transaction(operation, operation.emulated_gas(), entity_id)
    }
}
