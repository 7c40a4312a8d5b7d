//! Metrics collection for the ledger gateway

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for the gateway
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Receipts produced (live and synthetic)
    pub transactions_emitted: AtomicU64,

    /// Synthetic receipts among them
    pub synthetic_transactions: AtomicU64,

    /// Total gas across all receipts
    pub total_gas_used: AtomicU64,

    /// Requests sent to the live network by the registries
    pub live_calls: AtomicU64,

    /// Connection state transitions
    pub mode_transitions: AtomicU64,

    /// Registry operations that returned an error
    pub registry_failures: AtomicU64,
}

impl GatewayMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a receipt
    pub fn record_transaction(&self, gas_used: u64, synthetic: bool) {
        self.transactions_emitted.fetch_add(1, Ordering::Relaxed);
        self.total_gas_used.fetch_add(gas_used, Ordering::Relaxed);
        if synthetic {
            self.synthetic_transactions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a live network request
    pub fn record_live_call(&self) {
        self.live_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection state change
    pub fn record_transition(&self) {
        self.mode_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed registry operation
    pub fn record_failure(&self) {
        self.registry_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Pass a registry result through, counting it if it failed
    pub fn track<T, E>(&self, result: Result<T, E>) -> Result<T, E> {
        if result.is_err() {
            self.record_failure();
        }
        result
    }

    pub fn get_transactions_emitted(&self) -> u64 {
        self.transactions_emitted.load(Ordering::Relaxed)
    }

    pub fn get_live_calls(&self) -> u64 {
        self.live_calls.load(Ordering::Relaxed)
    }

    pub fn get_mode_transitions(&self) -> u64 {
        self.mode_transitions.load(Ordering::Relaxed)
    }

    pub fn get_registry_failures(&self) -> u64 {
        self.registry_failures.load(Ordering::Relaxed)
    }

    /// Average gas per receipt
    pub fn get_avg_gas_per_transaction(&self) -> f64 {
        let txs = self.transactions_emitted.load(Ordering::Relaxed);
        if txs == 0 {
            return 0.0;
        }
        self.total_gas_used.load(Ordering::Relaxed) as f64 / txs as f64
    }
}
