//! Prometheus metrics for the ledger gateway.
//!
//! All metrics follow the naming convention: `cl_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Once;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Bus events observed, by event name
    pub static ref LEDGER_EVENTS: CounterVec = CounterVec::new(
        Opts::new("cl_bus_events_total", "Ledger events observed on the bus"),
        &["event"]
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Settled transactions by operation and origin
    pub static ref TRANSACTIONS: CounterVec = CounterVec::new(
        Opts::new("cl_ledger_transactions_total", "Settled ledger transactions"),
        &["operation", "origin"]  // origin: live/emulated
    ).expect("metric creation failed");

    /// Gas reported by settled transactions
    pub static ref GAS_USED: Counter = Counter::new(
        "cl_ledger_gas_used_total",
        "Gas used by settled transactions"
    ).expect("metric creation failed");

    // =========================================================================
    // CONNECTION
    // =========================================================================

    /// 1 while a live network is connected, 0 while emulating
    pub static ref LEDGER_ONLINE: IntGauge = IntGauge::new(
        "cl_connection_online",
        "Whether the gateway is connected to a live network"
    ).expect("metric creation failed");

    /// Mode changes by resulting mode
    pub static ref MODE_CHANGES: CounterVec = CounterVec::new(
        Opts::new("cl_connection_mode_changes_total", "Connection mode changes"),
        &["mode"]
    ).expect("metric creation failed");
}

static REGISTER: Once = Once::new();

/// Register every metric with [`REGISTRY`]. Later calls are no-ops.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let mut result = Ok(());
    REGISTER.call_once(|| {
        let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(LEDGER_EVENTS.clone()),
            Box::new(TRANSACTIONS.clone()),
            Box::new(GAS_USED.clone()),
            Box::new(LEDGER_ONLINE.clone()),
            Box::new(MODE_CHANGES.clone()),
        ];
        for metric in metrics {
            if let Err(e) = REGISTRY.register(metric) {
                result = Err(TelemetryError::MetricsInit(e.to_string()));
                return;
            }
        }
    });
    result
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Count a settled transaction.
pub fn record_transaction(operation: &str, synthetic: bool, gas_used: u64) {
    let origin = if synthetic { "emulated" } else { "live" };
    TRANSACTIONS.with_label_values(&[operation, origin]).inc();
    GAS_USED.inc_by(gas_used as f64);
}

/// Count a mode change and update the online gauge.
pub fn record_mode(online: bool) {
    LEDGER_ONLINE.set(i64::from(online));
    let mode = if online { "online" } else { "offline" };
    MODE_CHANGES.with_label_values(&[mode]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_transaction_counters() {
        record_transaction("uploadDocument", true, 85_000);
        assert!(
            TRANSACTIONS
                .with_label_values(&["uploadDocument", "emulated"])
                .get()
                >= 1.0
        );
        assert!(GAS_USED.get() >= 85_000.0);
    }

    #[test]
    fn test_encode_contains_metric_names() {
        register_metrics().unwrap();
        record_mode(false);
        let text = encode_metrics().unwrap();
        assert!(text.contains("cl_connection_online 0"));
        assert!(text.contains("cl_connection_mode_changes_total"));
    }
}
