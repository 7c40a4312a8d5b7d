//! # Civic Telemetry
//!
//! Logging and metrics for the civic ledger services.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use civic_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // tracing macros now reach the configured output
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CL_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `CL_JSON_LOGS` | `false` | JSON lines output |
//! | `CL_SERVICE_NAME` | `civic-ledger` | Service name |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, record_mode, record_transaction, register_metrics, GAS_USED, LEDGER_EVENTS,
    LEDGER_ONLINE, MODE_CHANGES, TRANSACTIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the global subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::Config("bad filter".into());
        assert_eq!(err.to_string(), "Invalid configuration: bad filter");
    }

    #[test]
    fn test_metric_inc_macro() {
        metric_inc!(LEDGER_EVENTS, &["connected"]);
        assert!(LEDGER_EVENTS.with_label_values(&["connected"]).get() >= 1.0);
    }
}
