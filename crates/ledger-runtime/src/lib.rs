//! # Civic Ledger Runtime
//!
//! Process wiring around [`LedgerGateway`](cl_ledger_gateway::LedgerGateway).
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging, Prometheus registry)
//! 2. Restore the emulation snapshot, if one exists
//! 3. Start the audit handler on the event bus
//! 4. Initialize the gateway (live network or emulation)
//! 5. Run until Ctrl+C, then persist the snapshot and shut down

pub mod audit;
pub mod runtime;

pub use audit::AuditLogHandler;
pub use runtime::{LedgerRuntime, RuntimeOptions};
