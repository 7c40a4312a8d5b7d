//! # Civic Ledger Gateway
//!
//! Resilient ledger abstraction for the citizen-services portal.
//!
//! ## Purpose
//!
//! Exposes citizen, document and grievance registries backed by smart
//! contracts on an EVM JSON-RPC network. When the network is unreachable the
//! same registries run against an in-process emulation that fabricates
//! receipts and publishes the same events, so callers never branch on mode.
//!
//! ## Modes
//!
//! ```text
//! Uninitialized ──initialize──► Connecting ──trial ok + provisioned──► Online
//!       │                            │
//!       └──── force_offline ─────────┴──── trials exhausted ─────────► Offline
//! ```
//!
//! | Mode | Registries | Receipts | Events |
//! |------|-----------|----------|--------|
//! | Online | `adapters::live` | mined, `synthetic = false` | on mining |
//! | Offline | `adapters::emulated` | fabricated, `synthetic = true` | delayed |
//!
//! ## Emulation Ids and Delays
//!
//! | Operation | Gas | Domain event delay |
//! |-----------|-----|--------------------|
//! | register citizen | 75000 | 800 ms |
//! | verify citizen | 45000 | 600 ms |
//! | upload document (id from 1000) | 85000 | 900 ms |
//! | verify / reject document | 55000 | 700 ms |
//! | submit grievance (id from 2000) | 110000 | 1000 ms |
//! | assign grievance | 35000 | none |
//! | resolve grievance | 60000 | 800 ms |
//!
//! Every operation also emits a `transaction` event 500-1500 ms later.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service.rs       - LedgerGateway facade                        │
//! │  connection.rs    - mode state machine, connection trials       │
//! │  provisioning.rs  - artifact loading, binding, deployment       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/live      - contract handles, live registries         │
//! │  adapters/emulated  - store, tx generator, emulated registries  │
//! │  adapters/http_rpc  - reqwest JSON-RPC client                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - CitizenRegistry, DocumentRegistry, ...     │
//! │  ports/outbound.rs - LedgerRpc, RpcConnector                    │
//! │  domain/           - entities, value objects, LedgerError       │
//! │  abi/              - artifact parsing, ABI codec                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod abi;
pub mod adapters;
pub mod config;
pub mod connection;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod provisioning;
pub mod service;

pub use config::{ConnectionConfig, EmulationConfig, GatewayConfig, NetworkProfile, NetworkProfiles};
pub use connection::{ConnectionManager, LiveSession};
pub use domain::*;
pub use metrics::GatewayMetrics;
pub use ports::*;
pub use provisioning::ContractProvisioning;
pub use service::LedgerGateway;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
