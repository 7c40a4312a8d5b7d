//! Adapters - concrete implementations of the ports.

pub mod emulated;
pub mod http_rpc;
pub mod live;
pub mod signer;

pub use emulated::{Emulation, EmulatedStore, TransactionGenerator};
pub use http_rpc::{HttpConnector, HttpLedgerRpc};
pub use live::{ContractHandle, LiveContext};
pub use signer::SignerIdentity;
