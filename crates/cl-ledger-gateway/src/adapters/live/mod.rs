//! Live ledger adapters.
//!
//! Contract bindings over a [`LedgerRpc`](crate::ports::LedgerRpc) handle and
//! the registries built on them.

pub mod contract;
pub mod registries;

pub use contract::{canonical_receipt, classify_revert, wait_for_receipt, ContractHandle, Outputs};
pub use registries::{LiveCitizenRegistry, LiveContext, LiveDocumentRegistry, LiveGrievanceRegistry};
