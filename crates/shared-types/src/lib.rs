//! # Shared Types Crate
//!
//! Primitives shared by every civic-ledger crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: receipts, addresses and the connection state
//!   are defined once and reused by the bus and the gateway.
//! - **Canonical Text Forms**: addresses and hashes always render as
//!   lowercase `0x`-prefixed hex, regardless of how they were parsed.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
