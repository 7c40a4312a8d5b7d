//! # Ports Module
//!
//! Inbound registry APIs and outbound network interfaces.

pub mod inbound;
pub mod outbound;

pub use inbound::{CitizenRegistry, DocumentRegistry, GrievanceRegistry};
pub use outbound::{
    CallRequest, LedgerRpc, MockConnector, MockLedgerRpc, RpcConnector, RpcLog, RpcReceipt,
};
