//! # Domain Entities
//!
//! Registry records, operation requests and the reporting shapes returned by
//! the gateway facade.

use super::value_objects::{DocType, DocumentStatus, GrievanceCategory, GrievanceStatus, Priority};
use serde::{Deserialize, Serialize};
use shared_types::{Address, RegistryKind, TransactionReceipt};

// =============================================================================
// RECORDS
// =============================================================================

/// A registered citizen, keyed by wallet address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citizen {
    pub address: Address,
    pub identity_hash: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub verified: bool,
    pub registered_at: u64,
    pub verifier: Option<Address>,
    pub verified_at: Option<u64>,
}

/// An uploaded document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: u64,
    pub owner: Address,
    pub content_hash: String,
    pub doc_type: DocType,
    pub status: DocumentStatus,
    pub metadata: String,
    pub uploaded_at: u64,
    pub verified_at: Option<u64>,
    pub verifier: Option<Address>,
    pub rejection_reason: Option<String>,
    pub expires_at: Option<u64>,
}

/// A filed grievance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grievance {
    pub id: u64,
    pub citizen: Address,
    pub title: String,
    pub description: String,
    pub category: GrievanceCategory,
    pub priority: Priority,
    pub status: GrievanceStatus,
    pub submitted_at: u64,
    pub assigned_officer: Option<Address>,
    pub resolution: Option<String>,
    pub resolved_at: Option<u64>,
    pub satisfaction_rating: Option<u8>,
    pub location: String,
    pub attachments: Vec<String>,
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Input to `CitizenRegistry::register`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenRegistration {
    pub identity_hash: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Input to `DocumentRegistry::upload`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub content_hash: String,
    pub doc_type: DocType,
    pub metadata: String,
    pub expires_at: Option<u64>,
}

/// Input to `GrievanceRegistry::submit`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrievanceSubmission {
    pub title: String,
    pub description: String,
    pub category: GrievanceCategory,
    pub priority: Priority,
    pub location: String,
    pub attachments: Vec<String>,
}

// =============================================================================
// REPORTING
// =============================================================================

/// Entire emulation state, for export/import.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmulationSnapshot {
    pub citizens: Vec<Citizen>,
    pub documents: Vec<Document>,
    pub grievances: Vec<Grievance>,
    pub transactions: Vec<TransactionReceipt>,
    pub block_number: u64,
    /// Unix seconds when the snapshot was taken.
    #[serde(default)]
    pub exported_at: u64,
}

/// Record counts per emulated collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSizes {
    pub citizens: usize,
    pub documents: usize,
    pub grievances: usize,
    pub transactions: usize,
}

/// Snapshot of the gateway's connection and storage state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub initialized: bool,
    pub online: bool,
    pub offline: bool,
    pub has_rpc: bool,
    pub has_signer: bool,
    pub network: Option<String>,
    pub chain_id: Option<u64>,
    pub offline_reason: Option<String>,
    pub bound_contracts: Vec<RegistryKind>,
    pub collection_sizes: CollectionSizes,
    pub transactions_emitted: u64,
    pub live_calls: u64,
    pub mode_transitions: u64,
    pub registry_failures: u64,
}

/// Aggregate counters over the emulated registries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmulationStats {
    pub total_citizens: usize,
    pub verified_citizens: usize,
    pub total_documents: usize,
    pub verified_documents: usize,
    pub total_grievances: usize,
    pub resolved_grievances: usize,
    pub total_transactions: usize,
    pub current_block: u64,
}

/// Result of deploying a registry contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub registry: RegistryKind,
    pub address: Address,
    pub receipt: TransactionReceipt,
}
