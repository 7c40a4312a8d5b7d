//! # Inbound Ports
//!
//! One trait per registry. The gateway hands out an emulated or a live
//! implementation depending on the current connection mode, so callers never
//! branch on the mode themselves.

use crate::domain::{
    Citizen, CitizenRegistration, Document, DocumentUpload, Grievance, GrievanceSubmission,
    LedgerResult,
};
use async_trait::async_trait;
use shared_types::{Address, TransactionReceipt};

/// Citizen identity registry - inbound port.
#[async_trait]
pub trait CitizenRegistry: Send + Sync {
    /// Register a citizen under `address`.
    ///
    /// Fails with `AlreadyRegistered` if the address is taken.
    async fn register(
        &self,
        address: Address,
        registration: CitizenRegistration,
    ) -> LedgerResult<TransactionReceipt>;

    /// Fetch a citizen record.
    async fn get(&self, address: Address) -> LedgerResult<Citizen>;

    /// True if the address is registered. Never fails.
    async fn is_registered(&self, address: Address) -> bool;

    /// Mark a citizen verified.
    ///
    /// Fails with `NotFound` or `AlreadyVerified`.
    async fn verify(
        &self,
        address: Address,
        verifier: Option<Address>,
    ) -> LedgerResult<TransactionReceipt>;
}

/// Document verification registry - inbound port.
#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    /// Upload a document owned by `owner`. The receipt carries the new id.
    async fn upload(
        &self,
        owner: Address,
        upload: DocumentUpload,
    ) -> LedgerResult<TransactionReceipt>;

    /// Fetch a document record.
    async fn get(&self, id: u64) -> LedgerResult<Document>;

    /// Move a pending document to Verified.
    async fn verify(&self, id: u64, verifier: Option<Address>) -> LedgerResult<TransactionReceipt>;

    /// Move a pending document to Rejected.
    async fn reject(
        &self,
        id: u64,
        reason: String,
        verifier: Option<Address>,
    ) -> LedgerResult<TransactionReceipt>;

    /// Ids of documents owned by `owner`, ascending.
    async fn list_by_owner(&self, owner: Address) -> LedgerResult<Vec<u64>>;
}

/// Grievance management registry - inbound port.
#[async_trait]
pub trait GrievanceRegistry: Send + Sync {
    /// File a grievance on behalf of `citizen`. The receipt carries the new id.
    async fn submit(
        &self,
        citizen: Address,
        submission: GrievanceSubmission,
    ) -> LedgerResult<TransactionReceipt>;

    /// Fetch a grievance record.
    async fn get(&self, id: u64) -> LedgerResult<Grievance>;

    /// Assign an officer; the grievance moves to InProgress.
    async fn assign(&self, id: u64, officer: Address) -> LedgerResult<TransactionReceipt>;

    /// Resolve an assigned grievance.
    async fn resolve(&self, id: u64, resolution: String) -> LedgerResult<TransactionReceipt>;

    /// Ids of grievances filed by `citizen`, ascending.
    async fn list_by_citizen(&self, citizen: Address) -> LedgerResult<Vec<u64>>;
}
