//! Live registries.
//!
//! Each operation resolves its contract through provisioning, so a registry
//! that failed to deploy reports `ContractUnavailable` per call while the
//! others keep working. Mined receipts are published as `transaction`
//! events, followed by the domain event.

use super::contract::{classify_revert, ContractHandle, Outputs};
use crate::abi::Token;
use crate::domain::{
    Citizen, CitizenRegistration, DocType, Document, DocumentStatus, DocumentUpload, Grievance,
    GrievanceCategory, GrievanceStatus, GrievanceSubmission, LedgerError, LedgerResult, Priority,
};
use crate::metrics::GatewayMetrics;
use crate::ports::inbound::{CitizenRegistry, DocumentRegistry, GrievanceRegistry};
use crate::provisioning::ContractProvisioning;
use async_trait::async_trait;
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{Address, OperationType, RegistryKind, TransactionReceipt};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared handles for the live registries.
#[derive(Clone)]
pub struct LiveContext {
    pub provisioning: Arc<ContractProvisioning>,
    /// Default sender for privileged operations.
    pub signer: Option<Address>,
    pub publisher: Arc<dyn EventPublisher>,
    pub metrics: Arc<GatewayMetrics>,
}

impl LiveContext {
    fn contract(&self, kind: RegistryKind) -> LedgerResult<Arc<ContractHandle>> {
        self.provisioning.contract(kind)
    }

    /// Explicit sender, else the signer.
    fn sender(&self, explicit: Option<Address>, operation: OperationType) -> LedgerResult<Address> {
        explicit
            .or(self.signer)
            .ok_or_else(|| LedgerError::SignerUnavailable(operation.to_string()))
    }

    async fn publish(&self, receipt: &TransactionReceipt, event: Option<LedgerEvent>) {
        self.publisher
            .publish(LedgerEvent::Transaction(receipt.clone()))
            .await;
        if let Some(event) = event {
            self.publisher.publish(event).await;
        }
    }
}

fn code(value: u8) -> Token {
    Token::from(u64::from(value))
}

// =============================================================================
// CITIZENS
// =============================================================================

/// Citizen registry backed by the `CitizenRegistry` contract.
pub struct LiveCitizenRegistry {
    ctx: LiveContext,
}

impl LiveCitizenRegistry {
    pub fn new(ctx: LiveContext) -> Self {
        Self { ctx }
    }

    async fn register_citizen(
        &self,
        address: Address,
        registration: CitizenRegistration,
    ) -> LedgerResult<TransactionReceipt> {
        let contract = self.ctx.contract(RegistryKind::Citizen)?;
        let name = registration.name.clone();
        let mined = contract
            .send(
                "registerCitizen",
                &[
                    registration.identity_hash.into(),
                    registration.name.into(),
                    registration.email.into(),
                    registration.phone.into(),
                ],
                address,
            )
            .await
            .map_err(|e| classify_revert(e, "citizen", address))?;

        let receipt = contract
            .to_receipt(&mined, OperationType::RegisterCitizen, None)
            .await;
        info!("[cl-gateway] Citizen registered on chain: {}", address);
        self.ctx
            .publish(
                &receipt,
                Some(LedgerEvent::CitizenRegistered {
                    address,
                    name,
                    tx_hash: receipt.hash,
                }),
            )
            .await;
        Ok(receipt)
    }

    async fn fetch(&self, address: Address) -> LedgerResult<Citizen> {
        let contract = self.ctx.contract(RegistryKind::Citizen)?;
        let fields = contract
            .call("getCitizen", &[address.into()])
            .await
            .map_err(|e| classify_revert(e, "citizen", address))?;
        if fields.address("walletAddress")?.is_zero() {
            return Err(LedgerError::not_found("citizen", address));
        }
        citizen_from(address, &fields)
    }

    async fn verify_citizen(
        &self,
        address: Address,
        verifier: Option<Address>,
    ) -> LedgerResult<TransactionReceipt> {
        let contract = self.ctx.contract(RegistryKind::Citizen)?;
        let sender = self.ctx.sender(verifier, OperationType::VerifyCitizen)?;
        let mined = contract
            .send("verifyCitizen", &[address.into()], sender)
            .await
            .map_err(|e| classify_revert(e, "citizen", address))?;

        let receipt = contract
            .to_receipt(&mined, OperationType::VerifyCitizen, None)
            .await;
        self.ctx
            .publish(
                &receipt,
                Some(LedgerEvent::CitizenVerified {
                    address,
                    verifier: sender,
                    tx_hash: receipt.hash,
                }),
            )
            .await;
        Ok(receipt)
    }
}

fn citizen_from(address: Address, fields: &Outputs) -> LedgerResult<Citizen> {
    Ok(Citizen {
        address,
        identity_hash: fields.string("aadharHash")?,
        name: fields.string("name")?,
        email: fields.string("email")?,
        phone: fields.string("phone")?,
        verified: fields.bool("isVerified")?,
        registered_at: fields.u64("registrationDate")?,
        verifier: None,
        verified_at: None,
    })
}

#[async_trait]
impl CitizenRegistry for LiveCitizenRegistry {
    async fn register(
        &self,
        address: Address,
        registration: CitizenRegistration,
    ) -> LedgerResult<TransactionReceipt> {
        self.ctx
            .metrics
            .track(self.register_citizen(address, registration).await)
    }

    async fn get(&self, address: Address) -> LedgerResult<Citizen> {
        self.fetch(address).await
    }

    async fn is_registered(&self, address: Address) -> bool {
        let result = match self.ctx.contract(RegistryKind::Citizen) {
            Ok(contract) => contract
                .call("isCitizenRegistered", &[address.into()])
                .await
                .and_then(|fields| fields.only_bool()),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!("[cl-gateway] Registration check for {} failed: {}", address, e);
            false
        })
    }

    async fn verify(
        &self,
        address: Address,
        verifier: Option<Address>,
    ) -> LedgerResult<TransactionReceipt> {
        self.ctx
            .metrics
            .track(self.verify_citizen(address, verifier).await)
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// Document registry backed by the `DocumentRegistry` contract.
pub struct LiveDocumentRegistry {
    ctx: LiveContext,
}

impl LiveDocumentRegistry {
    pub fn new(ctx: LiveContext) -> Self {
        Self { ctx }
    }

    async fn upload_document(
        &self,
        owner: Address,
        upload: DocumentUpload,
    ) -> LedgerResult<TransactionReceipt> {
        let contract = self.ctx.contract(RegistryKind::Document)?;
        let mined = contract
            .send(
                "uploadDocument",
                &[
                    upload.content_hash.into(),
                    code(upload.doc_type.code()),
                    upload.metadata.into(),
                    upload.expires_at.unwrap_or_default().into(),
                ],
                owner,
            )
            .await
            .map_err(|e| classify_revert(e, "citizen", owner))?;

        let id = contract
            .find_event(&mined, "DocumentUploaded")?
            .map(|fields| fields.u64("documentId"))
            .transpose()?;
        let receipt = contract
            .to_receipt(&mined, OperationType::UploadDocument, id)
            .await;

        let event = match id {
            Some(document_id) => {
                info!("[cl-gateway] Document {} uploaded on chain", document_id);
                Some(LedgerEvent::DocumentUploaded {
                    document_id,
                    owner,
                    tx_hash: receipt.hash,
                })
            }
            None => {
                warn!("[cl-gateway] Upload {} emitted no DocumentUploaded log", receipt.hash);
                None
            }
        };
        self.ctx.publish(&receipt, event).await;
        Ok(receipt)
    }

    async fn fetch(&self, id: u64) -> LedgerResult<Document> {
        let contract = self.ctx.contract(RegistryKind::Document)?;
        let fields = contract
            .call("getDocument", &[id.into()])
            .await
            .map_err(|e| classify_revert(e, "document", id))?;
        if fields.address("owner")?.is_zero() {
            return Err(LedgerError::not_found("document", id));
        }
        document_from(&fields)
    }

    async fn finalize(
        &self,
        id: u64,
        reason: Option<String>,
        verifier: Option<Address>,
    ) -> LedgerResult<TransactionReceipt> {
        let contract = self.ctx.contract(RegistryKind::Document)?;
        let (operation, function, mut args) = match &reason {
            Some(_) => (OperationType::RejectDocument, "rejectDocument", vec![Token::from(id)]),
            None => (OperationType::VerifyDocument, "verifyDocument", vec![Token::from(id)]),
        };
        if let Some(reason) = &reason {
            args.push(Token::from(reason.as_str()));
        }

        let sender = self.ctx.sender(verifier, operation)?;
        let mined = contract
            .send(function, &args, sender)
            .await
            .map_err(|e| classify_revert(e, "document", id))?;
        let receipt = contract.to_receipt(&mined, operation, None).await;

        let event = match reason {
            Some(reason) => LedgerEvent::DocumentRejected {
                document_id: id,
                reason,
                tx_hash: receipt.hash,
            },
            None => LedgerEvent::DocumentVerified {
                document_id: id,
                verifier: sender,
                tx_hash: receipt.hash,
            },
        };
        self.ctx.publish(&receipt, Some(event)).await;
        Ok(receipt)
    }
}

fn document_from(fields: &Outputs) -> LedgerResult<Document> {
    Ok(Document {
        id: fields.u64("id")?,
        owner: fields.address("owner")?,
        content_hash: fields.string("documentHash")?,
        doc_type: DocType::from_code(fields.u64("docType")?)?,
        status: DocumentStatus::from_code(fields.u64("status")?)?,
        metadata: fields.string("metadata")?,
        uploaded_at: fields.u64("uploadDate")?,
        verified_at: fields.optional_u64("verificationDate")?,
        verifier: fields.optional_address("verifier")?,
        rejection_reason: fields.optional_string("rejectionReason")?,
        expires_at: fields.optional_u64("expiryDate")?,
    })
}

#[async_trait]
impl DocumentRegistry for LiveDocumentRegistry {
    async fn upload(
        &self,
        owner: Address,
        upload: DocumentUpload,
    ) -> LedgerResult<TransactionReceipt> {
        self.ctx
            .metrics
            .track(self.upload_document(owner, upload).await)
    }

    async fn get(&self, id: u64) -> LedgerResult<Document> {
        self.fetch(id).await
    }

    async fn verify(&self, id: u64, verifier: Option<Address>) -> LedgerResult<TransactionReceipt> {
        self.ctx.metrics.track(self.finalize(id, None, verifier).await)
    }

    async fn reject(
        &self,
        id: u64,
        reason: String,
        verifier: Option<Address>,
    ) -> LedgerResult<TransactionReceipt> {
        self.ctx
            .metrics
            .track(self.finalize(id, Some(reason), verifier).await)
    }

    async fn list_by_owner(&self, owner: Address) -> LedgerResult<Vec<u64>> {
        let contract = self.ctx.contract(RegistryKind::Document)?;
        let mut ids = contract
            .call("getUserDocuments", &[owner.into()])
            .await?
            .only_u64s()?;
        ids.sort_unstable();
        Ok(ids)
    }
}

// =============================================================================
// GRIEVANCES
// =============================================================================

/// Grievance registry backed by the `GrievanceSystem` contract.
pub struct LiveGrievanceRegistry {
    ctx: LiveContext,
}

impl LiveGrievanceRegistry {
    pub fn new(ctx: LiveContext) -> Self {
        Self { ctx }
    }

    async fn submit_grievance(
        &self,
        citizen: Address,
        submission: GrievanceSubmission,
    ) -> LedgerResult<TransactionReceipt> {
        let contract = self.ctx.contract(RegistryKind::Grievance)?;
        let title = submission.title.clone();
        let attachments = submission
            .attachments
            .into_iter()
            .map(Token::from)
            .collect();
        let mined = contract
            .send(
                "submitGrievance",
                &[
                    submission.title.into(),
                    submission.description.into(),
                    code(submission.category.code()),
                    code(submission.priority.code()),
                    submission.location.into(),
                    Token::Array(attachments),
                ],
                citizen,
            )
            .await
            .map_err(|e| classify_revert(e, "citizen", citizen))?;

        let id = contract
            .find_event(&mined, "GrievanceSubmitted")?
            .map(|fields| fields.u64("grievanceId"))
            .transpose()?;
        let receipt = contract
            .to_receipt(&mined, OperationType::SubmitGrievance, id)
            .await;

        let event = id.map(|grievance_id| LedgerEvent::GrievanceSubmitted {
            grievance_id,
            citizen,
            title,
            tx_hash: receipt.hash,
        });
        if event.is_none() {
            warn!("[cl-gateway] Submission {} emitted no GrievanceSubmitted log", receipt.hash);
        }
        self.ctx.publish(&receipt, event).await;
        Ok(receipt)
    }

    async fn fetch(&self, id: u64) -> LedgerResult<Grievance> {
        let contract = self.ctx.contract(RegistryKind::Grievance)?;
        let fields = contract
            .call("getGrievance", &[id.into()])
            .await
            .map_err(|e| classify_revert(e, "grievance", id))?;
        if fields.address("citizen")?.is_zero() {
            return Err(LedgerError::not_found("grievance", id));
        }
        grievance_from(&fields)
    }

    async fn assign_officer(&self, id: u64, officer: Address) -> LedgerResult<TransactionReceipt> {
        let contract = self.ctx.contract(RegistryKind::Grievance)?;
        let sender = self.ctx.sender(None, OperationType::AssignGrievance)?;
        let mined = contract
            .send("assignGrievance", &[id.into(), officer.into()], sender)
            .await
            .map_err(|e| classify_revert(e, "grievance", id))?;
        let receipt = contract
            .to_receipt(&mined, OperationType::AssignGrievance, None)
            .await;
        self.ctx.publish(&receipt, None).await;
        Ok(receipt)
    }

    async fn resolve_grievance(&self, id: u64, resolution: String) -> LedgerResult<TransactionReceipt> {
        let contract = self.ctx.contract(RegistryKind::Grievance)?;
        let sender = self.ctx.sender(None, OperationType::ResolveGrievance)?;
        let mined = contract
            .send(
                "resolveGrievance",
                &[id.into(), resolution.as_str().into()],
                sender,
            )
            .await
            .map_err(|e| classify_revert(e, "grievance", id))?;
        let receipt = contract
            .to_receipt(&mined, OperationType::ResolveGrievance, None)
            .await;
        self.ctx
            .publish(
                &receipt,
                Some(LedgerEvent::GrievanceResolved {
                    grievance_id: id,
                    resolution,
                    tx_hash: receipt.hash,
                }),
            )
            .await;
        Ok(receipt)
    }
}

fn grievance_from(fields: &Outputs) -> LedgerResult<Grievance> {
    let rating = fields.optional_u64("satisfactionRating")?;
    Ok(Grievance {
        id: fields.u64("id")?,
        citizen: fields.address("citizen")?,
        title: fields.string("title")?,
        description: fields.string("description")?,
        category: GrievanceCategory::from_code(fields.u64("category")?)?,
        priority: Priority::from_code(fields.u64("priority")?)?,
        status: GrievanceStatus::from_code(fields.u64("status")?)?,
        submitted_at: fields.u64("submitDate")?,
        assigned_officer: fields.optional_address("assignedOfficer")?,
        resolution: fields.optional_string("resolution")?,
        resolved_at: fields.optional_u64("resolvedDate")?,
        satisfaction_rating: rating.and_then(|r| u8::try_from(r).ok()),
        location: fields.string("location")?,
        attachments: fields.strings("attachments")?,
    })
}

#[async_trait]
impl GrievanceRegistry for LiveGrievanceRegistry {
    async fn submit(
        &self,
        citizen: Address,
        submission: GrievanceSubmission,
    ) -> LedgerResult<TransactionReceipt> {
        self.ctx
            .metrics
            .track(self.submit_grievance(citizen, submission).await)
    }

    async fn get(&self, id: u64) -> LedgerResult<Grievance> {
        self.fetch(id).await
    }

    async fn assign(&self, id: u64, officer: Address) -> LedgerResult<TransactionReceipt> {
        self.ctx.metrics.track(self.assign_officer(id, officer).await)
    }

    async fn resolve(&self, id: u64, resolution: String) -> LedgerResult<TransactionReceipt> {
        self.ctx
            .metrics
            .track(self.resolve_grievance(id, resolution).await)
    }

    async fn list_by_citizen(&self, citizen: Address) -> LedgerResult<Vec<u64>> {
        let contract = self.ctx.contract(RegistryKind::Grievance)?;
        let mut ids = contract
            .call("getCitizenGrievances", &[citizen.into()])
            .await?
            .only_u64s()?;
        ids.sort_unstable();
        Ok(ids)
    }
}
