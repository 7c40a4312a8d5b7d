//! Emulated registries.
//!
//! Each operation mutates the store under the collection's write lock,
//! fabricates a receipt and schedules the matching events. Nothing here
//! suspends; the async signatures come from the inbound ports.

use super::tx_generator::random_address;
use super::{EmulatedStore, Emulation};
use crate::domain::{
    invariant_citizen_unverified, invariant_document_pending, invariant_grievance_transition,
    Citizen, CitizenRegistration, Document, DocumentStatus, DocumentUpload, Grievance,
    GrievanceStatus, GrievanceSubmission, LedgerError, LedgerResult,
};
use crate::ports::inbound::{CitizenRegistry, DocumentRegistry, GrievanceRegistry};
use async_trait::async_trait;
use shared_bus::LedgerEvent;
use shared_types::{unix_now, Address, OperationType, TransactionReceipt};
use tracing::info;

// =============================================================================
// CITIZENS
// =============================================================================

/// Citizen registry backed by the emulated store.
pub struct EmulatedCitizenRegistry {
    emulation: Emulation,
}

impl EmulatedCitizenRegistry {
    pub fn new(emulation: Emulation) -> Self {
        Self { emulation }
    }

    fn register_citizen(
        &self,
        address: Address,
        registration: CitizenRegistration,
    ) -> LedgerResult<TransactionReceipt> {
        let name = registration.name.clone();
        {
            let mut citizens = self.emulation.store.citizens.write();
            if citizens.contains_key(&address) {
                return Err(LedgerError::AlreadyRegistered(address));
            }
            citizens.insert(
                address,
                Citizen {
                    address,
                    identity_hash: registration.identity_hash,
                    name: registration.name,
                    email: registration.email,
                    phone: registration.phone,
                    verified: false,
                    registered_at: unix_now(),
                    verifier: None,
                    verified_at: None,
                },
            );
        }
        info!("[cl-gateway] Emulated citizen registered: {} ({})", name, address);

        let receipt = self.emulation.emit(OperationType::RegisterCitizen, None);
        self.emulation.generator.announce(
            OperationType::RegisterCitizen,
            LedgerEvent::CitizenRegistered {
                address,
                name,
                tx_hash: receipt.hash,
            },
        );
        Ok(receipt)
    }

    fn verify_citizen(
        &self,
        address: Address,
        verifier: Option<Address>,
    ) -> LedgerResult<TransactionReceipt> {
        let verifier = verifier.unwrap_or_else(random_address);
        {
            let mut citizens = self.emulation.store.citizens.write();
            let citizen = citizens
                .get_mut(&address)
                .ok_or_else(|| LedgerError::not_found("citizen", address))?;
            invariant_citizen_unverified(citizen)?;
            citizen.verified = true;
            citizen.verifier = Some(verifier);
            citizen.verified_at = Some(unix_now());
        }
        info!("[cl-gateway] Emulated citizen verified: {}", address);

        let receipt = self.emulation.emit(OperationType::VerifyCitizen, None);
        self.emulation.generator.announce(
            OperationType::VerifyCitizen,
            LedgerEvent::CitizenVerified {
                address,
                verifier,
                tx_hash: receipt.hash,
            },
        );
        Ok(receipt)
    }
}

#[async_trait]
impl CitizenRegistry for EmulatedCitizenRegistry {
    async fn register(
        &self,
        address: Address,
        registration: CitizenRegistration,
    ) -> LedgerResult<TransactionReceipt> {
        self.emulation
            .metrics
            .track(self.register_citizen(address, registration))
    }

    async fn get(&self, address: Address) -> LedgerResult<Citizen> {
        self.emulation
            .store
            .citizens
            .get(&address)
            .ok_or_else(|| LedgerError::not_found("citizen", address))
    }

    async fn is_registered(&self, address: Address) -> bool {
        self.emulation.store.citizens.contains(&address)
    }

    async fn verify(
        &self,
        address: Address,
        verifier: Option<Address>,
    ) -> LedgerResult<TransactionReceipt> {
        self.emulation
            .metrics
            .track(self.verify_citizen(address, verifier))
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// Document registry backed by the emulated store.
pub struct EmulatedDocumentRegistry {
    emulation: Emulation,
}

impl EmulatedDocumentRegistry {
    pub fn new(emulation: Emulation) -> Self {
        Self { emulation }
    }

    fn upload_document(
        &self,
        owner: Address,
        upload: DocumentUpload,
    ) -> LedgerResult<TransactionReceipt> {
        let id = {
            let mut documents = self.emulation.store.documents.write();
            let id = EmulatedStore::next_document_id(&documents);
            documents.insert(
                id,
                Document {
                    id,
                    owner,
                    content_hash: upload.content_hash,
                    doc_type: upload.doc_type,
                    status: DocumentStatus::Pending,
                    metadata: upload.metadata,
                    uploaded_at: unix_now(),
                    verified_at: None,
                    verifier: None,
                    rejection_reason: None,
                    expires_at: upload.expires_at,
                },
            );
            id
        };
        info!("[cl-gateway] Emulated document {} uploaded by {}", id, owner);

        let receipt = self.emulation.emit(OperationType::UploadDocument, Some(id));
        self.emulation.generator.announce(
            OperationType::UploadDocument,
            LedgerEvent::DocumentUploaded {
                document_id: id,
                owner,
                tx_hash: receipt.hash,
            },
        );
        Ok(receipt)
    }

    /// Finalize a pending document as Verified or Rejected.
    fn finalize(
        &self,
        id: u64,
        next: DocumentStatus,
        reason: Option<String>,
        verifier: Option<Address>,
    ) -> LedgerResult<(Address, TransactionReceipt)> {
        let verifier = verifier.unwrap_or_else(random_address);
        {
            let mut documents = self.emulation.store.documents.write();
            let document = documents
                .get_mut(&id)
                .ok_or_else(|| LedgerError::not_found("document", id))?;
            invariant_document_pending(document, next)?;
            document.status = next;
            document.verifier = Some(verifier);
            document.verified_at = Some(unix_now());
            document.rejection_reason = reason;
        }
        info!("[cl-gateway] Emulated document {} -> {}", id, next);

        let operation = match next {
            DocumentStatus::Rejected => OperationType::RejectDocument,
            _ => OperationType::VerifyDocument,
        };
        Ok((verifier, self.emulation.emit(operation, None)))
    }
}

#[async_trait]
impl DocumentRegistry for EmulatedDocumentRegistry {
    async fn upload(
        &self,
        owner: Address,
        upload: DocumentUpload,
    ) -> LedgerResult<TransactionReceipt> {
        self.emulation
            .metrics
            .track(self.upload_document(owner, upload))
    }

    async fn get(&self, id: u64) -> LedgerResult<Document> {
        self.emulation
            .store
            .documents
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("document", id))
    }

    async fn verify(&self, id: u64, verifier: Option<Address>) -> LedgerResult<TransactionReceipt> {
        let (verifier, receipt) = self.emulation.metrics.track(self.finalize(
            id,
            DocumentStatus::Verified,
            None,
            verifier,
        ))?;
        self.emulation.generator.announce(
            OperationType::VerifyDocument,
            LedgerEvent::DocumentVerified {
                document_id: id,
                verifier,
                tx_hash: receipt.hash,
            },
        );
        Ok(receipt)
    }

    async fn reject(
        &self,
        id: u64,
        reason: String,
        verifier: Option<Address>,
    ) -> LedgerResult<TransactionReceipt> {
        let (_, receipt) = self.emulation.metrics.track(self.finalize(
            id,
            DocumentStatus::Rejected,
            Some(reason.clone()),
            verifier,
        ))?;
        self.emulation.generator.announce(
            OperationType::RejectDocument,
            LedgerEvent::DocumentRejected {
                document_id: id,
                reason,
                tx_hash: receipt.hash,
            },
        );
        Ok(receipt)
    }

    async fn list_by_owner(&self, owner: Address) -> LedgerResult<Vec<u64>> {
        Ok(self.emulation.store.documents.keys_where(|d| d.owner == owner))
    }
}

// =============================================================================
// GRIEVANCES
// =============================================================================

/// Grievance registry backed by the emulated store.
pub struct EmulatedGrievanceRegistry {
    emulation: Emulation,
}

impl EmulatedGrievanceRegistry {
    pub fn new(emulation: Emulation) -> Self {
        Self { emulation }
    }

    fn submit_grievance(
        &self,
        citizen: Address,
        submission: GrievanceSubmission,
    ) -> LedgerResult<TransactionReceipt> {
        let title = submission.title.clone();
        let id = {
            let mut grievances = self.emulation.store.grievances.write();
            let id = EmulatedStore::next_grievance_id(&grievances);
            grievances.insert(
                id,
                Grievance {
                    id,
                    citizen,
                    title: submission.title,
                    description: submission.description,
                    category: submission.category,
                    priority: submission.priority,
                    status: GrievanceStatus::Pending,
                    submitted_at: unix_now(),
                    assigned_officer: None,
                    resolution: None,
                    resolved_at: None,
                    satisfaction_rating: None,
                    location: submission.location,
                    attachments: submission.attachments,
                },
            );
            id
        };
        info!("[cl-gateway] Emulated grievance {} submitted: {}", id, title);

        let receipt = self.emulation.emit(OperationType::SubmitGrievance, Some(id));
        self.emulation.generator.announce(
            OperationType::SubmitGrievance,
            LedgerEvent::GrievanceSubmitted {
                grievance_id: id,
                citizen,
                title,
                tx_hash: receipt.hash,
            },
        );
        Ok(receipt)
    }

    fn assign_officer(&self, id: u64, officer: Address) -> LedgerResult<TransactionReceipt> {
        {
            let mut grievances = self.emulation.store.grievances.write();
            let grievance = grievances
                .get_mut(&id)
                .ok_or_else(|| LedgerError::not_found("grievance", id))?;
            invariant_grievance_transition(grievance, GrievanceStatus::InProgress)?;
            grievance.assigned_officer = Some(officer);
            grievance.status = GrievanceStatus::InProgress;
        }
        info!("[cl-gateway] Emulated grievance {} assigned to {}", id, officer);

        Ok(self.emulation.emit(OperationType::AssignGrievance, None))
    }

    fn resolve_grievance(&self, id: u64, resolution: String) -> LedgerResult<TransactionReceipt> {
        {
            let mut grievances = self.emulation.store.grievances.write();
            let grievance = grievances
                .get_mut(&id)
                .ok_or_else(|| LedgerError::not_found("grievance", id))?;
            invariant_grievance_transition(grievance, GrievanceStatus::Resolved)?;
            grievance.status = GrievanceStatus::Resolved;
            grievance.resolution = Some(resolution.clone());
            grievance.resolved_at = Some(unix_now());
        }
        info!("[cl-gateway] Emulated grievance {} resolved", id);

        let receipt = self.emulation.emit(OperationType::ResolveGrievance, None);
        self.emulation.generator.announce(
            OperationType::ResolveGrievance,
            LedgerEvent::GrievanceResolved {
                grievance_id: id,
                resolution,
                tx_hash: receipt.hash,
            },
        );
        Ok(receipt)
    }
}

#[async_trait]
impl GrievanceRegistry for EmulatedGrievanceRegistry {
    async fn submit(
        &self,
        citizen: Address,
        submission: GrievanceSubmission,
    ) -> LedgerResult<TransactionReceipt> {
        self.emulation
            .metrics
            .track(self.submit_grievance(citizen, submission))
    }

    async fn get(&self, id: u64) -> LedgerResult<Grievance> {
        self.emulation
            .store
            .grievances
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("grievance", id))
    }

    async fn assign(&self, id: u64, officer: Address) -> LedgerResult<TransactionReceipt> {
        self.emulation.metrics.track(self.assign_officer(id, officer))
    }

    async fn resolve(&self, id: u64, resolution: String) -> LedgerResult<TransactionReceipt> {
        self.emulation
            .metrics
            .track(self.resolve_grievance(id, resolution))
    }

    async fn list_by_citizen(&self, citizen: Address) -> LedgerResult<Vec<u64>> {
        Ok(self
            .emulation
            .store
            .grievances
            .keys_where(|g| g.citizen == citizen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmulationConfig;
    use crate::domain::{DocType, GrievanceCategory, Priority};
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
    use std::sync::Arc;
    use std::time::Duration;

    const CITIZEN: Address = Address([0x11; 20]);

    fn emulation() -> (Emulation, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        (Emulation::new(bus.clone(), EmulationConfig::default()), bus)
    }

    fn registration() -> CitizenRegistration {
        CitizenRegistration {
            identity_hash: "0xabc123".into(),
            name: "Priya Sharma".into(),
            email: "priya@example.com".into(),
            phone: "+91-9876543210".into(),
        }
    }

    fn upload() -> DocumentUpload {
        DocumentUpload {
            content_hash: "QmDocHash".into(),
            doc_type: DocType::Pan,
            metadata: "{}".into(),
            expires_at: None,
        }
    }

    fn street_light() -> GrievanceSubmission {
        GrievanceSubmission {
            title: "Street Light Not Working".into(),
            description: "The light at MG Road junction is out".into(),
            category: GrievanceCategory::Infrastructure,
            priority: Priority::High,
            location: "MG Road".into(),
            attachments: vec!["QmPhoto1".into(), "QmPhoto2".into()],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_twice_fails() {
        let (emulation, _) = emulation();
        let citizens = EmulatedCitizenRegistry::new(emulation.clone());

        let receipt = citizens.register(CITIZEN, registration()).await.unwrap();
        assert_eq!(receipt.gas_used, 75_000);
        assert!(citizens.is_registered(CITIZEN).await);

        let err = citizens.register(CITIZEN, registration()).await.unwrap_err();
        assert_eq!(err, LedgerError::AlreadyRegistered(CITIZEN));
        assert_eq!(emulation.metrics.get_registry_failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_citizen_once() {
        let (emulation, _) = emulation();
        let citizens = EmulatedCitizenRegistry::new(emulation);
        citizens.register(CITIZEN, registration()).await.unwrap();

        citizens.verify(CITIZEN, None).await.unwrap();
        let citizen = citizens.get(CITIZEN).await.unwrap();
        assert!(citizen.verified);
        assert!(citizen.verifier.is_some());

        let err = citizens.verify(CITIZEN, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyVerified { entity: "citizen", .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_unknown_citizen() {
        let (emulation, _) = emulation();
        let citizens = EmulatedCitizenRegistry::new(emulation);
        let err = citizens.verify(CITIZEN, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "citizen", .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_upload_emits_event_after_delay() {
        let (emulation, bus) = emulation();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Documents]));
        let documents = EmulatedDocumentRegistry::new(emulation);

        let receipt = documents.upload(CITIZEN, upload()).await.unwrap();
        let id = receipt.entity_id.unwrap();
        assert!(id >= 1000);
        assert_eq!(receipt.gas_used, 85_000);
        assert_eq!(documents.get(id).await.unwrap().status, DocumentStatus::Pending);

        tokio::time::sleep(Duration::from_millis(899)).await;
        assert!(sub.drain().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        let events = sub.drain();
        assert_eq!(
            events,
            vec![LedgerEvent::DocumentUploaded {
                document_id: id,
                owner: CITIZEN,
                tx_hash: receipt.hash,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_finalized_once() {
        let (emulation, _) = emulation();
        let documents = EmulatedDocumentRegistry::new(emulation);
        let id = documents
            .upload(CITIZEN, upload())
            .await
            .unwrap()
            .entity_id
            .unwrap();

        documents.verify(id, Some(Address([0x22; 20]))).await.unwrap();
        let document = documents.get(id).await.unwrap();
        assert_eq!(document.status, DocumentStatus::Verified);
        assert_eq!(document.verifier, Some(Address([0x22; 20])));

        let again = documents.verify(id, None).await.unwrap_err();
        assert!(matches!(again, LedgerError::AlreadyVerified { .. }));
        let reject = documents.reject(id, "blurry".into(), None).await.unwrap_err();
        assert!(matches!(reject, LedgerError::AlreadyVerified { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_reject_sets_reason() {
        let (emulation, _) = emulation();
        let documents = EmulatedDocumentRegistry::new(emulation);
        let id = documents
            .upload(CITIZEN, upload())
            .await
            .unwrap()
            .entity_id
            .unwrap();

        let receipt = documents.reject(id, "expired".into(), None).await.unwrap();
        assert_eq!(receipt.operation, OperationType::RejectDocument);
        let document = documents.get(id).await.unwrap();
        assert_eq!(document.status, DocumentStatus::Rejected);
        assert_eq!(document.rejection_reason.as_deref(), Some("expired"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_by_owner_is_ascending() {
        let (emulation, _) = emulation();
        let documents = EmulatedDocumentRegistry::new(emulation);
        for _ in 0..3 {
            documents.upload(CITIZEN, upload()).await.unwrap();
        }
        documents.upload(Address([0x33; 20]), upload()).await.unwrap();

        assert_eq!(
            documents.list_by_owner(CITIZEN).await.unwrap(),
            vec![1000, 1001, 1002]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_grievance_lifecycle() {
        let (emulation, bus) = emulation();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Grievances]));
        let grievances = EmulatedGrievanceRegistry::new(emulation);

        let id = grievances
            .submit(CITIZEN, street_light())
            .await
            .unwrap()
            .entity_id
            .unwrap();
        assert!(id >= 2000);

        let early = grievances.resolve(id, "fixed".into()).await.unwrap_err();
        assert!(matches!(early, LedgerError::InvalidTransition { .. }));

        let officer = Address([0x44; 20]);
        let assigned = grievances.assign(id, officer).await.unwrap();
        assert_eq!(assigned.gas_used, 35_000);
        let grievance = grievances.get(id).await.unwrap();
        assert_eq!(grievance.status, GrievanceStatus::InProgress);
        assert_eq!(grievance.assigned_officer, Some(officer));

        grievances.resolve(id, "Bulb replaced".into()).await.unwrap();
        let grievance = grievances.get(id).await.unwrap();
        assert_eq!(grievance.status, GrievanceStatus::Resolved);
        assert!(grievance.resolved_at.is_some());
        assert_eq!(grievance.attachments, vec!["QmPhoto1", "QmPhoto2"]);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let names: Vec<_> = sub.drain().iter().map(LedgerEvent::name).collect();
        assert_eq!(names, vec!["grievanceResolved", "grievanceSubmitted"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_assign_resolved_grievance_rejected() {
        let (emulation, _) = emulation();
        let store = Arc::clone(&emulation.store);
        let grievances = EmulatedGrievanceRegistry::new(emulation);
        let officer = Address([0x44; 20]);

        let id = grievances
            .submit(CITIZEN, street_light())
            .await
            .unwrap()
            .entity_id
            .unwrap();
        grievances.assign(id, officer).await.unwrap();
        grievances.resolve(id, "Bulb replaced".into()).await.unwrap();
        let logged = store.transactions().len();

        let err = grievances
            .assign(id, Address([0x55; 20]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition { entity: "grievance", .. }
        ));

        let grievance = grievances.get(id).await.unwrap();
        assert_eq!(grievance.status, GrievanceStatus::Resolved);
        assert_eq!(grievance.assigned_officer, Some(officer));
        assert_eq!(store.transactions().len(), logged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_assign_unknown_grievance() {
        let (emulation, _) = emulation();
        let grievances = EmulatedGrievanceRegistry::new(emulation);
        let err = grievances.assign(2042, Address::ZERO).await.unwrap_err();
        assert_eq!(err.to_string(), "grievance not found: 2042");
    }
}
