//! Sample records for a fresh emulated store.
//!
//! Two citizens (one verified), documents 1001/1002 and grievances 2001/2002,
//! using the well-known Hardhat development accounts.

use super::EmulatedStore;
use crate::domain::{
    Citizen, DocType, Document, DocumentStatus, Grievance, GrievanceCategory, GrievanceStatus,
    Priority,
};
use shared_types::{Address, ParseError};

const JOHN: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const JANE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
const VERIFIER: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
const OFFICER: &str = "0x90F79bf6EB2c4f870365E785982E1f101E93b906";

// 2024-01-15 .. 2024-03-05, midnight UTC
const JAN_15: u64 = 1_705_276_800;
const JAN_16: u64 = 1_705_363_200;
const JAN_17: u64 = 1_705_449_600;
const FEB_20: u64 = 1_708_387_200;
const FEB_21: u64 = 1_708_473_600;
const MAR_01: u64 = 1_709_251_200;
const MAR_05: u64 = 1_709_596_800;

/// Insert the sample records. Existing keys are overwritten.
pub fn seed(store: &EmulatedStore) -> Result<(), ParseError> {
    let john = Address::parse(JOHN)?;
    let jane = Address::parse(JANE)?;

    store.citizens.insert(
        john,
        Citizen {
            address: john,
            identity_hash: "hash_123456789".into(),
            name: "John Doe".into(),
            email: "john@example.com".into(),
            phone: "+91-9876543210".into(),
            verified: true,
            registered_at: JAN_15,
            verifier: None,
            verified_at: None,
        },
    );
    store.citizens.insert(
        jane,
        Citizen {
            address: jane,
            identity_hash: "hash_987654321".into(),
            name: "Jane Smith".into(),
            email: "jane@example.com".into(),
            phone: "+91-9876543211".into(),
            verified: false,
            registered_at: FEB_20,
            verifier: None,
            verified_at: None,
        },
    );

    store.documents.insert(
        1001,
        Document {
            id: 1001,
            owner: john,
            content_hash: "doc_hash_aadhar_001".into(),
            doc_type: DocType::Aadhar,
            status: DocumentStatus::Verified,
            metadata: "Aadhar Card - John Doe".into(),
            uploaded_at: JAN_16,
            verified_at: Some(JAN_17),
            verifier: Some(Address::parse(VERIFIER)?),
            rejection_reason: None,
            expires_at: None,
        },
    );
    store.documents.insert(
        1002,
        Document {
            id: 1002,
            owner: jane,
            content_hash: "doc_hash_pan_001".into(),
            doc_type: DocType::Pan,
            status: DocumentStatus::Pending,
            metadata: "PAN Card - Jane Smith".into(),
            uploaded_at: FEB_21,
            verified_at: None,
            verifier: None,
            rejection_reason: None,
            expires_at: None,
        },
    );

    store.grievances.insert(
        2001,
        Grievance {
            id: 2001,
            citizen: john,
            title: "Street Light Not Working".into(),
            description: "The street light outside my house has been non-functional for 2 weeks"
                .into(),
            category: GrievanceCategory::Infrastructure,
            priority: Priority::Medium,
            status: GrievanceStatus::InProgress,
            submitted_at: MAR_01,
            assigned_officer: Some(Address::parse(OFFICER)?),
            resolution: None,
            resolved_at: None,
            satisfaction_rating: None,
            location: "MG Road, Block A".into(),
            attachments: Vec::new(),
        },
    );
    store.grievances.insert(
        2002,
        Grievance {
            id: 2002,
            citizen: jane,
            title: "Water Supply Issue".into(),
            description: "Irregular water supply in our area for past month".into(),
            category: GrievanceCategory::PublicServices,
            priority: Priority::High,
            status: GrievanceStatus::Pending,
            submitted_at: MAR_05,
            assigned_officer: None,
            resolution: None,
            resolved_at: None,
            satisfaction_rating: None,
            location: "Sector 15, Apartment Complex".into(),
            attachments: Vec::new(),
        },
    );

    Ok(())
}
