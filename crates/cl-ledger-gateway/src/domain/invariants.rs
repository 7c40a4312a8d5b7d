//! # Domain Invariants
//!
//! Business rules enforced by the emulated registries. The live path gets the
//! same rules from the contracts themselves.

use super::entities::{Citizen, Document, Grievance};
use super::errors::LedgerError;
use super::value_objects::{DocumentStatus, GrievanceStatus};

/// First offline document id.
pub const DOCUMENT_ID_BASE: u64 = 1000;

/// First offline grievance id.
pub const GRIEVANCE_ID_BASE: u64 = 2000;

/// Invariant: next id is `base + size`, skipping ids already taken.
///
/// Seeded fixtures and imported records may occupy ids inside the range, so
/// the candidate advances until it is free.
pub fn allocate_id(base: u64, size: usize, taken: impl Fn(u64) -> bool) -> u64 {
    let mut candidate = base + size as u64;
    while taken(candidate) {
        candidate += 1;
    }
    candidate
}

/// Invariant: a citizen is verified exactly once.
pub fn invariant_citizen_unverified(citizen: &Citizen) -> Result<(), LedgerError> {
    if citizen.verified {
        return Err(LedgerError::already_verified("citizen", citizen.address));
    }
    Ok(())
}

/// Invariant: only a pending document can be verified or rejected.
pub fn invariant_document_pending(
    document: &Document,
    next: DocumentStatus,
) -> Result<(), LedgerError> {
    if !document.status.can_transition_to(next) {
        return Err(LedgerError::already_verified("document", document.id));
    }
    Ok(())
}

/// Invariant: grievance status moves along the lifecycle graph.
pub fn invariant_grievance_transition(
    grievance: &Grievance,
    next: GrievanceStatus,
) -> Result<(), LedgerError> {
    if !grievance.status.can_transition_to(next) {
        return Err(LedgerError::InvalidTransition {
            entity: "grievance",
            from: grievance.status.to_string(),
            to: next.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{GrievanceCategory, Priority};
    use shared_types::Address;

    fn grievance(status: GrievanceStatus) -> Grievance {
        Grievance {
            id: 2000,
            citizen: Address::ZERO,
            title: "t".into(),
            description: "d".into(),
            category: GrievanceCategory::Infrastructure,
            priority: Priority::Medium,
            status,
            submitted_at: 0,
            assigned_officer: None,
            resolution: None,
            resolved_at: None,
            satisfaction_rating: None,
            location: String::new(),
            attachments: vec![],
        }
    }

    #[test]
    fn test_allocate_id_skips_taken() {
        let taken = [1001u64, 1002];
        let id = allocate_id(DOCUMENT_ID_BASE, 1, |id| taken.contains(&id));
        assert_eq!(id, 1003);
        assert_eq!(allocate_id(GRIEVANCE_ID_BASE, 0, |_| false), 2000);
    }

    #[test]
    fn test_resolve_requires_assignment() {
        let err = invariant_grievance_transition(
            &grievance(GrievanceStatus::Pending),
            GrievanceStatus::Resolved,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid grievance transition: PENDING -> RESOLVED");
    }

    #[test]
    fn test_reassign_allowed() {
        assert!(invariant_grievance_transition(
            &grievance(GrievanceStatus::InProgress),
            GrievanceStatus::InProgress
        )
        .is_ok());
    }
}
