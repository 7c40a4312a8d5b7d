//! # Domain Value Objects
//!
//! Enumerations shared by the emulated and live registries. Discriminants
//! match the `uint8` values the registry contracts store on chain.

use serde::{Deserialize, Serialize};
use shared_types::ParseError;
use std::fmt;

/// Implements `code()`, `from_code()` and `Display` for an on-chain enum.
macro_rules! chain_enum {
    ($name:ident, $kind:literal, { $($variant:ident = $code:literal => $label:literal),+ $(,)? }) => {
        impl $name {
            /// On-chain discriminant.
            #[must_use]
            pub fn code(&self) -> u8 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// Decode an on-chain discriminant.
            pub fn from_code(value: u64) -> Result<Self, ParseError> {
                match value {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(ParseError::UnknownVariant { kind: $kind, value }),
                }
            }

            /// Uppercase label used by the portal.
            #[must_use]
            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// Kind of identity document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocType {
    Aadhar,
    Pan,
    Passport,
    DrivingLicense,
    VoterId,
    BirthCertificate,
    IncomeCertificate,
    Other,
}

chain_enum!(DocType, "document type", {
    Aadhar = 0 => "AADHAR",
    Pan = 1 => "PAN",
    Passport = 2 => "PASSPORT",
    DrivingLicense = 3 => "DRIVING_LICENSE",
    VoterId = 4 => "VOTER_ID",
    BirthCertificate = 5 => "BIRTH_CERTIFICATE",
    IncomeCertificate = 6 => "INCOME_CERTIFICATE",
    Other = 7 => "OTHER",
});

/// Document verification status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

chain_enum!(DocumentStatus, "document status", {
    Pending = 0 => "PENDING",
    Verified = 1 => "VERIFIED",
    Rejected = 2 => "REJECTED",
});

impl DocumentStatus {
    /// Only a pending document can be finalized.
    #[must_use]
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Verified) | (Self::Pending, Self::Rejected)
        )
    }

    /// Verified or rejected.
    #[must_use]
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

// =============================================================================
// GRIEVANCES
// =============================================================================

/// Grievance category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrievanceCategory {
    Infrastructure,
    PublicServices,
    Corruption,
    Healthcare,
    Education,
    Environment,
    Other,
}

chain_enum!(GrievanceCategory, "grievance category", {
    Infrastructure = 0 => "INFRASTRUCTURE",
    PublicServices = 1 => "PUBLIC_SERVICES",
    Corruption = 2 => "CORRUPTION",
    Healthcare = 3 => "HEALTHCARE",
    Education = 4 => "EDUCATION",
    Environment = 5 => "ENVIRONMENT",
    Other = 6 => "OTHER",
});

/// Grievance priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

chain_enum!(Priority, "priority", {
    Low = 0 => "LOW",
    Medium = 1 => "MEDIUM",
    High = 2 => "HIGH",
    Urgent = 3 => "URGENT",
});

/// Grievance lifecycle.
///
/// ```text
/// Pending ──assign──► InProgress ──resolve──► Resolved ──► Closed
///                      │    ▲
///                      └────┘ reassign
/// ```
///
/// `Closed` is set by an external disposition only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrievanceStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Closed,
}

chain_enum!(GrievanceStatus, "grievance status", {
    Pending = 0 => "PENDING",
    InProgress = 1 => "IN_PROGRESS",
    Resolved = 2 => "RESOLVED",
    Closed = 3 => "CLOSED",
});

impl GrievanceStatus {
    /// Check if transition is valid.
    #[must_use]
    pub fn can_transition_to(&self, next: GrievanceStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::InProgress)
                | (Self::InProgress, Self::Resolved)
                | (Self::Resolved, Self::Closed)
        )
    }

    /// Check if terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_codes() {
        assert_eq!(DocType::Aadhar.code(), 0);
        assert_eq!(DocType::Other.code(), 7);
        assert_eq!(DocType::from_code(1).unwrap(), DocType::Pan);
        assert!(DocType::from_code(8).is_err());
    }

    #[test]
    fn test_document_status_transitions() {
        assert!(DocumentStatus::Pending.can_transition_to(DocumentStatus::Verified));
        assert!(DocumentStatus::Pending.can_transition_to(DocumentStatus::Rejected));
        assert!(!DocumentStatus::Verified.can_transition_to(DocumentStatus::Rejected));
        assert!(!DocumentStatus::Rejected.can_transition_to(DocumentStatus::Pending));
    }

    #[test]
    fn test_grievance_status_transitions() {
        use GrievanceStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(!Pending.can_transition_to(Resolved));
        assert!(!Resolved.can_transition_to(InProgress));
        assert!(Resolved.is_terminal());
    }

    #[test]
    fn test_labels_match_serde() {
        let json = serde_json::to_string(&GrievanceCategory::PublicServices).unwrap();
        assert_eq!(json, format!("\"{}\"", GrievanceCategory::PublicServices.label()));
        let json = serde_json::to_string(&GrievanceStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }
}
