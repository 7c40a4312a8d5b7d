//! # Domain Errors
//!
//! Error taxonomy for the ledger gateway.
//!
//! Connection-level variants (`ConnectionUnavailable`, `ChainIdentityMismatch`,
//! `UnknownNetwork`, `Timeout` during a trial) are absorbed by the connection
//! manager and turned into an Offline transition. Everything else reaches the
//! registry caller unchanged.

use shared_types::{Address, ParseError, RegistryKind};
use thiserror::Error;

/// Ledger gateway error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Network unreachable after all connection trials.
    #[error("Ledger network unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Connected node reports an unexpected chain id.
    #[error("Chain identity mismatch: expected {expected}, got {actual}")]
    ChainIdentityMismatch {
        /// Chain id configured for the profile
        expected: u64,
        /// Chain id reported by the node
        actual: u64,
    },

    /// No network profile with this name.
    #[error("Unknown network profile: {0}")]
    UnknownNetwork(String),

    /// Entity key absent.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind (`citizen`, `document`, `grievance`)
        entity: &'static str,
        /// Lookup key as text
        key: String,
    },

    /// Citizen address already present.
    #[error("Citizen already registered: {0}")]
    AlreadyRegistered(Address),

    /// Verification already finalized.
    #[error("{entity} already verified: {key}")]
    AlreadyVerified {
        /// Entity kind
        entity: &'static str,
        /// Lookup key as text
        key: String,
    },

    /// Illegal status transition.
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        /// Entity kind
        entity: &'static str,
        /// Current status
        from: String,
        /// Attempted status
        to: String,
    },

    /// No live binding for the registry.
    #[error("Contract unavailable for {registry}: {reason}")]
    ContractUnavailable {
        /// Registry without a binding
        registry: RegistryKind,
        /// Why (offline, deployment failed, ...)
        reason: String,
    },

    /// A live call reverted.
    #[error("Operation reverted: {0}")]
    RevertedOperation(String),

    /// A live operation needs a sender and none is available.
    #[error("No signing identity available for {0}")]
    SignerUnavailable(String),

    /// Malformed account address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Build artifact missing fields or unparseable.
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// ABI encoding or decoding failed.
    #[error("ABI error: {0}")]
    Abi(String),

    /// JSON-RPC transport or node error.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Operation exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Emulation snapshot could not be read or written.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl LedgerError {
    /// Shorthand for `NotFound`.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Shorthand for `AlreadyVerified`.
    pub fn already_verified(entity: &'static str, key: impl ToString) -> Self {
        Self::AlreadyVerified {
            entity,
            key: key.to_string(),
        }
    }

    /// Expected outcomes a caller should handle, not report.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::AlreadyRegistered(_)
                | Self::AlreadyVerified { .. }
                | Self::InvalidTransition { .. }
        )
    }

    /// Deployment or configuration gap rather than a per-request error.
    #[must_use]
    pub fn is_service_degraded(&self) -> bool {
        matches!(
            self,
            Self::ContractUnavailable { .. } | Self::SignerUnavailable(_)
        )
    }
}

impl From<ParseError> for LedgerError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnknownVariant { .. } => Self::Abi(err.to_string()),
            ParseError::InvalidLength { .. } | ParseError::InvalidHex { .. } => {
                Self::InvalidAddress(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

/// Result alias used across the crate.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = LedgerError::not_found("document", 1042);
        assert_eq!(err.to_string(), "document not found: 1042");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_contract_unavailable_is_degraded() {
        let err = LedgerError::ContractUnavailable {
            registry: RegistryKind::Citizen,
            reason: "offline".into(),
        };
        assert!(err.is_service_degraded());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("CitizenRegistry"));
    }

    #[test]
    fn test_chain_mismatch_message() {
        let err = LedgerError::ChainIdentityMismatch {
            expected: 1337,
            actual: 1,
        };
        assert!(err.to_string().contains("expected 1337, got 1"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: LedgerError = Address::parse("0x12").unwrap_err().into();
        assert!(matches!(err, LedgerError::InvalidAddress(_)));
    }
}
