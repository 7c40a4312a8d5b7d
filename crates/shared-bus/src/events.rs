//! # Ledger Events
//!
//! Defines all event types that flow through the shared bus. The same events
//! are published whether the gateway runs against a live network or the
//! in-process emulation.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Address, TransactionReceipt, TxHash};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LedgerEvent {
    // =========================================================================
    // CONNECTION
    // =========================================================================
    /// The gateway reached a live network and provisioned its registries.
    Connected {
        /// Profile name (`localhost`, `polygon`, ...).
        network: String,
        /// Chain id reported by the node.
        chain_id: u64,
    },

    /// The gateway fell back to emulation.
    Offline {
        /// Why the live path is unavailable.
        reason: String,
    },

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================
    /// A receipt reached its settled state.
    ///
    /// In emulation this fires 500-1500 ms after the operation returned.
    Transaction(TransactionReceipt),

    // =========================================================================
    // CITIZENS
    // =========================================================================
    /// A citizen record was created.
    CitizenRegistered {
        address: Address,
        name: String,
        tx_hash: TxHash,
    },

    /// A citizen was verified.
    CitizenVerified {
        address: Address,
        verifier: Address,
        tx_hash: TxHash,
    },

    // =========================================================================
    // DOCUMENTS
    // =========================================================================
    /// A document was uploaded.
    DocumentUploaded {
        document_id: u64,
        owner: Address,
        tx_hash: TxHash,
    },

    /// A pending document was verified.
    DocumentVerified {
        document_id: u64,
        verifier: Address,
        tx_hash: TxHash,
    },

    /// A pending document was rejected.
    DocumentRejected {
        document_id: u64,
        reason: String,
        tx_hash: TxHash,
    },

    // =========================================================================
    // GRIEVANCES
    // =========================================================================
    /// A grievance was filed.
    GrievanceSubmitted {
        grievance_id: u64,
        citizen: Address,
        title: String,
        tx_hash: TxHash,
    },

    /// An assigned grievance was resolved.
    GrievanceResolved {
        grievance_id: u64,
        resolution: String,
        tx_hash: TxHash,
    },
}

impl LedgerEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Connected { .. } | Self::Offline { .. } => EventTopic::Connection,
            Self::Transaction(_) => EventTopic::Transactions,
            Self::CitizenRegistered { .. } | Self::CitizenVerified { .. } => EventTopic::Citizens,
            Self::DocumentUploaded { .. }
            | Self::DocumentVerified { .. }
            | Self::DocumentRejected { .. } => EventTopic::Documents,
            Self::GrievanceSubmitted { .. } | Self::GrievanceResolved { .. } => {
                EventTopic::Grievances
            }
        }
    }

    /// Event name as exposed to downstream collaborators.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Offline { .. } => "offline",
            Self::Transaction(_) => "transaction",
            Self::CitizenRegistered { .. } => "citizenRegistered",
            Self::CitizenVerified { .. } => "citizenVerified",
            Self::DocumentUploaded { .. } => "documentUploaded",
            Self::DocumentVerified { .. } => "documentVerified",
            Self::DocumentRejected { .. } => "documentRejected",
            Self::GrievanceSubmitted { .. } => "grievanceSubmitted",
            Self::GrievanceResolved { .. } => "grievanceResolved",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Mode changes (`connected`, `offline`).
    Connection,
    /// Settled receipts.
    Transactions,
    /// Citizen registry events.
    Citizens,
    /// Document registry events.
    Documents,
    /// Grievance registry events.
    Grievances,
    /// All events (no filtering).
    All,
}

impl EventTopic {
    /// Stable label for metrics and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Transactions => "transactions",
            Self::Citizens => "citizens",
            Self::Documents => "documents",
            Self::Grievances => "grievances",
            Self::All => "all",
        }
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Only pass synthetic (emulated) receipts and their domain events.
    /// `None` passes both.
    pub synthetic: Option<bool>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            synthetic: None,
        }
    }

    /// Restrict transaction events to synthetic or live receipts.
    #[must_use]
    pub fn with_synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = Some(synthetic);
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let origin_match = match (self.synthetic, event) {
            (Some(wanted), LedgerEvent::Transaction(receipt)) => receipt.synthetic == wanted,
            _ => true,
        };

        topic_match && origin_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::OperationType;

    fn receipt(synthetic: bool) -> TransactionReceipt {
        TransactionReceipt {
            hash: TxHash([1; 32]),
            block_number: 1_000_001,
            block_hash: TxHash([2; 32]),
            gas_used: 75_000,
            gas_price: 20_000_000_000,
            timestamp: 0,
            operation: OperationType::RegisterCitizen,
            entity_id: None,
            contract_address: None,
            synthetic,
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        let event = LedgerEvent::DocumentUploaded {
            document_id: 1000,
            owner: Address::ZERO,
            tx_hash: TxHash::default(),
        };
        assert_eq!(event.topic(), EventTopic::Documents);
        assert_eq!(event.name(), "documentUploaded");
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        let event = LedgerEvent::Offline {
            reason: "forced offline".into(),
        };
        assert!(filter.matches(&event));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Grievances]);

        let resolved = LedgerEvent::GrievanceResolved {
            grievance_id: 2000,
            resolution: "Fixed".into(),
            tx_hash: TxHash::default(),
        };
        assert!(filter.matches(&resolved));

        let tx = LedgerEvent::Transaction(receipt(true));
        assert!(!filter.matches(&tx));
    }

    #[test]
    fn test_filter_by_origin() {
        let filter = EventFilter::topics(vec![EventTopic::Transactions]).with_synthetic(false);
        assert!(!filter.matches(&LedgerEvent::Transaction(receipt(true))));
        assert!(filter.matches(&LedgerEvent::Transaction(receipt(false))));
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = LedgerEvent::Connected {
            network: "localhost".into(),
            chain_id: 1337,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["chain_id"], 1337);
    }
}
