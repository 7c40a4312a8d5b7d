//! # Audit Log Handler
//!
//! Subscribes to every ledger event, writes one audit line per event and
//! mirrors it into the Prometheus counters.

use civic_telemetry::{record_mode, record_transaction, LEDGER_EVENTS};
use shared_bus::{LedgerEvent, Subscription};
use tracing::{info, warn};

/// Handler for the audit trail.
pub struct AuditLogHandler {
    subscription: Subscription,
}

impl AuditLogHandler {
    pub fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Run until the bus closes.
    pub async fn run(mut self) {
        info!("[audit] Audit log handler started");
        while let Some(event) = self.subscription.recv().await {
            observe(&event);
        }
        warn!("[audit] Event bus closed; audit log handler stopped");
    }
}

/// Log one event and update metrics.
pub fn observe(event: &LedgerEvent) {
    LEDGER_EVENTS.with_label_values(&[event.name()]).inc();

    match event {
        LedgerEvent::Connected { network, chain_id } => {
            record_mode(true);
            info!("[audit] connected network={} chain_id={}", network, chain_id);
        }
        LedgerEvent::Offline { reason } => {
            record_mode(false);
            info!("[audit] offline reason={}", reason);
        }
        LedgerEvent::Transaction(receipt) => {
            record_transaction(receipt.operation.as_str(), receipt.synthetic, receipt.gas_used);
            info!(
                "[audit] transaction op={} hash={} block={} gas={} synthetic={}",
                receipt.operation,
                receipt.hash,
                receipt.block_number,
                receipt.gas_used,
                receipt.synthetic
            );
        }
        LedgerEvent::CitizenRegistered { address, tx_hash, .. } => {
            info!("[audit] citizenRegistered address={} tx={}", address, tx_hash);
        }
        LedgerEvent::CitizenVerified {
            address,
            verifier,
            tx_hash,
        } => {
            info!(
                "[audit] citizenVerified address={} verifier={} tx={}",
                address, verifier, tx_hash
            );
        }
        LedgerEvent::DocumentUploaded {
            document_id,
            owner,
            tx_hash,
        } => {
            info!(
                "[audit] documentUploaded id={} owner={} tx={}",
                document_id, owner, tx_hash
            );
        }
        LedgerEvent::DocumentVerified {
            document_id,
            verifier,
            tx_hash,
        } => {
            info!(
                "[audit] documentVerified id={} verifier={} tx={}",
                document_id, verifier, tx_hash
            );
        }
        LedgerEvent::DocumentRejected {
            document_id,
            reason,
            tx_hash,
        } => {
            info!(
                "[audit] documentRejected id={} reason={:?} tx={}",
                document_id, reason, tx_hash
            );
        }
        LedgerEvent::GrievanceSubmitted {
            grievance_id,
            citizen,
            tx_hash,
            ..
        } => {
            info!(
                "[audit] grievanceSubmitted id={} citizen={} tx={}",
                grievance_id, citizen, tx_hash
            );
        }
        LedgerEvent::GrievanceResolved {
            grievance_id,
            tx_hash,
            ..
        } => {
            info!("[audit] grievanceResolved id={} tx={}", grievance_id, tx_hash);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_telemetry::{MODE_CHANGES, TRANSACTIONS};
    use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus};
    use shared_types::{OperationType, TransactionReceipt, TxHash};
    use std::sync::Arc;
    use std::time::Duration;

    fn receipt() -> TransactionReceipt {
        TransactionReceipt {
            hash: TxHash([1; 32]),
            block_number: 1_000_001,
            block_hash: TxHash([2; 32]),
            gas_used: 60_000,
            gas_price: 20_000_000_000,
            timestamp: 1_705_276_800,
            operation: OperationType::ResolveGrievance,
            entity_id: None,
            contract_address: None,
            synthetic: true,
        }
    }

    #[test]
    fn test_observe_counts_transactions() {
        observe(&LedgerEvent::Transaction(receipt()));
        let count = TRANSACTIONS
            .with_label_values(&[OperationType::ResolveGrievance.as_str(), "emulated"])
            .get();
        assert!(count >= 1.0);
    }

    #[test]
    fn test_observe_tracks_mode() {
        observe(&LedgerEvent::Connected {
            network: "localhost".into(),
            chain_id: 1337,
        });
        assert!(MODE_CHANGES.with_label_values(&["online"]).get() >= 1.0);
        assert!(LEDGER_EVENTS.with_label_values(&["connected"]).get() >= 1.0);
    }

    #[tokio::test]
    async fn test_handler_stops_when_bus_closes() {
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = AuditLogHandler::new(bus.subscribe(EventFilter::all()));
        let task = tokio::spawn(handler.run());

        bus.publish(LedgerEvent::Offline {
            reason: "test".into(),
        })
        .await;
        drop(bus);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
