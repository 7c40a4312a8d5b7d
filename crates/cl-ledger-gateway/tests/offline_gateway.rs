//! Gateway scenarios against the in-process emulation.

use cl_ledger_gateway::{
    CitizenRegistration, DocType, DocumentStatus, DocumentUpload, GatewayConfig,
    GrievanceCategory, GrievanceStatus, GrievanceSubmission, LedgerError, LedgerGateway,
    MockConnector, Priority,
};
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, LedgerEvent};
use shared_types::{Address, ConnectionState, OperationType, RegistryKind};
use std::sync::Arc;
use std::time::Duration;

const CITIZEN: Address = Address([0x11; 20]);

async fn offline_gateway() -> (LedgerGateway, Arc<MockConnector>) {
    let connector = Arc::new(MockConnector::unreachable());
    let gateway = LedgerGateway::new(
        GatewayConfig::for_testing(),
        connector.clone(),
        Arc::new(InMemoryEventBus::new()),
    );
    let state = gateway.initialize("localhost", None, true).await;
    assert_eq!(state, ConnectionState::Offline);
    (gateway, connector)
}

fn registration(name: &str) -> CitizenRegistration {
    CitizenRegistration {
        identity_hash: "QmIdentityHash".into(),
        name: name.into(),
        email: format!("{}@example.org", name.to_lowercase()),
        phone: "+91-9876543210".into(),
    }
}

fn aadhar_upload() -> DocumentUpload {
    DocumentUpload {
        content_hash: "QmDocumentHash".into(),
        doc_type: DocType::Aadhar,
        metadata: r#"{"fileName":"aadhar.pdf"}"#.into(),
        expires_at: None,
    }
}

#[tokio::test]
async fn test_forced_offline_never_touches_network() {
    let (gateway, connector) = offline_gateway().await;

    for kind in RegistryKind::ALL {
        assert!(matches!(
            gateway.contract(kind),
            Err(LedgerError::ContractUnavailable { .. })
        ));
    }
    gateway
        .citizens()
        .register(CITIZEN, registration("Asha"))
        .await
        .unwrap();

    assert_eq!(connector.connect_count(), 0);
    let status = gateway.status();
    assert!(status.offline);
    assert!(!status.has_rpc);
    assert!(!status.has_signer);
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let (gateway, _) = offline_gateway().await;
    let citizens = gateway.citizens();

    let receipt = citizens.register(CITIZEN, registration("Asha")).await.unwrap();
    assert_eq!(receipt.operation, OperationType::RegisterCitizen);
    assert_eq!(receipt.gas_used, 75_000);
    assert!(citizens.is_registered(CITIZEN).await);

    let err = citizens
        .register(CITIZEN, registration("Asha"))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::AlreadyRegistered(CITIZEN));
    assert!(err.is_recoverable());
    assert_eq!(gateway.status().registry_failures, 1);
}

#[tokio::test]
async fn test_document_verified_exactly_once() {
    let (gateway, _) = offline_gateway().await;
    let documents = gateway.documents();

    let id = documents
        .upload(CITIZEN, aadhar_upload())
        .await
        .unwrap()
        .entity_id
        .unwrap();
    documents.verify(id, None).await.unwrap();

    let document = documents.get(id).await.unwrap();
    assert_eq!(document.status, DocumentStatus::Verified);
    assert!(document.verifier.is_some());
    assert!(document.verified_at.is_some());

    assert!(matches!(
        documents.verify(id, None).await,
        Err(LedgerError::AlreadyVerified { .. })
    ));
    assert!(documents
        .reject(id, "blurred scan".into(), None)
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_document_upload_event_follows_delay() {
    let (gateway, _) = offline_gateway().await;
    let mut sub = gateway.subscribe(EventFilter::topics(vec![EventTopic::Documents]));

    let receipt = gateway
        .documents()
        .upload(CITIZEN, aadhar_upload())
        .await
        .unwrap();
    let id = receipt.entity_id.unwrap();
    assert!(id >= 1000);
    assert_eq!(receipt.gas_used, 85_000);
    assert!(receipt.synthetic);
    assert_eq!(
        gateway.documents().get(id).await.unwrap().status,
        DocumentStatus::Pending
    );

    tokio::time::sleep(Duration::from_millis(899)).await;
    assert!(sub.drain().is_empty());

    tokio::time::sleep(Duration::from_millis(2)).await;
    let events = sub.drain();
    assert_eq!(events.len(), 1);
    match &events[0] {
        LedgerEvent::DocumentUploaded {
            document_id,
            owner,
            tx_hash,
        } => {
            assert_eq!(*document_id, id);
            assert_eq!(*owner, CITIZEN);
            assert_eq!(*tx_hash, receipt.hash);
        }
        other => panic!("unexpected event {other:?}"),
    }

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(sub.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_operation_emits_transaction_event() {
    let (gateway, _) = offline_gateway().await;
    let mut sub = gateway.subscribe(EventFilter::topics(vec![EventTopic::Transactions]));

    let first = gateway
        .citizens()
        .register(CITIZEN, registration("Asha"))
        .await
        .unwrap();
    let second = gateway.citizens().verify(CITIZEN, None).await.unwrap();
    assert!(second.block_number > first.block_number);

    tokio::time::sleep(Duration::from_millis(1501)).await;
    let hashes: Vec<_> = sub
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            LedgerEvent::Transaction(receipt) => Some(receipt.hash),
            _ => None,
        })
        .collect();
    assert_eq!(hashes.len(), 2);
    assert!(hashes.contains(&first.hash));
    assert!(hashes.contains(&second.hash));
}

#[tokio::test(start_paused = true)]
async fn test_street_light_grievance_lifecycle() {
    let (gateway, _) = offline_gateway().await;
    let grievances = gateway.grievances();
    let officer = Address([0x99; 20]);

    let receipt = grievances
        .submit(
            CITIZEN,
            GrievanceSubmission {
                title: "Street Light Not Working".into(),
                description: "The street light on MG Road has been out for a week".into(),
                category: GrievanceCategory::Infrastructure,
                priority: Priority::Medium,
                location: "MG Road, Sector 5".into(),
                attachments: vec!["QmPhotoHash".into()],
            },
        )
        .await
        .unwrap();
    let id = receipt.entity_id.unwrap();
    assert!(id >= 2000);
    assert_eq!(receipt.gas_used, 110_000);
    assert_eq!(grievances.get(id).await.unwrap().status, GrievanceStatus::Pending);

    grievances.assign(id, officer).await.unwrap();
    let assigned = grievances.get(id).await.unwrap();
    assert_eq!(assigned.status, GrievanceStatus::InProgress);
    assert_eq!(assigned.assigned_officer, Some(officer));

    grievances
        .resolve(id, "Bulb replaced".into())
        .await
        .unwrap();
    let resolved = grievances.get(id).await.unwrap();
    assert_eq!(resolved.status, GrievanceStatus::Resolved);
    assert_eq!(resolved.resolution.as_deref(), Some("Bulb replaced"));
    assert!(resolved.resolved_at.is_some());

    assert_eq!(grievances.list_by_citizen(CITIZEN).await.unwrap(), vec![id]);
    assert!(grievances.resolve(id, "again".into()).await.is_err());
}

#[tokio::test]
async fn test_unknown_records_not_found() {
    let (gateway, _) = offline_gateway().await;

    assert!(!gateway.citizens().is_registered(CITIZEN).await);
    assert!(matches!(
        gateway.citizens().get(CITIZEN).await,
        Err(LedgerError::NotFound { .. })
    ));
    assert!(matches!(
        gateway.documents().get(1042).await,
        Err(LedgerError::NotFound { .. })
    ));
    assert!(gateway
        .documents()
        .list_by_owner(CITIZEN)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_snapshot_restores_on_fresh_gateway() {
    let (source, _) = offline_gateway().await;
    source
        .citizens()
        .register(CITIZEN, registration("Asha"))
        .await
        .unwrap();
    let first_doc = source
        .documents()
        .upload(CITIZEN, aadhar_upload())
        .await
        .unwrap()
        .entity_id
        .unwrap();
    let second_doc = source
        .documents()
        .upload(CITIZEN, aadhar_upload())
        .await
        .unwrap()
        .entity_id
        .unwrap();
    let grievance = source
        .grievances()
        .submit(
            CITIZEN,
            GrievanceSubmission {
                title: "Water Supply Issue".into(),
                description: "No water since Monday".into(),
                category: GrievanceCategory::PublicServices,
                priority: Priority::High,
                location: "Block C".into(),
                attachments: vec![],
            },
        )
        .await
        .unwrap()
        .entity_id
        .unwrap();

    let snapshot = source.export_state();
    let text = serde_json::to_string(&snapshot).unwrap();

    let (target, _) = offline_gateway().await;
    target.import_state(serde_json::from_str(&text).unwrap());

    assert_eq!(
        target.citizens().get(CITIZEN).await.unwrap(),
        source.citizens().get(CITIZEN).await.unwrap()
    );
    assert_eq!(
        target.documents().list_by_owner(CITIZEN).await.unwrap(),
        vec![first_doc, second_doc]
    );
    assert_eq!(
        target.grievances().list_by_citizen(CITIZEN).await.unwrap(),
        vec![grievance]
    );
    assert_eq!(
        target.documents().get(second_doc).await.unwrap(),
        source.documents().get(second_doc).await.unwrap()
    );
    assert_eq!(
        target.emulation_stats().unwrap().current_block,
        snapshot.block_number
    );
}
