//! Gateway scenarios against a scripted JSON-RPC node.

use cl_ledger_gateway::abi::{encode, Artifact, Token};
use cl_ledger_gateway::{
    CitizenRegistration, DocType, DocumentUpload, GatewayConfig, GrievanceCategory, GrievanceSubmission, LedgerError,
    LedgerGateway, MockConnector, MockLedgerRpc, Priority, RpcLog,
};
use primitive_types::U256;
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, LedgerEvent};
use shared_types::{Address, ConnectionState, OperationType, RegistryKind};
use std::path::Path;
use std::sync::Arc;

const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const CITIZEN: Address = Address([0x11; 20]);

const CITIZEN_REGISTRY: &str = r#"{
    "contractName": "CitizenRegistry",
    "abi": [
        {"type": "function", "name": "registerCitizen", "stateMutability": "nonpayable",
         "inputs": [{"name": "_aadharHash", "type": "string"}, {"name": "_name", "type": "string"},
                    {"name": "_email", "type": "string"}, {"name": "_phone", "type": "string"}],
         "outputs": []},
        {"type": "function", "name": "isCitizenRegistered", "stateMutability": "view",
         "inputs": [{"name": "_citizen", "type": "address"}],
         "outputs": [{"name": "", "type": "bool"}]},
        {"type": "function", "name": "verifyCitizen", "stateMutability": "nonpayable",
         "inputs": [{"name": "_citizen", "type": "address"}], "outputs": []},
        {"type": "function", "name": "getCitizen", "stateMutability": "view",
         "inputs": [{"name": "_citizen", "type": "address"}],
         "outputs": [{"name": "", "type": "tuple", "internalType": "struct CitizenRegistry.Citizen",
                      "components": [
                        {"name": "aadharHash", "type": "string"},
                        {"name": "name", "type": "string"},
                        {"name": "email", "type": "string"},
                        {"name": "phone", "type": "string"},
                        {"name": "isVerified", "type": "bool"},
                        {"name": "registrationDate", "type": "uint256"},
                        {"name": "walletAddress", "type": "address"}]}]}
    ],
    "bytecode": "0x608060405234801561001057600080fd5b50"
}"#;

const GRIEVANCE_SYSTEM: &str = r#"{
    "contractName": "GrievanceSystem",
    "abi": [
        {"type": "function", "name": "submitGrievance", "stateMutability": "nonpayable",
         "inputs": [{"name": "_title", "type": "string"}, {"name": "_description", "type": "string"},
                    {"name": "_category", "type": "uint8"}, {"name": "_priority", "type": "uint8"},
                    {"name": "_location", "type": "string"}, {"name": "_attachments", "type": "string[]"}],
         "outputs": [{"name": "", "type": "uint256"}]},
        {"type": "function", "name": "getCitizenGrievances", "stateMutability": "view",
         "inputs": [{"name": "_citizen", "type": "address"}],
         "outputs": [{"name": "", "type": "uint256[]"}]},
        {"type": "function", "name": "assignGrievance", "stateMutability": "nonpayable",
         "inputs": [{"name": "_grievanceId", "type": "uint256"}, {"name": "_officer", "type": "address"}],
         "outputs": []},
        {"type": "event", "name": "GrievanceSubmitted", "anonymous": false,
         "inputs": [{"name": "grievanceId", "type": "uint256", "indexed": true},
                    {"name": "citizen", "type": "address", "indexed": true},
                    {"name": "category", "type": "uint8", "indexed": false}]}
    ],
    "bytecode": "0x608060405234801561001057600080fd5b51"
}"#;

const DOCUMENT_REGISTRY: &str = r#"{
    "contractName": "DocumentRegistry",
    "abi": [
        {"type": "function", "name": "uploadDocument", "stateMutability": "nonpayable",
         "inputs": [{"name": "_ipfsHash", "type": "string"}, {"name": "_docType", "type": "uint8"},
                    {"name": "_metadata", "type": "string"}, {"name": "_expiryDate", "type": "uint256"}],
         "outputs": [{"name": "", "type": "uint256"}]}
    ],
    "bytecode": "0x608060405234801561001057600080fd5b52"
}"#;

fn write_artifact(root: &Path, kind: RegistryKind, json: &str) {
    let name = kind.contract_name();
    let dir = root.join(format!("{name}.sol"));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{name}.json")), json).unwrap();
}

fn word(bytes: &[u8]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(bytes);
    word
}

struct Harness {
    gateway: LedgerGateway,
    rpc: Arc<MockLedgerRpc>,
    bus: Arc<InMemoryEventBus>,
    _artifacts: tempfile::TempDir,
}

/// Citizen and grievance artifacts, no document artifact.
fn harness() -> Harness {
    let artifacts = tempfile::tempdir().unwrap();
    write_artifact(artifacts.path(), RegistryKind::Citizen, CITIZEN_REGISTRY);
    write_artifact(artifacts.path(), RegistryKind::Grievance, GRIEVANCE_SYSTEM);

    let mut config = GatewayConfig::for_testing();
    config.artifacts_dir = artifacts.path().to_path_buf();

    let rpc = Arc::new(MockLedgerRpc::new(1337));
    let bus = Arc::new(InMemoryEventBus::new());
    let gateway = LedgerGateway::new(
        config,
        Arc::new(MockConnector::with_rpc(rpc.clone())),
        bus.clone(),
    );
    Harness {
        gateway,
        rpc,
        bus,
        _artifacts: artifacts,
    }
}

#[tokio::test]
async fn test_online_deploys_missing_registries() {
    let h = harness();
    let mut sub = h.bus.subscribe(EventFilter::all());

    let state = h.gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;
    assert_eq!(state, ConnectionState::Online);

    let status = h.gateway.status();
    assert!(status.online);
    assert!(status.has_signer);
    assert_eq!(status.chain_id, Some(1337));
    assert_eq!(
        status.bound_contracts,
        vec![RegistryKind::Citizen, RegistryKind::Grievance]
    );
    assert!(h.gateway.emulation_stats().is_none());

    let deployments: Vec<_> = sub
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            LedgerEvent::Transaction(receipt) => Some(receipt),
            _ => None,
        })
        .collect();
    assert_eq!(deployments.len(), 2);
    assert!(deployments
        .iter()
        .all(|r| r.operation == OperationType::Deployment && !r.synthetic));
    assert!(h.rpc.sent_transactions().iter().all(|tx| tx.to.is_none()));
}

#[tokio::test]
async fn test_missing_definition_degrades_one_registry() {
    let h = harness();
    h.gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;

    let err = h
        .gateway
        .documents()
        .list_by_owner(CITIZEN)
        .await
        .unwrap_err();
    assert!(err.is_service_degraded());
    assert!(matches!(
        err,
        LedgerError::ContractUnavailable { registry: RegistryKind::Document, ref reason }
            if reason == "no contract definition"
    ));
    assert!(h.gateway.contract(RegistryKind::Citizen).is_ok());
}

#[tokio::test]
async fn test_live_registration_publishes_events() {
    let h = harness();
    h.gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;
    let citizen_contract = h.gateway.contract(RegistryKind::Citizen).unwrap().address();
    let mut sub = h.bus.subscribe(EventFilter::topics(vec![
        EventTopic::Transactions,
        EventTopic::Citizens,
    ]));

    let receipt = h
        .gateway
        .citizens()
        .register(
            CITIZEN,
            CitizenRegistration {
                identity_hash: "QmIdentityHash".into(),
                name: "Asha".into(),
                email: "asha@example.org".into(),
                phone: "+91-9876543210".into(),
            },
        )
        .await
        .unwrap();
    assert!(!receipt.synthetic);
    assert_eq!(receipt.operation, OperationType::RegisterCitizen);

    let sent = h.rpc.sent_transactions();
    let last = sent.last().unwrap();
    assert_eq!(last.from, Some(CITIZEN));
    assert_eq!(last.to, Some(citizen_contract));

    let events = sub.drain();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], LedgerEvent::Transaction(receipt.clone()));
    assert!(matches!(
        &events[1],
        LedgerEvent::CitizenRegistered { address, name, tx_hash }
            if *address == CITIZEN && name == "Asha" && *tx_hash == receipt.hash
    ));
}

#[tokio::test]
async fn test_live_reads_decode_contract_structs() {
    let h = harness();
    h.gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;
    let artifact = Artifact::from_json(CITIZEN_REGISTRY).unwrap();

    h.rpc.set_call_result(
        artifact.function("isCitizenRegistered").unwrap().selector().unwrap(),
        encode(&[Token::Bool(true)]),
    );
    h.rpc.set_call_result(
        artifact.function("getCitizen").unwrap().selector().unwrap(),
        encode(&[Token::Tuple(vec![
            Token::String("QmIdentityHash".into()),
            Token::String("Asha".into()),
            Token::String("asha@example.org".into()),
            Token::String("+91-9876543210".into()),
            Token::Bool(true),
            Token::Uint(U256::from(1_705_276_800u64)),
            Token::Address(CITIZEN),
        ])]),
    );

    let citizens = h.gateway.citizens();
    assert!(citizens.is_registered(CITIZEN).await);
    let citizen = citizens.get(CITIZEN).await.unwrap();
    assert_eq!(citizen.name, "Asha");
    assert!(citizen.verified);
    assert_eq!(citizen.registered_at, 1_705_276_800);
}

#[tokio::test]
async fn test_live_revert_is_classified() {
    let h = harness();
    h.gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;
    let artifact = Artifact::from_json(CITIZEN_REGISTRY).unwrap();
    h.rpc.set_revert(
        artifact.function("verifyCitizen").unwrap().selector().unwrap(),
        "Citizen already verified",
    );

    let err = h.gateway.citizens().verify(CITIZEN, None).await.unwrap_err();
    assert_eq!(err, LedgerError::already_verified("citizen", CITIZEN));
}

#[tokio::test]
async fn test_live_submission_reads_id_from_log() {
    let h = harness();
    h.gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;
    let contract = h.gateway.contract(RegistryKind::Grievance).unwrap();
    let event = contract.artifact().event("GrievanceSubmitted").unwrap();
    let submit = contract.artifact().function("submitGrievance").unwrap();

    h.rpc.set_receipt_logs(
        submit.selector().unwrap(),
        vec![RpcLog {
            address: contract.address(),
            topics: vec![event.topic().unwrap(), word(&[7]), word(CITIZEN.as_bytes())],
            data: encode(&[Token::from(0u64)]),
        }],
    );
    let mut sub = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Grievances]));

    let receipt = h
        .gateway
        .grievances()
        .submit(
            CITIZEN,
            GrievanceSubmission {
                title: "Street Light Not Working".into(),
                description: "Out for a week".into(),
                category: GrievanceCategory::Infrastructure,
                priority: Priority::Medium,
                location: "MG Road".into(),
                attachments: vec!["QmPhotoHash".into()],
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.entity_id, Some(7));
    assert!(matches!(
        sub.try_recv(),
        Ok(Some(LedgerEvent::GrievanceSubmitted { grievance_id: 7, .. }))
    ));
}

#[tokio::test]
async fn test_balance_formats_ether() {
    let h = harness();
    h.gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;
    assert_eq!(h.gateway.balance(None).await.unwrap(), "1.0");
}

#[tokio::test]
async fn test_chain_mismatch_falls_back_to_emulation() {
    let h = harness();
    let state = h.gateway.initialize("hardhat", Some(HARDHAT_KEY), false).await;

    assert_eq!(state, ConnectionState::Offline);
    assert!(h
        .gateway
        .status()
        .offline_reason
        .unwrap()
        .contains("expected 31337, got 1337"));
    assert!(h.gateway.contract(RegistryKind::Citizen).is_err());
    assert!(h.rpc.sent_transactions().is_empty());

    // registries still work, on the emulation
    let receipt = h
        .gateway
        .citizens()
        .register(
            CITIZEN,
            CitizenRegistration {
                identity_hash: "QmIdentityHash".into(),
                name: "Asha".into(),
                email: "asha@example.org".into(),
                phone: "1".into(),
            },
        )
        .await
        .unwrap();
    assert!(receipt.synthetic);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_node_falls_back_to_emulation() {
    let connector = Arc::new(MockConnector::unreachable());
    let gateway = LedgerGateway::new(
        GatewayConfig::for_testing(),
        connector.clone(),
        Arc::new(InMemoryEventBus::new()),
    );

    let state = gateway.initialize("localhost", None, false).await;

    assert_eq!(state, ConnectionState::Offline);
    assert_eq!(connector.connect_count(), 2);
    assert!(gateway.emulation_stats().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_connected_listener_writes_to_live_registry() {
    let h = harness();
    let gateway = Arc::new(h.gateway);
    let mut sub = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Connection]));

    let listener = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            loop {
                match sub.recv().await {
                    Some(LedgerEvent::Connected { .. }) => break,
                    Some(_) => {}
                    None => panic!("bus closed before connecting"),
                }
            }
            assert!(gateway.is_online());
            gateway
                .citizens()
                .register(
                    CITIZEN,
                    CitizenRegistration {
                        identity_hash: "QmIdentityHash".into(),
                        name: "Meera".into(),
                        email: "meera@example.org".into(),
                        phone: "+91-9123456789".into(),
                    },
                )
                .await
        })
    };

    let state = gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;
    assert_eq!(state, ConnectionState::Online);

    let receipt = listener.await.unwrap().unwrap();
    assert!(!receipt.synthetic);
    assert_eq!(h.rpc.sent_transactions().last().unwrap().from, Some(CITIZEN));
}

#[tokio::test]
async fn test_live_upload_revert_is_classified() {
    let h = harness();
    write_artifact(h._artifacts.path(), RegistryKind::Document, DOCUMENT_REGISTRY);
    h.gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;
    let upload = h
        .gateway
        .contract(RegistryKind::Document)
        .unwrap()
        .artifact()
        .function("uploadDocument")
        .unwrap()
        .selector()
        .unwrap();
    h.rpc.set_revert(upload, "Citizen not found");

    let err = h
        .gateway
        .documents()
        .upload(
            CITIZEN,
            DocumentUpload {
                content_hash: "QmDocumentHash".into(),
                doc_type: DocType::Aadhar,
                metadata: "{}".into(),
                expires_at: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::not_found("citizen", CITIZEN));
}

#[tokio::test]
async fn test_live_submission_revert_is_classified() {
    let h = harness();
    h.gateway.initialize("localhost", Some(HARDHAT_KEY), false).await;
    let submit = h
        .gateway
        .contract(RegistryKind::Grievance)
        .unwrap()
        .artifact()
        .function("submitGrievance")
        .unwrap()
        .selector()
        .unwrap();
    h.rpc.set_revert(submit, "Citizen does not exist");

    let err = h
        .gateway
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
        .unwrap_err();
    assert_eq!(err, LedgerError::not_found("citizen", CITIZEN));
}
