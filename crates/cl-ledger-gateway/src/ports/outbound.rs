//! # Outbound Ports
//!
//! Traits for the ledger network (JSON-RPC node) and the factory that opens
//! connections to it. The connection manager only talks to the network
//! through these, which lets tests assert that no call was made.

use crate::domain::{LedgerError, LedgerResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use shared_types::{Address, Hash, TxHash};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Parameters of `eth_call`, `eth_estimateGas` and `eth_sendTransaction`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallRequest {
    /// Sender (node-managed account for sends).
    pub from: Option<Address>,
    /// Target contract. `None` deploys `data` as init code.
    pub to: Option<Address>,
    /// Calldata or init code.
    pub data: Vec<u8>,
    /// Gas limit.
    pub gas: Option<u64>,
}

impl CallRequest {
    /// First four bytes of the calldata.
    #[must_use]
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// A log entry from a mined receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RpcLog {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Vec<u8>,
}

/// A mined transaction receipt as reported by the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub block_hash: TxHash,
    pub gas_used: u64,
    pub effective_gas_price: Option<u128>,
    /// `false` when the node reports status `0x0`.
    pub status: bool,
    pub contract_address: Option<Address>,
    pub logs: Vec<RpcLog>,
}

/// Ledger node client - outbound port.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// `eth_chainId`
    async fn chain_id(&self) -> LedgerResult<u64>;

    /// `eth_blockNumber`
    async fn block_number(&self) -> LedgerResult<u64>;

    /// `eth_gasPrice`, in wei.
    async fn gas_price(&self) -> LedgerResult<u128>;

    /// `eth_getBalance` at `latest`, in wei.
    async fn balance(&self, address: Address) -> LedgerResult<U256>;

    /// `eth_call` at `latest`; returns the raw return data.
    async fn call(&self, request: &CallRequest) -> LedgerResult<Vec<u8>>;

    /// `eth_estimateGas`
    async fn estimate_gas(&self, request: &CallRequest) -> LedgerResult<u64>;

    /// `eth_sendTransaction` from a node-managed account.
    async fn send_transaction(&self, request: &CallRequest) -> LedgerResult<TxHash>;

    /// `eth_getTransactionReceipt`; `None` while pending.
    async fn transaction_receipt(&self, hash: TxHash) -> LedgerResult<Option<RpcReceipt>>;
}

/// Opens RPC handles for an endpoint URL - outbound port.
#[async_trait]
pub trait RpcConnector: Send + Sync {
    /// Create a client for `url`. Does not have to touch the network.
    async fn connect(&self, url: &str) -> LedgerResult<Arc<dyn LedgerRpc>>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Scriptable in-memory ledger node.
///
/// Answers `eth_call` from a per-selector table, mines every sent transaction
/// immediately and counts every request it receives.
pub struct MockLedgerRpc {
    chain_id: u64,
    balance: U256,
    unreachable: bool,
    stall: Option<Duration>,
    requests: AtomicU64,
    block: AtomicU64,
    call_results: Mutex<HashMap<[u8; 4], Vec<u8>>>,
    reverts: Mutex<HashMap<[u8; 4], String>>,
    receipt_logs: Mutex<HashMap<[u8; 4], Vec<RpcLog>>>,
    sent: Mutex<Vec<CallRequest>>,
    receipts: Mutex<HashMap<TxHash, RpcReceipt>>,
}

impl MockLedgerRpc {
    /// A healthy node reporting `chain_id`.
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            balance: U256::from(10u64).pow(U256::from(18u64)),
            unreachable: false,
            stall: None,
            requests: AtomicU64::new(0),
            block: AtomicU64::new(100),
            call_results: Mutex::new(HashMap::new()),
            reverts: Mutex::new(HashMap::new()),
            receipt_logs: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            receipts: Mutex::new(HashMap::new()),
        }
    }

    /// Every request fails as if the socket were refused.
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Every request sleeps for `delay` before answering.
    #[must_use]
    pub fn stalled(mut self, delay: Duration) -> Self {
        self.stall = Some(delay);
        self
    }

    /// Return `data` for `eth_call`s with this selector.
    pub fn set_call_result(&self, selector: [u8; 4], data: Vec<u8>) {
        self.call_results.lock().insert(selector, data);
    }

    /// Revert calls and sends with this selector.
    pub fn set_revert(&self, selector: [u8; 4], reason: impl Into<String>) {
        self.reverts.lock().insert(selector, reason.into());
    }

    /// Attach logs to receipts of transactions with this selector.
    pub fn set_receipt_logs(&self, selector: [u8; 4], logs: Vec<RpcLog>) {
        self.receipt_logs.lock().insert(selector, logs);
    }

    /// Total requests received.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Transactions sent so far.
    #[must_use]
    pub fn sent_transactions(&self) -> Vec<CallRequest> {
        self.sent.lock().clone()
    }

    async fn enter(&self) -> LedgerResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable {
            return Err(LedgerError::ConnectionUnavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }

    fn revert_for(&self, request: &CallRequest) -> LedgerResult<()> {
        match request.selector().and_then(|s| self.reverts.lock().get(&s).cloned()) {
            Some(reason) => Err(LedgerError::RevertedOperation(reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerRpc for MockLedgerRpc {
    async fn chain_id(&self) -> LedgerResult<u64> {
        self.enter().await?;
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> LedgerResult<u64> {
        self.enter().await?;
        Ok(self.block.load(Ordering::SeqCst))
    }

    async fn gas_price(&self) -> LedgerResult<u128> {
        self.enter().await?;
        Ok(1_000_000_000)
    }

    async fn balance(&self, _address: Address) -> LedgerResult<U256> {
        self.enter().await?;
        Ok(self.balance)
    }

    async fn call(&self, request: &CallRequest) -> LedgerResult<Vec<u8>> {
        self.enter().await?;
        self.revert_for(request)?;
        Ok(request
            .selector()
            .and_then(|s| self.call_results.lock().get(&s).cloned())
            .unwrap_or_default())
    }

    async fn estimate_gas(&self, request: &CallRequest) -> LedgerResult<u64> {
        self.enter().await?;
        self.revert_for(request)?;
        Ok(100_000)
    }

    async fn send_transaction(&self, request: &CallRequest) -> LedgerResult<TxHash> {
        self.enter().await?;
        self.revert_for(request)?;

        let block = self.block.fetch_add(1, Ordering::SeqCst) + 1;
        let mut sent = self.sent.lock();
        sent.push(request.clone());
        let nonce = sent.len() as u8;

        let hash = TxHash([nonce; 32]);
        let logs = request
            .selector()
            .and_then(|s| self.receipt_logs.lock().get(&s).cloned())
            .unwrap_or_default();
        let receipt = RpcReceipt {
            transaction_hash: hash,
            block_number: block,
            block_hash: TxHash([nonce ^ 0xff; 32]),
            gas_used: 50_000,
            effective_gas_price: Some(1_000_000_000),
            status: true,
            contract_address: request.to.is_none().then(|| Address([nonce; 20])),
            logs,
        };
        self.receipts.lock().insert(hash, receipt);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> LedgerResult<Option<RpcReceipt>> {
        self.enter().await?;
        Ok(self.receipts.lock().get(&hash).cloned())
    }
}

/// Connector handing out a fixed mock node, or refusing every connection.
pub struct MockConnector {
    rpc: Option<Arc<MockLedgerRpc>>,
    connects: AtomicU64,
}

impl MockConnector {
    /// Connector whose every `connect` fails.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            rpc: None,
            connects: AtomicU64::new(0),
        }
    }

    /// Connector that always returns `rpc`.
    #[must_use]
    pub fn with_rpc(rpc: Arc<MockLedgerRpc>) -> Self {
        Self {
            rpc: Some(rpc),
            connects: AtomicU64::new(0),
        }
    }

    /// Number of `connect` calls.
    #[must_use]
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcConnector for MockConnector {
    async fn connect(&self, url: &str) -> LedgerResult<Arc<dyn LedgerRpc>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match &self.rpc {
            Some(rpc) => Ok(rpc.clone() as Arc<dyn LedgerRpc>),
            None => Err(LedgerError::ConnectionUnavailable(format!(
                "connection refused: {url}"
            ))),
        }
    }
}
