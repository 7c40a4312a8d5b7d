//! Bound contract handle.
//!
//! Encodes calls from the artifact ABI, sends transactions from node-managed
//! accounts and waits for their receipts.

use crate::abi::{decode, encode_call, named_outputs, Artifact, Token};
use crate::config::ConnectionConfig;
use crate::domain::{LedgerError, LedgerResult};
use crate::metrics::GatewayMetrics;
use crate::ports::outbound::{CallRequest, LedgerRpc, RpcReceipt};
use shared_types::{unix_now, Address, OperationType, RegistryKind, TransactionReceipt, TxHash};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Decoded return values or event fields, by parameter name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outputs(pub HashMap<String, Token>);

impl Outputs {
    fn field(&self, name: &str) -> LedgerResult<&Token> {
        self.0
            .get(name)
            .ok_or_else(|| LedgerError::Abi(format!("missing field `{name}`")))
    }

    fn typed<T>(&self, name: &str, read: impl Fn(&Token) -> Option<T>) -> LedgerResult<T> {
        read(self.field(name)?)
            .ok_or_else(|| LedgerError::Abi(format!("field `{name}` has unexpected type")))
    }

    pub fn u64(&self, name: &str) -> LedgerResult<u64> {
        self.typed(name, Token::as_u64)
    }

    pub fn bool(&self, name: &str) -> LedgerResult<bool> {
        self.typed(name, Token::as_bool)
    }

    pub fn address(&self, name: &str) -> LedgerResult<Address> {
        self.typed(name, Token::as_address)
    }

    pub fn string(&self, name: &str) -> LedgerResult<String> {
        self.typed(name, |t| t.as_str().map(str::to_string))
    }

    /// Zero address means unset.
    pub fn optional_address(&self, name: &str) -> LedgerResult<Option<Address>> {
        Ok(Some(self.address(name)?).filter(|a| !a.is_zero()))
    }

    /// Zero means unset.
    pub fn optional_u64(&self, name: &str) -> LedgerResult<Option<u64>> {
        Ok(Some(self.u64(name)?).filter(|v| *v != 0))
    }

    /// Empty string means unset.
    pub fn optional_string(&self, name: &str) -> LedgerResult<Option<String>> {
        Ok(Some(self.string(name)?).filter(|s| !s.is_empty()))
    }

    pub fn strings(&self, name: &str) -> LedgerResult<Vec<String>> {
        self.typed(name, |t| {
            t.as_array()?
                .iter()
                .map(|s| s.as_str().map(str::to_string))
                .collect()
        })
    }

    pub fn u64s(&self, name: &str) -> LedgerResult<Vec<u64>> {
        self.typed(name, |t| t.as_array()?.iter().map(Token::as_u64).collect())
    }

    /// The sole output of a single-return function, whatever its name.
    fn only(&self) -> LedgerResult<&str> {
        match self.0.len() {
            1 => Ok(self.0.keys().next().map(String::as_str).unwrap_or_default()),
            n => Err(LedgerError::Abi(format!("expected one output, got {n}"))),
        }
    }

    pub fn only_bool(&self) -> LedgerResult<bool> {
        self.bool(self.only()?)
    }

    pub fn only_u64s(&self) -> LedgerResult<Vec<u64>> {
        self.u64s(self.only()?)
    }
}

/// A registry contract bound to a deployed address.
pub struct ContractHandle {
    registry: RegistryKind,
    address: Address,
    artifact: Arc<Artifact>,
    rpc: Arc<dyn LedgerRpc>,
    metrics: Arc<GatewayMetrics>,
    config: ConnectionConfig,
}

impl ContractHandle {
    pub fn new(
        registry: RegistryKind,
        address: Address,
        artifact: Arc<Artifact>,
        rpc: Arc<dyn LedgerRpc>,
        metrics: Arc<GatewayMetrics>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            registry,
            address,
            artifact,
            rpc,
            metrics,
            config,
        }
    }

    #[must_use]
    pub fn registry(&self) -> RegistryKind {
        self.registry
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Read-only call. Returns outputs by name; a single struct output is
    /// flattened into its fields.
    pub async fn call(&self, function: &str, args: &[Token]) -> LedgerResult<Outputs> {
        let item = self.artifact.function(function)?;
        let request = CallRequest {
            from: None,
            to: Some(self.address),
            data: encode_call(item, args)?,
            gas: None,
        };

        self.metrics.record_live_call();
        let data = self.rpc.call(&request).await?;
        let tokens = decode(&item.output_types()?, &data)?;
        Ok(Outputs(named_outputs(&item.outputs, tokens)?))
    }

    /// State-changing call from `from`.
    ///
    /// Simulated with `eth_call` first so reverts carry their reason, then
    /// sent and awaited. A mined receipt with status 0 is a revert.
    pub async fn send(
        &self,
        function: &str,
        args: &[Token],
        from: Address,
    ) -> LedgerResult<RpcReceipt> {
        let item = self.artifact.function(function)?;
        let request = CallRequest {
            from: Some(from),
            to: Some(self.address),
            data: encode_call(item, args)?,
            gas: None,
        };

        self.metrics.record_live_call();
        self.rpc.call(&request).await?;
        let hash = self.rpc.send_transaction(&request).await?;
        debug!(
            "[cl-gateway] {}.{} sent as {}",
            self.registry, function, hash
        );

        let receipt = wait_for_receipt(self.rpc.as_ref(), hash, &self.config).await?;
        if !receipt.status {
            return Err(LedgerError::RevertedOperation(format!(
                "{function} reverted in transaction {hash}"
            )));
        }
        self.metrics.record_transaction(receipt.gas_used, false);
        Ok(receipt)
    }

    /// Decode the first log of `event` emitted by this contract.
    pub fn find_event(&self, receipt: &RpcReceipt, event: &str) -> LedgerResult<Option<Outputs>> {
        let item = self.artifact.event(event)?;
        let topic = item.topic()?;
        receipt
            .logs
            .iter()
            .find(|log| log.address == self.address && log.topics.first() == Some(&topic))
            .map(|log| item.decode_log(&log.topics, &log.data).map(Outputs))
            .transpose()
    }

    /// Canonical receipt for a mined live transaction.
    pub async fn to_receipt(
        &self,
        receipt: &RpcReceipt,
        operation: OperationType,
        entity_id: Option<u64>,
    ) -> TransactionReceipt {
        canonical_receipt(self.rpc.as_ref(), receipt, operation, entity_id).await
    }
}

/// Poll until the node reports a receipt or `receipt_timeout` passes.
pub async fn wait_for_receipt(
    rpc: &dyn LedgerRpc,
    hash: TxHash,
    config: &ConnectionConfig,
) -> LedgerResult<RpcReceipt> {
    tokio::time::timeout(
        config.receipt_timeout,
        poll_receipt(rpc, hash, config.receipt_poll_interval),
    )
    .await
    .map_err(|_| LedgerError::Timeout(format!("receipt for {hash}")))?
}

async fn poll_receipt(
    rpc: &dyn LedgerRpc,
    hash: TxHash,
    interval: Duration,
) -> LedgerResult<RpcReceipt> {
    loop {
        if let Some(receipt) = rpc.transaction_receipt(hash).await? {
            return Ok(receipt);
        }
        tokio::time::sleep(interval).await;
    }
}

/// Convert a node receipt, querying the gas price when the node omits it.
pub async fn canonical_receipt(
    rpc: &dyn LedgerRpc,
    receipt: &RpcReceipt,
    operation: OperationType,
    entity_id: Option<u64>,
) -> TransactionReceipt {
    let gas_price = match receipt.effective_gas_price {
        Some(price) => price,
        None => rpc.gas_price().await.unwrap_or_else(|e| {
            warn!("[cl-gateway] Gas price unavailable: {}", e);
            0
        }),
    };
    TransactionReceipt {
        hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        block_hash: receipt.block_hash,
        gas_used: receipt.gas_used,
        gas_price,
        timestamp: unix_now(),
        operation,
        entity_id,
        contract_address: receipt.contract_address,
        synthetic: false,
    }
}

/// Map a known revert reason back onto the typed taxonomy.
///
/// `key` identifies the record the operation targeted.
pub fn classify_revert(error: LedgerError, entity: &'static str, key: impl ToString) -> LedgerError {
    let reason = match error {
        LedgerError::RevertedOperation(reason) => reason,
        other => return other,
    };
    let lower = reason.to_lowercase();
    let key = key.to_string();

    if lower.contains("already registered") {
        if let Ok(address) = Address::parse(&key) {
            return LedgerError::AlreadyRegistered(address);
        }
    }
    if lower.contains("already verified") {
        return LedgerError::already_verified(entity, key);
    }
    if lower.contains("not found") || lower.contains("does not exist") {
        return LedgerError::not_found(entity, key);
    }
    LedgerError::RevertedOperation(reason)
}
