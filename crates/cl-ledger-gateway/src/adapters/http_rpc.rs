//! JSON-RPC 2.0 client for an EVM ledger node.
//!
//! Implements the `LedgerRpc` port over HTTP with reqwest.

use crate::abi::{decode_revert_reason, revert_reason_from_message};
use crate::domain::{LedgerError, LedgerResult};
use crate::ports::outbound::{CallRequest, LedgerRpc, RpcConnector, RpcLog, RpcReceipt};
use async_trait::async_trait;
use primitive_types::U256;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash, TxHash};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Map a node error onto the ledger taxonomy, surfacing revert reasons.
    fn into_ledger_error(self) -> LedgerError {
        let payload = match &self.data {
            Some(serde_json::Value::String(hex)) => Some(hex.clone()),
            Some(serde_json::Value::Object(map)) => map
                .get("data")
                .and_then(|d| d.as_str())
                .map(str::to_string),
            _ => None,
        };
        let from_payload = payload
            .and_then(|hex| hex::decode(hex.trim_start_matches("0x")).ok())
            .and_then(|bytes| decode_revert_reason(&bytes));

        match from_payload.or_else(|| revert_reason_from_message(&self.message)) {
            Some(reason) => LedgerError::RevertedOperation(reason),
            None => LedgerError::Rpc(format!("{}: {}", self.code, self.message)),
        }
    }
}

/// Call object in node wire format.
#[derive(Debug, Serialize)]
struct WireCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas: Option<String>,
}

impl From<&CallRequest> for WireCall {
    fn from(request: &CallRequest) -> Self {
        Self {
            from: request.from.map(|a| a.to_string()),
            to: request.to.map(|a| a.to_string()),
            data: format!("0x{}", hex::encode(&request.data)),
            gas: request.gas.map(|g| format!("{g:#x}")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReceipt {
    transaction_hash: String,
    block_number: String,
    block_hash: String,
    gas_used: String,
    #[serde(default)]
    effective_gas_price: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(default)]
    logs: Vec<WireLog>,
}

#[derive(Debug, Deserialize)]
struct WireLog {
    address: String,
    topics: Vec<String>,
    data: String,
}

impl TryFrom<WireReceipt> for RpcReceipt {
    type Error = LedgerError;

    fn try_from(wire: WireReceipt) -> Result<Self, Self::Error> {
        let logs = wire
            .logs
            .into_iter()
            .map(|log| -> LedgerResult<RpcLog> {
                Ok(RpcLog {
                    address: Address::parse(&log.address)?,
                    topics: log
                        .topics
                        .iter()
                        .map(|t| TxHash::parse(t).map(|h| h.0))
                        .collect::<Result<Vec<Hash>, _>>()?,
                    data: parse_bytes(&log.data)?,
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;

        Ok(Self {
            transaction_hash: TxHash::parse(&wire.transaction_hash)?,
            block_number: parse_quantity(&wire.block_number)?.low_u64(),
            block_hash: TxHash::parse(&wire.block_hash)?,
            gas_used: parse_quantity(&wire.gas_used)?.low_u64(),
            effective_gas_price: wire
                .effective_gas_price
                .as_deref()
                .map(parse_quantity)
                .transpose()?
                .map(|p| p.low_u128()),
            // Pre-Byzantium receipts have no status field.
            status: wire.status.as_deref().map_or(true, |s| s != "0x0"),
            contract_address: wire
                .contract_address
                .as_deref()
                .map(Address::parse)
                .transpose()?,
            logs,
        })
    }
}

/// Parse a hex quantity (`0x1a`).
pub fn parse_quantity(text: &str) -> LedgerResult<U256> {
    let digits = text.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::Rpc(format!("bad quantity `{text}`: {e}")))
}

fn parse_bytes(text: &str) -> LedgerResult<Vec<u8>> {
    hex::decode(text.trim_start_matches("0x"))
        .map_err(|e| LedgerError::Rpc(format!("bad hex data: {e}")))
}

/// HTTP JSON-RPC ledger client.
pub struct HttpLedgerRpc {
    client: Client,
    url: String,
    request_id: AtomicU64,
}

impl HttpLedgerRpc {
    /// Create a client with a per-request timeout.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send a JSON-RPC request.
    async fn request<P: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> LedgerResult<Option<R>> {
        let id = self.next_id();
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        debug!("[ledger-rpc] -> {} (id {})", method, id);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LedgerError::ConnectionUnavailable(format!("cannot connect to {}", self.url))
                } else if e.is_timeout() {
                    LedgerError::Timeout(method.to_string())
                } else {
                    LedgerError::Rpc(e.to_string())
                }
            })?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| LedgerError::Rpc(format!("failed to parse {method} response: {e}")))?;

        if let Some(error) = rpc_response.error {
            return Err(error.into_ledger_error());
        }
        Ok(rpc_response.result)
    }

    async fn call_required<P: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> LedgerResult<R> {
        self.request(method, params)
            .await?
            .ok_or_else(|| LedgerError::Rpc(format!("{method}: missing result")))
    }

    async fn quantity<P: Serialize + Send + Sync>(&self, method: &str, params: P) -> LedgerResult<U256> {
        let text: String = self.call_required(method, params).await?;
        parse_quantity(&text)
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn chain_id(&self) -> LedgerResult<u64> {
        Ok(self.quantity("eth_chainId", [(); 0]).await?.low_u64())
    }

    async fn block_number(&self) -> LedgerResult<u64> {
        Ok(self.quantity("eth_blockNumber", [(); 0]).await?.low_u64())
    }

    async fn gas_price(&self) -> LedgerResult<u128> {
        Ok(self.quantity("eth_gasPrice", [(); 0]).await?.low_u128())
    }

    async fn balance(&self, address: Address) -> LedgerResult<U256> {
        self.quantity("eth_getBalance", (address.to_string(), "latest"))
            .await
    }

    async fn call(&self, request: &CallRequest) -> LedgerResult<Vec<u8>> {
        let text: String = self
            .call_required("eth_call", (WireCall::from(request), "latest"))
            .await?;
        parse_bytes(&text)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> LedgerResult<u64> {
        Ok(self
            .quantity("eth_estimateGas", [WireCall::from(request)])
            .await?
            .low_u64())
    }

    async fn send_transaction(&self, request: &CallRequest) -> LedgerResult<TxHash> {
        let text: String = self
            .call_required("eth_sendTransaction", [WireCall::from(request)])
            .await?;
        Ok(TxHash::parse(&text)?)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> LedgerResult<Option<RpcReceipt>> {
        let wire: Option<WireReceipt> = self
            .request("eth_getTransactionReceipt", [hash.to_string()])
            .await?;
        wire.map(RpcReceipt::try_from).transpose()
    }
}

/// Opens `HttpLedgerRpc` clients.
pub struct HttpConnector {
    request_timeout: Duration,
}

impl HttpConnector {
    #[must_use]
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl RpcConnector for HttpConnector {
    async fn connect(&self, url: &str) -> LedgerResult<Arc<dyn LedgerRpc>> {
        Ok(Arc::new(HttpLedgerRpc::new(url, self.request_timeout)?))
    }
}
