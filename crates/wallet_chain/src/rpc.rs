//! Typed Ethereum JSON-RPC access.
//!
//! [`EthRpc`] is the seam the wallet and transaction services talk to.
//! [`RpcClient`] implements it on top of any [`Eip1193Provider`]: an
//! [`HttpTransport`] for a node endpoint, or an injected / paired wallet.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use wallet_core::{WalletError, WalletResult};

use crate::eip1193::Eip1193Provider;

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    pub(crate) fn into_result(self) -> WalletResult<Value> {
        if let Some(err) = self.error {
            return Err(WalletError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

pub(crate) fn request_body(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// POST a JSON-RPC request and unwrap the envelope.
pub(crate) async fn post_json_rpc(
    client: &reqwest::Client,
    url: &str,
    id: u64,
    method: &str,
    params: Value,
) -> WalletResult<Value> {
    debug!(method, id, "json-rpc request");
    let resp = client
        .post(url)
        .json(&request_body(id, method, params))
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(WalletError::Network(format!(
            "{method} returned HTTP {status}: {body}"
        )));
    }

    let envelope: RpcResponse = resp
        .json()
        .await
        .map_err(|e| WalletError::Network(format!("malformed {method} response: {e}")))?;
    envelope.into_result()
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// JSON-RPC over HTTP POST. Used for node endpoints and for the external
/// wallet bridge alike.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Eip1193Provider for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        post_json_rpc(&self.client, &self.url, id, method, params).await
    }
}

// ---------------------------------------------------------------------------
// Typed API
// ---------------------------------------------------------------------------

/// A call or transaction skeleton, as passed to `eth_call` /
/// `eth_estimateGas`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl CallRequest {
    /// Plain value transfer.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            from: None,
            to,
            value,
            data: Bytes::new(),
        }
    }

    /// Contract call with no value attached.
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            value: U256::ZERO,
            data: data.into(),
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// The subset of a transaction receipt the wallet cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub success: bool,
    pub gas_used: u64,
    pub effective_gas_price: Option<u128>,
    pub block_number: Option<u64>,
    pub contract_address: Option<Address>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: B256,
    #[serde(default)]
    status: Option<String>,
    gas_used: String,
    #[serde(default)]
    effective_gas_price: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    contract_address: Option<Address>,
}

impl TryFrom<RawReceipt> for TxReceipt {
    type Error = WalletError;

    fn try_from(raw: RawReceipt) -> WalletResult<Self> {
        Ok(Self {
            transaction_hash: raw.transaction_hash,
            // Pre-Byzantium receipts carry no status; treat them as success.
            success: raw.status.as_deref().map(|s| s != "0x0").unwrap_or(true),
            gas_used: parse_quantity(&raw.gas_used)?,
            effective_gas_price: raw
                .effective_gas_price
                .as_deref()
                .map(parse_quantity_u128)
                .transpose()?,
            block_number: raw.block_number.as_deref().map(parse_quantity).transpose()?,
            contract_address: raw.contract_address,
        })
    }
}

/// Parse a `0x`-prefixed JSON-RPC quantity.
pub fn parse_quantity(s: &str) -> WalletResult<u64> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| WalletError::Network(format!("invalid quantity: {s}")))?;
    u64::from_str_radix(digits, 16).map_err(|e| WalletError::Network(format!("invalid quantity {s}: {e}")))
}

pub fn parse_quantity_u128(s: &str) -> WalletResult<u128> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| WalletError::Network(format!("invalid quantity: {s}")))?;
    u128::from_str_radix(digits, 16).map_err(|e| WalletError::Network(format!("invalid quantity {s}: {e}")))
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> WalletResult<T> {
    serde_json::from_value(value)
        .map_err(|e| WalletError::Network(format!("unexpected {method} result: {e}")))
}

fn quantity(method: &str, value: Value) -> WalletResult<u64> {
    let s: String = decode(method, value)?;
    parse_quantity(&s)
}

/// Read/write access to an EVM node.
#[async_trait]
pub trait EthRpc: Send + Sync {
    async fn chain_id(&self) -> WalletResult<u64>;
    async fn get_balance(&self, address: Address) -> WalletResult<U256>;
    /// Current gas price in wei.
    async fn gas_price(&self) -> WalletResult<u128>;
    async fn estimate_gas(&self, request: &CallRequest) -> WalletResult<u64>;
    /// Pending nonce for `address`.
    async fn transaction_count(&self, address: Address) -> WalletResult<u64>;
    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<B256>;
    async fn call(&self, request: &CallRequest) -> WalletResult<Bytes>;
    async fn transaction_receipt(&self, hash: B256) -> WalletResult<Option<TxReceipt>>;
}

/// [`EthRpc`] over any EIP-1193 style request function.
#[derive(Clone)]
pub struct RpcClient {
    provider: Arc<dyn Eip1193Provider>,
}

impl RpcClient {
    pub fn new(provider: Arc<dyn Eip1193Provider>) -> Self {
        Self { provider }
    }

    /// Client for a node's HTTP endpoint.
    pub fn http(url: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpTransport::new(url)))
    }

    async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
        self.provider.request(method, params).await
    }
}

#[async_trait]
impl EthRpc for RpcClient {
    async fn chain_id(&self) -> WalletResult<u64> {
        let v = self.request("eth_chainId", json!([])).await?;
        quantity("eth_chainId", v)
    }

    async fn get_balance(&self, address: Address) -> WalletResult<U256> {
        let v = self
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        decode("eth_getBalance", v)
    }

    async fn gas_price(&self) -> WalletResult<u128> {
        let v = self.request("eth_gasPrice", json!([])).await?;
        let s: String = decode("eth_gasPrice", v)?;
        parse_quantity_u128(&s)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> WalletResult<u64> {
        let v = self.request("eth_estimateGas", json!([request])).await?;
        quantity("eth_estimateGas", v)
    }

    async fn transaction_count(&self, address: Address) -> WalletResult<u64> {
        let v = self
            .request("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        quantity("eth_getTransactionCount", v)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<B256> {
        let v = self.request("eth_sendRawTransaction", json!([raw])).await?;
        decode("eth_sendRawTransaction", v)
    }

    async fn call(&self, request: &CallRequest) -> WalletResult<Bytes> {
        let v = self.request("eth_call", json!([request, "latest"])).await?;
        decode("eth_call", v)
    }

    async fn transaction_receipt(&self, hash: B256) -> WalletResult<Option<TxReceipt>> {
        let v = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if v.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = decode("eth_getTransactionReceipt", v)?;
        raw.try_into().map(Some)
    }
}
