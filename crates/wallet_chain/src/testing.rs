//! In-process fakes for the chain-facing traits, plus a tiny HTTP fixture
//! for exercising the reqwest-based clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wallet_core::{WalletError, WalletResult};

use crate::eip1193::{Eip1193Provider, UNRECOGNIZED_CHAIN};
use crate::rpc::{CallRequest, EthRpc, TxReceipt};
use crate::walletconnect::{PairingProposal, PairingRelay, SessionApproval};

pub const MOCK_ACCOUNT: &str = "0x70997970C51812dc3A010C7d01b50e20d17dc79C";

// ── MockRpc ──────────────────────────────────────────────────────────

struct MockRpcState {
    chain_id: u64,
    balance: U256,
    gas_limit: u64,
    gas_price: u128,
    nonce: u64,
    call_results: HashMap<[u8; 4], Bytes>,
    send_error: Option<String>,
    send_attempts: usize,
    sent_raw: Vec<Bytes>,
    estimated: Vec<CallRequest>,
    receipt: Option<TxReceipt>,
}

/// Scriptable [`EthRpc`]. Calls are answered by 4-byte selector.
pub struct MockRpc {
    state: Mutex<MockRpcState>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockRpcState {
                chain_id: 31_337,
                balance: U256::ZERO,
                gas_limit: 21_000,
                gas_price: 20_000_000_000,
                nonce: 0,
                call_results: HashMap::new(),
                send_error: None,
                send_attempts: 0,
                sent_raw: Vec::new(),
                estimated: Vec::new(),
                receipt: None,
            }),
        }
    }

    pub fn with_balance(mut self, balance: U256) -> Self {
        self.state.get_mut().balance = balance;
        self
    }

    pub fn with_gas(mut self, gas_limit: u64, gas_price: u128) -> Self {
        let state = self.state.get_mut();
        state.gas_limit = gas_limit;
        state.gas_price = gas_price;
        self
    }

    pub fn with_call_result(mut self, selector: [u8; 4], result: Vec<u8>) -> Self {
        self.state.get_mut().call_results.insert(selector, result.into());
        self
    }

    /// Every broadcast fails with a `-32000` RPC error carrying `message`.
    pub fn failing_send(mut self, message: &str) -> Self {
        self.state.get_mut().send_error = Some(message.to_string());
        self
    }

    pub fn set_receipt(&self, receipt: TxReceipt) {
        self.state.lock().receipt = Some(receipt);
    }

    /// Hash returned for every successful broadcast.
    pub fn next_hash(&self) -> B256 {
        B256::repeat_byte(0xab)
    }

    pub fn sent_raw(&self) -> Vec<Bytes> {
        self.state.lock().sent_raw.clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.state.lock().send_attempts
    }

    /// Requests passed to `eth_estimateGas`, oldest first.
    pub fn estimated(&self) -> Vec<CallRequest> {
        self.state.lock().estimated.clone()
    }
}

impl Default for MockRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EthRpc for MockRpc {
    async fn chain_id(&self) -> WalletResult<u64> {
        Ok(self.state.lock().chain_id)
    }

    async fn get_balance(&self, _address: Address) -> WalletResult<U256> {
        Ok(self.state.lock().balance)
    }

    async fn gas_price(&self) -> WalletResult<u128> {
        Ok(self.state.lock().gas_price)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> WalletResult<u64> {
        let mut state = self.state.lock();
        state.estimated.push(request.clone());
        Ok(state.gas_limit)
    }

    async fn transaction_count(&self, _address: Address) -> WalletResult<u64> {
        Ok(self.state.lock().nonce)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<B256> {
        let mut state = self.state.lock();
        state.send_attempts += 1;
        if let Some(message) = &state.send_error {
            return Err(WalletError::Rpc {
                code: -32000,
                message: message.clone(),
            });
        }
        state.sent_raw.push(raw);
        state.nonce += 1;
        Ok(self.next_hash())
    }

    async fn call(&self, request: &CallRequest) -> WalletResult<Bytes> {
        let selector: Option<[u8; 4]> = request.data.get(..4).and_then(|s| s.try_into().ok());
        selector
            .and_then(|s| self.state.lock().call_results.get(&s).cloned())
            .ok_or_else(|| WalletError::Rpc {
                code: 3,
                message: "execution reverted".into(),
            })
    }

    async fn transaction_receipt(&self, _hash: B256) -> WalletResult<Option<TxReceipt>> {
        Ok(self.state.lock().receipt.clone())
    }
}

// ── MockEip1193 ──────────────────────────────────────────────────────

/// Injected-wallet stand-in that records every request.
pub struct MockEip1193 {
    accounts: Vec<String>,
    unknown_chain: bool,
    chain_added: Mutex<bool>,
    errors: HashMap<String, i64>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MockEip1193 {
    pub fn new() -> Self {
        Self {
            accounts: vec![MOCK_ACCOUNT.to_string()],
            unknown_chain: false,
            chain_added: Mutex::new(false),
            errors: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_accounts(mut self, accounts: &[&str]) -> Self {
        self.accounts = accounts.iter().map(|a| a.to_string()).collect();
        self
    }

    /// `wallet_switchEthereumChain` fails with 4902 until the chain is added.
    pub fn with_unknown_chain(mut self) -> Self {
        self.unknown_chain = true;
        self
    }

    pub fn with_error(mut self, method: &str, code: i64) -> Self {
        self.errors.insert(method.to_string(), code);
        self
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(m, _)| m.clone()).collect()
    }
}

impl Default for MockEip1193 {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Eip1193Provider for MockEip1193 {
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
        self.requests.lock().push((method.to_string(), params));
        if let Some(code) = self.errors.get(method) {
            return Err(WalletError::Rpc {
                code: *code,
                message: format!("{method} failed"),
            });
        }
        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!(self.accounts)),
            "wallet_switchEthereumChain" => {
                if self.unknown_chain && !*self.chain_added.lock() {
                    Err(WalletError::Rpc {
                        code: UNRECOGNIZED_CHAIN,
                        message: "Unrecognized chain ID".into(),
                    })
                } else {
                    Ok(Value::Null)
                }
            }
            "wallet_addEthereumChain" => {
                *self.chain_added.lock() = true;
                Ok(Value::Null)
            }
            "eth_sendTransaction" => Ok(json!(B256::repeat_byte(0xcd))),
            _ => Err(WalletError::Rpc {
                code: -32601,
                message: format!("method not found: {method}"),
            }),
        }
    }
}

// ── MockRelay ────────────────────────────────────────────────────────

/// WalletConnect relay whose wallet approves immediately.
pub struct MockRelay {
    accounts: Vec<String>,
    proposals: Mutex<Vec<PairingProposal>>,
    forwarded: Mutex<Vec<(String, String)>>,
    disconnects: AtomicUsize,
}

impl MockRelay {
    /// Approve every proposal with these CAIP-10 accounts.
    pub fn approving(accounts: Vec<String>) -> Self {
        Self {
            accounts,
            proposals: Mutex::new(Vec::new()),
            forwarded: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn proposals(&self) -> Vec<PairingProposal> {
        self.proposals.lock().clone()
    }

    /// `(chain, method)` of every request routed to the wallet.
    pub fn forwarded(&self) -> Vec<(String, String)> {
        self.forwarded.lock().clone()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PairingRelay for MockRelay {
    async fn propose(&self, proposal: &PairingProposal) -> WalletResult<()> {
        self.proposals.lock().push(proposal.clone());
        Ok(())
    }

    async fn await_approval(&self, _topic: &str) -> WalletResult<SessionApproval> {
        Ok(SessionApproval {
            accounts: self.accounts.clone(),
            peer_name: Some("Mock Wallet".into()),
        })
    }

    async fn request(&self, _topic: &str, chain: &str, method: &str, _params: Value) -> WalletResult<Value> {
        self.forwarded.lock().push((chain.to_string(), method.to_string()));
        match method {
            "eth_sendTransaction" => Ok(json!(B256::repeat_byte(0xcd))),
            _ => Ok(Value::Null),
        }
    }

    async fn disconnect(&self, _topic: &str) -> WalletResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── HTTP fixture ─────────────────────────────────────────────────────

/// A request received by [`spawn_json_server`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl HttpRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpReply {
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_string(),
        }
    }
}

/// Serve `handler` on an ephemeral localhost port until the test ends.
/// Returns the base URL (`http://127.0.0.1:<port>`).
pub async fn spawn_json_server<F>(handler: F) -> String
where
    F: Fn(HttpRequest) -> HttpReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let handler = std::sync::Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let _ = serve_one(stream, handler.as_ref()).await;
            });
        }
    });

    format!("http://{addr}")
}

async fn serve_one<F>(mut stream: TcpStream, handler: &F) -> std::io::Result<()>
where
    F: Fn(HttpRequest) -> HttpReply,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or("").split_whitespace();
    let request = HttpRequest {
        method: request_line.next().unwrap_or("").to_string(),
        path: request_line.next().unwrap_or("").to_string(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    };

    let reply = handler(request);
    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reply.content_type,
        reply.body.len(),
        reply.body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
