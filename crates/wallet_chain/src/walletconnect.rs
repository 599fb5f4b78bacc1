//! WalletConnect v2 pairing.
//!
//! A pairing proposal is published to a relay and rendered as a `wc:` URI
//! (shown as a QR code). Once the remote wallet approves, requests for the
//! session are forwarded through the relay, so the session behaves as an
//! [`Eip1193Provider`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use wallet_core::{WalletError, WalletResult};

use crate::eip1193::Eip1193Provider;
use crate::network::Network;
use crate::rpc::post_json_rpc;

pub const DEFAULT_RELAY_URL: &str = "https://relay.walletconnect.com";
const RELAY_PROTOCOL: &str = "irn";

/// Methods the dapp asks the wallet to support.
pub const REQUIRED_METHODS: &[&str] = &[
    "eth_sendTransaction",
    "personal_sign",
    "eth_signTypedData_v4",
    "wallet_switchEthereumChain",
];

/// CAIP-2 chain id, e.g. `eip155:11155111`.
pub fn caip2(chain_id: u64) -> String {
    format!("eip155:{chain_id}")
}

/// Split a CAIP-10 account (`eip155:<chain>:<address>`).
pub fn parse_caip10(account: &str) -> WalletResult<(u64, Address)> {
    let mut parts = account.split(':');
    let (Some("eip155"), Some(chain), Some(address), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(WalletError::Validation(format!("invalid CAIP-10 account: {account}")));
    };
    let chain_id = chain
        .parse::<u64>()
        .map_err(|_| WalletError::Validation(format!("invalid CAIP-10 chain: {account}")))?;
    let address = address
        .parse::<Address>()
        .map_err(|_| WalletError::Validation(format!("invalid CAIP-10 address: {account}")))?;
    Ok((chain_id, address))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingProposal {
    pub topic: String,
    #[serde(skip_serializing)]
    pub sym_key: String,
    pub chains: Vec<String>,
    pub methods: Vec<String>,
}

impl PairingProposal {
    /// Fresh topic and symmetric key for `network`.
    pub fn generate(network: &Network) -> Self {
        Self {
            topic: hex::encode(rand::random::<[u8; 32]>()),
            sym_key: hex::encode(rand::random::<[u8; 32]>()),
            chains: vec![caip2(network.chain_id)],
            methods: REQUIRED_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// The `wc:` URI encoded into the pairing QR code.
    pub fn uri(&self) -> String {
        format!(
            "wc:{}@2?relay-protocol={RELAY_PROTOCOL}&symKey={}",
            self.topic, self.sym_key
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionApproval {
    /// CAIP-10 accounts.
    pub accounts: Vec<String>,
    #[serde(default)]
    pub peer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConnectSession {
    pub topic: String,
    pub address: Address,
    pub chain_id: u64,
    pub peer_name: String,
}

/// Transport to the WalletConnect relay.
#[async_trait]
pub trait PairingRelay: Send + Sync {
    async fn propose(&self, proposal: &PairingProposal) -> WalletResult<()>;
    /// Wait until the wallet approves (or rejects) the pairing.
    async fn await_approval(&self, topic: &str) -> WalletResult<SessionApproval>;
    async fn request(&self, topic: &str, chain: &str, method: &str, params: Value) -> WalletResult<Value>;
    async fn disconnect(&self, topic: &str) -> WalletResult<()>;
}

// ---------------------------------------------------------------------------
// HTTP relay
// ---------------------------------------------------------------------------

/// Relay client speaking JSON-RPC over HTTP.
pub struct HttpPairingRelay {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpPairingRelay {
    pub fn new(relay_url: &str, project_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/?projectId={project_id}", relay_url.trim_end_matches('/')),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> WalletResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        post_json_rpc(&self.client, &self.url, id, method, params).await
    }
}

#[async_trait]
impl PairingRelay for HttpPairingRelay {
    async fn propose(&self, proposal: &PairingProposal) -> WalletResult<()> {
        self.call(
            "wc_sessionPropose",
            json!({
                "topic": proposal.topic,
                "symKey": proposal.sym_key,
                "relay": { "protocol": RELAY_PROTOCOL },
                "requiredNamespaces": {
                    "eip155": {
                        "chains": proposal.chains,
                        "methods": proposal.methods,
                        "events": ["accountsChanged", "chainChanged"]
                    }
                }
            }),
        )
        .await?;
        Ok(())
    }

    async fn await_approval(&self, topic: &str) -> WalletResult<SessionApproval> {
        let v = self.call("wc_sessionAwait", json!({ "topic": topic })).await?;
        serde_json::from_value(v)
            .map_err(|e| WalletError::Network(format!("unexpected session approval: {e}")))
    }

    async fn request(&self, topic: &str, chain: &str, method: &str, params: Value) -> WalletResult<Value> {
        self.call(
            "wc_sessionRequest",
            json!({
                "topic": topic,
                "chainId": chain,
                "request": { "method": method, "params": params }
            }),
        )
        .await
    }

    async fn disconnect(&self, topic: &str) -> WalletResult<()> {
        self.call("wc_sessionDelete", json!({ "topic": topic })).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session provider
// ---------------------------------------------------------------------------

/// EIP-1193 requests routed to the paired wallet.
pub struct SessionProvider {
    relay: Arc<dyn PairingRelay>,
    topic: String,
    chain: String,
}

#[async_trait]
impl Eip1193Provider for SessionProvider {
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
        debug!(method, "walletconnect session request");
        self.relay.request(&self.topic, &self.chain, method, params).await
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct WalletConnectService {
    project_id: String,
    relay: Arc<dyn PairingRelay>,
    session: RwLock<Option<WalletConnectSession>>,
    pairing_uri: RwLock<Option<String>>,
}

impl WalletConnectService {
    pub fn new(project_id: impl Into<String>, relay: Arc<dyn PairingRelay>) -> WalletResult<Self> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(WalletError::Config("WALLETCONNECT_PROJECT_ID is not set".into()));
        }
        Ok(Self {
            project_id,
            relay,
            session: RwLock::new(None),
            pairing_uri: RwLock::new(None),
        })
    }

    /// Service talking to the HTTP relay at `relay_url` (or the public
    /// default).
    pub fn http(project_id: &str, relay_url: Option<&str>) -> WalletResult<Self> {
        let relay = HttpPairingRelay::new(relay_url.unwrap_or(DEFAULT_RELAY_URL), project_id);
        Self::new(project_id, Arc::new(relay))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Propose a pairing for `network`, hand the `wc:` URI to `on_uri` for
    /// display, and wait for the wallet's approval.
    pub async fn connect<F>(&self, network: &Network, on_uri: F) -> WalletResult<WalletConnectSession>
    where
        F: FnOnce(&str) + Send,
    {
        let proposal = PairingProposal::generate(network);
        self.relay.propose(&proposal).await?;

        let uri = proposal.uri();
        *self.pairing_uri.write() = Some(uri.clone());
        info!(network = %network.id, topic = %proposal.topic, "pairing proposed, waiting for wallet");
        on_uri(&uri);

        let approval = self.relay.await_approval(&proposal.topic).await;
        *self.pairing_uri.write() = None;
        let approval = approval?;

        let mut accounts = Vec::with_capacity(approval.accounts.len());
        for account in &approval.accounts {
            accounts.push(parse_caip10(account)?);
        }
        let (chain_id, address) = accounts
            .into_iter()
            .find(|(chain_id, _)| *chain_id == network.chain_id)
            .ok_or_else(|| {
                WalletError::Validation(format!("wallet did not approve {}", network.name))
            })?;

        let session = WalletConnectSession {
            topic: proposal.topic,
            address,
            chain_id,
            peer_name: approval.peer_name.unwrap_or_else(|| "WalletConnect".into()),
        };
        info!(address = %session.address, peer = %session.peer_name, "walletconnect session established");
        *self.session.write() = Some(session.clone());
        Ok(session)
    }

    /// URI of the pairing currently awaiting approval.
    pub fn pairing_uri(&self) -> Option<String> {
        self.pairing_uri.read().clone()
    }

    pub fn session(&self) -> Option<WalletConnectSession> {
        self.session.read().clone()
    }

    pub fn provider(&self, session: &WalletConnectSession) -> Arc<dyn Eip1193Provider> {
        Arc::new(SessionProvider {
            relay: self.relay.clone(),
            topic: session.topic.clone(),
            chain: caip2(session.chain_id),
        })
    }

    /// End the session. Safe to call without one.
    pub async fn disconnect(&self) {
        let Some(session) = self.session.write().take() else {
            return;
        };
        if let Err(e) = self.relay.disconnect(&session.topic).await {
            warn!(error = %e, "walletconnect session delete failed");
        }
    }
}
