use std::sync::Arc;

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_primitives::{Address, B256, Bytes, TxKind, U256};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use wallet_core::{WalletError, WalletResult};

use crate::eip1193::Eip1193Provider;
use crate::rpc::EthRpc;

/// How the active wallet holds its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Local,
    External,
    WalletConnect,
}

/// A fully priced transaction ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTx {
    pub chain_id: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: u64,
    /// Wei.
    pub gas_price: u128,
}

/// Signs and broadcasts transactions for one account.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;
    fn kind(&self) -> ConnectionKind;
    /// Display name of the wallet behind the signer.
    fn name(&self) -> &str;
    async fn send_transaction(&self, tx: PreparedTx, rpc: &dyn EthRpc) -> WalletResult<B256>;
}

// ---------------------------------------------------------------------------
// Local key
// ---------------------------------------------------------------------------

/// Signs in-process with a private key from configuration.
pub struct LocalKeySigner {
    signer: PrivateKeySigner,
}

impl LocalKeySigner {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(key: &str) -> WalletResult<Self> {
        let signer = key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|_| WalletError::Config("PRIVATE_KEY is not a valid private key".into()))?;
        Ok(Self { signer })
    }

    /// Sign `tx` with `nonce` and return the EIP-2718 encoded envelope.
    pub fn sign_legacy(&self, tx: &PreparedTx, nonce: u64) -> WalletResult<Bytes> {
        let mut legacy = TxLegacy {
            chain_id: Some(tx.chain_id),
            nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: TxKind::Call(tx.to),
            value: tx.value,
            input: tx.data.clone(),
        };
        let signature = self
            .signer
            .sign_transaction_sync(&mut legacy)
            .map_err(|e| WalletError::Send(format!("signing failed: {e}")))?;
        let envelope = TxEnvelope::Legacy(legacy.into_signed(signature));
        Ok(envelope.encoded_2718().into())
    }
}

#[async_trait]
impl WalletSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    fn kind(&self) -> ConnectionKind {
        ConnectionKind::Local
    }

    fn name(&self) -> &str {
        "Local Wallet"
    }

    async fn send_transaction(&self, tx: PreparedTx, rpc: &dyn EthRpc) -> WalletResult<B256> {
        let nonce = rpc.transaction_count(self.address()).await?;
        let raw = self.sign_legacy(&tx, nonce)?;
        debug!(nonce, to = %tx.to, "broadcasting signed transaction");
        rpc.send_raw_transaction(raw).await
    }
}

// ---------------------------------------------------------------------------
// Remote (EIP-1193) signer
// ---------------------------------------------------------------------------

/// Delegates signing to a provider that holds the key, via
/// `eth_sendTransaction`.
pub struct ProviderSigner {
    provider: Arc<dyn Eip1193Provider>,
    address: Address,
    kind: ConnectionKind,
    name: String,
}

impl ProviderSigner {
    pub fn new(
        provider: Arc<dyn Eip1193Provider>,
        address: Address,
        kind: ConnectionKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            address,
            kind,
            name: name.into(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn Eip1193Provider> {
        &self.provider
    }
}

pub(crate) fn send_transaction_params(from: Address, tx: &PreparedTx) -> Value {
    json!([{
        "from": from,
        "to": tx.to,
        "value": tx.value,
        "data": tx.data,
        "gas": format!("0x{:x}", tx.gas_limit),
        "gasPrice": format!("0x{:x}", tx.gas_price),
        "chainId": format!("0x{:x}", tx.chain_id),
    }])
}

#[async_trait]
impl WalletSigner for ProviderSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn kind(&self) -> ConnectionKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn send_transaction(&self, tx: PreparedTx, _rpc: &dyn EthRpc) -> WalletResult<B256> {
        let value = self
            .provider
            .request("eth_sendTransaction", send_transaction_params(self.address, &tx))
            .await?;
        serde_json::from_value(value)
            .map_err(|e| WalletError::Network(format!("unexpected eth_sendTransaction result: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEip1193, MockRpc};

    const HARDHAT_KEY_1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn tx() -> PreparedTx {
        PreparedTx {
            chain_id: 31_337,
            to: Address::repeat_byte(0x11),
            value: U256::from(1_000u64),
            data: Bytes::new(),
            gas_limit: 23_100,
            gas_price: 24_000_000_000,
        }
    }

    #[test]
    fn derives_address_from_key() {
        let signer = LocalKeySigner::from_hex(HARDHAT_KEY_1).unwrap();
        assert_eq!(
            signer.address().to_string(),
            "0x70997970C51812dc3A010C7d01b50e20d17dc79C"
        );
        assert_eq!(signer.kind(), ConnectionKind::Local);
    }

    #[test]
    fn invalid_key_is_config_error() {
        assert!(matches!(
            LocalKeySigner::from_hex("0x1234"),
            Err(WalletError::Config(_))
        ));
    }

    #[test]
    fn legacy_envelope_is_rlp_list() {
        let signer = LocalKeySigner::from_hex(HARDHAT_KEY_1).unwrap();
        let raw = signer.sign_legacy(&tx(), 7).unwrap();
        // Legacy transactions are untyped: the envelope is a bare RLP list.
        assert!(raw[0] >= 0xc0);
    }

    #[tokio::test]
    async fn local_signer_uses_pending_nonce_and_broadcasts() {
        let rpc = MockRpc::new();
        let signer = LocalKeySigner::from_hex(HARDHAT_KEY_1).unwrap();
        let hash = signer.send_transaction(tx(), &rpc).await.unwrap();
        assert_eq!(hash, rpc.next_hash());
        assert_eq!(rpc.sent_raw().len(), 1);
    }

    #[tokio::test]
    async fn provider_signer_sends_hex_fields() {
        let provider = Arc::new(MockEip1193::new());
        let signer = ProviderSigner::new(
            provider.clone(),
            Address::repeat_byte(0x22),
            ConnectionKind::External,
            "Browser Wallet",
        );
        let rpc = MockRpc::new();
        signer.send_transaction(tx(), &rpc).await.unwrap();

        let (method, params) = provider.requests().remove(0);
        assert_eq!(method, "eth_sendTransaction");
        assert_eq!(params[0]["gas"], "0x5a3c");
        assert_eq!(params[0]["value"], "0x3e8");
        assert!(rpc.sent_raw().is_empty());
    }
}
