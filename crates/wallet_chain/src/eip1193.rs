//! EIP-1193 provider seam for externally held keys (browser extension
//! bridge, WalletConnect session).

use alloy_primitives::Address;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};
use wallet_core::{WalletError, WalletResult};

use crate::network::Network;

/// User rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// The requested chain has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// `request({ method, params })` of an injected Ethereum provider.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value>;
}

/// Ask the provider for account access and return the selected account.
pub async fn request_accounts(provider: &dyn Eip1193Provider) -> WalletResult<Address> {
    let value = provider.request("eth_requestAccounts", json!([])).await?;
    let accounts: Vec<Address> = serde_json::from_value(value)
        .map_err(|e| WalletError::Network(format!("unexpected eth_requestAccounts result: {e}")))?;
    accounts
        .into_iter()
        .next()
        .ok_or_else(|| WalletError::NotInitialized("wallet returned no accounts".into()))
}

/// `wallet_addEthereumChain` parameters for `network`.
pub fn add_chain_params(network: &Network) -> Value {
    let mut params = json!({
        "chainId": network.chain_id_hex(),
        "chainName": network.name,
        "rpcUrls": [network.rpc_url],
        "nativeCurrency": {
            "name": network.currency_symbol,
            "symbol": network.currency_symbol,
            "decimals": 18
        }
    });
    if let Some(explorer) = &network.explorer_url {
        params["blockExplorerUrls"] = json!([explorer]);
    }
    params
}

/// Switch the provider to `network`, registering the chain first when the
/// wallet does not know it yet.
pub async fn switch_chain(provider: &dyn Eip1193Provider, network: &Network) -> WalletResult<()> {
    let switch = json!([{ "chainId": network.chain_id_hex() }]);
    match provider
        .request("wallet_switchEthereumChain", switch.clone())
        .await
    {
        Ok(_) => Ok(()),
        Err(WalletError::Rpc { code: UNRECOGNIZED_CHAIN, .. }) => {
            info!(network = %network.id, "chain unknown to wallet, adding it");
            provider
                .request("wallet_addEthereumChain", json!([add_chain_params(network)]))
                .await?;
            provider.request("wallet_switchEthereumChain", switch).await?;
            debug!(network = %network.id, "switched after add");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
