use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifiers of the networks shipped with the wallet.
pub const BUILTIN_NETWORK_IDS: &[&str] =
    &["mainnet", "sepolia", "holesky", "polygon", "amoy", "localhost"];

/// Static reference data for an EVM network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    pub name: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub currency_symbol: String,
    pub explorer_url: Option<String>,
}

impl Network {
    fn builtin(
        id: &str,
        name: &str,
        chain_id: u64,
        rpc_url: &str,
        currency_symbol: &str,
        explorer_url: Option<&str>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            rpc_url: rpc_url.to_string(),
            chain_id,
            currency_symbol: currency_symbol.to_string(),
            explorer_url: explorer_url.map(str::to_string),
        }
    }

    /// `0x`-prefixed chain id, as EIP-1193 wallets expect it.
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    /// Whether this network settles real value.
    pub fn is_testnet(&self) -> bool {
        !matches!(self.chain_id, 1 | 137)
    }

    /// Explorer link for a transaction hash, when the network has one.
    pub fn tx_url(&self, hash: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{hash}", base.trim_end_matches('/')))
    }

    /// Explorer link for an address, when the network has one.
    pub fn address_url(&self, address: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/address/{address}", base.trim_end_matches('/')))
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Returns the default configuration for every built-in network, in
/// display order.
pub fn builtin_networks() -> Vec<Network> {
    vec![
        Network::builtin(
            "mainnet",
            "Ethereum Mainnet",
            1,
            "https://eth.llamarpc.com",
            "ETH",
            Some("https://etherscan.io"),
        ),
        Network::builtin(
            "sepolia",
            "Sepolia Testnet",
            11_155_111,
            "https://rpc.sepolia.org",
            "ETH",
            Some("https://sepolia.etherscan.io"),
        ),
        Network::builtin(
            "holesky",
            "Holesky Testnet",
            17_000,
            "https://ethereum-holesky-rpc.publicnode.com",
            "ETH",
            Some("https://holesky.etherscan.io"),
        ),
        Network::builtin(
            "polygon",
            "Polygon Mainnet",
            137,
            "https://polygon-rpc.com",
            "POL",
            Some("https://polygonscan.com"),
        ),
        Network::builtin(
            "amoy",
            "Polygon Amoy Testnet",
            80_002,
            "https://rpc-amoy.polygon.technology",
            "POL",
            Some("https://amoy.polygonscan.com"),
        ),
        Network::builtin(
            "localhost",
            "Hardhat Local",
            31_337,
            "http://127.0.0.1:8545",
            "ETH",
            None,
        ),
    ]
}
