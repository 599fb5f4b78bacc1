use serde::{Deserialize, Serialize};
use wallet_core::{WalletConfig, WalletError, WalletResult};

use crate::network::{Network, builtin_networks};

/// The set of selectable networks with per-network RPC override support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRegistry {
    networks: Vec<Network>,
    custom: Vec<String>,
}

impl NetworkRegistry {
    /// Create a registry populated with the built-in networks and their
    /// default RPC URLs.
    pub fn with_defaults() -> Self {
        Self {
            networks: builtin_networks(),
            custom: Vec::new(),
        }
    }

    /// Built-in networks with the RPC overrides from `config` applied.
    /// Invalid override URLs are skipped with a warning.
    pub fn from_config(config: &WalletConfig) -> Self {
        let mut registry = Self::with_defaults();
        for (id, url) in &config.rpc_urls {
            if let Err(e) = registry.set_custom_rpc(id, url.clone()) {
                tracing::warn!(network = %id, error = %e, "ignoring RPC override");
            }
        }
        registry
    }

    pub fn get(&self, id: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.id == id)
    }

    /// Look up a network or fail with a validation error naming the id.
    pub fn require(&self, id: &str) -> WalletResult<&Network> {
        self.get(id)
            .ok_or_else(|| WalletError::Validation(format!("unknown network: {id}")))
    }

    pub fn by_chain_id(&self, chain_id: u64) -> Option<&Network> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    pub fn all(&self) -> &[Network] {
        &self.networks
    }

    pub fn is_custom(&self, id: &str) -> bool {
        self.custom.iter().any(|c| c == id)
    }

    /// Override the RPC URL for a network with a custom endpoint.
    pub fn set_custom_rpc(&mut self, id: &str, url: String) -> WalletResult<()> {
        if !validate_url(&url) {
            return Err(WalletError::Validation(format!("invalid RPC URL: {url}")));
        }
        let network = self
            .networks
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| WalletError::Validation(format!("unknown network: {id}")))?;
        network.rpc_url = url;
        if !self.custom.iter().any(|c| c == id) {
            self.custom.push(id.to_string());
        }
        Ok(())
    }

    /// Reset a network's RPC URL back to the built-in default.
    pub fn reset_to_default(&mut self, id: &str) {
        let Some(default) = builtin_networks().into_iter().find(|n| n.id == id) else {
            return;
        };
        if let Some(network) = self.networks.iter_mut().find(|n| n.id == id) {
            network.rpc_url = default.rpc_url;
        }
        self.custom.retain(|c| c != id);
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::BUILTIN_NETWORK_IDS;

    #[test]
    fn defaults_cover_all_networks() {
        let registry = NetworkRegistry::with_defaults();
        for id in BUILTIN_NETWORK_IDS {
            assert!(registry.get(id).is_some(), "missing {id}");
            assert!(!registry.is_custom(id));
        }
    }

    #[test]
    fn require_unknown_network_fails() {
        let registry = NetworkRegistry::with_defaults();
        let err = registry.require("invalid-id").unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
    }

    #[test]
    fn by_chain_id() {
        let registry = NetworkRegistry::with_defaults();
        assert_eq!(registry.by_chain_id(11_155_111).unwrap().id, "sepolia");
        assert!(registry.by_chain_id(999_999).is_none());
    }

    #[test]
    fn set_custom_rpc_marks_as_custom() {
        let mut registry = NetworkRegistry::with_defaults();
        registry
            .set_custom_rpc("sepolia", "https://my-node.example.com".into())
            .unwrap();
        assert!(registry.is_custom("sepolia"));
        assert_eq!(registry.get("sepolia").unwrap().rpc_url, "https://my-node.example.com");
    }

    #[test]
    fn set_custom_rpc_rejects_invalid_url() {
        let mut registry = NetworkRegistry::with_defaults();
        assert!(registry.set_custom_rpc("sepolia", "not-a-url".into()).is_err());
        assert!(registry.set_custom_rpc("sepolia", "ftp://files.example.com".into()).is_err());
    }

    #[test]
    fn set_custom_rpc_rejects_unknown_network() {
        let mut registry = NetworkRegistry::with_defaults();
        assert!(registry.set_custom_rpc("nope", "https://x.example.com".into()).is_err());
    }

    #[test]
    fn reset_to_default_restores_original_url() {
        let mut registry = NetworkRegistry::with_defaults();
        let original = registry.get("mainnet").unwrap().rpc_url.clone();
        registry
            .set_custom_rpc("mainnet", "https://custom.example.com".into())
            .unwrap();
        registry.reset_to_default("mainnet");
        assert_eq!(registry.get("mainnet").unwrap().rpc_url, original);
        assert!(!registry.is_custom("mainnet"));
    }

    #[test]
    fn from_config_applies_overrides() {
        let mut config = WalletConfig::default();
        config
            .rpc_urls
            .insert("sepolia".into(), "https://alchemy.example.com/v2/key".into());
        config.rpc_urls.insert("mainnet".into(), "garbage".into());

        let registry = NetworkRegistry::from_config(&config);
        assert_eq!(
            registry.get("sepolia").unwrap().rpc_url,
            "https://alchemy.example.com/v2/key"
        );
        assert!(!registry.is_custom("mainnet"));
    }

    #[test]
    fn validate_url_cases() {
        assert!(validate_url("https://rpc.example.com"));
        assert!(validate_url("http://localhost:8545"));
        assert!(!validate_url(""));
        assert!(!validate_url("not a url"));
        assert!(!validate_url("file:///etc/passwd"));
    }
}
