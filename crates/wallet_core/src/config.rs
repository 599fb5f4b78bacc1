use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable names read by [`WalletConfig::apply_env`].
pub const ENV_PRIVATE_KEY: &str = "PRIVATE_KEY";
pub const ENV_DEFAULT_NETWORK: &str = "DEFAULT_NETWORK";
pub const ENV_WALLETCONNECT_PROJECT_ID: &str = "WALLETCONNECT_PROJECT_ID";
pub const ENV_WALLETCONNECT_RELAY_URL: &str = "WALLETCONNECT_RELAY_URL";
pub const ENV_DEPLOY_API_URL: &str = "DEPLOY_API_URL";
pub const ENV_EXTERNAL_WALLET_URL: &str = "EXTERNAL_WALLET_URL";
pub const ENV_CONTRACTS_FILE: &str = "CONTRACTS_FILE";
pub const ENV_HARDHAT_PROJECT_DIR: &str = "HARDHAT_PROJECT_DIR";

pub const MIN_GAS_BUFFER: f64 = 1.0;
pub const MAX_GAS_BUFFER: f64 = 3.0;

/// Clamp a gas buffer multiplier into the supported `1.0..=3.0` range.
/// Non-finite input falls back to the lower bound.
pub fn clamp_gas_buffer(multiplier: f64) -> f64 {
    if multiplier.is_finite() {
        multiplier.clamp(MIN_GAS_BUFFER, MAX_GAS_BUFFER)
    } else {
        MIN_GAS_BUFFER
    }
}

/// Name of the `<NETWORK>_RPC_URL` variable for a network id,
/// e.g. `sepolia` -> `SEPOLIA_RPC_URL`.
pub fn rpc_env_var(network_id: &str) -> String {
    format!("{}_RPC_URL", network_id.to_uppercase().replace('-', "_"))
}

/// How contracts are deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStrategy {
    /// POST to the deployment API.
    #[default]
    Remote,
    /// Run the local Hardhat scripts.
    Local,
}

// ---------------------------------------------------------------------------
// WalletConfig
// ---------------------------------------------------------------------------

/// Application configuration stored at `~/.web3-wallet/settings.json`.
///
/// Secrets and endpoints come from the process environment and are
/// **never** written to the settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    #[serde(skip)]
    pub private_key: Option<String>,
    #[serde(skip)]
    pub walletconnect_project_id: Option<String>,
    #[serde(skip)]
    pub walletconnect_relay_url: Option<String>,
    #[serde(skip)]
    pub deploy_api_url: Option<String>,
    #[serde(skip)]
    pub external_wallet_url: Option<String>,
    /// Per-network RPC URL overrides keyed by network id.
    #[serde(skip)]
    pub rpc_urls: HashMap<String, String>,

    // Network & gas
    pub default_network: String,
    pub gas_buffer_multiplier: f64,

    // Deployment
    pub deploy_strategy: DeployStrategy,
    pub auto_verify: bool,
    pub hardhat_project_dir: Option<PathBuf>,
    pub deploy_timeout_secs: u64,
    pub verify_timeout_secs: u64,

    // Storage
    pub contracts_path: Option<PathBuf>,

    // General
    pub log_level: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            walletconnect_project_id: None,
            walletconnect_relay_url: None,
            deploy_api_url: None,
            external_wallet_url: None,
            rpc_urls: HashMap::new(),
            default_network: "sepolia".into(),
            gas_buffer_multiplier: 1.2,
            deploy_strategy: DeployStrategy::Remote,
            auto_verify: false,
            hardhat_project_dir: None,
            deploy_timeout_secs: 300,
            verify_timeout_secs: 180,
            contracts_path: None,
            log_level: "info".into(),
        }
    }
}

impl WalletConfig {
    /// Returns the base config directory: `~/.web3-wallet/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".web3-wallet"))
    }

    /// Returns the settings file path: `~/.web3-wallet/settings.json`
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("settings.json"))
    }

    /// Returns the logs directory: `~/.web3-wallet/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        for dir in [Self::base_dir()?, Self::logs_dir()?] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Where deployed contracts are persisted, honoring the configured path.
    pub fn resolved_contracts_path(&self) -> Result<PathBuf> {
        match &self.contracts_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::base_dir()?.join("contracts.json")),
        }
    }

    /// The settings file as stored, without the environment overlay.
    pub fn load_stored() -> Result<Self> {
        Self::ensure_dirs()?;
        Self::load_from_path(&Self::settings_path()?)
    }

    /// Copy every persisted field that differs between `before` and
    /// `after` into `self`. Secrets and endpoints are left alone.
    fn merge_changes(&mut self, before: &Self, after: &Self) {
        macro_rules! take_changed {
            ($($field:ident),* $(,)?) => {
                $(if before.$field != after.$field {
                    self.$field = after.$field.clone();
                })*
            };
        }
        take_changed!(
            default_network,
            gas_buffer_multiplier,
            deploy_strategy,
            auto_verify,
            hardhat_project_dir,
            deploy_timeout_secs,
            verify_timeout_secs,
            contracts_path,
            log_level,
        );
    }

    /// Load config from a specific file path, creating a default file if it
    /// is missing.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings: {}", path.display()))?;
            let mut config: Self = serde_json::from_str(&content)
                .with_context(|| "Failed to parse settings.json")?;
            config.gas_buffer_multiplier = clamp_gas_buffer(config.gas_buffer_multiplier);
            info!("Loaded settings from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default settings at {}", path.display());
            Ok(config)
        }
    }

    /// Save config to a specific file path (secrets are excluded via
    /// `#[serde(skip)]`).
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }

    /// Overlay values from the environment. `lookup` is usually
    /// `|k| std::env::var(k).ok()`; tests pass a map instead.
    ///
    /// `network_ids` lists the networks whose `<ID>_RPC_URL` variables are
    /// consulted.
    pub fn apply_env<F>(&mut self, network_ids: &[&str], lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = non_empty(ENV_PRIVATE_KEY) {
            self.private_key = Some(key);
        }
        if let Some(network) = non_empty(ENV_DEFAULT_NETWORK) {
            self.default_network = network;
        }
        if let Some(id) = non_empty(ENV_WALLETCONNECT_PROJECT_ID) {
            self.walletconnect_project_id = Some(id);
        }
        if let Some(url) = non_empty(ENV_WALLETCONNECT_RELAY_URL) {
            self.walletconnect_relay_url = Some(url);
        }
        if let Some(url) = non_empty(ENV_DEPLOY_API_URL) {
            self.deploy_api_url = Some(url);
        }
        if let Some(url) = non_empty(ENV_EXTERNAL_WALLET_URL) {
            self.external_wallet_url = Some(url);
        }
        if let Some(path) = non_empty(ENV_CONTRACTS_FILE) {
            self.contracts_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = non_empty(ENV_HARDHAT_PROJECT_DIR) {
            self.hardhat_project_dir = Some(PathBuf::from(dir));
        }
        for id in network_ids {
            if let Some(url) = non_empty(&rpc_env_var(id)) {
                self.rpc_urls.insert((*id).to_string(), url);
            }
        }
    }

    /// The RPC override for a network, if one was configured.
    pub fn rpc_url_for(&self, network_id: &str) -> Option<&str> {
        self.rpc_urls.get(network_id).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// ConfigManager
// ---------------------------------------------------------------------------

/// Thread-safe config holder. Updates are persisted immediately.
///
/// Two copies are kept: the file contents and the effective config with the
/// environment overlaid. Only changes made through [`ConfigManager::update`]
/// reach the file, so environment values never get written back.
pub struct ConfigManager {
    config: RwLock<WalletConfig>,
    stored: RwLock<WalletConfig>,
    path: PathBuf,
}

impl ConfigManager {
    /// Load `~/.web3-wallet/settings.json` and overlay the process
    /// environment.
    pub fn new(network_ids: &[&str]) -> Result<Self> {
        WalletConfig::ensure_dirs()?;
        let path = WalletConfig::settings_path()?;
        Self::load(&path, network_ids, |k| std::env::var(k).ok())
    }

    /// Load from an explicit path with an explicit environment lookup.
    pub fn load<F>(path: &Path, network_ids: &[&str], lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let stored = WalletConfig::load_from_path(path)?;
        let mut config = stored.clone();
        config.apply_env(network_ids, lookup);
        if config.private_key.is_none() {
            warn!("{ENV_PRIVATE_KEY} is not set; local key connections are unavailable");
        }
        Ok(Self {
            config: RwLock::new(config),
            stored: RwLock::new(stored),
            path: path.to_path_buf(),
        })
    }

    /// Get a clone of the current config (including environment values).
    pub fn get(&self) -> WalletConfig {
        self.config.read().clone()
    }

    /// Mutate the config and persist the fields `f` changed.
    pub fn update(&self, f: impl FnOnce(&mut WalletConfig)) -> Result<()> {
        let mut config = self.config.write();
        let before = config.clone();
        f(&mut config);
        config.gas_buffer_multiplier = clamp_gas_buffer(config.gas_buffer_multiplier);

        let mut stored = self.stored.write();
        stored.merge_changes(&before, &config);
        stored.save_to_path(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let config = WalletConfig::default();
        assert_eq!(config.default_network, "sepolia");
        assert_eq!(config.gas_buffer_multiplier, 1.2);
        assert_eq!(config.deploy_strategy, DeployStrategy::Remote);
        assert!(config.private_key.is_none());
    }

    #[test]
    fn clamp_gas_buffer_bounds() {
        assert_eq!(clamp_gas_buffer(0.5), 1.0);
        assert_eq!(clamp_gas_buffer(1.5), 1.5);
        assert_eq!(clamp_gas_buffer(9.0), 3.0);
        assert_eq!(clamp_gas_buffer(f64::NAN), 1.0);
    }

    #[test]
    fn rpc_env_var_names() {
        assert_eq!(rpc_env_var("sepolia"), "SEPOLIA_RPC_URL");
        assert_eq!(rpc_env_var("polygon-amoy"), "POLYGON_AMOY_RPC_URL");
    }

    #[test]
    fn apply_env_reads_secrets_and_overrides() {
        let mut config = WalletConfig::default();
        config.apply_env(
            &["sepolia", "mainnet"],
            env_from(&[
                ("PRIVATE_KEY", "0xabc"),
                ("DEFAULT_NETWORK", "mainnet"),
                ("WALLETCONNECT_PROJECT_ID", "proj-1"),
                ("SEPOLIA_RPC_URL", "https://sepolia.example.com"),
                ("DEPLOY_API_URL", "http://localhost:4000"),
            ]),
        );
        assert_eq!(config.private_key.as_deref(), Some("0xabc"));
        assert_eq!(config.default_network, "mainnet");
        assert_eq!(config.walletconnect_project_id.as_deref(), Some("proj-1"));
        assert_eq!(config.rpc_url_for("sepolia"), Some("https://sepolia.example.com"));
        assert_eq!(config.rpc_url_for("mainnet"), None);
        assert_eq!(config.deploy_api_url.as_deref(), Some("http://localhost:4000"));
    }

    #[test]
    fn apply_env_ignores_blank_values() {
        let mut config = WalletConfig::default();
        config.apply_env(&[], env_from(&[("PRIVATE_KEY", "   "), ("DEFAULT_NETWORK", "")]));
        assert!(config.private_key.is_none());
        assert_eq!(config.default_network, "sepolia");
    }

    #[test]
    fn secrets_are_never_serialized() {
        let config = WalletConfig {
            private_key: Some("0xdeadbeef".into()),
            walletconnect_project_id: Some("proj".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("deadbeef"));
        assert!(!json.contains("proj"));
    }

    #[test]
    fn load_from_path_creates_default_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let config = WalletConfig::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.default_network, "sepolia");
    }

    #[test]
    fn load_from_path_clamps_multiplier() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"gas_buffer_multiplier": 7.5}"#).unwrap();
        let config = WalletConfig::load_from_path(&path).unwrap();
        assert_eq!(config.gas_buffer_multiplier, 3.0);
    }

    #[test]
    fn manager_update_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        let manager = ConfigManager::load(&path, &[], env_from(&[])).unwrap();
        manager
            .update(|c| {
                c.auto_verify = true;
                c.gas_buffer_multiplier = 0.2;
            })
            .unwrap();

        let reloaded = WalletConfig::load_from_path(&path).unwrap();
        assert!(reloaded.auto_verify);
        assert_eq!(reloaded.gas_buffer_multiplier, 1.0);
    }

    #[test]
    fn env_overrides_are_not_written_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        let manager = ConfigManager::load(
            &path,
            &[],
            env_from(&[("DEFAULT_NETWORK", "holesky"), ("CONTRACTS_FILE", "/tmp/c.json")]),
        )
        .unwrap();
        assert_eq!(manager.get().default_network, "holesky");
        manager.update(|c| c.auto_verify = true).unwrap();

        let reloaded = ConfigManager::load(&path, &[], env_from(&[])).unwrap().get();
        assert!(reloaded.auto_verify);
        assert_eq!(reloaded.default_network, "sepolia");
        assert!(reloaded.contracts_path.is_none());
    }

    #[test]
    fn explicit_change_to_env_backed_field_is_persisted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        let manager =
            ConfigManager::load(&path, &[], env_from(&[("DEFAULT_NETWORK", "holesky")])).unwrap();
        manager.update(|c| c.default_network = "mainnet".into()).unwrap();

        let reloaded = WalletConfig::load_from_path(&path).unwrap();
        assert_eq!(reloaded.default_network, "mainnet");
    }

    #[test]
    fn manager_keeps_env_values_in_memory_only() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        let manager =
            ConfigManager::load(&path, &[], env_from(&[("PRIVATE_KEY", "0x11")])).unwrap();
        manager.update(|c| c.log_level = "debug".into()).unwrap();

        assert_eq!(manager.get().private_key.as_deref(), Some("0x11"));
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("0x11"));
    }
}
