use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};
use wallet_chain::{BUILTIN_NETWORK_IDS, NetworkRegistry, WalletService};
use wallet_contracts::deploy::remote::DEFAULT_DEPLOY_API_URL;
use wallet_contracts::{
    ContractDeployer, ContractStorage, DeployRequest, DeployResult, LocalCliDeployer, RemoteDeployer,
};
use wallet_core::{ConfigManager, DeployStrategy, WalletConfig, WalletResult};
use wallet_state::{AppState, Services, Store, Thunks};

// ---------------------------------------------------------------------------
// AppContext
// ---------------------------------------------------------------------------

/// Everything the binary needs, wired together once at startup.
pub struct AppContext {
    pub config: Arc<ConfigManager>,
    pub networks: NetworkRegistry,
    pub thunks: Thunks,
}

impl AppContext {
    /// Load `~/.web3-wallet/settings.json` plus the environment and build
    /// the services on top of it.
    pub fn load() -> Result<Self> {
        let manager = ConfigManager::new(BUILTIN_NETWORK_IDS)?;
        Self::from_manager(manager)
    }

    pub fn from_manager(manager: ConfigManager) -> Result<Self> {
        let manager = Arc::new(manager);
        let config = manager.get();
        let networks = NetworkRegistry::from_config(&config);

        let wallet = Arc::new(WalletService::from_config(&config));
        let storage = Arc::new(
            ContractStorage::from_config(&config).context("Failed to open contract storage")?,
        );
        let deployer: Arc<dyn ContractDeployer> = Arc::new(ConfiguredDeployer {
            config: manager.clone(),
        });
        info!(
            network = %config.default_network,
            strategy = ?config.deploy_strategy,
            "wallet services ready"
        );

        let store = Store::new(AppState::new(&config, networks.all().to_vec()));
        let services = Services::new(wallet, storage, deployer).with_config(manager.clone());

        Ok(Self {
            config: manager,
            networks,
            thunks: Thunks::new(store, services),
        })
    }

    pub fn store(&self) -> &Store {
        self.thunks.store()
    }
}

fn deployer_for(config: &WalletConfig) -> WalletResult<Box<dyn ContractDeployer>> {
    Ok(match config.deploy_strategy {
        DeployStrategy::Remote => {
            let url = config
                .deploy_api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_DEPLOY_API_URL.to_string());
            Box::new(RemoteDeployer::with_base_url(url))
        }
        DeployStrategy::Local => Box::new(LocalCliDeployer::from_config(config)?),
    })
}

/// Picks the deployer from the current settings on every deploy, so a
/// strategy that cannot be built only fails the deploy itself.
struct ConfiguredDeployer {
    config: Arc<ConfigManager>,
}

#[async_trait]
impl ContractDeployer for ConfiguredDeployer {
    fn strategy(&self) -> DeployStrategy {
        self.config.get().deploy_strategy
    }

    async fn deploy(&self, request: &DeployRequest) -> WalletResult<DeployResult> {
        let deployer = deployer_for(&self.config.get())?;
        debug!(strategy = ?deployer.strategy(), "deployer selected");
        deployer.deploy(request).await
    }
}
