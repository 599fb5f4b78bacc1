use serde::Serialize;
use wallet_core::{DeployStrategy, WalletConfig, clamp_gas_buffer};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsState {
    /// Always within `1.0..=3.0`.
    pub gas_buffer_multiplier: f64,
    pub default_network: String,
    pub auto_verify: bool,
    pub deploy_strategy: DeployStrategy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsAction {
    SetGasBufferMultiplier(f64),
    SetDefaultNetwork(String),
    SetAutoVerify(bool),
    SetDeployStrategy(DeployStrategy),
}

impl SettingsState {
    pub fn from_config(config: &WalletConfig) -> Self {
        Self {
            gas_buffer_multiplier: clamp_gas_buffer(config.gas_buffer_multiplier),
            default_network: config.default_network.clone(),
            auto_verify: config.auto_verify,
            deploy_strategy: config.deploy_strategy,
        }
    }

    /// Copy the settings into `config` for persisting.
    pub fn write_to(&self, config: &mut WalletConfig) {
        config.gas_buffer_multiplier = self.gas_buffer_multiplier;
        config.default_network = self.default_network.clone();
        config.auto_verify = self.auto_verify;
        config.deploy_strategy = self.deploy_strategy;
    }

    pub fn reduce(&mut self, action: SettingsAction) {
        match action {
            SettingsAction::SetGasBufferMultiplier(m) => self.gas_buffer_multiplier = clamp_gas_buffer(m),
            SettingsAction::SetDefaultNetwork(id) => self.default_network = id,
            SettingsAction::SetAutoVerify(on) => self.auto_verify = on,
            SettingsAction::SetDeployStrategy(strategy) => self.deploy_strategy = strategy,
        }
    }
}

impl Default for SettingsState {
    fn default() -> Self {
        Self::from_config(&WalletConfig::default())
    }
}
