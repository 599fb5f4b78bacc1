use serde::Serialize;
use tracing::warn;
use wallet_chain::{ConnectedWallet, ConnectionKind, GasEstimate, Network, builtin_networks};

use crate::status::{AsyncStatus, Phase};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub address: Option<String>,
    pub balance: Option<String>,
    pub network: Network,
    /// Networks `SetNetwork` may select from.
    #[serde(skip)]
    pub networks: Vec<Network>,
    pub connection: Option<ConnectionKind>,
    pub wallet_name: Option<String>,
    pub is_connected: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    /// WalletConnect URI waiting to be scanned.
    pub pairing_uri: Option<String>,
    pub gas_estimate: AsyncStatus<GasEstimate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletAction {
    /// Select a network by id. Unknown ids are ignored.
    SetNetwork(String),
    SetLoading(bool),
    SetError(Option<String>),
    SetPairingUri(Option<String>),
    Reset,
    Connect(Phase<ConnectedWallet>),
    FetchBalance(Phase<String>),
    Disconnect(Phase<()>),
    EstimateGas(Phase<GasEstimate>),
}

impl WalletState {
    /// Start on `default_id`, falling back to the first network when the id
    /// is unknown.
    pub fn new(networks: Vec<Network>, default_id: &str) -> Self {
        let network = networks
            .iter()
            .find(|n| n.id == default_id)
            .or_else(|| networks.first())
            .cloned()
            .unwrap_or_else(fallback_network);
        Self {
            address: None,
            balance: None,
            network,
            networks,
            connection: None,
            wallet_name: None,
            is_connected: false,
            is_loading: false,
            error: None,
            pairing_uri: None,
            gas_estimate: AsyncStatus::Idle,
        }
    }

    fn disconnected(&mut self) {
        self.address = None;
        self.balance = None;
        self.connection = None;
        self.wallet_name = None;
        self.is_connected = false;
        self.pairing_uri = None;
        self.gas_estimate = AsyncStatus::Idle;
    }

    pub fn reduce(&mut self, action: WalletAction) {
        match action {
            WalletAction::SetNetwork(id) => match self.networks.iter().find(|n| n.id == id) {
                Some(network) => self.network = network.clone(),
                None => warn!(network = %id, "ignoring unknown network"),
            },
            WalletAction::SetLoading(loading) => self.is_loading = loading,
            WalletAction::SetError(error) => self.error = error,
            WalletAction::SetPairingUri(uri) => self.pairing_uri = uri,
            WalletAction::Reset => {
                let networks = std::mem::take(&mut self.networks);
                let id = self.network.id.clone();
                *self = Self::new(networks, &id);
            }
            WalletAction::Connect(phase) => {
                (self.is_loading, self.error) = phase.flags();
                if let Phase::Fulfilled(wallet) = phase {
                    self.address = Some(wallet.address);
                    self.wallet_name = Some(wallet.wallet_name);
                    self.connection = Some(wallet.kind);
                    self.is_connected = true;
                    self.balance = None;
                    self.pairing_uri = None;
                } else if let Phase::Rejected(_) = phase {
                    self.pairing_uri = None;
                }
            }
            WalletAction::FetchBalance(phase) => {
                (self.is_loading, self.error) = phase.flags();
                if let Phase::Fulfilled(balance) = phase {
                    self.balance = Some(balance);
                }
            }
            WalletAction::Disconnect(phase) => {
                (self.is_loading, self.error) = phase.flags();
                if let Phase::Fulfilled(()) = phase {
                    self.disconnected();
                }
            }
            WalletAction::EstimateGas(phase) => {
                self.error = phase.error().map(str::to_string);
                self.gas_estimate.apply(&phase);
            }
        }
    }
}

impl Default for WalletState {
    fn default() -> Self {
        Self::new(builtin_networks(), "sepolia")
    }
}

fn fallback_network() -> Network {
    Network {
        id: "localhost".into(),
        name: "Localhost".into(),
        rpc_url: "http://127.0.0.1:8545".into(),
        chain_id: 31337,
        currency_symbol: "ETH".into(),
        explorer_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> ConnectedWallet {
        ConnectedWallet {
            address: "0x70997970C51812dc3A010C7d01b50e20d17dc79C".into(),
            wallet_name: "Local Wallet".into(),
            kind: ConnectionKind::Local,
        }
    }

    #[test]
    fn unknown_network_is_ignored() {
        let mut state = WalletState::default();
        assert_eq!(state.network.id, "sepolia");
        state.reduce(WalletAction::SetNetwork("invalid-id".into()));
        assert_eq!(state.network.id, "sepolia");
        assert_eq!(state.network.chain_id, 11155111);
    }

    #[test]
    fn known_network_is_selected() {
        let mut state = WalletState::default();
        state.reduce(WalletAction::SetNetwork("polygon".into()));
        assert_eq!(state.network.chain_id, 137);
    }

    #[test]
    fn connect_lifecycle() {
        let mut state = WalletState::default();
        state.reduce(WalletAction::SetError(Some("old".into())));
        state.reduce(WalletAction::Connect(Phase::Pending));
        assert!(state.is_loading);
        assert!(state.error.is_none());

        state.reduce(WalletAction::Connect(Phase::Fulfilled(connected())));
        assert!(!state.is_loading);
        assert!(state.is_connected);
        assert_eq!(state.connection, Some(ConnectionKind::Local));
        assert_eq!(state.wallet_name.as_deref(), Some("Local Wallet"));
    }

    #[test]
    fn connect_rejected_sets_error() {
        let mut state = WalletState::default();
        state.reduce(WalletAction::Connect(Phase::Pending));
        state.reduce(WalletAction::Connect(Phase::Rejected("No wallet".into())));
        assert!(!state.is_loading);
        assert!(!state.is_connected);
        assert_eq!(state.error.as_deref(), Some("No wallet"));
    }

    #[test]
    fn disconnect_clears_session_but_keeps_network() {
        let mut state = WalletState::default();
        state.reduce(WalletAction::SetNetwork("holesky".into()));
        state.reduce(WalletAction::Connect(Phase::Fulfilled(connected())));
        state.reduce(WalletAction::FetchBalance(Phase::Fulfilled("1.5".into())));
        state.reduce(WalletAction::Disconnect(Phase::Fulfilled(())));
        assert!(state.address.is_none());
        assert!(state.balance.is_none());
        assert!(!state.is_connected);
        assert_eq!(state.network.id, "holesky");
    }

    #[test]
    fn reset_keeps_network_list() {
        let mut state = WalletState::default();
        state.reduce(WalletAction::SetNetwork("amoy".into()));
        state.reduce(WalletAction::Connect(Phase::Fulfilled(connected())));
        state.reduce(WalletAction::Reset);
        assert!(!state.is_connected);
        assert_eq!(state.network.id, "amoy");
        state.reduce(WalletAction::SetNetwork("mainnet".into()));
        assert_eq!(state.network.id, "mainnet");
    }

    #[test]
    fn unknown_default_falls_back_to_first() {
        let state = WalletState::new(builtin_networks(), "nope");
        assert_eq!(state.network.id, builtin_networks()[0].id);
    }
}
