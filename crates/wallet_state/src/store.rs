use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::trace;
use wallet_chain::{Network, builtin_networks};
use wallet_core::WalletConfig;

use crate::slices::contract::{ContractAction, ContractState};
use crate::slices::settings::{SettingsAction, SettingsState};
use crate::slices::toast::{ToastState, ToastsAction};
use crate::slices::transaction::{TransactionAction, TransactionState};
use crate::slices::wallet::{WalletAction, WalletState};

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppState {
    pub wallet: WalletState,
    pub transaction: TransactionState,
    pub contract: ContractState,
    pub settings: SettingsState,
    pub toast: ToastState,
}

#[derive(Debug, Clone)]
pub enum Action {
    Wallet(WalletAction),
    Transaction(TransactionAction),
    Contract(ContractAction),
    Settings(SettingsAction),
    Toast(ToastsAction),
}

macro_rules! action_from {
    ($($slice:ident => $variant:ident),* $(,)?) => {
        $(impl From<$slice> for Action {
            fn from(action: $slice) -> Self {
                Action::$variant(action)
            }
        })*
    };
}

action_from! {
    WalletAction => Wallet,
    TransactionAction => Transaction,
    ContractAction => Contract,
    SettingsAction => Settings,
    ToastsAction => Toast,
}

impl AppState {
    /// Initial state for the given configuration and network list.
    pub fn new(config: &WalletConfig, networks: Vec<Network>) -> Self {
        Self {
            wallet: WalletState::new(networks, &config.default_network),
            settings: SettingsState::from_config(config),
            ..Self::default()
        }
    }

    pub fn from_config(config: &WalletConfig) -> Self {
        Self::new(config, builtin_networks())
    }

    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::Wallet(a) => self.wallet.reduce(a),
            Action::Transaction(a) => self.transaction.reduce(a),
            Action::Contract(a) => self.contract.reduce(a),
            Action::Settings(a) => self.settings.reduce(a),
            Action::Toast(a) => self.toast.reduce(a),
        }
    }
}

/// The single source of truth. Cloning yields another handle to the same
/// state.
#[derive(Clone)]
pub struct Store {
    tx: Arc<watch::Sender<AppState>>,
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Apply `action` and notify subscribers.
    pub fn dispatch(&self, action: impl Into<Action>) {
        let action = action.into();
        trace!(?action, "dispatch");
        self.tx.send_modify(|state| state.reduce(action));
    }

    /// Snapshot of the whole state.
    pub fn state(&self) -> AppState {
        self.tx.borrow().clone()
    }

    /// Read part of the state without cloning all of it.
    pub fn select<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Phase;

    #[test]
    fn dispatch_routes_to_slice() {
        let store = Store::default();
        store.dispatch(WalletAction::SetNetwork("mainnet".into()));
        store.dispatch(SettingsAction::SetAutoVerify(true));
        let state = store.state();
        assert_eq!(state.wallet.network.id, "mainnet");
        assert!(state.settings.auto_verify);
    }

    #[test]
    fn invalid_network_leaves_state_unchanged() {
        let store = Store::default();
        let before = store.select(|s| s.wallet.network.clone());
        store.dispatch(WalletAction::SetNetwork("invalid-id".into()));
        assert_eq!(store.select(|s| s.wallet.network.clone()), before);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let store = Store::default();
        let mut rx = store.subscribe();
        let handle = store.clone();
        tokio::spawn(async move {
            handle.dispatch(ContractAction::Load(Phase::Pending));
        });
        rx.changed().await.unwrap();
        assert!(rx.borrow().contract.is_loading);
    }

    #[test]
    fn initial_state_follows_config() {
        let config = WalletConfig {
            default_network: "holesky".into(),
            gas_buffer_multiplier: 2.0,
            ..WalletConfig::default()
        };
        let state = AppState::from_config(&config);
        assert_eq!(state.wallet.network.id, "holesky");
        assert_eq!(state.settings.gas_buffer_multiplier, 2.0);
    }
}
