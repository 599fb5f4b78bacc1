//! Async operations that drive the store: each dispatches `Pending`, calls
//! a service, then dispatches `Fulfilled` or `Rejected`. A rejection also
//! raises an error toast. Nothing is retried and concurrent calls are not
//! serialized; whichever resolves last wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wallet_chain::{
    ConnectedWallet, ConnectionKind, GasEstimate, StatusUpdate, TokenInfo, TransactionRecord,
    TransactionService, WalletService,
};
use wallet_contracts::{ContractDeployer, ContractParams, ContractStorage};
use wallet_core::{ConfigManager, Toast, WalletError, WalletResult};

use crate::slices::contract::{ContractAction, DeployedContract, Deployment};
use crate::slices::settings::SettingsAction;
use crate::slices::toast::ToastsAction;
use crate::slices::transaction::TransactionAction;
use crate::slices::wallet::WalletAction;
use crate::status::Phase;
use crate::store::{Action, Store};

/// Everything the thunks call into.
pub struct Services {
    pub wallet: Arc<WalletService>,
    pub transactions: Arc<TransactionService>,
    pub contracts: Arc<ContractStorage>,
    pub deployer: Arc<dyn ContractDeployer>,
    /// Where settings changes are persisted, if anywhere.
    pub config: Option<Arc<ConfigManager>>,
}

impl Services {
    pub fn new(
        wallet: Arc<WalletService>,
        contracts: Arc<ContractStorage>,
        deployer: Arc<dyn ContractDeployer>,
    ) -> Self {
        Self {
            transactions: Arc::new(TransactionService::new(wallet.clone())),
            wallet,
            contracts,
            deployer,
            config: None,
        }
    }

    pub fn with_config(mut self, config: Arc<ConfigManager>) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Clone)]
pub struct Thunks {
    store: Store,
    services: Arc<Services>,
}

impl Thunks {
    pub fn new(store: Store, services: Services) -> Self {
        Self {
            store,
            services: Arc::new(services),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run `op` through the pending / fulfilled / rejected cycle.
    async fn run<T, A, F, Fut>(&self, name: &str, to_action: F, op: Fut) -> WalletResult<T>
    where
        T: Clone,
        A: Into<Action>,
        F: Fn(Phase<T>) -> A,
        Fut: Future<Output = WalletResult<T>>,
    {
        debug!(thunk = name, "pending");
        self.store.dispatch(to_action(Phase::Pending));
        match op.await {
            Ok(value) => {
                self.store.dispatch(to_action(Phase::Fulfilled(value.clone())));
                Ok(value)
            }
            Err(e) => {
                warn!(thunk = name, category = ?e.category(), error = %e, "rejected");
                let message = e.user_message();
                self.store.dispatch(to_action(Phase::Rejected(message.clone())));
                self.store.dispatch(ToastsAction::add(Toast::error(message)));
                Err(e)
            }
        }
    }

    fn notify(&self, toast: Toast) {
        self.store.dispatch(ToastsAction::add(toast));
    }

    fn multiplier(&self) -> f64 {
        self.store.select(|s| s.settings.gas_buffer_multiplier)
    }

    // ── wallet ───────────────────────────────────────────────────────

    /// Connect to the network currently selected in the wallet slice, then
    /// load the balance.
    pub async fn connect_wallet(&self, kind: ConnectionKind) -> WalletResult<ConnectedWallet> {
        let network = self.store.select(|s| s.wallet.network.clone());
        let wallet = self.services.wallet.clone();
        let store = self.store.clone();
        let connected = self
            .run("connect_wallet", WalletAction::Connect, async move {
                match kind {
                    ConnectionKind::Local => wallet.connect_local(&network).await,
                    ConnectionKind::External => wallet.connect_external(&network).await,
                    ConnectionKind::WalletConnect => {
                        wallet
                            .connect_wallet_connect(&network, move |uri: &str| {
                                store.dispatch(WalletAction::SetPairingUri(Some(uri.to_string())));
                            })
                            .await
                    }
                }
            })
            .await?;

        // A failed balance read is reported on its own; the connection stands.
        let _ = self.fetch_balance().await;
        Ok(connected)
    }

    pub async fn fetch_balance(&self) -> WalletResult<String> {
        let wallet = self.services.wallet.clone();
        self.run("fetch_balance", WalletAction::FetchBalance, async move {
            let address = wallet
                .address()
                .ok_or_else(|| WalletError::NotInitialized("no wallet provider".into()))?;
            wallet.get_balance(&address.to_string()).await
        })
        .await
    }

    pub async fn disconnect_wallet(&self) {
        let wallet = self.services.wallet.clone();
        let _ = self
            .run("disconnect_wallet", WalletAction::Disconnect, async move {
                wallet.disconnect().await;
                Ok(())
            })
            .await;
    }

    /// Gas for a native transfer, shown on the wallet screen.
    pub async fn estimate_gas(&self, to: &str, amount: &str) -> WalletResult<GasEstimate> {
        let multiplier = self.multiplier();
        self.run(
            "estimate_gas",
            WalletAction::EstimateGas,
            self.services.wallet.estimate_gas(to, amount, multiplier),
        )
        .await
    }

    // ── transactions ─────────────────────────────────────────────────

    async fn sent(
        &self,
        name: &str,
        op: impl Future<Output = WalletResult<TransactionRecord>>,
    ) -> WalletResult<TransactionRecord> {
        let record = self.run(name, TransactionAction::Send, op).await?;
        self.notify(Toast::success(format!("Transaction sent: {}", record.hash)));
        Ok(record)
    }

    pub async fn send_native(&self, to: &str, amount: &str) -> WalletResult<TransactionRecord> {
        let multiplier = self.multiplier();
        self.sent(
            "send_native",
            self.services.transactions.send_native(to, amount, multiplier),
        )
        .await
    }

    pub async fn send_erc20(&self, token: &str, to: &str, amount: &str) -> WalletResult<TransactionRecord> {
        let multiplier = self.multiplier();
        self.sent(
            "send_erc20",
            self.services.transactions.send_erc20(token, to, amount, multiplier),
        )
        .await
    }

    pub async fn mint_nft(&self, contract: &str, to: &str, token_uri: &str) -> WalletResult<TransactionRecord> {
        let multiplier = self.multiplier();
        self.sent(
            "mint_nft",
            self.services.transactions.mint_nft(contract, to, token_uri, multiplier),
        )
        .await
    }

    pub async fn estimate_native_gas(&self, to: &str, amount: &str) -> WalletResult<GasEstimate> {
        let multiplier = self.multiplier();
        self.run(
            "estimate_native_gas",
            TransactionAction::EstimateGas,
            self.services.transactions.estimate_native_gas(to, amount, multiplier),
        )
        .await
    }

    pub async fn estimate_erc20_gas(&self, token: &str, to: &str, amount: &str) -> WalletResult<GasEstimate> {
        let multiplier = self.multiplier();
        self.run(
            "estimate_erc20_gas",
            TransactionAction::EstimateGas,
            self.services
                .transactions
                .estimate_erc20_gas(token, to, amount, multiplier),
        )
        .await
    }

    pub async fn fetch_token_info(&self, token: &str) -> WalletResult<TokenInfo> {
        self.run(
            "fetch_token_info",
            TransactionAction::TokenInfo,
            self.services.transactions.get_erc20_token_info(token),
        )
        .await
    }

    pub async fn refresh_status(&self, hash: &str) -> WalletResult<StatusUpdate> {
        self.run(
            "refresh_status",
            TransactionAction::RefreshStatus,
            self.services.transactions.refresh_status(hash),
        )
        .await
    }

    // ── contracts ────────────────────────────────────────────────────

    pub async fn load_stored_contracts(&self) -> WalletResult<Vec<DeployedContract>> {
        let storage = self.services.contracts.clone();
        self.run("load_stored_contracts", ContractAction::Load, async move {
            Ok(storage
                .get_all_contracts()
                .into_iter()
                .map(DeployedContract::from)
                .collect())
        })
        .await
    }

    /// Validate the form, deploy with the active settings and record the
    /// new contract.
    pub async fn deploy_contract(&self, params: ContractParams) -> WalletResult<Deployment> {
        let (network, verify, multiplier) = self.store.select(|s| {
            (
                s.wallet.network.id.clone(),
                s.settings.auto_verify,
                s.settings.gas_buffer_multiplier,
            )
        });
        let services = self.services.clone();
        let deployment = self
            .run("deploy_contract", ContractAction::Deploy, async move {
                let request = params.into_request(network, verify, multiplier)?;
                let result = services.deployer.deploy(&request).await?;
                if !result.success {
                    let error = result.error.as_deref().unwrap_or("unknown error");
                    return Err(WalletError::Subprocess(error.to_string()));
                }

                let owner = services
                    .wallet
                    .address()
                    .map(|a| a.to_string())
                    .unwrap_or_default();
                let new = result.to_new_contract(&request, owner).ok_or_else(|| {
                    WalletError::Subprocess("deployment reported no contract address".into())
                })?;
                let stored = services.contracts.save_contract(new)?;
                info!(id = %stored.id, address = %stored.contract_address, "contract recorded");
                Ok(Deployment {
                    result,
                    contract: stored.into(),
                })
            })
            .await?;

        self.notify(Toast::success(format!(
            "Contract deployed: {}",
            deployment.contract.address
        )));
        Ok(deployment)
    }

    pub async fn delete_contract(&self, id: &str) -> WalletResult<String> {
        let storage = self.services.contracts.clone();
        let id = id.to_string();
        self.run("delete_contract", ContractAction::Delete, async move {
            if storage.delete_contract(&id)? {
                Ok(id)
            } else {
                Err(WalletError::Validation(format!("Contract {id} not found")))
            }
        })
        .await
    }

    // ── settings ─────────────────────────────────────────────────────

    /// Apply a settings change and persist it when a config manager is
    /// attached.
    pub fn update_settings(&self, action: SettingsAction) -> WalletResult<()> {
        if let SettingsAction::SetDefaultNetwork(id) = &action {
            let known = self.store.select(|s| s.wallet.networks.iter().any(|n| &n.id == id));
            if !known {
                let e = WalletError::Validation(format!("Unknown network: {id}"));
                self.notify(Toast::error(e.user_message()));
                return Err(e);
            }
        }
        self.store.dispatch(action);

        let Some(config) = &self.services.config else {
            return Ok(());
        };
        let settings = self.store.select(|s| s.settings.clone());
        config.update(|c| settings.write_to(c)).map_err(|e| {
            let e = WalletError::Storage(format!("{e:#}"));
            self.notify(Toast::error(e.user_message()));
            e
        })
    }

    // ── toasts ───────────────────────────────────────────────────────

    /// Tick the toast timers every `period` until the handle is aborted.
    pub fn spawn_toast_ticker(&self, period: Duration) -> JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                store.dispatch(ToastsAction::Tick(std::time::Instant::now()));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AppState;
    use alloy_primitives::utils::parse_ether;
    use wallet_chain::testing::{MOCK_ACCOUNT, MockRpc};
    use wallet_chain::{EthRpc, Network, TxStatus};
    use wallet_contracts::testing::{MockDeployer, SCENARIO_ADDRESS, scenario_document};
    use wallet_contracts::{ContractType, JsonFileBackend};
    use wallet_core::{ToastSeverity, WalletConfig};

    const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    const RECIPIENT: &str = "0xaf0b1eA2be2183e633BfAD72F05A1E7e1e44a74f";

    fn wallet(rpc: Arc<MockRpc>) -> Arc<WalletService> {
        Arc::new(
            WalletService::new()
                .with_private_key(KEY)
                .with_rpc_factory(Arc::new(move |_: &Network| -> Arc<dyn EthRpc> { rpc.clone() })),
        )
    }

    fn thunks_with(rpc: Arc<MockRpc>, storage: ContractStorage, deployer: MockDeployer) -> Thunks {
        let services = Services::new(wallet(rpc), Arc::new(storage), Arc::new(deployer));
        Thunks::new(Store::new(AppState::from_config(&WalletConfig::default())), services)
    }

    fn thunks(rpc: Arc<MockRpc>) -> Thunks {
        thunks_with(rpc, ContractStorage::in_memory(), MockDeployer::deploying_to(SCENARIO_ADDRESS))
    }

    fn error_toasts(thunks: &Thunks) -> Vec<String> {
        thunks.store().select(|s| {
            s.toast
                .toasts()
                .iter()
                .filter(|t| t.severity == ToastSeverity::Error)
                .map(|t| t.message.clone())
                .collect()
        })
    }

    #[tokio::test]
    async fn connect_local_loads_balance() {
        let rpc = Arc::new(MockRpc::new().with_balance(parse_ether("1.5").unwrap()));
        let thunks = thunks(rpc);
        let connected = thunks.connect_wallet(ConnectionKind::Local).await.unwrap();
        assert_eq!(connected.address, MOCK_ACCOUNT);

        let state = thunks.store().state();
        assert!(state.wallet.is_connected);
        assert!(!state.wallet.is_loading);
        assert_eq!(state.wallet.address.as_deref(), Some(MOCK_ACCOUNT));
        assert_eq!(state.wallet.balance.unwrap().parse::<f64>().unwrap(), 1.5);
    }

    #[tokio::test]
    async fn external_without_provider_sets_error_and_toast() {
        let thunks = thunks(Arc::new(MockRpc::new()));
        let err = thunks.connect_wallet(ConnectionKind::External).await.unwrap_err();
        assert_eq!(err, WalletError::NoProvider);

        let state = thunks.store().state();
        assert!(!state.wallet.is_connected);
        assert_eq!(state.wallet.error, Some(err.user_message()));
        assert_eq!(error_toasts(&thunks), vec![err.user_message()]);
    }

    #[tokio::test]
    async fn balance_without_connection_is_rejected() {
        let thunks = thunks(Arc::new(MockRpc::new()));
        assert!(thunks.fetch_balance().await.is_err());
        assert_eq!(
            thunks.store().select(|s| s.wallet.error.clone()).as_deref(),
            Some("Wallet is not connected.")
        );
    }

    #[tokio::test]
    async fn send_native_records_history() {
        let rpc = Arc::new(MockRpc::new().with_balance(parse_ether("10").unwrap()));
        let thunks = thunks(rpc.clone());
        thunks.connect_wallet(ConnectionKind::Local).await.unwrap();

        let record = thunks.send_native(RECIPIENT, "0.1").await.unwrap();
        assert_eq!(record.hash, rpc.next_hash().to_string());

        let state = thunks.store().state();
        assert_eq!(state.transaction.history.len(), 1);
        assert_eq!(state.transaction.history[0].status, TxStatus::Pending);
        assert_eq!(state.transaction.last_hash.as_deref(), Some(record.hash.as_str()));
        assert!(
            state
                .toast
                .toasts()
                .iter()
                .any(|t| t.severity == ToastSeverity::Success && t.message.contains(&record.hash))
        );
    }

    #[tokio::test]
    async fn failed_send_surfaces_cause() {
        let rpc = Arc::new(MockRpc::new().failing_send("insufficient funds for gas * price + value"));
        let thunks = thunks(rpc);
        thunks.connect_wallet(ConnectionKind::Local).await.unwrap();

        assert!(thunks.send_native(RECIPIENT, "1").await.is_err());
        let state = thunks.store().state();
        assert!(state.transaction.history.is_empty());
        assert!(!state.transaction.is_loading);
        assert!(state.transaction.error.unwrap().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn invalid_amount_is_rejected_before_rpc() {
        let rpc = Arc::new(MockRpc::new());
        let thunks = thunks(rpc.clone());
        thunks.connect_wallet(ConnectionKind::Local).await.unwrap();
        let err = thunks.send_native(RECIPIENT, "-1").await.unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
        assert_eq!(rpc.send_attempts(), 0);
    }

    #[tokio::test]
    async fn estimate_uses_settings_multiplier() {
        let rpc = Arc::new(MockRpc::new().with_gas(21_000, 20_000_000_000));
        let thunks = thunks(rpc);
        thunks.connect_wallet(ConnectionKind::Local).await.unwrap();
        thunks
            .update_settings(SettingsAction::SetGasBufferMultiplier(1.2))
            .unwrap();

        let estimate = thunks.estimate_native_gas(RECIPIENT, "0.5").await.unwrap();
        assert!((estimate.actual.gas_price - 24.0).abs() < 1e-9);
        assert_eq!(
            thunks.store().select(|s| s.transaction.gas_estimate.value().copied()),
            Some(estimate)
        );
    }

    #[tokio::test]
    async fn load_stored_contracts_scenario() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("contracts.json");
        std::fs::write(&path, scenario_document()).unwrap();
        let thunks = thunks_with(
            Arc::new(MockRpc::new()),
            ContractStorage::new(JsonFileBackend::new(&path)),
            MockDeployer::deploying_to(SCENARIO_ADDRESS),
        );

        thunks.load_stored_contracts().await.unwrap();
        let contracts = thunks.store().select(|s| s.contract.contracts.clone());
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].name, "My Second Token");
        assert_eq!(contracts[0].contract_type.as_lower(), "erc20");
        assert_eq!(contracts[0].address, SCENARIO_ADDRESS);
        assert_eq!(contracts[0].network, "sepolia");
        let json = serde_json::to_value(&contracts[0]).unwrap();
        assert_eq!(json["type"], "erc20");
    }

    #[tokio::test]
    async fn deploy_records_contract() {
        let thunks = thunks(Arc::new(MockRpc::new()));
        thunks.connect_wallet(ConnectionKind::Local).await.unwrap();
        thunks.update_settings(SettingsAction::SetAutoVerify(true)).unwrap();

        let mut params = ContractParams::new(ContractType::Erc20, "Gold", "GLD");
        params.total_supply = "1000".into();
        let deployment = thunks.deploy_contract(params).await.unwrap();
        assert!(deployment.result.verified);
        assert_eq!(deployment.contract.owner, MOCK_ACCOUNT);

        let state = thunks.store().state();
        assert!(!state.contract.is_deploying);
        assert_eq!(state.contract.contracts.len(), 1);
        assert_eq!(
            thunks.services().contracts.get_all_contracts()[0].contract_address,
            SCENARIO_ADDRESS
        );
    }

    #[tokio::test]
    async fn deploy_validation_failure_never_reaches_deployer() {
        let deployer = Arc::new(MockDeployer::deploying_to(SCENARIO_ADDRESS));
        let services = Services::new(
            wallet(Arc::new(MockRpc::new())),
            Arc::new(ContractStorage::in_memory()),
            deployer.clone(),
        );
        let thunks = Thunks::new(Store::default(), services);

        let mut params = ContractParams::new(ContractType::Erc20, "Gold", "GLD");
        params.total_supply = "-1".into();
        assert!(thunks.deploy_contract(params).await.is_err());
        assert!(deployer.requests().is_empty());
        assert_eq!(
            thunks.store().select(|s| s.contract.error.clone()).as_deref(),
            Some(wallet_contracts::params::TOTAL_SUPPLY_INVALID)
        );
    }

    #[tokio::test]
    async fn unsuccessful_deploy_is_rejected() {
        let thunks = thunks_with(
            Arc::new(MockRpc::new()),
            ContractStorage::in_memory(),
            MockDeployer::rejecting("Deploy API error (500): out of gas"),
        );
        let params = ContractParams::new(ContractType::Erc721, "Art", "ART");
        assert!(thunks.deploy_contract(params).await.is_err());

        let state = thunks.store().state();
        assert!(state.contract.contracts.is_empty());
        assert!(state.contract.error.unwrap().contains("out of gas"));
        assert!(thunks.services().contracts.get_all_contracts().is_empty());
    }

    #[tokio::test]
    async fn delete_contract_updates_slice_and_storage() {
        let thunks = thunks(Arc::new(MockRpc::new()));
        let deployment = thunks
            .deploy_contract(ContractParams::new(ContractType::Erc20, "Gold", "GLD"))
            .await
            .unwrap();

        let id = deployment.contract.id.clone();
        thunks.delete_contract(&id).await.unwrap();
        assert!(thunks.store().select(|s| s.contract.contracts.is_empty()));
        assert!(thunks.services().contracts.get_contract_by_id(&id).is_none());

        assert!(thunks.delete_contract(&id).await.is_err());
    }

    #[tokio::test]
    async fn unknown_default_network_is_refused() {
        let thunks = thunks(Arc::new(MockRpc::new()));
        let err = thunks
            .update_settings(SettingsAction::SetDefaultNetwork("invalid-id".into()))
            .unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
        assert_eq!(thunks.store().select(|s| s.settings.default_network.clone()), "sepolia");
    }

    #[tokio::test]
    async fn settings_are_persisted() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let config = Arc::new(ConfigManager::load(&path, &[], |_| None).unwrap());
        let services = Services::new(
            wallet(Arc::new(MockRpc::new())),
            Arc::new(ContractStorage::in_memory()),
            Arc::new(MockDeployer::deploying_to(SCENARIO_ADDRESS)),
        )
        .with_config(config.clone());
        let thunks = Thunks::new(Store::default(), services);

        thunks
            .update_settings(SettingsAction::SetGasBufferMultiplier(2.5))
            .unwrap();
        assert_eq!(config.get().gas_buffer_multiplier, 2.5);
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["gas_buffer_multiplier"], 2.5);
    }

    #[tokio::test]
    async fn ticker_expires_toasts() {
        let thunks = thunks(Arc::new(MockRpc::new()));
        thunks.store().dispatch(ToastsAction::add(Toast::error("gone soon").with_duration(50)));
        let handle = thunks.spawn_toast_ticker(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();
        assert!(thunks.store().select(|s| s.toast.toasts().is_empty()));
    }
}
