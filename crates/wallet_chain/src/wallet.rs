use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::utils::{format_ether, parse_ether};
use alloy_primitives::{Address, B256};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};
use wallet_core::{WalletConfig, WalletError, WalletResult};

use crate::eip1193::{Eip1193Provider, request_accounts, switch_chain};
use crate::gas::GasEstimate;
use crate::network::Network;
use crate::rpc::{CallRequest, EthRpc, RpcClient, TxReceipt};
use crate::signer::{ConnectionKind, LocalKeySigner, PreparedTx, ProviderSigner, WalletSigner};
use crate::validate;
use crate::walletconnect::{WalletConnectSession, WalletConnectService};

/// Builds the read-side RPC client for a network.
pub type RpcFactory = Arc<dyn Fn(&Network) -> Arc<dyn EthRpc> + Send + Sync>;

/// Returned by every successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedWallet {
    /// Checksummed.
    pub address: String,
    pub wallet_name: String,
    pub kind: ConnectionKind,
}

/// The active signer plus the RPC it talks to.
pub struct Connection {
    signer: Arc<dyn WalletSigner>,
    rpc: Arc<dyn EthRpc>,
    network: Network,
}

impl Connection {
    pub fn signer(&self) -> &Arc<dyn WalletSigner> {
        &self.signer
    }

    pub fn rpc(&self) -> &Arc<dyn EthRpc> {
        &self.rpc
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

/// Owns the active signer and RPC connection.
///
/// Connect calls are not serialized: whichever finishes last becomes the
/// active connection. The lock is never held across an await.
pub struct WalletService {
    private_key: Option<String>,
    external: Option<Arc<dyn Eip1193Provider>>,
    walletconnect: Option<Arc<WalletConnectService>>,
    rpc_factory: RpcFactory,
    connection: RwLock<Option<Arc<Connection>>>,
}

impl WalletService {
    pub fn new() -> Self {
        Self {
            private_key: None,
            external: None,
            walletconnect: None,
            rpc_factory: Arc::new(|network: &Network| -> Arc<dyn EthRpc> {
                Arc::new(RpcClient::http(network.rpc_url.clone()))
            }),
            connection: RwLock::new(None),
        }
    }

    /// Wire up the key and adapters named in `config`.
    pub fn from_config(config: &WalletConfig) -> Self {
        let mut service = Self::new();
        service.private_key = config.private_key.clone();
        if let Some(url) = &config.external_wallet_url {
            service.external = Some(Arc::new(crate::rpc::HttpTransport::new(url.clone())));
        }
        if let Some(project_id) = &config.walletconnect_project_id {
            match WalletConnectService::http(project_id, config.walletconnect_relay_url.as_deref()) {
                Ok(wc) => service.walletconnect = Some(Arc::new(wc)),
                Err(e) => warn!(error = %e, "WalletConnect disabled"),
            }
        }
        service
    }

    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    pub fn with_external_provider(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.external = Some(provider);
        self
    }

    pub fn with_walletconnect(mut self, service: Arc<WalletConnectService>) -> Self {
        self.walletconnect = Some(service);
        self
    }

    pub fn with_rpc_factory(mut self, factory: RpcFactory) -> Self {
        self.rpc_factory = factory;
        self
    }

    pub fn walletconnect(&self) -> Option<&Arc<WalletConnectService>> {
        self.walletconnect.as_ref()
    }

    // -- connections --------------------------------------------------------

    /// Connect with the configured private key.
    pub async fn connect_local(&self, network: &Network) -> WalletResult<ConnectedWallet> {
        let key = self
            .private_key
            .as_deref()
            .ok_or_else(|| WalletError::Config("PRIVATE_KEY is not configured".into()))?;
        self.connect_local_with_key(network, key).await
    }

    /// Connect with an explicitly supplied private key.
    pub async fn connect_local_with_key(
        &self,
        network: &Network,
        key: &str,
    ) -> WalletResult<ConnectedWallet> {
        let signer = LocalKeySigner::from_hex(key)?;
        let rpc = (self.rpc_factory)(network);
        Ok(self.install(Arc::new(signer), rpc, network))
    }

    /// Connect through the injected EIP-1193 provider, switching (and if
    /// needed adding) the requested chain.
    pub async fn connect_external(&self, network: &Network) -> WalletResult<ConnectedWallet> {
        let provider = self.external.clone().ok_or(WalletError::NoProvider)?;
        let address = request_accounts(provider.as_ref()).await?;
        switch_chain(provider.as_ref(), network).await?;

        let rpc: Arc<dyn EthRpc> = Arc::new(RpcClient::new(provider.clone()));
        let signer = ProviderSigner::new(provider, address, ConnectionKind::External, "Browser Wallet");
        Ok(self.install(Arc::new(signer), rpc, network))
    }

    /// Pair with a remote wallet. `on_uri` receives the `wc:` pairing URI to
    /// display while waiting for approval.
    pub async fn connect_wallet_connect<F>(
        &self,
        network: &Network,
        on_uri: F,
    ) -> WalletResult<ConnectedWallet>
    where
        F: FnOnce(&str) + Send,
    {
        let wc = self
            .walletconnect
            .clone()
            .ok_or_else(|| WalletError::Config("WALLETCONNECT_PROJECT_ID is not configured".into()))?;
        let session: WalletConnectSession = wc.connect(network, on_uri).await?;

        let signer = ProviderSigner::new(
            wc.provider(&session),
            session.address,
            ConnectionKind::WalletConnect,
            session.peer_name.clone(),
        );
        let rpc = (self.rpc_factory)(network);
        Ok(self.install(Arc::new(signer), rpc, network))
    }

    fn install(
        &self,
        signer: Arc<dyn WalletSigner>,
        rpc: Arc<dyn EthRpc>,
        network: &Network,
    ) -> ConnectedWallet {
        let connected = ConnectedWallet {
            address: signer.address().to_string(),
            wallet_name: signer.name().to_string(),
            kind: signer.kind(),
        };
        *self.connection.write() = Some(Arc::new(Connection {
            signer,
            rpc,
            network: network.clone(),
        }));
        info!(address = %connected.address, network = %network.id, kind = ?connected.kind, "wallet connected");
        connected
    }

    /// Drop the active connection. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let previous = self.connection.write().take();
        let Some(connection) = previous else {
            return;
        };
        if connection.signer.kind() == ConnectionKind::WalletConnect
            && let Some(wc) = &self.walletconnect
        {
            wc.disconnect().await;
        }
        info!(address = %connection.address(), "wallet disconnected");
    }

    pub fn connection(&self) -> WalletResult<Arc<Connection>> {
        self.connection
            .read()
            .clone()
            .ok_or_else(|| WalletError::NotInitialized("no wallet provider".into()))
    }

    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    pub fn address(&self) -> Option<Address> {
        self.connection.read().as_ref().map(|c| c.address())
    }

    pub fn active_network(&self) -> Option<Network> {
        self.connection.read().as_ref().map(|c| c.network.clone())
    }

    // -- reads --------------------------------------------------------------

    /// Native balance of `address`, formatted in whole units.
    pub async fn get_balance(&self, address: &str) -> WalletResult<String> {
        let connection = self.connection()?;
        let address = parse_address(address)?;
        let wei = connection.rpc.get_balance(address).await?;
        Ok(format_ether(wei))
    }

    /// Raw and buffered gas figures for a native transfer.
    pub async fn estimate_gas(&self, to: &str, amount: &str, multiplier: f64) -> WalletResult<GasEstimate> {
        let to = parse_address(to)?;
        let value = parse_amount(amount)?;
        self.estimate_call(CallRequest::transfer(to, value), multiplier).await
    }

    /// Raw and buffered gas figures for an arbitrary call from the active
    /// account.
    pub async fn estimate_call(&self, request: CallRequest, multiplier: f64) -> WalletResult<GasEstimate> {
        let connection = self.connection()?;
        let request = request.from(connection.address());
        let (gas_limit, gas_price) = tokio::try_join!(
            connection.rpc.estimate_gas(&request),
            connection.rpc.gas_price()
        )?;
        Ok(GasEstimate::new(gas_limit, gas_price, multiplier))
    }

    pub async fn transaction_receipt(&self, hash: &str) -> WalletResult<Option<TxReceipt>> {
        let connection = self.connection()?;
        let hash = B256::from_str(hash)
            .map_err(|_| WalletError::Validation(format!("invalid transaction hash: {hash}")))?;
        connection.rpc.transaction_receipt(hash).await
    }

    // -- writes -------------------------------------------------------------

    /// Send `amount` of the native currency to `to`. Returns the hash.
    pub async fn send_transaction(&self, to: &str, amount: &str, multiplier: f64) -> WalletResult<String> {
        let to = parse_address(to)?;
        let value = parse_amount(amount)?;
        let hash = self.submit(CallRequest::transfer(to, value), multiplier).await?;
        Ok(hash.to_string())
    }

    /// Estimate, buffer and submit `request` from the active account.
    /// Failures after validation surface as [`WalletError::Send`]; nothing is
    /// retried.
    pub async fn submit(&self, request: CallRequest, multiplier: f64) -> WalletResult<B256> {
        let connection = self.connection()?;
        let estimate = self
            .estimate_call(request.clone(), multiplier)
            .await
            .map_err(into_send_error)?;

        let tx = PreparedTx {
            chain_id: connection.network.chain_id,
            to: request.to,
            value: request.value,
            data: request.data,
            gas_limit: estimate.actual.gas_limit,
            gas_price: estimate.actual.gas_price_wei,
        };
        debug!(
            to = %tx.to,
            gas_limit = tx.gas_limit,
            gas_price_gwei = estimate.actual.gas_price,
            "submitting transaction"
        );
        let hash = connection
            .signer
            .send_transaction(tx, connection.rpc.as_ref())
            .await
            .map_err(into_send_error)?;
        info!(hash = %hash, network = %connection.network.id, "transaction submitted");
        Ok(hash)
    }
}

impl Default for WalletService {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn into_send_error(e: WalletError) -> WalletError {
    match e {
        WalletError::Send(_) => e,
        WalletError::Rpc { message, .. } => WalletError::Send(message),
        other => WalletError::Send(other.to_string()),
    }
}

pub(crate) fn parse_address(address: &str) -> WalletResult<Address> {
    if !validate::validate_address(address) {
        return Err(WalletError::Validation(format!("Invalid address: {address}")));
    }
    Address::from_str(address).map_err(|_| WalletError::Validation(format!("Invalid address: {address}")))
}

fn parse_amount(amount: &str) -> WalletResult<alloy_primitives::U256> {
    if !validate::validate_amount(amount) {
        return Err(WalletError::Validation(format!("Invalid amount: {amount}")));
    }
    parse_ether(amount.trim()).map_err(|e| WalletError::Validation(format!("Invalid amount {amount}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::builtin_networks;
    use crate::testing::{MockEip1193, MockRelay, MockRpc};
    use alloy_primitives::U256;

    const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    const ADDRESS: &str = "0x70997970C51812dc3A010C7d01b50e20d17dc79C";
    const RECIPIENT: &str = "0xaf0b1eA2be2183e633BfAD72F05A1E7e1e44a74f";

    fn network(id: &str) -> Network {
        builtin_networks().into_iter().find(|n| n.id == id).unwrap()
    }

    fn service_with(rpc: Arc<MockRpc>) -> WalletService {
        WalletService::new()
            .with_private_key(KEY)
            .with_rpc_factory(Arc::new(move |_: &Network| -> Arc<dyn EthRpc> { rpc.clone() }))
    }

    #[tokio::test]
    async fn connect_local_derives_checksummed_address() {
        let service = service_with(Arc::new(MockRpc::new()));
        let wallet = service.connect_local(&network("localhost")).await.unwrap();
        assert_eq!(wallet.address, ADDRESS);
        assert_eq!(wallet.kind, ConnectionKind::Local);
        assert_eq!(service.active_network().unwrap().id, "localhost");
    }

    #[tokio::test]
    async fn connect_local_without_key_is_config_error() {
        let service = WalletService::new();
        let err = service.connect_local(&network("sepolia")).await.unwrap_err();
        assert!(matches!(err, WalletError::Config(_)));
        assert!(!service.is_connected());
    }

    #[tokio::test]
    async fn connect_external_without_provider() {
        let service = WalletService::new();
        assert_eq!(
            service.connect_external(&network("sepolia")).await.unwrap_err(),
            WalletError::NoProvider
        );
    }

    #[tokio::test]
    async fn connect_external_switches_chain() {
        let provider = Arc::new(MockEip1193::new().with_accounts(&[ADDRESS]).with_unknown_chain());
        let service = WalletService::new().with_external_provider(provider.clone());
        let wallet = service.connect_external(&network("sepolia")).await.unwrap();
        assert_eq!(wallet.kind, ConnectionKind::External);
        assert_eq!(provider.methods()[0], "eth_requestAccounts");
        assert!(provider.methods().contains(&"wallet_addEthereumChain".to_string()));
    }

    #[tokio::test]
    async fn connect_wallet_connect_requires_project() {
        let service = WalletService::new();
        let err = service
            .connect_wallet_connect(&network("sepolia"), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Config(_)));
    }

    #[tokio::test]
    async fn connect_wallet_connect_wraps_remote_signer() {
        let relay = Arc::new(MockRelay::approving(vec![format!("eip155:11155111:{ADDRESS}")]));
        let wc = Arc::new(WalletConnectService::new("proj", relay).unwrap());
        let service = WalletService::new()
            .with_walletconnect(wc.clone())
            .with_rpc_factory(Arc::new(|_: &Network| -> Arc<dyn EthRpc> { Arc::new(MockRpc::new()) }));

        let wallet = service
            .connect_wallet_connect(&network("sepolia"), |_| {})
            .await
            .unwrap();
        assert_eq!(wallet.kind, ConnectionKind::WalletConnect);
        assert_eq!(wallet.address, ADDRESS);

        service.disconnect().await;
        assert!(wc.session().is_none());
    }

    #[tokio::test]
    async fn balance_requires_connection() {
        let service = WalletService::new();
        assert!(matches!(
            service.get_balance(ADDRESS).await,
            Err(WalletError::NotInitialized(_))
        ));
    }

    #[tokio::test]
    async fn balance_is_formatted_in_ether() {
        let rpc = Arc::new(MockRpc::new().with_balance(U256::from(1_500_000_000_000_000_000u128)));
        let service = service_with(rpc);
        service.connect_local(&network("localhost")).await.unwrap();
        let balance = service.get_balance(ADDRESS).await.unwrap();
        assert_eq!(balance.parse::<f64>().unwrap(), 1.5);
    }

    #[tokio::test]
    async fn estimate_applies_buffers() {
        let rpc = Arc::new(MockRpc::new().with_gas(21_000, 20_000_000_000));
        let service = service_with(rpc);
        service.connect_local(&network("localhost")).await.unwrap();

        let est = service.estimate_gas(RECIPIENT, "0.1", 1.2).await.unwrap();
        assert_eq!(est.gas_limit, 21_000);
        assert!((est.actual.gas_price - 24.0).abs() < 1e-9);
        assert_eq!(est.actual.gas_limit, 23_100);
    }

    #[tokio::test]
    async fn send_returns_hash_and_broadcasts_once() {
        let rpc = Arc::new(MockRpc::new());
        let service = service_with(rpc.clone());
        service.connect_local(&network("localhost")).await.unwrap();

        let hash = service.send_transaction(RECIPIENT, "0.01", 1.2).await.unwrap();
        assert_eq!(hash, rpc.next_hash().to_string());
        assert_eq!(rpc.sent_raw().len(), 1);
    }

    #[tokio::test]
    async fn send_failure_is_wrapped_and_not_retried() {
        let rpc = Arc::new(MockRpc::new().failing_send("insufficient funds for gas * price + value"));
        let service = service_with(rpc.clone());
        service.connect_local(&network("localhost")).await.unwrap();

        let err = service.send_transaction(RECIPIENT, "1", 1.0).await.unwrap_err();
        assert_eq!(
            err,
            WalletError::Send("insufficient funds for gas * price + value".into())
        );
        assert_eq!(rpc.send_attempts(), 1);
    }

    #[tokio::test]
    async fn send_validates_input_first() {
        let rpc = Arc::new(MockRpc::new());
        let service = service_with(rpc.clone());
        service.connect_local(&network("localhost")).await.unwrap();

        assert!(matches!(
            service.send_transaction("0x123", "1", 1.0).await,
            Err(WalletError::Validation(_))
        ));
        assert!(matches!(
            service.send_transaction(RECIPIENT, "-1", 1.0).await,
            Err(WalletError::Validation(_))
        ));
        assert_eq!(rpc.send_attempts(), 0);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let service = service_with(Arc::new(MockRpc::new()));
        service.connect_local(&network("localhost")).await.unwrap();
        service.disconnect().await;
        service.disconnect().await;
        assert!(!service.is_connected());
        assert!(service.address().is_none());
    }

    #[tokio::test]
    async fn last_connect_wins() {
        let service = service_with(Arc::new(MockRpc::new()));
        service.connect_local(&network("sepolia")).await.unwrap();
        service.connect_local(&network("localhost")).await.unwrap();
        assert_eq!(service.active_network().unwrap().id, "localhost");
    }
}
