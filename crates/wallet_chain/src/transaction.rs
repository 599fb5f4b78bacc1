//! Native transfers, ERC-20 transfers and NFT mints on top of
//! [`WalletService`].

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::utils::{format_units, parse_units};
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wallet_core::{WalletError, WalletResult};

use crate::abi::{IERC20, IERC721Mint};
use crate::gas::GasEstimate;
use crate::rpc::{CallRequest, EthRpc};
use crate::validate::{validate_address, validate_amount};
use crate::wallet::{WalletService, parse_address};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Native,
    Erc20,
    Nft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One entry of the in-memory transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Decimal string in token / native units.
    pub value: String,
    pub kind: TransactionKind,
    pub status: TxStatus,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

impl TransactionRecord {
    fn pending(hash: B256, from: Address, to: Address, value: String, kind: TransactionKind) -> Self {
        Self {
            hash: hash.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            value,
            kind,
            status: TxStatus::Pending,
            timestamp: Utc::now().timestamp_millis(),
            gas_used: None,
            gas_price: None,
            token_symbol: None,
            token_id: None,
        }
    }
}

/// Outcome of polling a transaction's receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub hash: String,
    pub status: TxStatus,
    pub gas_used: Option<String>,
    /// Gwei.
    pub gas_price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Balance of the active account, in token units.
    pub balance: String,
}

async fn read<C: SolCall>(rpc: &dyn EthRpc, token: Address, call: C) -> WalletResult<C::Return> {
    let data = rpc.call(&CallRequest::call(token, call.abi_encode())).await?;
    C::abi_decode_returns(&data)
        .map_err(|e| WalletError::Network(format!("cannot decode {} result: {e}", C::SIGNATURE)))
}

fn check_amount(amount: &str) -> WalletResult<()> {
    if validate_amount(amount) {
        Ok(())
    } else {
        Err(WalletError::Validation("Amount must be a positive number".into()))
    }
}

fn check_address(label: &str, address: &str) -> WalletResult<Address> {
    if !validate_address(address) {
        return Err(WalletError::Validation(format!("Invalid {label} address")));
    }
    parse_address(address)
}

fn token_units(amount: &str, decimals: u8) -> WalletResult<U256> {
    parse_units(amount.trim(), decimals)
        .map(|units| units.get_absolute())
        .map_err(|e| WalletError::Validation(format!("Invalid amount {amount}: {e}")))
}

fn wrap(context: &str) -> impl Fn(WalletError) -> WalletError + '_ {
    move |e| match e {
        WalletError::Validation(_) | WalletError::NotInitialized(_) => e,
        WalletError::Send(cause) => WalletError::Send(format!("{context}: {cause}")),
        other => WalletError::Send(format!("{context}: {}", other.user_message())),
    }
}

pub struct TransactionService {
    wallet: Arc<WalletService>,
}

impl TransactionService {
    pub fn new(wallet: Arc<WalletService>) -> Self {
        Self { wallet }
    }

    pub fn wallet(&self) -> &Arc<WalletService> {
        &self.wallet
    }

    pub async fn send_native(&self, to: &str, amount: &str, multiplier: f64) -> WalletResult<TransactionRecord> {
        let to = check_address("recipient", to)?;
        check_amount(amount)?;
        let from = self.wallet.connection()?.address();

        let hash = async {
            let value = alloy_primitives::utils::parse_ether(amount.trim())
                .map_err(|e| WalletError::Validation(format!("Invalid amount {amount}: {e}")))?;
            self.wallet.submit(CallRequest::transfer(to, value), multiplier).await
        }
        .await
        .map_err(wrap("Native transfer failed"))?;

        info!(hash = %hash, to = %to, amount, "native transfer sent");
        Ok(TransactionRecord::pending(hash, from, to, amount.trim().to_string(), TransactionKind::Native))
    }

    pub async fn send_erc20(
        &self,
        token: &str,
        to: &str,
        amount: &str,
        multiplier: f64,
    ) -> WalletResult<TransactionRecord> {
        let token = check_address("token", token)?;
        let to = check_address("recipient", to)?;
        check_amount(amount)?;
        let connection = self.wallet.connection()?;

        let (hash, symbol) = async {
            let rpc = connection.rpc().as_ref();
            let (decimals, symbol) = tokio::join!(
                read(rpc, token, IERC20::decimalsCall {}),
                read(rpc, token, IERC20::symbolCall {})
            );
            let units = token_units(amount, decimals?)?;
            let data = IERC20::transferCall { to, amount: units }.abi_encode();
            let hash = self.wallet.submit(CallRequest::call(token, data), multiplier).await?;
            Ok::<_, WalletError>((hash, symbol.ok()))
        }
        .await
        .map_err(wrap("ERC20 transfer failed"))?;

        info!(hash = %hash, token = %token, to = %to, amount, "erc20 transfer sent");
        let mut record = TransactionRecord::pending(
            hash,
            connection.address(),
            to,
            amount.trim().to_string(),
            TransactionKind::Erc20,
        );
        record.token_symbol = symbol;
        Ok(record)
    }

    pub async fn mint_nft(
        &self,
        contract: &str,
        to: &str,
        token_uri: &str,
        multiplier: f64,
    ) -> WalletResult<TransactionRecord> {
        let contract = check_address("contract", contract)?;
        let to = check_address("recipient", to)?;
        let from = self.wallet.connection()?.address();

        let data = IERC721Mint::mintCall {
            to,
            tokenURI: token_uri.to_string(),
        }
        .abi_encode();
        let hash = self
            .wallet
            .submit(CallRequest::call(contract, data), multiplier)
            .await
            .map_err(wrap("NFT mint failed"))?;

        info!(hash = %hash, contract = %contract, to = %to, "nft mint sent");
        Ok(TransactionRecord::pending(hash, from, to, "0".into(), TransactionKind::Nft))
    }

    pub async fn estimate_native_gas(&self, to: &str, amount: &str, multiplier: f64) -> WalletResult<GasEstimate> {
        check_address("recipient", to)?;
        check_amount(amount)?;
        self.wallet.estimate_gas(to, amount, multiplier).await
    }

    /// Gas for an ERC-20 `transfer` from the active account.
    pub async fn estimate_erc20_gas(
        &self,
        token: &str,
        to: &str,
        amount: &str,
        multiplier: f64,
    ) -> WalletResult<GasEstimate> {
        let token = check_address("token", token)?;
        let to = check_address("recipient", to)?;
        check_amount(amount)?;
        let connection = self.wallet.connection()?;

        let decimals = read(connection.rpc().as_ref(), token, IERC20::decimalsCall {}).await?;
        let data = IERC20::transferCall {
            to,
            amount: token_units(amount, decimals)?,
        }
        .abi_encode();
        self.wallet
            .estimate_call(CallRequest::call(token, data), multiplier)
            .await
    }

    /// Name, symbol, decimals and the active account's balance, read
    /// concurrently. Any failed read fails the whole lookup.
    pub async fn get_erc20_token_info(&self, token: &str) -> WalletResult<TokenInfo> {
        let token = check_address("token", token)?;
        let connection = self.wallet.connection()?;
        let rpc = connection.rpc().as_ref();

        let (name, symbol, decimals, balance) = tokio::try_join!(
            read(rpc, token, IERC20::nameCall {}),
            read(rpc, token, IERC20::symbolCall {}),
            read(rpc, token, IERC20::decimalsCall {}),
            read(rpc, token, IERC20::balanceOfCall { account: connection.address() }),
        )?;

        let balance = format_units(balance, decimals)
            .map_err(|e| WalletError::Network(format!("cannot format token balance: {e}")))?;
        Ok(TokenInfo {
            address: token.to_string(),
            name,
            symbol,
            decimals,
            balance,
        })
    }

    /// Poll the receipt for `hash`. No receipt yet means still pending.
    pub async fn refresh_status(&self, hash: &str) -> WalletResult<StatusUpdate> {
        let parsed = B256::from_str(hash)
            .map_err(|_| WalletError::Validation(format!("invalid transaction hash: {hash}")))?;
        let receipt = self.wallet.transaction_receipt(&parsed.to_string()).await?;

        let Some(receipt) = receipt else {
            return Ok(StatusUpdate {
                hash: hash.to_string(),
                status: TxStatus::Pending,
                gas_used: None,
                gas_price: None,
            });
        };
        let status = if receipt.success {
            TxStatus::Confirmed
        } else {
            warn!(hash, "transaction reverted");
            TxStatus::Failed
        };
        let gas_price = receipt
            .effective_gas_price
            .and_then(|wei| format_units(U256::from(wei), "gwei").ok());
        Ok(StatusUpdate {
            hash: hash.to_string(),
            status,
            gas_used: Some(receipt.gas_used.to_string()),
            gas_price,
        })
    }
}
