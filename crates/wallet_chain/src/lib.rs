//! EVM chain access for the wallet: networks, JSON-RPC, signers,
//! WalletConnect pairing and the wallet / transaction services.

pub mod abi;
pub mod eip1193;
pub mod gas;
pub mod network;
pub mod rpc;
pub mod rpc_config;
pub mod signer;
pub mod transaction;
pub mod validate;
pub mod wallet;
pub mod walletconnect;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export primary types for convenient access.
pub use eip1193::Eip1193Provider;
pub use gas::{BufferedGas, GasEstimate};
pub use network::{BUILTIN_NETWORK_IDS, Network, builtin_networks};
pub use rpc::{CallRequest, EthRpc, HttpTransport, RpcClient, TxReceipt};
pub use rpc_config::{NetworkRegistry, validate_url};
pub use signer::{ConnectionKind, LocalKeySigner, WalletSigner};
pub use transaction::{
    StatusUpdate, TokenInfo, TransactionKind, TransactionRecord, TransactionService, TxStatus,
};
pub use validate::{validate_address, validate_amount, validate_private_key, validate_tx_hash};
pub use wallet::{ConnectedWallet, WalletService};
pub use walletconnect::{PairingRelay, WalletConnectService, WalletConnectSession};
