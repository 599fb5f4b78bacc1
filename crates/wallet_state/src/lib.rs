//! Application state: one store, five slices, async thunks.
//!
//! Front-ends dispatch a thunk, the thunk calls a service, and the result
//! lands in a slice through a pure reducer. Subscribers observe snapshots
//! of [`AppState`] through a `tokio::sync::watch` channel.

pub mod slices;
pub mod status;
pub mod store;
pub mod thunks;

pub use slices::contract::{ContractAction, ContractState, DeployedContract, Deployment};
pub use slices::settings::{SettingsAction, SettingsState};
pub use slices::toast::{ToastState, ToastsAction};
pub use slices::transaction::{TransactionAction, TransactionState};
pub use slices::wallet::{WalletAction, WalletState};
pub use status::{AsyncStatus, Phase};
pub use store::{Action, AppState, Store};
pub use thunks::{Services, Thunks};
