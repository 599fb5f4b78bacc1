pub mod config;
pub mod error;
pub mod logging;
pub mod toast;

pub use config::{ConfigManager, DeployStrategy, WalletConfig, clamp_gas_buffer};
pub use error::{ErrorCategory, ValidationResult, WalletError, WalletResult};
pub use toast::{Toast, ToastAction, ToastQueue, ToastSeverity, ToastTimer};
