use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service-layer error type shared by every wallet crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not initialized: {0}")]
    NotInitialized(String),

    #[error("No injected wallet provider found")]
    NoProvider,

    #[error("Network error: {0}")]
    Network(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction failed: {0}")]
    Send(String),

    #[error("Subprocess error: {0}")]
    Subprocess(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Broad classification used for logging and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Bad input or a rejected user action.
    UserError,
    /// Invalid or missing configuration.
    ConfigError,
    /// RPC / HTTP transport failure.
    NetworkError,
    /// Subprocess, storage or lifecycle failure.
    SystemError,
}

impl WalletError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::UserError,
            Self::Send(_) => ErrorCategory::UserError,
            Self::Config(_) | Self::NoProvider => ErrorCategory::ConfigError,
            Self::Network(_) | Self::Rpc { .. } => ErrorCategory::NetworkError,
            Self::NotInitialized(_) | Self::Subprocess(_) | Self::Storage(_) => {
                ErrorCategory::SystemError
            }
        }
    }

    /// A message suitable for an inline form error or a toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Config(msg) => format!("Configuration issue: {msg}"),
            Self::NotInitialized(_) => "Wallet is not connected.".into(),
            Self::NoProvider => {
                "No browser wallet detected. Install or unlock a wallet extension.".into()
            }
            Self::Network(_) => "Network error. Check your RPC endpoint.".into(),
            Self::Rpc { message, .. } => message.clone(),
            Self::Send(msg) => format!("Transaction failed: {msg}"),
            Self::Subprocess(msg) => format!("Deployment tool failed: {msg}"),
            Self::Storage(_) => "Storage error. Check disk space and permissions.".into(),
        }
    }

    /// Whether the failure came from the user rejecting a wallet prompt
    /// (EIP-1193 code 4001).
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::Rpc { code: 4001, .. })
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<std::io::Error> for WalletError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Outcome of validating form input. Never thrown, so callers can render
/// every message inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Convert into a `WalletError::Validation` joining all messages.
    pub fn into_result(self) -> WalletResult<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(WalletError::Validation(self.errors.join(", ")))
        }
    }
}
