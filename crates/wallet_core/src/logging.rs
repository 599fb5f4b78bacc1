use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::WalletConfig;

const WALLET_CRATES: &[&str] = &[
    "wallet_app",
    "wallet_core",
    "wallet_chain",
    "wallet_contracts",
    "wallet_state",
];

/// Filter used when `RUST_LOG` is unset: dependencies at `warn`, the wallet
/// crates at `level`. An unknown level falls back to `info`.
pub fn wallet_filter(level: &str) -> String {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        l @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => l.to_string(),
        _ => "info".to_string(),
    };
    let crates: Vec<String> = WALLET_CRATES.iter().map(|c| format!("{c}={level}")).collect();
    format!("warn,{}", crates.join(","))
}

/// File + stderr logging under `~/.web3-wallet/logs`, filtered by
/// `RUST_LOG` or else by `config.log_level`. Keep the guard alive for the
/// life of the process.
pub fn init_logging(config: &WalletConfig) -> Result<WorkerGuard> {
    let logs_dir = WalletConfig::logs_dir()?;
    install(&logs_dir, &wallet_filter(&config.log_level), true)
}

/// File-only logging to `logs_dir` with an explicit fallback filter.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    install(logs_dir, filter, false)
}

fn install(logs_dir: &Path, fallback: &str, console: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    // Daily rotation
    let file_appender = tracing_appender::rolling::daily(logs_dir, "wallet");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let stderr = console.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_to_dir_creates_directory() {
        let tmp = tempfile::tempdir().expect("Failed to create tempdir");
        let logs_dir = tmp.path().join("nested").join("logs");
        assert!(!logs_dir.exists());

        // Only one global subscriber per process; a second call errors but
        // the directory is still created.
        let result = init_logging_to_dir(&logs_dir, "warn");
        assert!(logs_dir.exists());

        if let Err(e) = result {
            assert!(e.to_string().contains("logging"), "unexpected error: {e}");
        }
    }

    #[test]
    fn filter_follows_configured_level() {
        let filter = wallet_filter("debug");
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("wallet_chain=debug"));
        assert!(EnvFilter::try_new(&filter).is_ok());
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(wallet_filter("chatty"), wallet_filter("info"));
        assert_eq!(wallet_filter(" TRACE "), wallet_filter("trace"));
    }
}
