//! Scraping deployment results out of the deploy script's stdout.
//!
//! The script prints lines such as:
//!
//! ```text
//! Contract deployed to: 0x5FbDB2315678afecb367f032d93F642f64180aa3
//! Transaction hash: 0x3f1c...e9
//! Deployment ID: erc20-sepolia-1718000000000
//! ```

use std::sync::LazyLock;

use regex::Regex;
use wallet_core::{WalletError, WalletResult};

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:deployed\s+to|contract\s+address)\s*[:=]?\s*(0x[0-9a-f]{40})\b")
        .expect("valid address regex")
});

static TX_HASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:transaction|tx)\s*hash\s*[:=]?\s*(0x[0-9a-f]{64})\b").expect("valid tx regex")
});

static DEPLOYMENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)deployment\s*id\s*[:=]?\s*([A-Za-z0-9_.:-]+)").expect("valid id regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDeployment {
    pub address: String,
    pub tx_hash: String,
    pub deployment_id: String,
}

fn capture(re: &Regex, stdout: &str, what: &str) -> WalletResult<String> {
    re.captures(stdout)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| WalletError::Subprocess(format!("{what} not found in deploy output")))
}

/// Extract address, transaction hash and deployment id. Every one of them
/// is required.
pub fn parse_deploy_output(stdout: &str) -> WalletResult<ParsedDeployment> {
    Ok(ParsedDeployment {
        address: capture(&ADDRESS_RE, stdout, "contract address")?,
        tx_hash: capture(&TX_HASH_RE, stdout, "transaction hash")?,
        deployment_id: capture(&DEPLOYMENT_ID_RE, stdout, "deployment id")?,
    })
}

/// Whether verifier output reports success (or an already verified
/// contract).
pub fn verification_succeeded(stdout: &str) -> bool {
    let lower = stdout.to_ascii_lowercase();
    lower.contains("successfully verified") || lower.contains("already verified")
}
