use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};
use wallet_core::{DeployStrategy, WalletConfig, WalletError, WalletResult};

use super::output::{parse_deploy_output, verification_succeeded};
use super::{ContractDeployer, DeployRequest, DeployResult};
use crate::storage::ContractType;

/// File the deploy scripts read their parameters from, relative to the
/// project directory.
pub const PARAMS_FILE: &str = "deploy-params.json";

const DEFAULT_PROGRAM: &str = "npx";

/// Runs the Hardhat deploy scripts as subprocesses and scrapes their output.
pub struct LocalCliDeployer {
    project_dir: PathBuf,
    program: String,
    deploy_timeout: Duration,
    verify_timeout: Duration,
}

impl LocalCliDeployer {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            program: DEFAULT_PROGRAM.into(),
            deploy_timeout: Duration::from_secs(300),
            verify_timeout: Duration::from_secs(180),
        }
    }

    pub fn from_config(config: &WalletConfig) -> WalletResult<Self> {
        let dir = config
            .hardhat_project_dir
            .clone()
            .ok_or_else(|| WalletError::Config("HARDHAT_PROJECT_DIR is not set".into()))?;
        Ok(Self::new(dir).with_timeouts(
            Duration::from_secs(config.deploy_timeout_secs),
            Duration::from_secs(config.verify_timeout_secs),
        ))
    }

    /// Replace the launcher (`npx` by default).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeouts(mut self, deploy: Duration, verify: Duration) -> Self {
        self.deploy_timeout = deploy;
        self.verify_timeout = verify;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn params_path(&self) -> PathBuf {
        self.project_dir.join(PARAMS_FILE)
    }

    fn deploy_args(request: &DeployRequest) -> Vec<String> {
        let script = match request.contract_type {
            ContractType::Erc20 => "scripts/deploy-erc20.js",
            ContractType::Erc721 => "scripts/deploy-erc721.js",
        };
        vec![
            "hardhat".into(),
            "run".into(),
            script.into(),
            "--network".into(),
            request.network.clone(),
        ]
    }

    fn verify_args(request: &DeployRequest, address: &str) -> Vec<String> {
        let mut args = vec![
            "hardhat".into(),
            "verify".into(),
            "--network".into(),
            request.network.clone(),
            address.to_string(),
            request.name.clone(),
            request.symbol.clone(),
        ];
        match request.contract_type {
            ContractType::Erc20 => {
                args.push(request.decimals.unwrap_or(18).to_string());
                args.push(request.total_supply.clone().unwrap_or_else(|| "1000000".into()));
            }
            ContractType::Erc721 => {
                args.push(request.base_uri.clone().unwrap_or_default());
            }
        }
        args
    }

    fn write_params(&self, request: &DeployRequest) -> WalletResult<PathBuf> {
        let path = self.params_path();
        let json = serde_json::to_string_pretty(request)
            .map_err(|e| WalletError::Storage(format!("failed to serialize deploy params: {e}")))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Run the launcher with `args`, bounded by `timeout`. The child is
    /// killed if the timeout fires.
    async fn run(&self, args: &[String], params: &Path, timeout: Duration) -> WalletResult<Output> {
        debug!(program = %self.program, args = ?args, "spawning deploy tool");
        let child = Command::new(&self.program)
            .args(args)
            .current_dir(&self.project_dir)
            .env("DEPLOY_PARAMS", params)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(WalletError::Subprocess(format!(
                "failed to execute {} {}: {e}",
                self.program,
                args.join(" ")
            ))),
            Err(_) => Err(WalletError::Subprocess(format!(
                "{} {} timed out after {}s",
                self.program,
                args.first().map(String::as_str).unwrap_or(""),
                timeout.as_secs()
            ))),
        }
    }

    async fn verify(&self, request: &DeployRequest, address: &str, params: &Path) -> bool {
        let args = Self::verify_args(request, address);
        match self.run(&args, params, self.verify_timeout).await {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let verified = output.status.success() || verification_succeeded(&stdout);
                if !verified {
                    warn!(
                        address,
                        stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                        "contract verification failed"
                    );
                }
                verified
            }
            Err(e) => {
                warn!(address, error = %e, "contract verification did not run");
                false
            }
        }
    }
}

#[async_trait]
impl ContractDeployer for LocalCliDeployer {
    fn strategy(&self) -> DeployStrategy {
        DeployStrategy::Local
    }

    async fn deploy(&self, request: &DeployRequest) -> WalletResult<DeployResult> {
        let params = self.write_params(request)?;
        let output = self
            .run(&Self::deploy_args(request), &params, self.deploy_timeout)
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WalletError::Subprocess(format!(
                "deploy script failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed = parse_deploy_output(&stdout)?;
        info!(
            address = %parsed.address,
            tx = %parsed.tx_hash,
            network = %request.network,
            "local deployment succeeded"
        );

        let verified = if request.wants_verification() {
            self.verify(request, &parsed.address, &params).await
        } else {
            false
        };

        Ok(DeployResult {
            success: true,
            address: Some(parsed.address),
            tx_hash: Some(parsed.tx_hash),
            deployment_id: Some(parsed.deployment_id),
            verified,
            error: None,
        })
    }
}
