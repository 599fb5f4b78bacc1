//! Fixtures shared with downstream crates' tests (`features = ["testing"]`).

use async_trait::async_trait;
use parking_lot::Mutex;
use wallet_core::{DeployStrategy, WalletError, WalletResult};

use crate::deploy::{ContractDeployer, DeployRequest, DeployResult};

pub const SCENARIO_ADDRESS: &str = "0xaf0b1eA2be2183e633BfAD72F05A1E7e1e44a74f";

/// A stored document holding one ERC20 contract, "My Second Token" on
/// sepolia, in canonical layout.
pub fn scenario_document() -> String {
    r#"{
  "contracts": [
    {
      "id": "ERC20_My Second Token_1718000000000",
      "name": "My Second Token",
      "symbol": "MST",
      "contract_address": "0xaf0b1eA2be2183e633BfAD72F05A1E7e1e44a74f",
      "abi": [
        {
          "type": "function",
          "name": "transfer",
          "inputs": [
            {
              "name": "to",
              "type": "address"
            },
            {
              "name": "amount",
              "type": "uint256"
            }
          ],
          "outputs": [
            {
              "name": "",
              "type": "bool"
            }
          ],
          "stateMutability": "nonpayable"
        }
      ],
      "type": "ERC20",
      "deployedAt": "2024-06-10T06:13:20.000Z",
      "transactionHash": "0x8f5e0a6d0b1c9f0e7a3b2c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f7081",
      "network": "sepolia",
      "owner": "0x70997970C51812dc3A010C7d01b50e20d17dc79C"
    }
  ]
}"#
    .to_string()
}

enum Outcome {
    Deployed(String),
    Rejected(String),
    Broken(String),
}

/// Scripted [`ContractDeployer`] recording every request it receives.
pub struct MockDeployer {
    outcome: Outcome,
    requests: Mutex<Vec<DeployRequest>>,
}

impl MockDeployer {
    /// Every deployment succeeds at `address`.
    pub fn deploying_to(address: impl Into<String>) -> Self {
        Self::with(Outcome::Deployed(address.into()))
    }

    /// Every deployment comes back with `success: false`.
    pub fn rejecting(error: impl Into<String>) -> Self {
        Self::with(Outcome::Rejected(error.into()))
    }

    /// Every deployment fails with a subprocess error.
    pub fn broken(error: impl Into<String>) -> Self {
        Self::with(Outcome::Broken(error.into()))
    }

    fn with(outcome: Outcome) -> Self {
        Self {
            outcome,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<DeployRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ContractDeployer for MockDeployer {
    fn strategy(&self) -> DeployStrategy {
        DeployStrategy::Remote
    }

    async fn deploy(&self, request: &DeployRequest) -> WalletResult<DeployResult> {
        self.requests.lock().push(request.clone());
        match &self.outcome {
            Outcome::Deployed(address) => Ok(DeployResult {
                success: true,
                address: Some(address.clone()),
                tx_hash: Some(format!("0x{}", "5a".repeat(32))),
                deployment_id: Some(format!("{}-{}-1", request.contract_type.as_lower(), request.network)),
                verified: request.wants_verification(),
                error: None,
            }),
            Outcome::Rejected(error) => Ok(DeployResult::failed(error.clone())),
            Outcome::Broken(error) => Err(WalletError::Subprocess(error.clone())),
        }
    }
}
