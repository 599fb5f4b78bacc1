//! Contract deployment behind one interface, whatever does the work.

pub mod local;
pub mod output;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use wallet_core::{DeployStrategy, WalletResult};

use crate::storage::{ContractType, NewContract};

pub use local::LocalCliDeployer;
pub use remote::{DeployGasQuote, RemoteDeployer};

fn serialize_lower<S: Serializer>(kind: &ContractType, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.as_lower())
}

/// Parameters of one deployment, in the deploy API's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    #[serde(rename = "type", serialize_with = "serialize_lower")]
    pub contract_type: ContractType,
    pub name: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<String>,
    #[serde(rename = "baseURI", skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_buffer_multiplier: Option<f64>,
}

impl DeployRequest {
    pub fn wants_verification(&self) -> bool {
        self.verify.unwrap_or(false)
    }
}

/// Outcome of a deployment. Failures that the caller should render rather
/// than propagate come back as `success: false` with `error` set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployResult {
    pub success: bool,
    #[serde(rename = "contractAddress")]
    pub address: Option<String>,
    #[serde(rename = "transactionHash")]
    pub tx_hash: Option<String>,
    pub deployment_id: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeployResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// The storage record for a successful deployment of `request`, owned
    /// by `owner`. `None` unless the deployment succeeded with an address.
    pub fn to_new_contract(&self, request: &DeployRequest, owner: impl Into<String>) -> Option<NewContract> {
        if !self.success {
            return None;
        }
        let address = self.address.clone()?;
        let abi = match request.contract_type {
            ContractType::Erc20 => wallet_chain::abi::erc20_abi(),
            ContractType::Erc721 => wallet_chain::abi::erc721_abi(),
        };
        Some(NewContract {
            name: request.name.clone(),
            symbol: request.symbol.clone(),
            contract_address: address,
            abi,
            contract_type: request.contract_type,
            transaction_hash: self.tx_hash.clone().unwrap_or_default(),
            network: request.network.clone(),
            owner: owner.into(),
        })
    }
}

#[async_trait]
pub trait ContractDeployer: Send + Sync {
    fn strategy(&self) -> DeployStrategy;
    async fn deploy(&self, request: &DeployRequest) -> WalletResult<DeployResult>;
}
