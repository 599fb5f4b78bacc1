use serde::{Serialize, Serializer};
use serde_json::Value;
use wallet_contracts::{ContractType, DeployResult, StoredContract};

use crate::status::Phase;

fn lower<S: Serializer>(kind: &ContractType, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.as_lower())
}

/// A deployed contract as shown by the app. The type serializes lower-case.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedContract {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub address: String,
    #[serde(rename = "type", serialize_with = "lower")]
    pub contract_type: ContractType,
    pub network: String,
    pub deployed_at: String,
    pub transaction_hash: String,
    pub owner: String,
    #[serde(skip)]
    pub abi: Vec<Value>,
}

impl From<StoredContract> for DeployedContract {
    fn from(stored: StoredContract) -> Self {
        Self {
            id: stored.id,
            name: stored.name,
            symbol: stored.symbol,
            address: stored.contract_address,
            contract_type: stored.contract_type,
            network: stored.network,
            deployed_at: stored.deployed_at,
            transaction_hash: stored.transaction_hash,
            owner: stored.owner,
            abi: stored.abi,
        }
    }
}

/// What a fulfilled deploy thunk carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deployment {
    pub result: DeployResult,
    pub contract: DeployedContract,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractState {
    pub contracts: Vec<DeployedContract>,
    pub is_loading: bool,
    pub is_deploying: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pub last_deployment: Option<DeployResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContractAction {
    Add(DeployedContract),
    /// Remove by address (any case). A miss leaves the slice unchanged.
    Remove(String),
    SetError(Option<String>),
    Load(Phase<Vec<DeployedContract>>),
    Deploy(Phase<Deployment>),
    /// Fulfilled with the id of the deleted record.
    Delete(Phase<String>),
}

impl ContractState {
    pub fn find_by_address(&self, address: &str) -> Option<&DeployedContract> {
        self.contracts.iter().find(|c| c.address.eq_ignore_ascii_case(address))
    }

    pub fn reduce(&mut self, action: ContractAction) {
        match action {
            ContractAction::Add(contract) => self.contracts.push(contract),
            ContractAction::Remove(address) => {
                self.contracts.retain(|c| !c.address.eq_ignore_ascii_case(&address));
            }
            ContractAction::SetError(error) => self.error = error,
            ContractAction::Load(phase) => {
                (self.is_loading, self.error) = phase.flags();
                if let Phase::Fulfilled(contracts) = phase {
                    self.contracts = contracts;
                }
            }
            ContractAction::Deploy(phase) => {
                (self.is_deploying, self.error) = phase.flags();
                match phase {
                    Phase::Pending => self.last_deployment = None,
                    Phase::Fulfilled(deployment) => {
                        self.last_deployment = Some(deployment.result);
                        self.contracts.push(deployment.contract);
                    }
                    Phase::Rejected(error) => self.last_deployment = Some(DeployResult::failed(error)),
                }
            }
            ContractAction::Delete(phase) => {
                (self.is_loading, self.error) = phase.flags();
                if let Phase::Fulfilled(id) = phase {
                    self.contracts.retain(|c| c.id != id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0xaf0b1eA2be2183e633BfAD72F05A1E7e1e44a74f";

    fn contract(id: &str, address: &str) -> DeployedContract {
        DeployedContract {
            id: id.into(),
            name: "My Second Token".into(),
            symbol: "MST".into(),
            address: address.into(),
            contract_type: ContractType::Erc20,
            network: "sepolia".into(),
            deployed_at: "2024-06-10T06:13:20.000Z".into(),
            transaction_hash: "0x01".into(),
            owner: "0x02".into(),
            abi: Vec::new(),
        }
    }

    #[test]
    fn add_then_remove_by_address() {
        let mut state = ContractState::default();
        state.reduce(ContractAction::Add(contract("a", ADDRESS)));
        assert_eq!(state.contracts.len(), 1);
        state.reduce(ContractAction::Remove(ADDRESS.into()));
        assert!(state.contracts.is_empty());
    }

    #[test]
    fn removing_missing_address_is_noop() {
        let mut state = ContractState::default();
        state.reduce(ContractAction::Add(contract("a", ADDRESS)));
        let before = state.contracts.clone();
        state.reduce(ContractAction::Remove(
            "0x0000000000000000000000000000000000000001".into(),
        ));
        assert_eq!(state.contracts, before);
    }

    #[test]
    fn remove_ignores_case() {
        let mut state = ContractState::default();
        state.reduce(ContractAction::Add(contract("a", ADDRESS)));
        state.reduce(ContractAction::Remove(ADDRESS.to_lowercase()));
        assert!(state.contracts.is_empty());
    }

    #[test]
    fn type_serializes_lower_case() {
        let json = serde_json::to_value(contract("a", ADDRESS)).unwrap();
        assert_eq!(json["type"], "erc20");
        assert_eq!(json["address"], ADDRESS);
    }

    #[test]
    fn deploy_lifecycle() {
        let mut state = ContractState::default();
        state.reduce(ContractAction::Deploy(Phase::Pending));
        assert!(state.is_deploying);

        let result = DeployResult {
            success: true,
            address: Some(ADDRESS.into()),
            ..DeployResult::default()
        };
        state.reduce(ContractAction::Deploy(Phase::Fulfilled(Deployment {
            result: result.clone(),
            contract: contract("a", ADDRESS),
        })));
        assert!(!state.is_deploying);
        assert_eq!(state.last_deployment, Some(result));
        assert!(state.find_by_address(&ADDRESS.to_uppercase().replacen("0X", "0x", 1)).is_some());
    }

    #[test]
    fn deploy_rejection_records_failure() {
        let mut state = ContractState::default();
        state.reduce(ContractAction::Deploy(Phase::Rejected("out of gas".into())));
        assert_eq!(state.error.as_deref(), Some("out of gas"));
        assert!(!state.last_deployment.unwrap().success);
    }

    #[test]
    fn delete_removes_by_id() {
        let mut state = ContractState::default();
        state.reduce(ContractAction::Add(contract("a", ADDRESS)));
        state.reduce(ContractAction::Add(contract("b", "0x01")));
        state.reduce(ContractAction::Delete(Phase::Fulfilled("a".into())));
        assert_eq!(state.contracts.len(), 1);
        assert_eq!(state.contracts[0].id, "b");
    }
}
