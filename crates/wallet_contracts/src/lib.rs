pub mod deploy;
pub mod params;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use deploy::{
    ContractDeployer, DeployGasQuote, DeployRequest, DeployResult, LocalCliDeployer, RemoteDeployer,
};
pub use params::{ContractParams, validate_contract_params};
pub use storage::{
    ContractBackend, ContractDocument, ContractStorage, ContractType, JsonFileBackend, KeyValueBackend,
    KeyValueStore, MemoryKeyValueStore, NewContract, StoredContract,
};
