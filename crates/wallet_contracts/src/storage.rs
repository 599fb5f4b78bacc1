//! Persistence for deployed-contract records.
//!
//! The whole document is rewritten on every mutation. Missing or corrupt
//! data reads as an empty list; it is a local cache of display data, so
//! availability wins over strictness.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use wallet_core::{WalletConfig, WalletError, WalletResult};

/// Key of the local-storage slot holding the document.
pub const DEFAULT_STORAGE_KEY: &str = "deployedContracts";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "ERC20", alias = "erc20")]
    Erc20,
    #[serde(rename = "ERC721", alias = "erc721")]
    Erc721,
}

impl ContractType {
    /// Upper-case form used in the persisted document.
    pub fn as_stored(&self) -> &'static str {
        match self {
            Self::Erc20 => "ERC20",
            Self::Erc721 => "ERC721",
        }
    }

    /// Lower-case form used by the rest of the app.
    pub fn as_lower(&self) -> &'static str {
        match self {
            Self::Erc20 => "erc20",
            Self::Erc721 => "erc721",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

impl FromStr for ContractType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "erc20" => Ok(Self::Erc20),
            "erc721" => Ok(Self::Erc721),
            other => Err(WalletError::Validation(format!("unknown contract type: {other}"))),
        }
    }
}

/// A deployed contract as persisted. Field order matches the document
/// layout; unknown fields are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredContract {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    pub contract_address: String,
    #[serde(default)]
    pub abi: Vec<Value>,
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    #[serde(rename = "deployedAt", default)]
    pub deployed_at: String,
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub owner: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Input to [`ContractStorage::save_contract`]; id and timestamp are
/// assigned on save.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
    pub name: String,
    pub symbol: String,
    pub contract_address: String,
    pub abi: Vec<Value>,
    pub contract_type: ContractType,
    pub transaction_hash: String,
    pub network: String,
    pub owner: String,
}

/// `{ "contracts": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDocument {
    #[serde(default)]
    pub contracts: Vec<StoredContract>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContractDocument {
    /// Parse a stored document; `None` when it is not valid.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(error = %e, "contract document is corrupt, treating as empty");
                None
            }
        }
    }

    /// Two-space indented JSON, no trailing newline.
    pub fn to_json(&self) -> WalletResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WalletError::Storage(format!("failed to serialize contracts: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Where the contract document lives.
pub trait ContractBackend: Send + Sync {
    /// The stored document, or an empty one when missing or unreadable.
    fn read(&self) -> ContractDocument;
    /// Replace the stored document.
    fn write(&self, doc: &ContractDocument) -> WalletResult<()>;
}

/// JSON file on disk, replaced atomically via a temp file + rename.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContractBackend for JsonFileBackend {
    fn read(&self) -> ContractDocument {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => ContractDocument::parse(&text).unwrap_or_default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no contract file yet");
                ContractDocument::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read contract file");
                ContractDocument::default()
            }
        }
    }

    fn write(&self, doc: &ContractDocument) -> WalletResult<()> {
        let json = doc.to_json()?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| WalletError::Storage(format!("failed to replace {}: {e}", self.path.display())))?;
        Ok(())
    }
}

/// A string-valued key/value store (browser local storage style).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> WalletResult<()>;
    fn remove(&self, key: &str);
}

/// Process-local [`KeyValueStore`].
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> WalletResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

/// The document kept under one key of a [`KeyValueStore`].
pub struct KeyValueBackend<S: KeyValueStore> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> KeyValueBackend<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> ContractBackend for KeyValueBackend<S> {
    fn read(&self) -> ContractDocument {
        self.store
            .get(&self.key)
            .and_then(|text| ContractDocument::parse(&text))
            .unwrap_or_default()
    }

    fn write(&self, doc: &ContractDocument) -> WalletResult<()> {
        self.store.set(&self.key, doc.to_json()?)
    }
}

// ---------------------------------------------------------------------------
// ContractStorage
// ---------------------------------------------------------------------------

/// Lookup and mutation of deployed contracts over a swappable backend.
///
/// Mutations are read-modify-write with no concurrency control; the last
/// writer wins.
pub struct ContractStorage {
    backend: Box<dyn ContractBackend>,
}

impl ContractStorage {
    pub fn new(backend: impl ContractBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// File-backed storage at the configured contracts path.
    pub fn from_config(config: &WalletConfig) -> anyhow::Result<Self> {
        let path = config.resolved_contracts_path()?;
        info!(path = %path.display(), "contract storage");
        Ok(Self::new(JsonFileBackend::new(path)))
    }

    /// In-memory storage, mostly for tests.
    pub fn in_memory() -> Self {
        Self::new(KeyValueBackend::new(MemoryKeyValueStore::new()))
    }

    pub fn get_all_contracts(&self) -> Vec<StoredContract> {
        self.backend.read().contracts
    }

    pub fn get_contracts_by_type(&self, contract_type: ContractType) -> Vec<StoredContract> {
        self.get_all_contracts()
            .into_iter()
            .filter(|c| c.contract_type == contract_type)
            .collect()
    }

    pub fn get_contract_by_id(&self, id: &str) -> Option<StoredContract> {
        self.get_all_contracts().into_iter().find(|c| c.id == id)
    }

    /// Case-insensitive address match.
    pub fn get_contract_by_address(&self, address: &str) -> Option<StoredContract> {
        self.get_all_contracts()
            .into_iter()
            .find(|c| c.contract_address.eq_ignore_ascii_case(address))
    }

    /// Append a record, assigning `{type}_{name}_{epochMillis}` as its id.
    /// Two saves of the same type and name within one millisecond collide.
    pub fn save_contract(&self, new: NewContract) -> WalletResult<StoredContract> {
        let now = Utc::now();
        let record = StoredContract {
            id: format!("{}_{}_{}", new.contract_type, new.name, now.timestamp_millis()),
            name: new.name,
            symbol: new.symbol,
            contract_address: new.contract_address,
            abi: new.abi,
            contract_type: new.contract_type,
            deployed_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            transaction_hash: new.transaction_hash,
            network: new.network,
            owner: new.owner,
            extra: Map::new(),
        };

        let mut doc = self.backend.read();
        doc.contracts.push(record.clone());
        self.backend.write(&doc)?;
        info!(id = %record.id, address = %record.contract_address, network = %record.network, "contract saved");
        Ok(record)
    }

    /// Remove the record with `id`. Returns whether one was removed.
    pub fn delete_contract(&self, id: &str) -> WalletResult<bool> {
        let mut doc = self.backend.read();
        let before = doc.contracts.len();
        doc.contracts.retain(|c| c.id != id);
        if doc.contracts.len() == before {
            return Ok(false);
        }
        self.backend.write(&doc)?;
        info!(id, "contract deleted");
        Ok(true)
    }
}
