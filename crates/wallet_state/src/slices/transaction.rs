use serde::Serialize;
use wallet_chain::{GasEstimate, StatusUpdate, TokenInfo, TransactionRecord};

use crate::status::{AsyncStatus, Phase};

/// Send history (newest first) and transaction-side async results.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionState {
    pub history: Vec<TransactionRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_hash: Option<String>,
    pub gas_estimate: AsyncStatus<GasEstimate>,
    pub token_info: AsyncStatus<TokenInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionAction {
    Add(TransactionRecord),
    UpdateStatus(StatusUpdate),
    ClearHistory,
    SetError(Option<String>),
    Send(Phase<TransactionRecord>),
    EstimateGas(Phase<GasEstimate>),
    TokenInfo(Phase<TokenInfo>),
    RefreshStatus(Phase<StatusUpdate>),
}

impl TransactionState {
    fn add(&mut self, record: TransactionRecord) {
        self.history.retain(|r| r.hash != record.hash);
        self.history.insert(0, record);
    }

    fn update_status(&mut self, update: StatusUpdate) {
        if let Some(record) = self.history.iter_mut().find(|r| r.hash == update.hash) {
            record.status = update.status;
            if update.gas_used.is_some() {
                record.gas_used = update.gas_used;
            }
            if update.gas_price.is_some() {
                record.gas_price = update.gas_price;
            }
        }
    }

    pub fn reduce(&mut self, action: TransactionAction) {
        match action {
            TransactionAction::Add(record) => self.add(record),
            TransactionAction::UpdateStatus(update) => self.update_status(update),
            TransactionAction::ClearHistory => self.history.clear(),
            TransactionAction::SetError(error) => self.error = error,
            TransactionAction::Send(phase) => {
                (self.is_loading, self.error) = phase.flags();
                if let Phase::Fulfilled(record) = phase {
                    self.last_hash = Some(record.hash.clone());
                    self.add(record);
                }
            }
            TransactionAction::EstimateGas(phase) => {
                self.error = phase.error().map(str::to_string);
                self.gas_estimate.apply(&phase);
            }
            TransactionAction::TokenInfo(phase) => {
                self.error = phase.error().map(str::to_string);
                self.token_info.apply(&phase);
            }
            TransactionAction::RefreshStatus(phase) => {
                if let Some(e) = phase.error() {
                    self.error = Some(e.to_string());
                }
                if let Phase::Fulfilled(update) = phase {
                    self.update_status(update);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_chain::{TransactionKind, TxStatus};

    fn record(hash: &str) -> TransactionRecord {
        TransactionRecord {
            hash: hash.into(),
            from: "0x01".into(),
            to: "0x02".into(),
            value: "0.1".into(),
            kind: TransactionKind::Native,
            status: TxStatus::Pending,
            timestamp: 1_718_000_000_000,
            gas_used: None,
            gas_price: None,
            token_symbol: None,
            token_id: None,
        }
    }

    #[test]
    fn history_is_newest_first() {
        let mut state = TransactionState::default();
        state.reduce(TransactionAction::Add(record("0xa")));
        state.reduce(TransactionAction::Send(Phase::Fulfilled(record("0xb"))));
        assert_eq!(state.history[0].hash, "0xb");
        assert_eq!(state.history[1].hash, "0xa");
        assert_eq!(state.last_hash.as_deref(), Some("0xb"));
    }

    #[test]
    fn status_updates_in_place() {
        let mut state = TransactionState::default();
        state.reduce(TransactionAction::Add(record("0xa")));
        state.reduce(TransactionAction::Add(record("0xb")));
        state.reduce(TransactionAction::UpdateStatus(StatusUpdate {
            hash: "0xa".into(),
            status: TxStatus::Confirmed,
            gas_used: Some("21000".into()),
            gas_price: Some("24".into()),
        }));
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[1].status, TxStatus::Confirmed);
        assert_eq!(state.history[1].gas_used.as_deref(), Some("21000"));
        assert_eq!(state.history[0].status, TxStatus::Pending);
    }

    #[test]
    fn unknown_hash_update_is_ignored() {
        let mut state = TransactionState::default();
        state.reduce(TransactionAction::Add(record("0xa")));
        state.reduce(TransactionAction::RefreshStatus(Phase::Fulfilled(StatusUpdate {
            hash: "0xzz".into(),
            status: TxStatus::Failed,
            gas_used: None,
            gas_price: None,
        })));
        assert_eq!(state.history[0].status, TxStatus::Pending);
    }

    #[test]
    fn clear_history() {
        let mut state = TransactionState::default();
        state.reduce(TransactionAction::Add(record("0xa")));
        state.reduce(TransactionAction::ClearHistory);
        assert!(state.history.is_empty());
    }

    #[test]
    fn rejected_send_keeps_history() {
        let mut state = TransactionState::default();
        state.reduce(TransactionAction::Add(record("0xa")));
        state.reduce(TransactionAction::Send(Phase::Pending));
        assert!(state.is_loading);
        state.reduce(TransactionAction::Send(Phase::Rejected(
            "Transaction failed: insufficient funds".into(),
        )));
        assert!(!state.is_loading);
        assert_eq!(state.history.len(), 1);
        assert!(state.error.as_deref().unwrap().contains("insufficient funds"));
    }

    #[test]
    fn estimate_tracks_status() {
        let mut state = TransactionState::default();
        state.reduce(TransactionAction::EstimateGas(Phase::Pending));
        assert!(state.gas_estimate.is_loading());
        let estimate = GasEstimate::new(21_000, 20_000_000_000, 1.2);
        state.reduce(TransactionAction::EstimateGas(Phase::Fulfilled(estimate)));
        assert_eq!(state.gas_estimate.value(), Some(&estimate));
    }
}
