//! Contract deployment form: raw field values, validation and conversion
//! into a [`DeployRequest`].

use serde::{Deserialize, Serialize};
use url::Url;
use wallet_core::{ValidationResult, WalletError, WalletResult, clamp_gas_buffer};

use crate::deploy::DeployRequest;
use crate::storage::ContractType;

pub const NAME_REQUIRED: &str = "コントラクト名は必須です";
pub const SYMBOL_REQUIRED: &str = "シンボルは必須です";
pub const TOTAL_SUPPLY_INVALID: &str = "総供給量は正の数値である必要があります";
pub const DECIMALS_INVALID: &str = "小数点以下の桁数は0から18の間である必要があります";
pub const BASE_URI_INVALID: &str = "ベースURIは有効なURLである必要があります";

/// Deployment form as entered. Optional fields are plain strings; an empty
/// string means "not provided".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractParams {
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: String,
    #[serde(default)]
    pub total_supply: String,
    #[serde(rename = "baseURI", default)]
    pub base_uri: String,
}

impl ContractParams {
    pub fn new(contract_type: ContractType, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            contract_type,
            name: name.into(),
            symbol: symbol.into(),
            decimals: String::new(),
            total_supply: String::new(),
            base_uri: String::new(),
        }
    }

    /// Validate and turn into the deploy API's request shape.
    pub fn into_request(
        self,
        network: impl Into<String>,
        verify: bool,
        gas_buffer_multiplier: f64,
    ) -> WalletResult<DeployRequest> {
        validate_contract_params(&self).into_result()?;

        let (decimals, total_supply, base_uri) = match self.contract_type {
            ContractType::Erc20 => {
                let decimals = provided(&self.decimals)
                    .map(parse_decimals)
                    .transpose()?;
                (decimals, provided(&self.total_supply).map(str::to_string), None)
            }
            ContractType::Erc721 => (None, None, provided(&self.base_uri).map(str::to_string)),
        };

        Ok(DeployRequest {
            contract_type: self.contract_type,
            name: self.name.trim().to_string(),
            symbol: self.symbol.trim().to_string(),
            decimals,
            total_supply,
            base_uri,
            network: network.into(),
            verify: Some(verify),
            gas_buffer_multiplier: Some(clamp_gas_buffer(gas_buffer_multiplier)),
        })
    }
}

fn provided(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_decimals(value: &str) -> WalletResult<u8> {
    value
        .parse::<u8>()
        .ok()
        .filter(|d| *d <= 18)
        .ok_or_else(|| WalletError::Validation(DECIMALS_INVALID.into()))
}

fn is_positive_number(value: &str) -> bool {
    value
        .parse::<f64>()
        .map(|v| v.is_finite() && v > 0.0)
        .unwrap_or(false)
}

fn is_well_formed_url(value: &str) -> bool {
    Url::parse(value).map(|u| u.has_host()).unwrap_or(false)
}

/// Check a deployment form. All problems are reported at once.
pub fn validate_contract_params(params: &ContractParams) -> ValidationResult {
    let mut errors = Vec::new();

    if provided(&params.name).is_none() {
        errors.push(NAME_REQUIRED.to_string());
    }
    if provided(&params.symbol).is_none() {
        errors.push(SYMBOL_REQUIRED.to_string());
    }

    match params.contract_type {
        ContractType::Erc20 => {
            if let Some(supply) = provided(&params.total_supply) {
                if !is_positive_number(supply) {
                    errors.push(TOTAL_SUPPLY_INVALID.to_string());
                }
            }
            if let Some(decimals) = provided(&params.decimals) {
                if parse_decimals(decimals).is_err() {
                    errors.push(DECIMALS_INVALID.to_string());
                }
            }
        }
        ContractType::Erc721 => {
            if let Some(uri) = provided(&params.base_uri) {
                if !is_well_formed_url(uri) {
                    errors.push(BASE_URI_INVALID.to_string());
                }
            }
        }
    }

    ValidationResult::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn erc20() -> ContractParams {
        ContractParams::new(ContractType::Erc20, "Gold", "GLD")
    }

    fn erc721() -> ContractParams {
        ContractParams::new(ContractType::Erc721, "Art", "ART")
    }

    #[test]
    fn empty_optional_fields_are_skipped() {
        let result = validate_contract_params(&erc20());
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn negative_supply_is_rejected() {
        let mut params = erc20();
        params.total_supply = "-1".into();
        let result = validate_contract_params(&params);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec![TOTAL_SUPPLY_INVALID.to_string()]);
    }

    #[test]
    fn name_and_symbol_are_required() {
        let params = ContractParams::new(ContractType::Erc20, "   ", "");
        let result = validate_contract_params(&params);
        assert_eq!(
            result.errors,
            vec![NAME_REQUIRED.to_string(), SYMBOL_REQUIRED.to_string()]
        );
    }

    #[test]
    fn decimals_range() {
        for (value, ok) in [("0", true), ("18", true), ("19", false), ("-1", false), ("1.5", false)] {
            let mut params = erc20();
            params.decimals = value.into();
            assert_eq!(validate_contract_params(&params).is_valid, ok, "decimals {value}");
        }
    }

    #[test]
    fn base_uri_must_be_a_url() {
        let mut params = erc721();
        params.base_uri = "not-a-url".into();
        let result = validate_contract_params(&params);
        assert_eq!(result.errors, vec![BASE_URI_INVALID.to_string()]);

        params.base_uri = "ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG/".into();
        assert!(validate_contract_params(&params).is_valid);

        params.base_uri = "https://meta.example.com/art/".into();
        assert!(validate_contract_params(&params).is_valid);
    }

    #[test]
    fn nft_ignores_erc20_fields() {
        let mut params = erc721();
        params.total_supply = "-5".into();
        assert!(validate_contract_params(&params).is_valid);
    }

    #[test]
    fn into_request_keeps_relevant_fields() {
        let mut params = erc20();
        params.decimals = "6".into();
        params.total_supply = "1000000".into();
        params.base_uri = "ipfs://ignored/".into();
        let request = params.into_request("sepolia", true, 5.0).unwrap();
        assert_eq!(request.decimals, Some(6));
        assert_eq!(request.total_supply.as_deref(), Some("1000000"));
        assert_eq!(request.base_uri, None);
        assert_eq!(request.gas_buffer_multiplier, Some(3.0));
        assert!(request.wants_verification());
    }

    #[test]
    fn into_request_rejects_invalid_form() {
        let err = ContractParams::new(ContractType::Erc721, "", "ART")
            .into_request("sepolia", false, 1.2)
            .unwrap_err();
        assert_eq!(err, WalletError::Validation(NAME_REQUIRED.into()));
    }

    #[test]
    fn deserializes_form_json() {
        let params: ContractParams =
            serde_json::from_str(r#"{"type":"erc721","name":"Art","symbol":"ART","baseURI":""}"#).unwrap();
        assert_eq!(params.contract_type, ContractType::Erc721);
        assert!(validate_contract_params(&params).is_valid);
    }
}
