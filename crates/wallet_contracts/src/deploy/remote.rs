use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use wallet_core::{DeployStrategy, WalletResult};

use super::{ContractDeployer, DeployRequest, DeployResult};

pub const DEFAULT_DEPLOY_API_URL: &str = "http://localhost:3001";

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Response of `POST /api/estimate-gas`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployGasQuote {
    pub success: bool,
    #[serde(deserialize_with = "string_or_number")]
    pub gas_limit: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub gas_price: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub estimated_fee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client for the HTTP deployment API.
///
/// Transport failures and non-2xx responses are reported inside the result
/// (`success: false`), never as `Err`.
pub struct RemoteDeployer {
    base_url: String,
    client: Client,
}

impl RemoteDeployer {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_DEPLOY_API_URL)
    }

    /// Create a new client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the API what deploying `request` would cost.
    pub async fn estimate_gas(&self, request: &DeployRequest) -> DeployGasQuote {
        let url = format!("{}/api/estimate-gas", self.base_url);
        match self.post::<DeployGasQuote>(&url, request).await {
            Ok(quote) => quote,
            Err(error) => DeployGasQuote {
                error: Some(error),
                ..DeployGasQuote::default()
            },
        }
    }

    /// POST `body` and decode a 2xx JSON reply. Errors are rendered to a
    /// message.
    async fn post<T: DeserializeOwned>(&self, url: &str, body: &DeployRequest) -> Result<T, String> {
        debug!(url = %url, "deploy API request");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("Deploy API unreachable: {e}"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("Failed to read deploy API response: {e}"))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| text.trim().to_string());
            return Err(format!("Deploy API error ({status}): {detail}"));
        }

        serde_json::from_str(&text).map_err(|e| format!("Invalid deploy API response: {e}"))
    }
}

impl Default for RemoteDeployer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractDeployer for RemoteDeployer {
    fn strategy(&self) -> DeployStrategy {
        DeployStrategy::Remote
    }

    async fn deploy(&self, request: &DeployRequest) -> WalletResult<DeployResult> {
        let url = format!("{}/api/deploy", self.base_url);
        let result = match self.post::<DeployResult>(&url, request).await {
            Ok(result) => result,
            Err(error) => DeployResult::failed(error),
        };
        if result.success {
            info!(
                name = %request.name,
                network = %request.network,
                address = result.address.as_deref().unwrap_or("-"),
                "remote deployment succeeded"
            );
        } else {
            warn!(
                name = %request.name,
                error = result.error.as_deref().unwrap_or("unknown"),
                "remote deployment failed"
            );
        }
        Ok(result)
    }
}
