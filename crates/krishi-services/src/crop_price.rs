//! Daily mandi prices from the data.gov.in commodity resource.

use krishi_core::{
    with_retry, AppError, ConfigError, NetworkError, PricesConfig, ReqwestErrorExt, RetryConfig,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum PriceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] NetworkError),
}

impl From<reqwest::Error> for PriceError {
    fn from(e: reqwest::Error) -> Self {
        PriceError::Upstream(e.into_network_error())
    }
}

impl From<PriceError> for AppError {
    fn from(e: PriceError) -> Self {
        match e {
            PriceError::InvalidInput(msg) => AppError::InvalidInput(msg),
            PriceError::Config(e) => AppError::Config(e),
            PriceError::Upstream(e) => AppError::Upstream(e),
        }
    }
}

/// Filters for one price lookup. Only `state` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuery {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commodity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl PriceQuery {
    pub fn for_state(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ..Self::default()
        }
    }

    /// Request query pairs; blank optional filters are left out
    fn to_params(&self, api_key: &str, default_limit: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api-key", api_key.to_string()),
            ("format", "json".to_string()),
            ("limit", self.limit.unwrap_or(default_limit).to_string()),
            ("filters[state.keyword]", self.state.trim().to_string()),
        ];

        let optional = [
            ("filters[commodity]", &self.commodity),
            ("filters[district]", &self.district),
            ("filters[market]", &self.market),
            ("filters[variety]", &self.variety),
            ("filters[grade]", &self.grade),
        ];
        for (key, value) in optional {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push((key, v.to_string()));
            }
        }
        params
    }
}

/// Client for the commodity price API
#[derive(Debug, Clone)]
pub struct CropPriceClient {
    client: Arc<Client>,
    api_url: Url,
    api_key: String,
    default_limit: u32,
    retry: RetryConfig,
}

impl CropPriceClient {
    /// Build a client; fails when no API key is configured.
    pub fn new(config: &PricesConfig) -> Result<Self, PriceError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingSetting("prices.api_key".to_string()))?;

        let api_url = Url::parse(&config.api_url)
            .map_err(|e| ConfigError::Invalid(format!("prices.api_url: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            api_url,
            api_key,
            default_limit: config.default_limit,
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch price records and return the API's JSON body unchanged.
    pub async fn fetch(&self, query: &PriceQuery) -> Result<String, PriceError> {
        if query.state.trim().is_empty() {
            return Err(PriceError::InvalidInput(
                "state is required for a price lookup".to_string(),
            ));
        }

        let params = query.to_params(&self.api_key, self.default_limit);
        tracing::debug!(
            "Fetching crop prices for state={} commodity={:?}",
            query.state,
            query.commodity
        );

        let response = with_retry(self.retry.clone(), || {
            self.client.get(self.api_url.clone()).query(&params).send()
        })
        .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!("Price API returned {}", status);
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }

        tracing::info!("Fetched {} bytes of price data", body.len());
        Ok(body)
    }
}
