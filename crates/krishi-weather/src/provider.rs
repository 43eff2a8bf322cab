//! Open-Meteo hourly forecast fetching.

use crate::types::{
    ForecastSeries, Location, WeatherError, FORECAST_DAYS, FORECAST_VARIABLES,
};
use krishi_core::{with_retry, NetworkError, RetryConfig, WeatherConfig};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    #[serde(flatten)]
    values: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoError {
    reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ForecastProvider {
    client: Arc<Client>,
    forecast_url: String,
    retry: RetryConfig,
}

impl ForecastProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            forecast_url: config.forecast_url.clone(),
            retry: RetryConfig::from(&config.retry),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch the 3-day hourly forecast for `location` and downsample it.
    ///
    /// Hours are aligned to the location's local timezone. Throttling and
    /// server errors are retried with exponential backoff.
    pub async fn fetch(
        &self,
        location: &Location,
        step_hours: usize,
    ) -> Result<ForecastSeries, WeatherError> {
        if step_hours == 0 {
            return Err(WeatherError::InvalidInput(
                "step_hours must be a positive integer".to_string(),
            ));
        }

        let query = [
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("hourly", FORECAST_VARIABLES.join(",")),
            ("forecast_days", FORECAST_DAYS.to_string()),
            ("timezone", "auto".to_string()),
        ];
        tracing::debug!(
            "Fetching forecast for {}, {}",
            location.latitude,
            location.longitude
        );

        let response = with_retry(self.retry.clone(), || {
            self.client.get(&self.forecast_url).query(&query).send()
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenMeteoError>(&body)
                .ok()
                .and_then(|e| e.reason)
                .unwrap_or(body);
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: OpenMeteoResponse = response.json().await?;
        let hourly = parse_hourly(body.hourly)?;
        tracing::info!(
            "Fetched {} hourly points, downsampling every {} hours",
            hourly.len(),
            step_hours
        );

        hourly.downsample(step_hours)
    }
}

/// Pull the fixed variable set out of the hourly block.
fn parse_hourly(mut hourly: HourlyBlock) -> Result<ForecastSeries, WeatherError> {
    let mut variables = BTreeMap::new();

    for name in FORECAST_VARIABLES {
        let raw = hourly.values.remove(name).ok_or_else(|| {
            NetworkError::InvalidResponse(format!("forecast is missing '{}'", name))
        })?;
        let values: Vec<Option<f64>> = serde_json::from_value(raw).map_err(|e| {
            NetworkError::InvalidResponse(format!("forecast series '{}': {}", name, e))
        })?;
        variables.insert(name.to_string(), values);
    }

    ForecastSeries::new(hourly.time, variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(len: usize) -> serde_json::Value {
        let mut hourly = serde_json::Map::new();
        hourly.insert(
            "time".into(),
            json!((0..len).map(|i| format!("2025-06-01T{:02}:00", i)).collect::<Vec<_>>()),
        );
        for name in FORECAST_VARIABLES {
            hourly.insert(name.into(), json!(vec![1.5; len]));
        }
        serde_json::Value::Object(hourly)
    }

    #[test]
    fn test_parse_hourly_extracts_all_variables() {
        let hourly: HourlyBlock = serde_json::from_value(block(4)).unwrap();
        let series = parse_hourly(hourly).unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.variables.len(), FORECAST_VARIABLES.len());
        assert!(series.is_aligned());
    }

    #[test]
    fn test_parse_hourly_accepts_nulls() {
        let mut raw = block(2);
        raw["precipitation_probability"] = json!([null, 40]);
        let hourly: HourlyBlock = serde_json::from_value(raw).unwrap();
        let series = parse_hourly(hourly).unwrap();

        assert_eq!(
            series.variables["precipitation_probability"],
            vec![None, Some(40.0)]
        );
    }

    #[test]
    fn test_parse_hourly_missing_variable() {
        let mut raw = block(2);
        raw.as_object_mut().unwrap().remove("wind_speed_10m");
        let hourly: HourlyBlock = serde_json::from_value(raw).unwrap();

        let err = parse_hourly(hourly).unwrap_err();
        assert!(err.to_string().contains("wind_speed_10m"));
    }

    #[test]
    fn test_parse_hourly_length_mismatch() {
        let mut raw = block(3);
        raw["temperature_2m"] = json!([1.0]);
        let hourly: HourlyBlock = serde_json::from_value(raw).unwrap();

        assert!(matches!(
            parse_hourly(hourly),
            Err(WeatherError::Upstream(NetworkError::InvalidResponse(_)))
        ));
    }
}
