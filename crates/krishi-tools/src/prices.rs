//! `crop_price_agent`: daily mandi prices.

use async_trait::async_trait;
use krishi_core::{parse_args, AppError, Config, ConfigError, Specialist, SpecialistContext, Tool};
use krishi_services::{CropPriceClient, PriceError, PriceQuery};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct GetCropPriceTool {
    client: Option<CropPriceClient>,
}

#[async_trait]
impl Tool for GetCropPriceTool {
    fn name(&self) -> &str {
        "get_crop_price_tool"
    }

    fn description(&self) -> &str {
        "Fetches daily mandi prices from the Government of India commodity price API. \
         Only the state is required; commodity, district, market, variety and grade \
         narrow the results. Returns the API's JSON text."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "state": { "type": "string", "description": "Indian state, e.g. \"Punjab\"" },
                "commodity": { "type": "string", "description": "Crop name, e.g. \"Wheat\"" },
                "district": { "type": "string" },
                "market": { "type": "string" },
                "variety": { "type": "string" },
                "grade": { "type": "string" },
                "limit": { "type": "integer", "minimum": 1, "default": 10 }
            },
            "required": ["state"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, AppError> {
        let query: PriceQuery = parse_args(self.name(), params)?;
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSetting("prices.api_key".to_string()))?;

        let body = client.fetch(&query).await?;
        Ok(Value::String(body))
    }
}

pub struct PriceSpecialist {
    client: Option<CropPriceClient>,
}

impl PriceSpecialist {
    pub fn new(client: CropPriceClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// A missing API key leaves the tool registered; calls then fail with a
    /// configuration error.
    pub fn from_config(config: &Config) -> Result<Self, PriceError> {
        match CropPriceClient::new(&config.prices) {
            Ok(client) => Ok(Self::new(client)),
            Err(PriceError::Config(ConfigError::MissingSetting(setting))) => {
                tracing::warn!("{} is not set; crop price lookups are disabled", setting);
                Ok(Self { client: None })
            }
            Err(e) => Err(e),
        }
    }
}

impl Specialist for PriceSpecialist {
    fn id(&self) -> &str {
        "crop_price_agent"
    }

    fn name(&self) -> &str {
        "Crop Price Helper"
    }

    fn description(&self) -> &str {
        "Mandi prices for crops across Indian states and markets"
    }

    fn initialize(&mut self, _ctx: &SpecialistContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(GetCropPriceTool {
            client: self.client.clone(),
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_at_call_time() {
        let specialist = PriceSpecialist::from_config(&Config::default()).unwrap();
        let tools = specialist.tools();

        let err = tools[0]
            .execute(json!({"state": "Punjab"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::MissingSetting(_))));
    }

    #[tokio::test]
    async fn test_state_is_required() {
        let specialist = PriceSpecialist::from_config(&Config::default()).unwrap();
        let err = specialist.tools()[0]
            .execute(json!({"commodity": "Wheat"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
