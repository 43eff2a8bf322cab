//! `weather_expert`: forecast tools backed by the freshness cache.

use async_trait::async_trait;
use krishi_core::{parse_args, AppError, Specialist, SpecialistContext, Tool};
use krishi_weather::{WeatherCache, FORECAST_VARIABLES};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct CityArgs {
    city_name: String,
}

#[derive(Debug, Deserialize)]
struct VariableArgs {
    city_name: String,
    variable: String,
}

/// Full 3-day forecast for a city
pub struct GetWeatherTool {
    cache: Arc<WeatherCache>,
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Fetches agricultural weather variables (temperature, humidity, soil temperature, \
         precipitation, soil moisture, wind) for an Indian city for the next 3 days at a \
         3-hourly resolution. Served from a local cache when it is less than an hour old."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city_name": {
                    "type": "string",
                    "description": "Name of an Indian city, e.g. \"Nashik\""
                }
            },
            "required": ["city_name"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, AppError> {
        let args: CityArgs = parse_args(self.name(), params)?;
        let table = self.cache.get_default(&args.city_name).await?;
        serde_json::to_value(&table.series).map_err(|e| AppError::Other(e.into()))
    }
}

/// One variable's series for a city
pub struct QueryWeatherVariablesTool {
    cache: Arc<WeatherCache>,
}

#[async_trait]
impl Tool for QueryWeatherVariablesTool {
    fn name(&self) -> &str {
        "query_weather_variables"
    }

    fn description(&self) -> &str {
        "Fetches a single weather variable with its timestamps for an Indian city. \
         Use when only one factor (e.g. rain or soil moisture) is asked about."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city_name": {
                    "type": "string",
                    "description": "Name of an Indian city"
                },
                "variable": {
                    "type": "string",
                    "enum": FORECAST_VARIABLES,
                    "description": "Forecast variable to return"
                }
            },
            "required": ["city_name", "variable"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, AppError> {
        let args: VariableArgs = parse_args(self.name(), params)?;
        let series = self
            .cache
            .query_variable(&args.city_name, &args.variable, self.cache.max_age_seconds())
            .await?;
        serde_json::to_value(&series).map_err(|e| AppError::Other(e.into()))
    }
}

pub struct WeatherSpecialist {
    cache: Arc<WeatherCache>,
}

impl WeatherSpecialist {
    pub fn new(cache: Arc<WeatherCache>) -> Self {
        Self { cache }
    }
}

impl Specialist for WeatherSpecialist {
    fn id(&self) -> &str {
        "weather_expert"
    }

    fn name(&self) -> &str {
        "Weather Expert"
    }

    fn description(&self) -> &str {
        "Forecasts and agricultural weather insight for Indian cities"
    }

    fn initialize(&mut self, _ctx: &SpecialistContext) -> anyhow::Result<()> {
        std::fs::create_dir_all(self.cache.cache_dir())?;
        tracing::info!("Weather cache at {}", self.cache.cache_dir().display());
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(GetWeatherTool {
                cache: self.cache.clone(),
            }),
            Arc::new(QueryWeatherVariablesTool {
                cache: self.cache.clone(),
            }),
        ]
    }
}
