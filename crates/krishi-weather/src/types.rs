use krishi_core::{AppError, NetworkError, ReqwestErrorExt};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Hourly Open-Meteo variables relevant to farming, in request order.
///
/// - `temperature_2m` (°C): air temperature; crop growth, pests, heat stress
/// - `relative_humidity_2m` (%): fungal disease risk, transpiration
/// - `evapotranspiration` (mm): water loss; irrigation scheduling
/// - `soil_temperature_{0,6,18}cm` (°C): germination and root-zone conditions
/// - `precipitation` (mm) and `precipitation_probability` (%)
/// - `soil_moisture_*` (m³/m³): water available at 0-1, 1-3, 3-9, 9-27 cm
/// - `wind_speed_10m`: pollination, lodging, spray drift
pub const FORECAST_VARIABLES: [&str; 13] = [
    "temperature_2m",
    "relative_humidity_2m",
    "evapotranspiration",
    "soil_temperature_0cm",
    "soil_temperature_6cm",
    "soil_temperature_18cm",
    "precipitation",
    "precipitation_probability",
    "soil_moisture_0_to_1cm",
    "soil_moisture_1_to_3cm",
    "soil_moisture_3_to_9cm",
    "soil_moisture_9_to_27cm",
    "wind_speed_10m",
];

/// Forecast horizon requested from the provider
pub const FORECAST_DAYS: u32 = 3;

/// Key of the timestamp series inside a forecast table
pub const DATE_KEY: &str = "date";

/// Geographic location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Timestamp-aligned forecast series.
///
/// Serializes flat: `{"date": [...], "temperature_2m": [...], ...}`.
/// Missing provider values are `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub date: Vec<String>,
    #[serde(flatten)]
    pub variables: BTreeMap<String, Vec<Option<f64>>>,
}

impl ForecastSeries {
    /// Build a series, rejecting variables whose length differs from `date`.
    pub fn new(
        date: Vec<String>,
        variables: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self, WeatherError> {
        let series = Self { date, variables };
        if let Some((name, values)) = series.misaligned() {
            return Err(WeatherError::Upstream(NetworkError::InvalidResponse(format!(
                "series '{}' has {} values for {} timestamps",
                name,
                values.len(),
                series.date.len()
            ))));
        }
        Ok(series)
    }

    /// Number of timestamps
    pub fn len(&self) -> usize {
        self.date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }

    pub fn is_aligned(&self) -> bool {
        self.misaligned().is_none()
    }

    fn misaligned(&self) -> Option<(&String, &Vec<Option<f64>>)> {
        self.variables
            .iter()
            .find(|(_, values)| values.len() != self.date.len())
    }

    /// Keep positions `0, step, 2*step, ...` of every series.
    ///
    /// The same index set is applied to `date` and to each variable, so an
    /// aligned input stays aligned. `step_hours == 1` returns a copy.
    pub fn downsample(&self, step_hours: usize) -> Result<Self, WeatherError> {
        if step_hours == 0 {
            return Err(WeatherError::InvalidInput(
                "step_hours must be a positive integer".to_string(),
            ));
        }

        let pick = |len: usize| (0..len).step_by(step_hours);

        let date = pick(self.date.len())
            .filter_map(|i| self.date.get(i).cloned())
            .collect();
        let variables = self
            .variables
            .iter()
            .map(|(name, values)| {
                let selected = pick(self.date.len())
                    .filter_map(|i| values.get(i).copied())
                    .collect();
                (name.clone(), selected)
            })
            .collect();

        Ok(Self { date, variables })
    }

    /// Project a single variable alongside the timestamps.
    pub fn project(&self, variable: &str) -> Result<VariableSeries, WeatherError> {
        let values = self
            .variables
            .get(variable)
            .ok_or_else(|| WeatherError::UnknownVariable(variable.to_string()))?;

        Ok(VariableSeries {
            date: self.date.clone(),
            variable: variable.to_string(),
            values: values.clone(),
        })
    }
}

/// One cached forecast; also the on-disk cache file format
/// `{"city": ..., "timestamp": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    /// Normalized (lower-cased) city key
    pub city: String,
    /// Seconds since the Unix epoch at which the data was fetched
    #[serde(rename = "timestamp")]
    pub fetched_at: f64,
    #[serde(rename = "data")]
    pub series: ForecastSeries,
}

/// `{date, <variable>}` projection returned by a variable query.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSeries {
    pub date: Vec<String>,
    pub variable: String,
    pub values: Vec<Option<f64>>,
}

impl Serialize for VariableSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(DATE_KEY, &self.date)?;
        map.serialize_entry(&self.variable, &self.values)?;
        map.end()
    }
}

/// Weather subsystem errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("City '{0}' not found")]
    CityNotFound(String),

    #[error("Variable '{0}' not found in weather data")]
    UnknownVariable(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] NetworkError),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        WeatherError::Upstream(e.into_network_error())
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::InvalidInput(msg) => AppError::InvalidInput(msg),
            WeatherError::CityNotFound(city) => AppError::NotFound(format!("city '{city}'")),
            WeatherError::UnknownVariable(v) => AppError::UnknownVariable(v),
            WeatherError::Upstream(e) => AppError::Upstream(e),
            WeatherError::Cache(msg) => {
                AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hourly(n: usize) -> ForecastSeries {
        let date = (0..n).map(|i| format!("2025-06-01T{:02}:00", i % 24)).collect();
        let mut variables = BTreeMap::new();
        variables.insert(
            "temperature_2m".to_string(),
            (0..n).map(|i| Some(20.0 + i as f64)).collect(),
        );
        variables.insert(
            "precipitation".to_string(),
            (0..n).map(|i| if i % 2 == 0 { Some(0.0) } else { None }).collect(),
        );
        ForecastSeries::new(date, variables).unwrap()
    }

    #[test]
    fn test_downsample_length_is_ceiling() {
        let series = hourly(72);
        for step in 1..=10 {
            let out = series.downsample(step).unwrap();
            let expected = (72 + step - 1) / step;
            assert_eq!(out.len(), expected, "step {step}");
            assert!(out.is_aligned(), "step {step}");
        }
    }

    #[test]
    fn test_downsample_picks_every_nth_index() {
        let series = hourly(10);
        let out = series.downsample(3).unwrap();

        for (i, date) in out.date.iter().enumerate() {
            assert_eq!(date, &series.date[i * 3]);
        }
        assert_eq!(
            out.variables["temperature_2m"],
            vec![Some(20.0), Some(23.0), Some(26.0), Some(29.0)]
        );
        assert_eq!(
            out.variables["precipitation"],
            vec![Some(0.0), None, Some(0.0), None]
        );
    }

    #[test]
    fn test_downsample_step_one_is_identity() {
        let series = hourly(7);
        assert_eq!(series.downsample(1).unwrap(), series);
    }

    #[test]
    fn test_downsample_zero_step_rejected() {
        assert!(matches!(
            hourly(4).downsample(0),
            Err(WeatherError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_downsample_empty_series() {
        let out = ForecastSeries::default().downsample(3).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_new_rejects_misaligned_series() {
        let mut variables = BTreeMap::new();
        variables.insert("wind_speed_10m".to_string(), vec![Some(1.0)]);
        let err = ForecastSeries::new(vec!["a".into(), "b".into()], variables).unwrap_err();
        assert!(matches!(
            err,
            WeatherError::Upstream(NetworkError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_project_returns_date_and_variable_only() {
        let series = hourly(4);
        let projected = series.project("temperature_2m").unwrap();
        let value = serde_json::to_value(&projected).unwrap();

        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(value["date"], json!(series.date));
        assert_eq!(value["temperature_2m"], json!([20.0, 21.0, 22.0, 23.0]));
    }

    #[test]
    fn test_project_unknown_variable() {
        let err = hourly(4).project("nonexistent_var").unwrap_err();
        assert!(matches!(err, WeatherError::UnknownVariable(ref v) if v == "nonexistent_var"));
    }

    #[test]
    fn test_project_date_is_not_a_variable() {
        assert!(matches!(
            hourly(4).project(DATE_KEY),
            Err(WeatherError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_table_cache_layout() {
        let table = ForecastTable {
            city: "delhi".to_string(),
            fetched_at: 1_700_000_000.5,
            series: hourly(2),
        };
        let value = serde_json::to_value(&table).unwrap();

        assert_eq!(value["city"], "delhi");
        assert_eq!(value["timestamp"], 1_700_000_000.5);
        assert_eq!(value["data"]["date"].as_array().unwrap().len(), 2);
        assert_eq!(value["data"]["precipitation"], json!([0.0, null]));

        let back: ForecastTable = serde_json::from_value(value).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_error_maps_to_app_error() {
        let app: AppError = WeatherError::UnknownVariable("x".into()).into();
        assert!(matches!(app, AppError::UnknownVariable(_)));

        let app: AppError = WeatherError::CityNotFound("atlantis".into()).into();
        assert!(matches!(app, AppError::NotFound(_)));
    }
}
