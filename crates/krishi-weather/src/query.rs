use crate::cache::WeatherCache;
use crate::types::{VariableSeries, WeatherError};

impl WeatherCache {
    /// One variable's time series for a city.
    ///
    /// Goes through [`WeatherCache::get`] first, so a stale city is refreshed
    /// before the variable is looked up.
    pub async fn query_variable(
        &self,
        city_name: &str,
        variable: &str,
        max_age_seconds: u64,
    ) -> Result<VariableSeries, WeatherError> {
        let table = self.get(city_name, max_age_seconds).await?;
        tracing::debug!("Querying '{}' for '{}'", variable, table.city);
        table.series.project(variable)
    }
}
