//! Per-city forecast cache persisted as JSON files.
//!
//! One file per city under the cache directory. An entry younger than
//! `max_age_seconds` is served as-is; anything else is refetched and the file
//! replaced wholesale. A stale entry is never served when the refresh fails.

use crate::geocode::Geocoder;
use crate::provider::ForecastProvider;
use crate::types::{ForecastTable, WeatherError};
use chrono::{DateTime, Utc};
use krishi_core::WeatherConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source of "now" for freshness checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Seconds since the epoch with millisecond precision
pub fn epoch_seconds(t: DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64 / 1000.0
}

pub struct WeatherCache {
    cache_dir: PathBuf,
    geocoder: Geocoder,
    provider: ForecastProvider,
    step_hours: usize,
    max_age_seconds: u64,
    clock: Arc<dyn Clock>,
    /// Per-city refresh locks so one stale city triggers one upstream fetch
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for WeatherCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCache")
            .field("cache_dir", &self.cache_dir)
            .field("step_hours", &self.step_hours)
            .field("max_age_seconds", &self.max_age_seconds)
            .finish_non_exhaustive()
    }
}

impl WeatherCache {
    pub fn new(cache_dir: impl Into<PathBuf>, geocoder: Geocoder, provider: ForecastProvider) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            geocoder,
            provider,
            step_hours: 3,
            max_age_seconds: 3600,
            clock: Arc::new(SystemClock),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let cache = Self::new(
            config.cache_dir.clone(),
            Geocoder::new(config)?,
            ForecastProvider::new(config)?,
        )
        .with_step_hours(config.step_hours)
        .with_max_age(config.max_age_seconds);
        Ok(cache)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_step_hours(mut self, step_hours: usize) -> Self {
        self.step_hours = step_hours;
        self
    }

    pub fn with_max_age(mut self, max_age_seconds: u64) -> Self {
        self.max_age_seconds = max_age_seconds;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Default freshness window
    pub fn max_age_seconds(&self) -> u64 {
        self.max_age_seconds
    }

    /// Cache key for a city: trimmed and lower-cased
    pub fn normalize_city(city_name: &str) -> String {
        city_name.trim().to_lowercase()
    }

    /// File holding the entry for a normalized city key.
    ///
    /// Characters that could escape the cache directory are replaced.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.cache_dir.join(format!("{}.json", file_stem))
    }

    /// Read the stored entry for a key. Missing or unreadable files are a miss.
    pub fn read_entry(&self, key: &str) -> Option<ForecastTable> {
        let path = self.entry_path(key);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read cache file {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<ForecastTable>(&contents) {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Replace the entry file wholesale (write to a temp file, then rename).
    pub fn write_entry(&self, table: &ForecastTable) -> Result<(), WeatherError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| {
            WeatherError::Cache(format!(
                "failed to create {}: {}",
                self.cache_dir.display(),
                e
            ))
        })?;

        let path = self.entry_path(&table.city);
        let contents = serde_json::to_string(table)
            .map_err(|e| WeatherError::Cache(format!("failed to serialize forecast: {}", e)))?;
        let write_failed =
            |e: std::io::Error| WeatherError::Cache(format!("failed to write {}: {}", path.display(), e));

        // Unique temp name: keys that sanitize to the same stem may refresh concurrently
        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir).map_err(write_failed)?;
        tmp.write_all(contents.as_bytes()).map_err(write_failed)?;
        tmp.persist(&path).map_err(|e| write_failed(e.error))?;
        Ok(())
    }

    fn is_fresh(&self, table: &ForecastTable, key: &str, max_age_seconds: u64) -> bool {
        let age = epoch_seconds(self.clock.now()) - table.fetched_at;
        table.city == key && age < max_age_seconds as f64
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Drop the key's lock from the map once no other task holds or awaits it.
    ///
    /// Clones are only taken under the map lock, so a count of two (map plus
    /// `lock`) means nobody else can be waiting.
    fn release_key_lock(&self, key: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock();
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(key);
        }
    }

    /// Forecast for a city, served from cache while younger than `max_age_seconds`.
    pub async fn get(
        &self,
        city_name: &str,
        max_age_seconds: u64,
    ) -> Result<ForecastTable, WeatherError> {
        let key = Self::normalize_city(city_name);
        if key.is_empty() {
            return Err(WeatherError::InvalidInput(
                "city name must not be empty".to_string(),
            ));
        }

        if let Some(table) = self.fresh_entry(&key, max_age_seconds) {
            return Ok(table);
        }

        let lock = self.key_lock(&key);
        let result = {
            let _guard = lock.lock().await;

            // Another task may have refreshed while we waited
            match self.fresh_entry(&key, max_age_seconds) {
                Some(table) => Ok(table),
                None => self.refresh(&key, city_name.trim()).await,
            }
        };
        self.release_key_lock(&key, lock);

        result
    }

    /// [`get`](Self::get) with the configured freshness window
    pub async fn get_default(&self, city_name: &str) -> Result<ForecastTable, WeatherError> {
        self.get(city_name, self.max_age_seconds).await
    }

    fn fresh_entry(&self, key: &str, max_age_seconds: u64) -> Option<ForecastTable> {
        let table = self.read_entry(key)?;
        if self.is_fresh(&table, key, max_age_seconds) {
            tracing::info!("Using cached weather data for '{}'", key);
            Some(table)
        } else {
            tracing::debug!("Cached weather data for '{}' is stale", key);
            None
        }
    }

    async fn refresh(&self, key: &str, city_name: &str) -> Result<ForecastTable, WeatherError> {
        tracing::info!("Fetching new weather data for '{}'", key);

        let location = self.geocoder.resolve(city_name).await?;
        let series = self.provider.fetch(&location, self.step_hours).await?;

        let table = ForecastTable {
            city: key.to_string(),
            fetched_at: epoch_seconds(self.clock.now()),
            series,
        };
        self.write_entry(&table)?;

        Ok(table)
    }

    /// Delete entries older than `max_age_seconds`. Returns how many were removed.
    ///
    /// Unreadable files are left alone.
    pub fn sweep_expired(&self, max_age_seconds: u64) -> Result<usize, WeatherError> {
        let entries = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(WeatherError::Cache(e.to_string())),
        };

        let now = epoch_seconds(self.clock.now());
        let mut removed = 0;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let Some(table) = std::fs::read_to_string(&path)
                .ok()
                .and_then(|c| serde_json::from_str::<ForecastTable>(&c).ok())
            else {
                continue;
            };

            if now - table.fetched_at >= max_age_seconds as f64 {
                std::fs::remove_file(&path).map_err(|e| WeatherError::Cache(e.to_string()))?;
                tracing::debug!("Removed expired cache entry {}", path.display());
                removed += 1;
            }
        }

        tracing::info!("Swept {} expired weather cache entries", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForecastSeries;
    use chrono::TimeZone;

    fn offline_cache(dir: &Path) -> WeatherCache {
        let config = WeatherConfig {
            geocode_url: "http://127.0.0.1:9/search".into(),
            forecast_url: "http://127.0.0.1:9/v1/forecast".into(),
            timeout_secs: 1,
            ..WeatherConfig::default()
        };
        WeatherCache::new(
            dir,
            Geocoder::new(&config).unwrap(),
            ForecastProvider::new(&config).unwrap(),
        )
    }

    fn table(city: &str, fetched_at: f64) -> ForecastTable {
        ForecastTable {
            city: city.to_string(),
            fetched_at,
            series: ForecastSeries::default(),
        }
    }

    #[test]
    fn test_normalize_city() {
        assert_eq!(WeatherCache::normalize_city("  New Delhi "), "new delhi");
        assert_eq!(WeatherCache::normalize_city("PUNE"), "pune");
    }

    #[test]
    fn test_entry_path_stays_inside_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = offline_cache(dir.path());

        let path = cache.entry_path("../../etc/passwd");
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(cache.entry_path("new delhi"), dir.path().join("new delhi.json"));
    }

    #[test]
    fn test_write_then_read_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = offline_cache(&dir.path().join("nested"));

        cache.write_entry(&table("pune", 100.0)).unwrap();
        assert_eq!(cache.read_entry("pune"), Some(table("pune", 100.0)));
        assert_eq!(cache.read_entry("nagpur"), None);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = offline_cache(dir.path());
        std::fs::write(cache.entry_path("pune"), "{not json").unwrap();

        assert_eq!(cache.read_entry("pune"), None);
    }

    #[test]
    fn test_freshness_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let cache = offline_cache(dir.path()).with_clock(clock.clone());
        let entry = table("pune", epoch_seconds(start));

        clock.advance(chrono::Duration::seconds(3599));
        assert!(cache.is_fresh(&entry, "pune", 3600));

        clock.advance(chrono::Duration::seconds(1));
        assert!(!cache.is_fresh(&entry, "pune", 3600));
    }

    #[test]
    fn test_mismatched_city_is_not_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
        let cache = offline_cache(dir.path()).with_clock(Arc::new(ManualClock::new(start)));

        let entry = table("mumbai", epoch_seconds(start));
        assert!(!cache.is_fresh(&entry, "pune", 3600));
    }

    #[tokio::test]
    async fn test_empty_city_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = offline_cache(dir.path());
        assert!(matches!(
            cache.get("  ", 3600).await,
            Err(WeatherError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sweep_expired() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
        let cache = offline_cache(dir.path()).with_clock(Arc::new(ManualClock::new(now)));
        let now_secs = epoch_seconds(now);

        cache.write_entry(&table("old", now_secs - 7200.0)).unwrap();
        cache.write_entry(&table("new", now_secs - 60.0)).unwrap();
        std::fs::write(dir.path().join("junk.json"), "nope").unwrap();

        assert_eq!(cache.sweep_expired(3600).unwrap(), 1);
        assert!(cache.read_entry("old").is_none());
        assert!(cache.read_entry("new").is_some());
        assert!(dir.path().join("junk.json").exists());
    }

    #[test]
    fn test_colliding_stems_write_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(offline_cache(dir.path()));
        assert_eq!(cache.entry_path("a.b"), cache.entry_path("a_b"));

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let city = if i % 2 == 0 { "a.b" } else { "a_b" };
                    for n in 0..20 {
                        cache.write_entry(&table(city, f64::from(n))).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let stored = std::fs::read_to_string(cache.entry_path("a_b")).unwrap();
        let stored: ForecastTable = serde_json::from_str(&stored).unwrap();
        assert!(stored.city == "a.b" || stored.city == "a_b");
        // Only the entry file remains; no temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_locks_are_released() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        let config = WeatherConfig {
            geocode_url: format!("{}/search", server.uri()),
            forecast_url: format!("{}/v1/forecast", server.uri()),
            timeout_secs: 5,
            ..WeatherConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let cache = WeatherCache::new(
            dir.path(),
            Geocoder::new(&config).unwrap(),
            ForecastProvider::new(&config).unwrap(),
        );

        let (a, b, c) = tokio::join!(
            cache.get("Atlantis", 3600),
            cache.get("atlantis", 3600),
            cache.get("Lemuria", 3600),
        );
        assert!(a.is_err() && b.is_err() && c.is_err());
        assert!(cache.in_flight.lock().is_empty());
    }

    #[test]
    fn test_sweep_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = offline_cache(&dir.path().join("absent"));
        assert_eq!(cache.sweep_expired(0).unwrap(), 0);
    }
}
