use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::retry::RetryConfig;

/// Environment variable prefix for overrides, e.g. `KRISHI__WEATHER__STEP_HOURS=1`.
pub const ENV_PREFIX: &str = "KRISHI";

/// Environment variable the pricing API key is read from when not configured.
pub const COMMODITY_API_KEY_ENV: &str = "COMMODITY_API_KEY";

/// Weather cache directory name under `data_dir` when `weather.cache_dir` is unset.
pub const WEATHER_CACHE_DIR: &str = "weather-cache";

/// Crop guide directory name under `data_dir` when `crops.guides_dir` is unset.
pub const CROP_GUIDES_DIR: &str = "crop-guides";

/// User location file name under `data_dir` when `user.info_path` is unset.
pub const USER_INFO_FILE: &str = "user_info.json";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory for local state (weather cache, crop guides, user info)
    pub data_dir: PathBuf,

    pub weather: WeatherConfig,

    pub crops: CropsConfig,

    pub prices: PricesConfig,

    pub user: UserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// One `<city>.json` file per city lives here
    pub cache_dir: PathBuf,

    /// Cached forecasts younger than this are served without a fetch
    pub max_age_seconds: u64,

    /// Downsampling step applied to the hourly series
    pub step_hours: usize,

    /// Country qualifier appended to every city lookup
    pub country: String,

    pub geocode_url: String,
    pub reverse_geocode_url: String,
    pub forecast_url: String,

    /// Per-request timeout for all weather HTTP calls
    pub timeout_secs: u64,

    pub retry: RetrySettings,
}

/// Serializable form of [`RetryConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: crate::retry::DEFAULT_MAX_RETRIES,
            initial_delay_ms: crate::retry::DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: crate::retry::DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(s: &RetrySettings) -> Self {
        RetryConfig::new(s.max_retries, s.initial_delay_ms, s.max_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropsConfig {
    /// Directory of per-crop cultivation guides (`<crop>.json`)
    pub guides_dir: PathBuf,

    /// Optional JSON file replacing the built-in crop calendar
    pub calendar_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricesConfig {
    /// data.gov.in daily commodity price resource
    pub api_url: String,

    /// API key; falls back to `COMMODITY_API_KEY`
    pub api_key: Option<String>,

    pub default_limit: u32,

    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Where the reverse-geocoded user location is stored
    pub info_path: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("krishi")
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_data_dir().join(WEATHER_CACHE_DIR),
            max_age_seconds: 3600,
            step_hours: 3,
            country: "India".to_string(),
            geocode_url: "https://nominatim.openstreetmap.org/search".to_string(),
            reverse_geocode_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_secs: 10,
            retry: RetrySettings::default(),
        }
    }
}

impl Default for CropsConfig {
    fn default() -> Self {
        Self {
            guides_dir: default_data_dir().join(CROP_GUIDES_DIR),
            calendar_path: None,
        }
    }
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.data.gov.in/resource/9ef84268-d588-465a-a308-a864a43d0070"
                .to_string(),
            api_key: None,
            default_limit: 10,
            timeout_secs: 10,
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            info_path: default_data_dir().join(USER_INFO_FILE),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            weather: WeatherConfig::default(),
            crops: CropsConfig::default(),
            prices: PricesConfig::default(),
            user: UserConfig::default(),
        }
    }
}

impl Config {
    /// Defaults with every local path placed under `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self {
            data_dir: data_dir.into(),
            ..Self::default()
        };
        config.weather.cache_dir = config.data_dir.join(WEATHER_CACHE_DIR);
        config.crops.guides_dir = config.data_dir.join(CROP_GUIDES_DIR);
        config.user.info_path = config.data_dir.join(USER_INFO_FILE);
        config
    }

    /// Load configuration from the default file location plus environment overrides.
    ///
    /// A missing file is not an error; defaults fill every absent setting.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(Some(&path))
    }

    /// Load configuration layering defaults, an optional TOML file and `KRISHI__*` variables.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            tracing::debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let layered = builder
            .build()
            .context("Failed to read configuration sources")?;
        let is_set = |key: &str| layered.get::<String>(key).is_ok();
        let cache_dir_set = is_set("weather.cache_dir");
        let guides_dir_set = is_set("crops.guides_dir");
        let info_path_set = is_set("user.info_path");

        let mut config: Config = layered
            .try_deserialize()
            .context("Failed to parse configuration")?;

        // Paths not given explicitly follow data_dir
        if !cache_dir_set {
            config.weather.cache_dir = config.data_dir.join(WEATHER_CACHE_DIR);
        }
        if !guides_dir_set {
            config.crops.guides_dir = config.data_dir.join(CROP_GUIDES_DIR);
        }
        if !info_path_set {
            config.user.info_path = config.data_dir.join(USER_INFO_FILE);
        }

        if config.prices.api_key.is_none() {
            config.prices.api_key = std::env::var(COMMODITY_API_KEY_ENV).ok();
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let path = Self::config_path()?;
        Self::load_validated_from(Some(&path))
    }

    /// [`Config::load_from`] followed by validation; errors abort the load.
    pub fn load_validated_from(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.geocode_url, "weather.geocode_url", &mut result);
        self.validate_url(
            &self.weather.reverse_geocode_url,
            "weather.reverse_geocode_url",
            &mut result,
        );
        self.validate_url(&self.weather.forecast_url, "weather.forecast_url", &mut result);
        self.validate_url(&self.prices.api_url, "prices.api_url", &mut result);

        if self.weather.step_hours == 0 {
            result.add_error("weather.step_hours", "Step must be at least 1 hour");
        } else if self.weather.step_hours > 24 {
            result.add_warning(
                "weather.step_hours",
                "Step is longer than a day; forecasts will have very few points",
            );
        }

        if self.weather.max_age_seconds == 0 {
            result.add_warning(
                "weather.max_age_seconds",
                "Weather cache disabled (0 seconds); every request will fetch",
            );
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        }

        if self.weather.country.trim().is_empty() {
            result.add_warning(
                "weather.country",
                "No country qualifier; city names may resolve outside the intended region",
            );
        }

        if self.prices.api_key.as_deref().map_or(true, str::is_empty) {
            result.add_warning(
                "prices.api_key",
                "No pricing API key configured - crop price lookups will fail",
            );
        }

        if self.prices.default_limit == 0 {
            result.add_error("prices.default_limit", "Limit must be greater than 0");
        }

        if !self.crops.guides_dir.is_dir() {
            result.add_warning(
                "crops.guides_dir",
                format!(
                    "Directory does not exist: {}",
                    self.crops.guides_dir.display()
                ),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Copy safe to print: the pricing API key is masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.prices.api_key.is_some() {
            config.prices.api_key = Some("***".to_string());
        }
        config
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("krishi");

        Ok(config_dir.join("config.toml"))
    }
}
