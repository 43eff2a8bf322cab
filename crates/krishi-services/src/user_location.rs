//! The farmer's saved location, reverse geocoded once from device coordinates.

use krishi_core::{AppError, Config};
use krishi_weather::{Geocoder, Location, PlaceAddress, WeatherError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Geocode(#[from] WeatherError),

    #[error("Failed to persist user location: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed user location file: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::InvalidInput(msg) => AppError::InvalidInput(msg),
            LocationError::Geocode(e) => e.into(),
            LocationError::Io(e) => AppError::Io(e),
            LocationError::Malformed(e) => AppError::Other(e.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

/// Persisted as `{"coords": {...}, "location": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub coords: Coords,
    pub location: PlaceAddress,
}

#[derive(Debug, Clone)]
pub struct UserLocationStore {
    path: PathBuf,
    geocoder: Geocoder,
}

impl UserLocationStore {
    pub fn new(path: impl Into<PathBuf>, geocoder: Geocoder) -> Self {
        Self {
            path: path.into(),
            geocoder,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, LocationError> {
        Ok(Self::new(
            config.user.info_path.clone(),
            Geocoder::new(&config.weather)?,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reverse geocode `lat`/`lon` and save the result, replacing any
    /// previous location.
    pub async fn initialize(&self, lat: f64, lon: f64) -> Result<UserLocation, LocationError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(LocationError::InvalidInput(format!(
                "latitude {} is outside -90..=90",
                lat
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(LocationError::InvalidInput(format!(
                "longitude {} is outside -180..=180",
                lon
            )));
        }

        let location = self
            .geocoder
            .reverse(&Location {
                latitude: lat,
                longitude: lon,
            })
            .await?;

        let user = UserLocation {
            coords: Coords { lat, lon },
            location,
        };
        self.save(&user)?;
        tracing::info!("Saved user location to {}", self.path.display());
        Ok(user)
    }

    /// Saved location, or `None` before the first `initialize`.
    pub fn load(&self) -> Result<Option<UserLocation>, LocationError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, user: &UserLocation) -> Result<(), LocationError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(user)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}
