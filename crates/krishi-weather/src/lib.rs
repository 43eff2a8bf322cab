//! Weather data for Krishi Sewa
//!
//! Resolves Indian city names with Nominatim, fetches agricultural hourly
//! forecasts from Open-Meteo and keeps one fresh copy per city on disk.

pub mod cache;
pub mod geocode;
pub mod provider;
pub mod query;
pub mod types;

pub use cache::{Clock, ManualClock, SystemClock, WeatherCache};
pub use geocode::{Geocoder, PlaceAddress};
pub use provider::ForecastProvider;
pub use types::*;
