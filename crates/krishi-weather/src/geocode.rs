//! Forward and reverse geocoding via Nominatim (OpenStreetMap) - free, no API key required.

use crate::types::{Location, WeatherError};
use krishi_core::{NetworkError, WeatherConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("KrishiSewa/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    #[allow(dead_code)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

/// Address parts of a reverse-geocoded point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceAddress {
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl PlaceAddress {
    /// Human-readable name such as "Nashik, Maharashtra"
    pub fn display_name(&self) -> Option<String> {
        let place = self
            .city
            .as_ref()
            .or(self.district.as_ref())
            .or(self.state.as_ref())
            .or(self.country.as_ref())?;

        let suffix = self
            .state
            .as_ref()
            .filter(|s| !s.is_empty() && *s != place)
            .or_else(|| {
                self.country
                    .as_ref()
                    .filter(|c| !c.is_empty() && *c != place)
            });

        Some(match suffix {
            Some(s) => format!("{}, {}", place, s),
            None => place.clone(),
        })
    }
}

/// Nominatim client
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Arc<Client>,
    search_url: String,
    reverse_url: String,
    country: String,
}

impl Geocoder {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            search_url: config.geocode_url.clone(),
            reverse_url: config.reverse_geocode_url.clone(),
            country: config.country.clone(),
        })
    }

    /// Resolve a city name to coordinates, qualified with the configured country.
    ///
    /// One request, no retry. The first search result wins.
    pub async fn resolve(&self, city_name: &str) -> Result<Location, WeatherError> {
        let city_name = city_name.trim();
        if city_name.is_empty() {
            return Err(WeatherError::InvalidInput(
                "city name must not be empty".to_string(),
            ));
        }

        let query = if self.country.is_empty() {
            city_name.to_string()
        } else {
            format!("{}, {}", city_name, self.country)
        };
        tracing::debug!("Geocoding '{}'", query);

        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: format!("geocoding failed: {}", message),
            }
            .into());
        }

        let results: Vec<SearchResult> = response.json().await?;
        let first = results
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::CityNotFound(city_name.to_string()))?;

        let location = Location {
            latitude: parse_coordinate(&first.lat, "lat")?,
            longitude: parse_coordinate(&first.lon, "lon")?,
        };
        tracing::info!(
            "Geocoded '{}' to {}, {}",
            city_name,
            location.latitude,
            location.longitude
        );
        Ok(location)
    }

    /// Reverse geocode coordinates into address parts.
    pub async fn reverse(&self, location: &Location) -> Result<PlaceAddress, WeatherError> {
        let lat = location.latitude.to_string();
        let lon = location.longitude.to_string();

        let response = self
            .client
            .get(&self.reverse_url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Reverse geocode returned status {}", status);
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: format!("reverse geocoding failed: {}", message),
            }
            .into());
        }

        let body: ReverseResponse = response.json().await?;
        let addr = body.address.ok_or_else(|| {
            WeatherError::CityNotFound(format!("{}, {}", location.latitude, location.longitude))
        })?;

        // city > town > village > municipality for the primary place name
        let place = PlaceAddress {
            city: addr
                .city
                .or(addr.town)
                .or(addr.village)
                .or(addr.municipality),
            district: addr.county.or(addr.state_district),
            state: addr.state,
            country: addr.country,
        };

        if let Some(name) = place.display_name() {
            tracing::info!("Reverse geocoded to: {}", name);
        }
        Ok(place)
    }
}

fn parse_coordinate(raw: &str, field: &str) -> Result<f64, WeatherError> {
    raw.trim().parse::<f64>().map_err(|_| {
        NetworkError::InvalidResponse(format!("geocoder returned non-numeric {}: {}", field, raw))
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("28.6139", "lat").unwrap(), 28.6139);
        assert!(matches!(
            parse_coordinate("north", "lat"),
            Err(WeatherError::Upstream(NetworkError::InvalidResponse(_)))
        ));
    }

    #[test]
    fn test_display_name_adds_state() {
        let place = PlaceAddress {
            city: Some("Nashik".into()),
            district: Some("Nashik".into()),
            state: Some("Maharashtra".into()),
            country: Some("India".into()),
        };
        assert_eq!(place.display_name().as_deref(), Some("Nashik, Maharashtra"));
    }

    #[test]
    fn test_display_name_falls_back_to_country() {
        let place = PlaceAddress {
            city: None,
            district: None,
            state: Some("Goa".into()),
            country: Some("India".into()),
        };
        assert_eq!(place.display_name().as_deref(), Some("Goa, India"));
        assert_eq!(PlaceAddress::default().display_name(), None);
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_name() {
        let geocoder = Geocoder::new(&WeatherConfig::default()).unwrap();
        assert!(matches!(
            geocoder.resolve("   ").await,
            Err(WeatherError::InvalidInput(_))
        ));
    }
}
