//! Specialists and their tools, wired into an [`App`].

pub mod context;
pub mod crops;
pub mod prices;
pub mod weather;

use anyhow::Result;
use krishi_core::{App, Config};
use krishi_services::UserLocationStore;
use krishi_weather::WeatherCache;
use std::sync::Arc;

pub use context::UserContextSpecialist;
pub use crops::CropSpecialist;
pub use prices::PriceSpecialist;
pub use weather::WeatherSpecialist;

/// Register every specialist for `config` and initialize them.
///
/// An invalid configuration is rejected before any specialist is built.
pub fn build_app(config: Config) -> Result<App> {
    let validation = config.validate();
    if !validation.is_valid() {
        anyhow::bail!(
            "Configuration validation failed: {}",
            validation.error_summary()
        );
    }

    let cache = WeatherCache::from_config(&config.weather)?;
    let weather = WeatherSpecialist::new(Arc::new(cache));
    let crops = CropSpecialist::from_config(&config)?;
    let prices = PriceSpecialist::from_config(&config)?;
    let context = UserContextSpecialist::new(UserLocationStore::from_config(&config)?);

    let mut app = App::new(config);
    app.register_specialist(Box::new(weather))?;
    app.register_specialist(Box::new(crops))?;
    app.register_specialist(Box::new(prices))?;
    app.register_specialist(Box::new(context))?;
    app.initialize()?;

    Ok(app)
}
