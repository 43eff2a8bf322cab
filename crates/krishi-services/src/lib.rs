//! External data services for Krishi Sewa: mandi prices and the farmer's
//! saved location.

pub mod crop_price;
pub mod user_location;

pub use crop_price::{CropPriceClient, PriceError, PriceQuery};
pub use user_location::{Coords, LocationError, UserLocation, UserLocationStore};
