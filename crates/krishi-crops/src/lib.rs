//! Crop knowledge for Krishi Sewa: the India crop calendar and the
//! per-crop cultivation guides.

pub mod calendar;
pub mod cultivation;
pub mod error;

pub use calendar::{CalendarView, CropCalendar, MonthView, Stage, StageInfo, StageMonths};
pub use cultivation::CropGuides;
pub use error::CropError;
