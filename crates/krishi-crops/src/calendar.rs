//! India crop calendar: which months each crop is planted, sown, growing and
//! arriving at market.

use crate::error::CropError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Shown for a stage with no months in the table
pub const NO_INFORMATION: &str = "No information available";

/// Shown for a stage with no crops in the requested month
pub const NO_CROPS: &str = "No crops";

/// Cultivation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planting,
    Sowing,
    Growth,
    Arrival,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Planting, Stage::Sowing, Stage::Growth, Stage::Arrival];
}

/// Month numbers (1-12) for each stage of one crop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMonths {
    #[serde(default)]
    pub planting: Vec<u32>,
    #[serde(default)]
    pub sowing: Vec<u32>,
    #[serde(default)]
    pub growth: Vec<u32>,
    #[serde(default)]
    pub arrival: Vec<u32>,
}

impl StageMonths {
    fn new(planting: &[u32], sowing: &[u32], growth: &[u32], arrival: &[u32]) -> Self {
        Self {
            planting: planting.to_vec(),
            sowing: sowing.to_vec(),
            growth: growth.to_vec(),
            arrival: arrival.to_vec(),
        }
    }

    pub fn months(&self, stage: Stage) -> &[u32] {
        match stage {
            Stage::Planting => &self.planting,
            Stage::Sowing => &self.sowing,
            Stage::Growth => &self.growth,
            Stage::Arrival => &self.arrival,
        }
    }
}

/// Readable value for one stage of [`CropCalendar::calendar_for`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StageInfo {
    Months(Vec<String>),
    Note(String),
}

/// `{planting, sowing, growth, arrival}` with month names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarView {
    pub planting: StageInfo,
    pub sowing: StageInfo,
    pub growth: StageInfo,
    pub arrival: StageInfo,
}

/// Crops per stage in one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCrops {
    pub planting: Vec<String>,
    pub sowing: Vec<String>,
    pub growth: Vec<String>,
    pub arrival: Vec<String>,
}

impl StageCrops {
    pub fn get(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::Planting => &self.planting,
            Stage::Sowing => &self.sowing,
            Stage::Growth => &self.growth,
            Stage::Arrival => &self.arrival,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub month: String,
    pub crops: StageCrops,
}

/// English month name for 1-12
pub fn month_name(month: u32) -> Option<&'static str> {
    u8::try_from(month)
        .ok()
        .and_then(|m| chrono::Month::try_from(m).ok())
        .map(|m| m.name())
}

/// Immutable crop calendar, loaded once and shared by the crop tools.
#[derive(Debug, Clone)]
pub struct CropCalendar {
    /// Ordered so reverse lookups list crops in a stable order
    crops: Vec<(String, StageMonths)>,
}

impl CropCalendar {
    /// Built-in calendar of the major Indian market crops.
    pub fn india() -> Self {
        let table: [(&str, StageMonths); 18] = [
            ("castor seed", StageMonths::new(&[7], &[7], &[8, 9, 10], &[11, 12, 1])),
            ("mustard seed", StageMonths::new(&[10], &[10], &[11, 12, 1], &[2, 3])),
            ("soybean", StageMonths::new(&[6], &[6], &[7, 8, 9], &[10, 11])),
            ("cotton", StageMonths::new(&[5], &[5], &[6, 7, 8, 9], &[10, 11, 12])),
            ("guar", StageMonths::new(&[7], &[7], &[8, 9], &[10])),
            ("barley", StageMonths::new(&[10], &[10], &[11, 12, 1], &[2, 3])),
            ("maize", StageMonths::new(&[6], &[6], &[7, 8, 9], &[10])),
            ("wheat", StageMonths::new(&[11], &[11], &[12, 1, 2], &[3, 4])),
            ("chana", StageMonths::new(&[10], &[10], &[11, 12, 1], &[2, 3])),
            ("bajra", StageMonths::new(&[6], &[6], &[7, 8], &[9])),
            ("paddy kharif", StageMonths::new(&[6], &[6], &[7, 8, 9], &[10, 11])),
            ("paddy rabi", StageMonths::new(&[11], &[11], &[12, 1, 2], &[3, 4])),
            ("moong", StageMonths::new(&[6], &[6], &[7, 8], &[9])),
            (
                "sugar",
                StageMonths::new(&[2], &[2], &[3, 4, 5, 6, 7, 8, 9], &[10, 11, 12, 1]),
            ),
            ("coriander", StageMonths::new(&[10], &[10], &[11, 12, 1], &[2, 3])),
            ("jeera", StageMonths::new(&[11], &[11], &[12, 1, 2], &[3, 4])),
            (
                "turmeric",
                StageMonths::new(&[4], &[4], &[5, 6, 7, 8, 9], &[10, 11, 12, 1, 2, 3]),
            ),
            ("chilli", StageMonths::new(&[8], &[8], &[9, 10, 11], &[12, 1, 2])),
        ];

        Self {
            crops: table
                .into_iter()
                .map(|(name, months)| (name.to_string(), months))
                .collect(),
        }
    }

    /// Calendar from a JSON object `{crop: {planting: [..], ...}}`.
    ///
    /// Crop names are lower-cased; order follows the sorted crop names.
    pub fn from_json(json: &str) -> Result<Self, CropError> {
        let table: BTreeMap<String, StageMonths> =
            serde_json::from_str(json).map_err(|e| CropError::Malformed {
                file: "crop calendar".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            crops: table
                .into_iter()
                .map(|(name, months)| (name.to_lowercase(), months))
                .collect(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, CropError> {
        let contents = std::fs::read_to_string(path)?;
        let calendar = Self::from_json(&contents).map_err(|e| match e {
            CropError::Malformed { message, .. } => CropError::Malformed {
                file: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        tracing::info!(
            "Loaded crop calendar with {} crops from {}",
            calendar.len(),
            path.display()
        );
        Ok(calendar)
    }

    pub fn len(&self) -> usize {
        self.crops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }

    pub fn crop_names(&self) -> impl Iterator<Item = &str> {
        self.crops.iter().map(|(name, _)| name.as_str())
    }

    pub fn stages(&self, crop_name: &str) -> Option<&StageMonths> {
        let wanted = crop_name.trim().to_lowercase();
        self.crops
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, months)| months)
    }

    /// Month names for each stage of a crop.
    pub fn calendar_for(&self, crop_name: &str) -> Result<CalendarView, CropError> {
        if crop_name.trim().is_empty() {
            return Err(CropError::EmptyCropName);
        }

        let months = self
            .stages(crop_name)
            .ok_or_else(|| CropError::CropNotFound(crop_name.to_string()))?;

        let describe = |stage: Stage| -> StageInfo {
            let numbers = months.months(stage);
            if numbers.is_empty() {
                return StageInfo::Note(NO_INFORMATION.to_string());
            }
            let names: Result<Vec<String>, u32> = numbers
                .iter()
                .map(|&m| month_name(m).map(str::to_string).ok_or(m))
                .collect();
            match names {
                Ok(names) => StageInfo::Months(names),
                Err(bad) => StageInfo::Note(format!("Invalid month index {} in data.", bad)),
            }
        };

        Ok(CalendarView {
            planting: describe(Stage::Planting),
            sowing: describe(Stage::Sowing),
            growth: describe(Stage::Growth),
            arrival: describe(Stage::Arrival),
        })
    }

    /// Crops in each stage during `month` (1-12).
    pub fn crops_in_month(&self, month: i64) -> Result<MonthView, CropError> {
        let month_no = u32::try_from(month).map_err(|_| CropError::InvalidMonth)?;
        let name = month_name(month_no).ok_or(CropError::InvalidMonth)?;

        let collect = |stage: Stage| -> Vec<String> {
            let crops: Vec<String> = self
                .crops
                .iter()
                .filter(|(_, months)| months.months(stage).contains(&month_no))
                .map(|(crop, _)| crop.clone())
                .collect();
            if crops.is_empty() {
                vec![NO_CROPS.to_string()]
            } else {
                crops
            }
        };

        Ok(MonthView {
            month: name.to_string(),
            crops: StageCrops {
                planting: collect(Stage::Planting),
                sowing: collect(Stage::Sowing),
                growth: collect(Stage::Growth),
                arrival: collect(Stage::Arrival),
            },
        })
    }
}

impl Default for CropCalendar {
    fn default() -> Self {
        Self::india()
    }
}
