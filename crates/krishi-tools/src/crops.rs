//! `crop_agent`: crop calendar and cultivation guide lookups.
//!
//! Lookup misses come back as `{"error": ...}` results rather than tool
//! failures so the orchestrator can ask the farmer to clarify.

use async_trait::async_trait;
use krishi_core::{parse_args, AppError, Config, Specialist, SpecialistContext, Tool};
use krishi_crops::{CropCalendar, CropError, CropGuides};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct CropNameArgs {
    #[serde(default)]
    crop_name: Value,
}

#[derive(Debug, Deserialize)]
struct MonthArgs {
    #[serde(default)]
    month: Value,
}

#[derive(Debug, Deserialize)]
struct FilenameArgs {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct ContextArgs {
    filename: String,
    key: String,
}

/// Result value, or the error object for a lookup miss
fn lookup<T: serde::Serialize>(result: Result<T, CropError>) -> Result<Value, AppError> {
    match result {
        Ok(value) => serde_json::to_value(value).map_err(|e| AppError::Other(e.into())),
        Err(e @ CropError::Io(_)) => Err(e.into()),
        Err(e) => {
            tracing::debug!("Crop lookup miss: {}", e);
            Ok(e.to_error_object())
        }
    }
}

/// Non-string crop names get the same answer as an empty one
fn crop_name(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

pub struct GetCropCalendarTool {
    calendar: Arc<CropCalendar>,
}

#[async_trait]
impl Tool for GetCropCalendarTool {
    fn name(&self) -> &str {
        "get_crop_calendar"
    }

    fn description(&self) -> &str {
        "Returns the planting, sowing, growth and arrival months of a crop in India."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "crop_name": {
                    "type": "string",
                    "description": "Crop name in English, e.g. \"wheat\" or \"paddy kharif\""
                }
            },
            "required": ["crop_name"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, AppError> {
        let args: CropNameArgs = parse_args(self.name(), params)?;
        lookup(self.calendar.calendar_for(crop_name(&args.crop_name)))
    }
}

pub struct GetCropsByMonthTool {
    calendar: Arc<CropCalendar>,
}

#[async_trait]
impl Tool for GetCropsByMonthTool {
    fn name(&self) -> &str {
        "get_crops_by_month"
    }

    fn description(&self) -> &str {
        "Lists the crops in each stage (planting, sowing, growth, arrival) during a month."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "month": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 12,
                    "description": "Month number, 7 for July"
                }
            },
            "required": ["month"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, AppError> {
        let args: MonthArgs = parse_args(self.name(), params)?;
        match args.month.as_i64() {
            Some(month) => lookup(self.calendar.crops_in_month(month)),
            None => Ok(CropError::InvalidMonth.to_error_object()),
        }
    }
}

pub struct SearchFilenameTool {
    guides: Arc<CropGuides>,
}

#[async_trait]
impl Tool for SearchFilenameTool {
    fn name(&self) -> &str {
        "search_filename"
    }

    fn description(&self) -> &str {
        "Finds the cultivation guide file for a crop. Returns the filename or null."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "crop_name": {
                    "type": "string",
                    "description": "Crop name in English; translate other languages first"
                }
            },
            "required": ["crop_name"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, AppError> {
        let args: CropNameArgs = parse_args(self.name(), params)?;
        lookup(self.guides.search_filename(crop_name(&args.crop_name)))
    }
}

pub struct GetKeysTool {
    guides: Arc<CropGuides>,
}

#[async_trait]
impl Tool for GetKeysTool {
    fn name(&self) -> &str {
        "get_keys"
    }

    fn description(&self) -> &str {
        "Lists the sections available in a crop's cultivation guide."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Guide filename returned by search_filename"
                }
            },
            "required": ["filename"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, AppError> {
        let args: FilenameArgs = parse_args(self.name(), params)?;
        lookup(self.guides.get_keys(&args.filename))
    }
}

pub struct GetContextTool {
    guides: Arc<CropGuides>,
}

#[async_trait]
impl Tool for GetContextTool {
    fn name(&self) -> &str {
        "get_context"
    }

    fn description(&self) -> &str {
        "Returns the content of one section of a crop's cultivation guide."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": { "type": "string" },
                "key": {
                    "type": "string",
                    "description": "Section name returned by get_keys"
                }
            },
            "required": ["filename", "key"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, AppError> {
        let args: ContextArgs = parse_args(self.name(), params)?;
        lookup(self.guides.get_context(&args.filename, &args.key))
    }
}

pub struct CropSpecialist {
    calendar: Arc<CropCalendar>,
    guides: Arc<CropGuides>,
}

impl CropSpecialist {
    pub fn new(calendar: CropCalendar, guides: CropGuides) -> Self {
        Self {
            calendar: Arc::new(calendar),
            guides: Arc::new(guides),
        }
    }

    /// Built-in India calendar unless `crops.calendar_path` points elsewhere
    pub fn from_config(config: &Config) -> Result<Self, CropError> {
        let calendar = match &config.crops.calendar_path {
            Some(path) => CropCalendar::from_path(path)?,
            None => CropCalendar::india(),
        };
        Ok(Self::new(calendar, CropGuides::new(&config.crops.guides_dir)))
    }
}

impl Specialist for CropSpecialist {
    fn id(&self) -> &str {
        "crop_agent"
    }

    fn name(&self) -> &str {
        "Crop Expert"
    }

    fn description(&self) -> &str {
        "Crop calendars and cultivation practices"
    }

    fn initialize(&mut self, _ctx: &SpecialistContext) -> anyhow::Result<()> {
        if !self.guides.dir().is_dir() {
            tracing::warn!(
                "Cultivation guide directory {} does not exist; guide lookups will find nothing",
                self.guides.dir().display()
            );
        }
        tracing::info!("Crop calendar has {} crops", self.calendar.len());
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(SearchFilenameTool {
                guides: self.guides.clone(),
            }),
            Arc::new(GetKeysTool {
                guides: self.guides.clone(),
            }),
            Arc::new(GetContextTool {
                guides: self.guides.clone(),
            }),
            Arc::new(GetCropCalendarTool {
                calendar: self.calendar.clone(),
            }),
            Arc::new(GetCropsByMonthTool {
                calendar: self.calendar.clone(),
            }),
        ]
    }
}
