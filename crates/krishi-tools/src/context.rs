//! `user_context`: where the farmer is and what day it is.

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDateTime};
use krishi_core::{AppError, Specialist, SpecialistContext, Tool};
use krishi_services::UserLocationStore;
use serde_json::{json, Value};
use std::sync::Arc;

const NO_LOCATION: &str = "No location info available. Initialise the user location first.";

/// `{current_date, day, month, year, time}` for a local timestamp
pub fn date_time_info(now: NaiveDateTime) -> Value {
    json!({
        "current_date": now.format("%Y-%m-%d").to_string(),
        "day": now.format("%A").to_string(),
        "month": now.format("%B").to_string(),
        "year": now.year(),
        "time": now.format("%H:%M:%S").to_string(),
    })
}

pub struct DateTimeInfoTool;

#[async_trait]
impl Tool for DateTimeInfoTool {
    fn name(&self) -> &str {
        "get_date_time_info"
    }

    fn description(&self) -> &str {
        "Current local date, weekday, month, year and time. Use it to resolve \
         \"today\", \"this month\" or \"this season\" before calling other tools."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value) -> Result<Value, AppError> {
        Ok(date_time_info(Local::now().naive_local()))
    }
}

pub struct GetUserLocationTool {
    store: Arc<UserLocationStore>,
}

#[async_trait]
impl Tool for GetUserLocationTool {
    fn name(&self) -> &str {
        "get_user_location"
    }

    fn description(&self) -> &str {
        "The farmer's saved location (coordinates, city, district, state, country). \
         Useful as the default state for price lookups and city for forecasts."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value) -> Result<Value, AppError> {
        match self.store.load()? {
            Some(user) => serde_json::to_value(user).map_err(|e| AppError::Other(e.into())),
            None => Ok(json!({ "error": NO_LOCATION })),
        }
    }
}

pub struct UserContextSpecialist {
    store: Arc<UserLocationStore>,
}

impl UserContextSpecialist {
    pub fn new(store: UserLocationStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

impl Specialist for UserContextSpecialist {
    fn id(&self) -> &str {
        "user_context"
    }

    fn name(&self) -> &str {
        "User Context"
    }

    fn description(&self) -> &str {
        "The farmer's location and the current date"
    }

    fn initialize(&mut self, _ctx: &SpecialistContext) -> anyhow::Result<()> {
        if !self.store.path().exists() {
            tracing::info!("No user location saved yet; run `krishi init` to set one");
        }
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(DateTimeInfoTool),
            Arc::new(GetUserLocationTool {
                store: self.store.clone(),
            }),
        ]
    }
}
