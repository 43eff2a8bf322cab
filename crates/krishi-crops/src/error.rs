//! Crop lookup errors.

use krishi_core::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("Invalid input. Please provide a crop name as a string.")]
    EmptyCropName,

    #[error("Invalid input. Please provide a month number between 1 and 12.")]
    InvalidMonth,

    #[error("Crop '{0}' not found in the India crop calendar.")]
    CropNotFound(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Guide not found: {0}")]
    GuideNotFound(String),

    #[error("Malformed data in {file}: {message}")]
    Malformed { file: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CropError {
    /// Structured `{"error": ...}` result handed back to the orchestrator
    /// instead of a failure, so it can rephrase or ask the farmer.
    pub fn to_error_object(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

impl From<CropError> for AppError {
    fn from(e: CropError) -> Self {
        match e {
            CropError::EmptyCropName | CropError::InvalidMonth | CropError::InvalidFilename(_) => {
                AppError::InvalidInput(e.to_string())
            }
            CropError::CropNotFound(_) | CropError::GuideNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            CropError::Malformed { .. } => AppError::Other(anyhow::anyhow!("{e}")),
            CropError::Io(io) => AppError::Io(io),
        }
    }
}
