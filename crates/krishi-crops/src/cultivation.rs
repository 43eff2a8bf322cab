//! Per-crop cultivation guides stored as one JSON document per crop.

use crate::error::CropError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Returned by [`CropGuides::get_context`] for a missing section
pub const KEY_NOT_FOUND: &str = "Key not found";

/// Directory of `<crop>.json` guides
#[derive(Debug, Clone)]
pub struct CropGuides {
    dir: PathBuf,
}

impl CropGuides {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First guide (by name) whose filename starts with the crop name.
    ///
    /// A missing or unreadable guide directory yields `Ok(None)` so the
    /// orchestrator can tell the farmer no guide exists.
    pub fn search_filename(&self, crop_name: &str) -> Result<Option<String>, CropError> {
        let prefix = crop_name.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(CropError::EmptyCropName);
        }

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Guide directory {} unreadable: {}", self.dir.display(), e);
                return Ok(None);
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".json"))
            .collect();
        names.sort();

        tracing::debug!("Guide search for '{}' matched {:?}", prefix, names);
        Ok(names.into_iter().next())
    }

    /// Top-level section names of a guide, sorted.
    pub fn get_keys(&self, filename: &str) -> Result<Vec<String>, CropError> {
        Ok(self.load(filename)?.keys().cloned().collect())
    }

    /// Text of one section; non-string sections come back as JSON text.
    pub fn get_context(&self, filename: &str, key: &str) -> Result<String, CropError> {
        let guide = self.load(filename)?;
        Ok(match guide.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => KEY_NOT_FOUND.to_string(),
        })
    }

    fn load(&self, filename: &str) -> Result<Map<String, Value>, CropError> {
        let path = self.resolve(filename)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CropError::GuideNotFound(filename.to_string()))
            }
            Err(e) => return Err(CropError::Io(e)),
        };

        serde_json::from_str(&contents).map_err(|e| CropError::Malformed {
            file: filename.to_string(),
            message: e.to_string(),
        })
    }

    /// Path inside the guide directory; names that could escape it are rejected
    fn resolve(&self, filename: &str) -> Result<PathBuf, CropError> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(CropError::InvalidFilename(filename.to_string()));
        }
        Ok(self.dir.join(filename))
    }
}
