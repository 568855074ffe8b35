//! Project Document
//!
//! The `config.json` written next to a render: loop settings plus the
//! properties of every sample (not the audio). Loading is tolerant: fields
//! are probed one by one, coerced where a sensible reading exists, and
//! anything missing or unreadable falls back to its default.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SalvoError};
use crate::sample::SampleProps;
use crate::settings::LoopSettings;

/// Project document file name
pub const CONFIG_FILE: &str = "config.json";

/// Backup of the previous project document
pub const CONFIG_BACKUP_FILE: &str = "config.json.bak";

/// Settings and sample properties of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectDocument {
    pub loop_settings: LoopSettings,
    pub sample_props: Vec<SampleProps>,
}

impl ProjectDocument {
    /// Parse a document, tolerating missing and extra fields
    pub fn from_json(json: &Value) -> Result<Self> {
        if !json.is_object() {
            return Err(SalvoError::InvalidProject {
                reason: "top level is not an object".to_string(),
            });
        }

        let loop_settings = json
            .get("loop_settings")
            .map(LoopSettings::from_json)
            .unwrap_or_default();

        let sample_props = match json.get("sample_props").and_then(|v| v.as_array()) {
            Some(entries) => entries
                .iter()
                .map(SampleProps::from_json)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            loop_settings,
            sample_props,
        })
    }

    /// Read a document from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SalvoError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let data: Value = serde_json::from_str(&content)?;
        let document = Self::from_json(&data)?;
        debug!(
            "Loaded project {} ({} samples)",
            path.display(),
            document.sample_props.len()
        );
        Ok(document)
    }

    /// Write `config.json` into `dir`, keeping the previous one as a backup
    ///
    /// Only one backup is kept; an older backup is overwritten.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        ensure_dir(dir)?;

        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            let backup_path = dir.join(CONFIG_BACKUP_FILE);
            fs::copy(&config_path, &backup_path).map_err(|e| SalvoError::FileWriteError {
                path: backup_path.clone(),
                source: e,
            })?;
            info!("Backed up {} to {}", config_path.display(), backup_path.display());
        }

        // serde_json maps are ordered, so keys come out sorted
        let content = serde_json::to_string_pretty(&serde_json::to_value(self)?)?;
        fs::write(&config_path, content).map_err(|e| SalvoError::FileWriteError {
            path: config_path.clone(),
            source: e,
        })?;

        Ok(config_path)
    }
}

/// Make sure `dir` exists as a directory
///
/// # Errors
/// * `PathConflict` - If something other than a directory is in the way
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if dir.is_dir() {
            return Ok(());
        }
        return Err(SalvoError::PathConflict {
            path: dir.to_path_buf(),
        });
    }

    fs::create_dir_all(dir).map_err(|e| SalvoError::DirectoryCreateError {
        path: dir.to_path_buf(),
        source: e,
    })
}

// ============================================================================
// Field coercion
// ============================================================================

/// Read `key` as an integer, truncating floats and parsing strings
pub(crate) fn field_i64(json: &Value, key: &str) -> Option<i64> {
    match json.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Read `key` as a float, parsing strings
pub(crate) fn field_f64(json: &Value, key: &str) -> Option<f64> {
    match json.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

/// Read `key` as a bool; numbers are true when non-zero
pub(crate) fn field_bool(json: &Value, key: &str) -> Option<bool> {
    match json.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read `key` as a string; numbers are formatted
pub(crate) fn field_string(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
