//! Loop generation settings

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::project::{field_bool, field_i64, field_string};

pub const DEFAULT_PREFIX: &str = "default";
pub const DEFAULT_SEED: i64 = 42;
pub const DEFAULT_FIRE_COUNT: u32 = 31;
pub const DEFAULT_BURST_COUNT: u32 = 3;
pub const DEFAULT_RPM: u32 = 800;
pub const DEFAULT_RPM_BURST: u32 = 900;
pub const DEFAULT_NORMALIZE: bool = true;
pub const DEFAULT_MONO_LOOP: bool = true;
pub const DEFAULT_MONO_TAIL: bool = false;
pub const DEFAULT_VARIATIONS: u32 = 3;

/// Directory renders go to when nothing else is configured
pub fn default_target_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_default()
        .join("results")
}

/// Clamp a raw count or rate to at least 1
fn at_least_one(value: i64) -> u32 {
    value.clamp(1, u32::MAX as i64) as u32
}

/// Parameters for a loop/burst/tail render
///
/// Shot counts and fire rates are never below 1; the setters clamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopSettings {
    fire_count: u32,
    burst_count: u32,
    rpm: u32,
    rpm_burst: u32,
    pub seed: i64,
    pub normalize: bool,
    pub mono_loop: bool,
    pub mono_tail: bool,
    pub prefix: String,
    pub target_path: PathBuf,
    pub variations: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            fire_count: DEFAULT_FIRE_COUNT,
            burst_count: DEFAULT_BURST_COUNT,
            rpm: DEFAULT_RPM,
            rpm_burst: DEFAULT_RPM_BURST,
            seed: DEFAULT_SEED,
            normalize: DEFAULT_NORMALIZE,
            mono_loop: DEFAULT_MONO_LOOP,
            mono_tail: DEFAULT_MONO_TAIL,
            prefix: DEFAULT_PREFIX.to_string(),
            target_path: default_target_path(),
            variations: DEFAULT_VARIATIONS,
        }
    }
}

impl LoopSettings {
    /// Read settings from a JSON object
    ///
    /// Missing or unusable fields keep their default; counts and rates
    /// clamp to at least 1.
    pub fn from_json(json: &Value) -> Self {
        let mut settings = Self::default();

        if let Some(v) = field_i64(json, "fire_count") {
            settings.set_fire_count(v);
        }
        if let Some(v) = field_i64(json, "burst_count") {
            settings.set_burst_count(v);
        }
        if let Some(v) = field_i64(json, "rpm") {
            settings.set_rpm(v);
        }
        if let Some(v) = field_i64(json, "rpm_burst") {
            settings.set_rpm_burst(v);
        }
        if let Some(v) = field_i64(json, "seed") {
            settings.seed = v;
        }
        if let Some(v) = field_bool(json, "normalize") {
            settings.normalize = v;
        }
        if let Some(v) = field_bool(json, "mono_loop") {
            settings.mono_loop = v;
        }
        if let Some(v) = field_bool(json, "mono_tail") {
            settings.mono_tail = v;
        }
        if let Some(v) = field_string(json, "prefix") {
            settings.prefix = v;
        }
        if let Some(v) = field_string(json, "target_path") {
            settings.target_path = PathBuf::from(v);
        }
        if let Some(v) = field_i64(json, "variations") {
            settings.variations = v.clamp(0, u32::MAX as i64) as u32;
        }

        settings
    }

    pub fn fire_count(&self) -> u32 {
        self.fire_count
    }

    pub fn burst_count(&self) -> u32 {
        self.burst_count
    }

    pub fn rpm(&self) -> u32 {
        self.rpm
    }

    pub fn rpm_burst(&self) -> u32 {
        self.rpm_burst
    }

    pub fn set_fire_count(&mut self, count: i64) {
        self.fire_count = at_least_one(count);
    }

    pub fn set_burst_count(&mut self, count: i64) {
        self.burst_count = at_least_one(count);
    }

    pub fn set_rpm(&mut self, rpm: i64) {
        self.rpm = at_least_one(rpm);
    }

    pub fn set_rpm_burst(&mut self, rpm: i64) {
        self.rpm_burst = at_least_one(rpm);
    }

    /// Shot count and rate of fire for a burst or an auto-fire loop
    pub fn count_and_rpm(&self, is_burst: bool) -> (usize, u32) {
        if is_burst {
            (self.burst_count as usize, self.rpm_burst)
        } else {
            (self.fire_count as usize, self.rpm)
        }
    }

    /// Directory a render with these settings writes to
    pub fn output_dir(&self) -> PathBuf {
        self.target_path.join(&self.prefix)
    }
}
