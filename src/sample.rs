//! Weapon fire samples
//!
//! A [`WeaponFireSample`] is one recorded source shot plus the parameters
//! that shape how it is rendered. Its identity is its source path.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::engine::AudioBuffer;
use crate::error::{Result, SalvoError};
use crate::project::{field_bool, field_f64, field_i64, field_string};

// ============================================================================
// Constants
// ============================================================================

/// Default normalization headroom (dB below full scale)
pub const DEFAULT_HEADROOM_DB: f32 = -6.0;

/// Default random pitch spread (± cents)
pub const DEFAULT_RAND_OFFSET_CENTS: i64 = 24;

/// Default start of the loop fade-out
pub const DEFAULT_LOOP_FADEOUT_START_MS: i64 = 120;

/// Default length of the loop fade-out
pub const DEFAULT_LOOP_FADEOUT_LENGTH_MS: i64 = 48;

/// Default tail crop length
pub const DEFAULT_TAIL_OFFSET_MS: i64 = 36;

/// Default tail fade-in length
pub const DEFAULT_TAIL_FADEIN_MS: i64 = 30;

/// Headroom can never be closer to full scale than this
pub const MAX_HEADROOM_DB: f32 = -0.01;

// ============================================================================
// Sample Tuning
// ============================================================================

/// The user-tunable fields of a sample
///
/// This is a plain value: copying properties from one sample to another
/// copies one of these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleTuning {
    /// Normalization ceiling in dB, always <= -0.01 once sanitized
    #[serde(rename = "headroom")]
    pub headroom_db: f32,
    /// Random pitch spread in cents, always >= 0 once sanitized
    pub rand_offset_cents: i64,
    pub loop_fadeout_start_ms: i64,
    pub loop_fadeout_length_ms: i64,
    pub tail_offset_ms: i64,
    pub tail_fadein_ms: i64,
    /// Force every shot of a sequence onto this sample
    pub solo: bool,
}

impl Default for SampleTuning {
    fn default() -> Self {
        Self {
            headroom_db: DEFAULT_HEADROOM_DB,
            rand_offset_cents: DEFAULT_RAND_OFFSET_CENTS,
            loop_fadeout_start_ms: DEFAULT_LOOP_FADEOUT_START_MS,
            loop_fadeout_length_ms: DEFAULT_LOOP_FADEOUT_LENGTH_MS,
            tail_offset_ms: DEFAULT_TAIL_OFFSET_MS,
            tail_fadein_ms: DEFAULT_TAIL_FADEIN_MS,
            solo: false,
        }
    }
}

impl SampleTuning {
    /// Read tuning fields from a JSON object
    ///
    /// Missing or unusable fields keep their default value.
    pub fn from_json(json: &Value) -> Self {
        let defaults = Self::default();
        Self {
            headroom_db: field_f64(json, "headroom")
                .or_else(|| field_f64(json, "headroom_db"))
                .map(|v| v as f32)
                .unwrap_or(defaults.headroom_db),
            rand_offset_cents: field_i64(json, "rand_offset_cents")
                .unwrap_or(defaults.rand_offset_cents),
            loop_fadeout_start_ms: field_i64(json, "loop_fadeout_start_ms")
                .unwrap_or(defaults.loop_fadeout_start_ms),
            loop_fadeout_length_ms: field_i64(json, "loop_fadeout_length_ms")
                .unwrap_or(defaults.loop_fadeout_length_ms),
            tail_offset_ms: field_i64(json, "tail_offset_ms").unwrap_or(defaults.tail_offset_ms),
            tail_fadein_ms: field_i64(json, "tail_fadein_ms").unwrap_or(defaults.tail_fadein_ms),
            solo: field_bool(json, "solo").unwrap_or(defaults.solo),
        }
    }

    /// Clamp every field into range for a source of `duration_ms`
    ///
    /// Fade starts and offsets land in `[0, duration]`, fade lengths in
    /// `[0, duration - start]`.
    pub fn clamped_to(self, duration_ms: i64) -> Self {
        let duration_ms = duration_ms.max(0);
        let loop_fadeout_start_ms = self.loop_fadeout_start_ms.clamp(0, duration_ms);
        let tail_offset_ms = self.tail_offset_ms.clamp(0, duration_ms);

        Self {
            headroom_db: clamp_headroom(self.headroom_db),
            rand_offset_cents: self.rand_offset_cents.saturating_abs(),
            loop_fadeout_start_ms,
            loop_fadeout_length_ms: self
                .loop_fadeout_length_ms
                .clamp(0, duration_ms - loop_fadeout_start_ms),
            tail_offset_ms,
            tail_fadein_ms: self.tail_fadein_ms.clamp(0, duration_ms - tail_offset_ms),
            solo: self.solo,
        }
    }
}

fn clamp_headroom(headroom_db: f32) -> f32 {
    if headroom_db.is_nan() {
        return DEFAULT_HEADROOM_DB;
    }
    headroom_db.min(MAX_HEADROOM_DB)
}

// ============================================================================
// Persisted Form
// ============================================================================

/// Everything about a sample except its audio, as stored in a project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleProps {
    pub path: PathBuf,
    pub name: String,
    #[serde(flatten)]
    pub tuning: SampleTuning,
}

impl SampleProps {
    /// Read a sample entry from a project document
    ///
    /// `path` is required. `name` falls back to the file name.
    pub fn from_json(json: &Value) -> Result<Self> {
        let path = field_string(json, "path")
            .map(PathBuf::from)
            .ok_or_else(|| SalvoError::InvalidProject {
                reason: "sample entry without a path".to_string(),
            })?;
        let name = field_string(json, "name").unwrap_or_else(|| display_name(&path));

        Ok(Self {
            path,
            name,
            tuning: SampleTuning::from_json(json),
        })
    }
}

/// Name shown for a sample loaded from `path`
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Weapon Fire Sample
// ============================================================================

/// One recorded shot and its render parameters
///
/// The tuning is re-clamped against the source every time either changes,
/// so fades never run past the end of the audio.
#[derive(Debug, Clone)]
pub struct WeaponFireSample {
    source: AudioBuffer,
    path: PathBuf,
    name: String,
    tuning: SampleTuning,
}

impl WeaponFireSample {
    /// Create a sample with default tuning
    pub fn new(source: AudioBuffer, path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self::with_tuning(source, path, name, SampleTuning::default())
    }

    /// Create a sample with the given tuning, clamped to the source
    pub fn with_tuning(
        source: AudioBuffer,
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        tuning: SampleTuning,
    ) -> Self {
        let mut sample = Self {
            source,
            path: path.into(),
            name: name.into(),
            tuning,
        };
        sample.reclamp();
        sample
    }

    /// Rebuild a sample from its persisted form and freshly decoded audio
    pub fn from_props(source: AudioBuffer, props: SampleProps) -> Self {
        Self::with_tuning(source, props.path, props.name, props.tuning)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &AudioBuffer {
        &self.source
    }

    pub fn tuning(&self) -> &SampleTuning {
        &self.tuning
    }

    pub fn is_solo(&self) -> bool {
        self.tuning.solo
    }

    /// Source length in whole milliseconds
    pub fn duration_ms(&self) -> i64 {
        self.source.duration_ms().round() as i64
    }

    /// Replace the tuning, clamping it to the source
    pub fn set_tuning(&mut self, tuning: SampleTuning) {
        self.tuning = tuning;
        self.reclamp();
    }

    pub fn set_headroom(&mut self, headroom_db: f32) {
        self.tuning.headroom_db = clamp_headroom(headroom_db);
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.tuning.solo = solo;
    }

    /// Swap in freshly decoded audio and display name; tuning is kept
    pub fn replace_source(&mut self, source: AudioBuffer, name: impl Into<String>) {
        self.source = source;
        self.name = name.into();
        self.reclamp();
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    /// Persisted form of this sample
    pub fn props(&self) -> SampleProps {
        SampleProps {
            path: self.path.clone(),
            name: self.name.clone(),
            tuning: self.tuning,
        }
    }

    fn reclamp(&mut self) {
        self.tuning = self.tuning.clamped_to(self.duration_ms());
    }
}

impl PartialEq for WeaponFireSample {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for WeaponFireSample {}

impl std::fmt::Display for WeaponFireSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.path.display())
    }
}
