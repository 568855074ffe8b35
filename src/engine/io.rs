//! Audio file I/O for Salvo
//!
//! The renderer only ever sees [`AudioBuffer`]s; getting them on and off
//! disk goes through the [`AudioCodec`] trait. [`WavCodec`] is the real
//! implementation, [`MemoryCodec`] keeps "files" in a map for tests and
//! dry runs.
//!
//! Decoded audio keeps the file's own sample rate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{Result, SalvoError};

/// Decode/encode capability the renderer depends on
pub trait AudioCodec: Send + Sync {
    /// Read the audio stored at `path`
    fn decode(&self, path: &Path) -> Result<AudioBuffer>;

    /// Write `buffer` to `path`, replacing any existing file
    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()>;
}

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 float (default: 16)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 16 }
    }
}

impl ExportFormat {
    /// Create an export format with the given bit depth
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }
}

/// WAV codec backed by `hound`
#[derive(Debug, Clone, Default)]
pub struct WavCodec {
    /// Format used when encoding
    pub format: ExportFormat,
}

impl WavCodec {
    /// Create a codec that encodes with `format`
    pub fn new(format: ExportFormat) -> Self {
        Self { format }
    }
}

impl AudioCodec for WavCodec {
    fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        import_audio(path)
    }

    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()> {
        export_audio(buffer, path, self.format)
    }
}

/// Import a WAV file
///
/// Integer and float WAVs are converted to 32-bit float at the file's
/// sample rate.
///
/// # Errors
/// * `DecodeFailure` - If the file is missing or not a readable WAV file
/// * `UnsupportedFormat` - If the audio has more than 2 channels
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(decode_failure(path, "file not found"));
    }

    let reader = WavReader::open(path)
        .map_err(|e| decode_failure(path, format!("failed to open WAV file: {}", e)))?;

    let spec = reader.spec();
    let layout = ChannelLayout::from_count(spec.channels as usize).ok_or_else(|| {
        SalvoError::UnsupportedFormat {
            format: format!(
                "{}-channel audio (only mono/stereo supported)",
                spec.channels
            ),
        }
    })?;

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)
        .map_err(|reason| decode_failure(path, reason))?;

    debug!(
        "Decoded {} ({} Hz, {} ch, {} bit)",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    AudioBuffer::from_interleaved(&interleaved, layout, spec.sample_rate)
}

/// Export an AudioBuffer to a WAV file at the buffer's own sample rate
///
/// Integer formats clamp samples to full scale.
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    if !matches!(format.bit_depth, 16 | 24 | 32) {
        return Err(SalvoError::UnsupportedFormat {
            format: format!("{}-bit audio (only 16, 24, 32 supported)", format.bit_depth),
        });
    }

    let mut writer = WavWriter::create(path, spec).map_err(|e| encode_failure(path, e))?;

    for sample in buffer.to_interleaved() {
        let written = match format.bit_depth {
            16 => writer.write_sample((sample * 32767.0).clamp(-32768.0, 32767.0) as i16),
            // 24-bit stored as i32 in hound
            24 => writer.write_sample((sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32),
            _ => writer.write_sample(sample),
        };
        written.map_err(|e| encode_failure(path, e))?;
    }

    writer.finalize().map_err(|e| encode_failure(path, e))?;
    debug!("Encoded {}", path.display());

    Ok(())
}

/// Generate a mono test tone (sine wave)
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `duration_secs` - Duration of the tone in seconds
/// * `sample_rate` - Sample rate in Hz
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs as f64 * sample_rate as f64).round() as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    let samples = (0..num_samples)
        .map(|i| (angular_freq * i as f32).sin())
        .collect();

    AudioBuffer::from_channels(vec![samples], sample_rate)
}

/// Generate a stereo test tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let left = generate_test_tone(freq_left, duration_secs, sample_rate);
    let right = generate_test_tone(freq_right, duration_secs, sample_rate);

    AudioBuffer::from_channels(
        vec![left.channel(0).to_vec(), right.channel(0).to_vec()],
        sample_rate,
    )
}

/// Codec that keeps encoded buffers in memory
///
/// Decoding a path that was never inserted or encoded fails like a
/// missing file would.
#[derive(Debug, Default)]
pub struct MemoryCodec {
    files: Mutex<HashMap<PathBuf, AudioBuffer>>,
}

impl MemoryCodec {
    /// Create an empty in-memory codec
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `buffer` under `path`
    pub fn insert(&self, path: impl Into<PathBuf>, buffer: AudioBuffer) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), buffer);
        }
    }

    /// Fetch a copy of what is stored under `path`
    pub fn get(&self, path: &Path) -> Option<AudioBuffer> {
        self.files.lock().ok()?.get(path).cloned()
    }

    /// All stored paths, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

impl AudioCodec for MemoryCodec {
    fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        self.get(path)
            .ok_or_else(|| decode_failure(path, "file not found"))
    }

    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|e| encode_failure(path, e))?;
        files.insert(path.to_path_buf(), buffer.clone());
        Ok(())
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn decode_failure(path: &Path, reason: impl ToString) -> SalvoError {
    SalvoError::DecodeFailure {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn encode_failure(path: &Path, reason: impl ToString) -> SalvoError {
    SalvoError::EncodeFailure {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> std::result::Result<Vec<f32>, String> {
    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| format!("failed to read float samples: {}", e)),
        SampleFormat::Int => {
            let scale = match bits_per_sample {
                8 => 128.0,
                16 => 32768.0,
                24 => 8388608.0,
                32 => 2147483648.0,
                other => return Err(format!("unsupported {}-bit integer audio", other)),
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| format!("failed to read {}-bit samples: {}", bits_per_sample, e))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
