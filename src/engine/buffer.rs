//! Audio Buffer Management
//!
//! Provides the core audio buffer type for Salvo. Buffers keep the sample
//! rate of the file they were decoded from; every shaping operation returns
//! a new buffer and leaves its input untouched.

use crate::error::{Result, SalvoError};

// ============================================================================
// Constants
// ============================================================================

/// Sample rate used for generated buffers when nothing else dictates one
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Gain ratios this close to unity are treated as "already normalized"
const NORMALIZE_TOLERANCE: f32 = 1e-6;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (0.0 to 1.0+ range)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// # Arguments
/// * `linear` - Linear amplitude value
///
/// # Returns
/// Value in decibels. Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Calculate the RMS (Root Mean Square) level of an audio buffer in dBFS
///
/// All channels are pooled, so a stereo buffer reports one figure.
///
/// # Returns
/// RMS level in dB. Returns -f32::INFINITY for empty or silent buffers.
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total_samples = buffer.num_channels() * buffer.num_samples();
    if total_samples == 0 {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    let rms = (sum_squares / total_samples as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Calculate the peak level of an audio buffer in dBFS
///
/// # Returns
/// Peak level in dB. Returns -f32::INFINITY for empty or silent buffers.
pub fn calculate_peak(buffer: &AudioBuffer) -> f32 {
    linear_to_db(peak_linear(buffer))
}

fn peak_linear(buffer: &AudioBuffer) -> f32 {
    buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max)
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Core audio buffer type
///
/// Stores audio as non-interleaved 32-bit floating point samples.
/// Each channel is a separate Vec<f32>.
///
/// # Example
/// ```
/// use salvo::engine::buffer::{AudioBuffer, ChannelLayout, DEFAULT_SAMPLE_RATE};
///
/// // Create a 1-second stereo buffer
/// let buffer = AudioBuffer::new(DEFAULT_SAMPLE_RATE as usize, ChannelLayout::Stereo);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.duration_ms(), 1000.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer at the default sample rate
    ///
    /// # Arguments
    /// * `num_samples` - Number of samples per channel
    /// * `layout` - Channel configuration (Mono or Stereo)
    pub fn new(num_samples: usize, layout: ChannelLayout) -> Self {
        Self::silent(num_samples, layout.num_channels(), DEFAULT_SAMPLE_RATE)
    }

    /// Create a silent buffer with an explicit channel count and rate
    pub fn silent(num_samples: usize, num_channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels.max(1)],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel sample vectors
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `layout` - Channel configuration
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// Result containing the AudioBuffer, or error if data length doesn't match layout
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(SalvoError::UnsupportedFormat {
                format: format!(
                    "interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Alias for channels() - returns the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alias for len() - returns the number of samples per channel
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.len()
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get the duration in milliseconds
    #[inline]
    pub fn duration_ms(&self) -> f64 {
        self.duration_secs() * 1000.0
    }

    /// Number of frames covering `ms` milliseconds at this buffer's rate
    #[inline]
    pub fn ms_to_samples(&self, ms: f64) -> usize {
        (ms.max(0.0) * self.sample_rate as f64 / 1000.0).round() as usize
    }

    /// Get the channel layout
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.channels())
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get a sample at the specified channel and index
    #[inline]
    pub fn get_sample(&self, channel: usize, index: usize) -> Option<f32> {
        self.samples
            .get(channel)
            .and_then(|ch| ch.get(index).copied())
    }

    /// Peak level in dBFS (-inf for silence)
    pub fn peak_dbfs(&self) -> f32 {
        calculate_peak(self)
    }

    /// RMS level in dBFS (-inf for silence)
    pub fn rms_dbfs(&self) -> f32 {
        calculate_rms(self)
    }

    /// Copy out the frames in `[start, end)`, clamped to the buffer
    pub fn slice(&self, start: usize, end: usize) -> AudioBuffer {
        let len = self.len();
        let end = end.min(len);
        let start = start.min(end);
        AudioBuffer {
            samples: self
                .samples
                .iter()
                .map(|ch| ch[start..end].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Append another buffer to the end of this one
    ///
    /// The appended buffer is converted to this buffer's rate and channel
    /// count first.
    pub fn append(&mut self, other: &AudioBuffer) {
        let other = other.synced_to(self.sample_rate, self.channels());
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            dst.extend_from_slice(src);
        }
    }

    /// Mix `other` into this buffer starting at frame `offset`
    ///
    /// The mix is additive. Whatever extends past the end of this buffer is
    /// dropped, the length of `self` never changes.
    pub fn overlay(&mut self, other: &AudioBuffer, offset: usize) {
        let other = other.synced_to(self.sample_rate, self.channels());
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            if offset >= dst.len() {
                continue;
            }
            for (d, s) in dst[offset..].iter_mut().zip(src.iter()) {
                *d += *s;
            }
        }
    }

    /// Apply gain to all samples
    ///
    /// # Arguments
    /// * `gain_db` - Gain in decibels
    pub fn apply_gain(&mut self, gain_db: f32) {
        self.scale(db_to_linear(gain_db));
    }

    /// Copy of this buffer with `gain_db` applied
    pub fn with_gain(&self, gain_db: f32) -> AudioBuffer {
        let mut out = self.clone();
        out.apply_gain(gain_db);
        out
    }

    fn scale(&mut self, factor: f32) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample *= factor;
            }
        }
    }

    /// Scale so the peak sits `headroom_db` below full scale
    ///
    /// The sign of `headroom_db` is ignored. Silent buffers, and buffers
    /// already at the target, come back unchanged.
    pub fn normalized(&self, headroom_db: f32) -> AudioBuffer {
        let mut out = self.clone();
        let peak = peak_linear(self);
        if peak <= 0.0 {
            return out;
        }

        let gain = db_to_linear(-headroom_db.abs()) / peak;
        if (gain - 1.0).abs() > NORMALIZE_TOLERANCE {
            out.scale(gain);
        }
        out
    }

    /// Downmix to a single channel by averaging
    pub fn to_mono(&self) -> AudioBuffer {
        self.with_channels(1)
    }

    /// Convert to `count` channels
    ///
    /// Fewer channels average the existing ones; more channels duplicate
    /// the downmix.
    pub fn with_channels(&self, count: usize) -> AudioBuffer {
        let count = count.max(1);
        if count == self.channels() {
            return self.clone();
        }

        let num_channels = self.channels().max(1) as f32;
        let mixed: Vec<f32> = (0..self.len())
            .map(|i| self.samples.iter().map(|ch| ch[i]).sum::<f32>() / num_channels)
            .collect();

        AudioBuffer {
            samples: vec![mixed; count],
            sample_rate: self.sample_rate,
        }
    }

    /// Same frames, relabelled with a different sample rate
    ///
    /// Nothing is resampled: played back, the audio runs faster or slower.
    pub fn reinterpreted(&self, sample_rate: u32) -> AudioBuffer {
        AudioBuffer {
            samples: self.samples.clone(),
            sample_rate,
        }
    }

    /// Resample to `target_rate` with linear interpolation
    pub fn resampled(&self, target_rate: u32) -> AudioBuffer {
        if target_rate == self.sample_rate || self.sample_rate == 0 || target_rate == 0 {
            return self.clone();
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        AudioBuffer {
            samples: self
                .samples
                .iter()
                .map(|channel| resample_linear(channel, ratio))
                .collect(),
            sample_rate: target_rate,
        }
    }

    /// Convert to the given rate and channel count, if not already there
    pub fn synced_to(&self, sample_rate: u32, num_channels: usize) -> AudioBuffer {
        let resampled = if sample_rate == self.sample_rate {
            self.clone()
        } else {
            self.resampled(sample_rate)
        };
        resampled.with_channels(num_channels)
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(0, ChannelLayout::Stereo)
    }
}

/// Linear interpolation resampling
///
/// Produces `floor(len * ratio)` frames when downsampling and
/// `ceil(len * ratio)` when upsampling, so any ratio other than 1 changes
/// the length.
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    // tolerance keeps whole-number lengths whole despite float error
    let exact_len = (source_len as f64) * ratio;
    let target_len = if ratio < 1.0 {
        (exact_len + 1e-9).floor() as usize
    } else {
        (exact_len - 1e-9).ceil() as usize
    };
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        // Map output index to source position
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // Helper to create a buffer with known content
    fn create_test_buffer(samples: Vec<Vec<f32>>) -> AudioBuffer {
        AudioBuffer::from_channels(samples, DEFAULT_SAMPLE_RATE)
    }

    // ------------------------------------------------------------------------
    // Unit conversion tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_db_to_linear() {
        assert_abs_diff_eq!(db_to_linear(0.0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(db_to_linear(-6.0206), 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(db_to_linear(-20.0), 0.1, epsilon = 1e-6);
        assert!(db_to_linear(-120.0) < 1e-5);
    }

    #[test]
    fn test_linear_to_db() {
        assert_abs_diff_eq!(linear_to_db(1.0), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(linear_to_db(0.5), -6.0206, epsilon = 1e-3);
        assert!(linear_to_db(0.0).is_infinite() && linear_to_db(0.0).is_sign_negative());
    }

    // ------------------------------------------------------------------------
    // Level tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_calculate_rms_unity() {
        // DC signal at 1.0 should have RMS of 1.0 = 0 dB
        let buffer = create_test_buffer(vec![vec![1.0; 1000]]);
        assert_abs_diff_eq!(calculate_rms(&buffer), 0.0, epsilon = 0.01);
    }

    #[test]
    fn test_calculate_rms_empty() {
        let buffer = create_test_buffer(vec![vec![]]);
        let rms = calculate_rms(&buffer);
        assert!(rms.is_infinite() && rms.is_sign_negative());
    }

    #[test]
    fn test_calculate_peak_negative() {
        let mut samples = vec![0.0; 1000];
        samples[500] = -0.5;
        let buffer = create_test_buffer(vec![samples]);
        assert_abs_diff_eq!(buffer.peak_dbfs(), -6.02, epsilon = 0.01);
    }

    #[test]
    fn test_calculate_peak_silence() {
        let buffer = create_test_buffer(vec![vec![0.0; 1000]]);
        let peak = buffer.peak_dbfs();
        assert!(peak.is_infinite() && peak.is_sign_negative());
    }

    // ------------------------------------------------------------------------
    // ChannelLayout tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_channel_layout() {
        assert_eq!(ChannelLayout::Mono.num_channels(), 1);
        assert_eq!(ChannelLayout::Stereo.num_channels(), 2);
        assert_eq!(ChannelLayout::from_count(2), Some(ChannelLayout::Stereo));
        assert_eq!(ChannelLayout::from_count(6), None);
    }

    // ------------------------------------------------------------------------
    // AudioBuffer tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_buffer_duration() {
        let buffer = AudioBuffer::new(DEFAULT_SAMPLE_RATE as usize / 2, ChannelLayout::Mono);
        assert_abs_diff_eq!(buffer.duration_ms(), 500.0, epsilon = 1e-9);
        assert_eq!(buffer.ms_to_samples(100.0), 4800);
    }

    #[test]
    fn test_buffer_from_interleaved_stereo() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let buffer =
            AudioBuffer::from_interleaved(&interleaved, ChannelLayout::Stereo, DEFAULT_SAMPLE_RATE)
                .unwrap();

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.get_sample(0, 1), Some(0.3));
        assert_eq!(buffer.get_sample(1, 1), Some(0.4));
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_buffer_from_interleaved_invalid() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let result =
            AudioBuffer::from_interleaved(&interleaved, ChannelLayout::Stereo, DEFAULT_SAMPLE_RATE);
        assert!(result.is_err());
    }

    #[test]
    fn test_slice_is_clamped() {
        let buffer = create_test_buffer(vec![vec![0.1, 0.2, 0.3, 0.4]]);
        assert_eq!(buffer.slice(1, 3).channel(0), &[0.2, 0.3]);
        assert_eq!(buffer.slice(2, 100).channel(0), &[0.3, 0.4]);
        assert!(buffer.slice(10, 20).is_empty());
    }

    #[test]
    fn test_overlay_is_additive_and_truncated() {
        let mut canvas = create_test_buffer(vec![vec![0.25; 4]]);
        let shot = create_test_buffer(vec![vec![0.5; 4]]);
        canvas.overlay(&shot, 2);

        assert_eq!(canvas.len(), 4);
        assert_eq!(canvas.channel(0), &[0.25, 0.25, 0.75, 0.75]);
    }

    #[test]
    fn test_overlay_upmixes_mono_shot() {
        let mut canvas = AudioBuffer::new(4, ChannelLayout::Stereo);
        let shot = create_test_buffer(vec![vec![0.5; 2]]);
        canvas.overlay(&shot, 0);
        assert_eq!(canvas.channel(1), &[0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_append() {
        let mut a = create_test_buffer(vec![vec![0.1, 0.2]]);
        a.append(&create_test_buffer(vec![vec![0.3]]));
        assert_eq!(a.channel(0), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_apply_gain() {
        let buffer = create_test_buffer(vec![vec![0.5; 100]]);
        let quieter = buffer.with_gain(-6.0206);
        assert_abs_diff_eq!(quieter.get_sample(0, 0).unwrap(), 0.25, epsilon = 0.001);
        // input untouched
        assert_eq!(buffer.get_sample(0, 0), Some(0.5));
    }

    #[test]
    fn test_normalized_hits_headroom() {
        let buffer = create_test_buffer(vec![vec![0.1, -0.2, 0.05]]);
        let normalized = buffer.normalized(6.0);
        assert_abs_diff_eq!(normalized.peak_dbfs(), -6.0, epsilon = 1e-4);

        // sign of the headroom does not matter
        let negative = buffer.normalized(-6.0);
        assert_abs_diff_eq!(negative.peak_dbfs(), -6.0, epsilon = 1e-4);
    }

    #[test]
    fn test_normalized_twice_is_unchanged() {
        let buffer = create_test_buffer(vec![vec![0.1, -0.3, 0.2]]);
        let once = buffer.normalized(0.1);
        let twice = once.normalized(0.1);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalized_silence_is_noop() {
        let buffer = create_test_buffer(vec![vec![0.0; 10]]);
        assert_eq!(buffer.normalized(3.0), buffer);
    }

    #[test]
    fn test_to_mono_averages() {
        let buffer = create_test_buffer(vec![vec![1.0, 0.0], vec![0.0, 0.5]]);
        let mono = buffer.to_mono();
        assert_eq!(mono.channels(), 1);
        assert_eq!(mono.channel(0), &[0.5, 0.25]);
    }

    #[test]
    fn test_resample_lengths() {
        let buffer = create_test_buffer(vec![vec![0.0; 4800]]);
        assert_eq!(buffer.resampled(24000).len(), 2400);
        assert_eq!(buffer.resampled(96000).len(), 9600);
        assert_eq!(buffer.resampled(DEFAULT_SAMPLE_RATE).len(), 4800);
    }

    #[test]
    fn test_resample_length_follows_ratio() {
        // 1588 frames; ceil would keep the downsampled length unchanged
        let samples = vec![0.25; 1588];
        assert_eq!(resample_linear(&samples, 44100.0 / 44125.0).len(), 1587);
        assert_eq!(resample_linear(&samples, 44100.0 / 44074.0).len(), 1589);
        assert_eq!(resample_linear(&samples, 1.0).len(), 1588);
        assert_eq!(resample_linear(&vec![0.0; 4800], 44100.0 / 48000.0).len(), 4410);
    }

    #[test]
    fn test_resample_linear_interpolates() {
        let resampled = resample_linear(&[0.0, 1.0, 0.0], 2.0);
        assert_eq!(resampled.len(), 6);
        assert_abs_diff_eq!(resampled[1], 0.5, epsilon = 0.01);
    }
}
