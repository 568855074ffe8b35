//! Sequence mixing
//!
//! Shots are laid on a silent canvas at a fixed spacing derived from the
//! rate of fire and summed. The canvas ends exactly where the last shot
//! ends; earlier shots that ring past it are cut.

use log::debug;

use crate::engine::AudioBuffer;
use crate::error::{Result, SalvoError};

/// Headroom a normalized mix keeps below full scale, in dB
pub const MIX_HEADROOM_DB: f32 = 0.1;

/// A mixed buffer and how far normalization moved its peak
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub buffer: AudioBuffer,
    /// `|peak_before - peak_after|` in dB, 0 when not normalized
    pub gain_diff_db: f32,
}

/// Milliseconds between two shots at `rpm` rounds per minute, rounded up
pub fn time_between_ms(rpm: u32) -> u64 {
    let rpm = rpm.max(1) as u64;
    (60_000 + rpm - 1) / rpm
}

/// Normalize to the mix ceiling and report the peak movement
pub fn normalize_with_diff(buffer: &AudioBuffer) -> RenderResult {
    let before = buffer.peak_dbfs();
    let normalized = buffer.normalized(MIX_HEADROOM_DB);
    let after = normalized.peak_dbfs();

    let gain_diff_db = if before.is_finite() && after.is_finite() {
        (before - after).abs()
    } else {
        0.0
    };

    RenderResult {
        buffer: normalized,
        gain_diff_db,
    }
}

/// Overlay `shots` at the spacing of `rpm` and optionally normalize
///
/// The canvas takes the highest sample rate and channel count among the
/// shots. Its length is `(count - 1) * time_between_ms(rpm)` plus the
/// length of the last shot.
///
/// # Errors
/// * `EmptySequence` - If `shots` is empty
pub fn mix_sequence(shots: &[AudioBuffer], rpm: u32, normalize: bool) -> Result<RenderResult> {
    let last = shots.last().ok_or(SalvoError::EmptySequence)?;

    let sample_rate = shots.iter().map(|s| s.sample_rate).max().unwrap_or_default();
    let channels = shots.iter().map(|s| s.channels()).max().unwrap_or(1);
    let spacing_ms = time_between_ms(rpm);

    let offset_of = |index: usize| -> usize {
        let ms = index as u64 * spacing_ms;
        (ms as f64 * sample_rate as f64 / 1000.0).round() as usize
    };

    let last_len = last.synced_to(sample_rate, channels).len();
    let total = offset_of(shots.len() - 1) + last_len;
    let mut canvas = AudioBuffer::silent(total, channels, sample_rate);

    for (index, shot) in shots.iter().enumerate() {
        canvas.overlay(shot, offset_of(index));
    }

    debug!(
        "Mixed {} shots at {} ms spacing into {:.1} ms",
        shots.len(),
        spacing_ms,
        canvas.duration_ms()
    );

    if normalize {
        Ok(normalize_with_diff(&canvas))
    } else {
        Ok(RenderResult {
            buffer: canvas,
            gain_diff_db: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
    use crate::engine::io::{generate_stereo_test_tone, generate_test_tone};
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test_case(600, 100 ; "even")]
    #[test_case(800, 75 ; "exact")]
    #[test_case(900, 67 ; "rounds up")]
    #[test_case(0, 60_000 ; "clamped")]
    #[test_case(1, 60_000 ; "one per minute")]
    fn test_time_between(rpm: u32, expected: u64) {
        assert_eq!(time_between_ms(rpm), expected);
    }

    #[test]
    fn test_mix_length() {
        let shot = generate_test_tone(440.0, 0.25, DEFAULT_SAMPLE_RATE);
        let shots = vec![shot.clone(); 5];

        let result = mix_sequence(&shots, 900, false).unwrap();
        // 4 * 67 ms + 250 ms
        assert_eq!(result.buffer.len(), 4 * 3216 + 12000);
        assert_eq!(result.gain_diff_db, 0.0);
    }

    #[test]
    fn test_single_shot_is_its_own_length() {
        let shot = generate_test_tone(440.0, 0.3, DEFAULT_SAMPLE_RATE);
        let result = mix_sequence(std::slice::from_ref(&shot), 600, false).unwrap();
        assert_eq!(result.buffer, shot);
    }

    #[test]
    fn test_overlay_is_additive() {
        let dc = AudioBuffer::from_channels(vec![vec![0.25; 4800]], DEFAULT_SAMPLE_RATE);
        // 60 000 rpm puts every shot at the same millisecond boundary
        let result = mix_sequence(&[dc.clone(), dc.clone()], 60_000, false).unwrap();

        assert_eq!(result.buffer.len(), 48 + 4800);
        assert_abs_diff_eq!(result.buffer.get_sample(0, 0).unwrap(), 0.25);
        assert_abs_diff_eq!(result.buffer.get_sample(0, 100).unwrap(), 0.5);
    }

    #[test]
    fn test_canvas_takes_widest_layout() {
        let mono = generate_test_tone(440.0, 0.1, DEFAULT_SAMPLE_RATE);
        let stereo = generate_stereo_test_tone(440.0, 660.0, 0.1, DEFAULT_SAMPLE_RATE);

        let result = mix_sequence(&[stereo, mono], 600, false).unwrap();
        assert_eq!(result.buffer.channels(), 2);
        assert_eq!(result.buffer.len(), 4800 + 4800);
    }

    #[test]
    fn test_normalize_reports_diff_once() {
        let quiet = generate_test_tone(440.0, 0.2, DEFAULT_SAMPLE_RATE).with_gain(-12.0);
        let first = mix_sequence(&[quiet], 600, true).unwrap();

        assert_abs_diff_eq!(first.buffer.peak_dbfs(), -MIX_HEADROOM_DB, epsilon = 0.001);
        assert_abs_diff_eq!(first.gain_diff_db, 12.0 - MIX_HEADROOM_DB, epsilon = 0.01);

        let second = normalize_with_diff(&first.buffer);
        assert_eq!(second.gain_diff_db, 0.0);
        assert_eq!(second.buffer, first.buffer);
    }

    #[test]
    fn test_silent_mix_does_not_normalize() {
        let silence = AudioBuffer::silent(4800, 1, DEFAULT_SAMPLE_RATE);
        let result = mix_sequence(&[silence.clone()], 600, true).unwrap();
        assert_eq!(result.gain_diff_db, 0.0);
        assert_eq!(result.buffer, silence);
    }

    #[test]
    fn test_empty_sequence() {
        assert!(matches!(
            mix_sequence(&[], 600, true),
            Err(SalvoError::EmptySequence)
        ));
    }
}
