//! Pitch randomization
//!
//! Pitch is shifted the way a tape machine does it: the audio is played
//! back at a different speed, so a higher pitch is also a shorter sound.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::AudioBuffer;

/// Random offset in `[-spread, spread)` cents, a pure function of `seed`
///
/// A zero spread always yields 0.
pub fn random_cents(seed: u64, spread_cents: i64) -> f64 {
    let spread = spread_cents.saturating_abs();
    if spread == 0 {
        return 0.0;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let total_range = spread.saturating_mul(2);
    rng.gen_range(0..total_range) as f64 - spread as f64
}

/// Playback-rate multiplier for a shift of `cents`
#[inline]
pub fn rate_ratio(cents: f64) -> f64 {
    2.0_f64.powf(cents / 1200.0)
}

/// Shift `buffer` by `cents`, changing its length along with its pitch
///
/// The frames are relabelled with `rate * ratio` and then resampled back to
/// the original rate. The relabelled rate moves at least one Hz in the
/// direction of the shift, so a non-empty buffer always changes length.
pub fn pitch_shift(buffer: &AudioBuffer, cents: f64) -> AudioBuffer {
    let original_rate = buffer.sample_rate;
    if cents == 0.0 || original_rate == 0 {
        return buffer.clone();
    }

    let mut shifted_rate = (original_rate as f64 * rate_ratio(cents)).round().max(1.0) as u32;
    if shifted_rate == original_rate {
        shifted_rate = if cents > 0.0 {
            original_rate.saturating_add(1)
        } else {
            original_rate.saturating_sub(1).max(1)
        };
    }
    buffer.reinterpreted(shifted_rate).resampled(original_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
    use crate::engine::io::generate_test_tone;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test]
    fn test_random_cents_is_pure() {
        for seed in [0, 1, 42, 999_999_998] {
            assert_eq!(random_cents(seed, 24), random_cents(seed, 24));
        }
    }

    #[test]
    fn test_random_cents_range() {
        for seed in 0..500 {
            let cents = random_cents(seed, 24);
            assert!((-24.0..24.0).contains(&cents), "{}", cents);
            assert_eq!(cents.fract(), 0.0);
        }
    }

    #[test]
    fn test_random_cents_zero_spread() {
        assert_eq!(random_cents(7, 0), 0.0);
    }

    #[test]
    fn test_rate_ratio_octave() {
        assert_abs_diff_eq!(rate_ratio(1200.0), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rate_ratio(-1200.0), 0.5, epsilon = 1e-12);
        assert_eq!(rate_ratio(0.0), 1.0);
    }

    #[test]
    fn test_zero_cents_is_identity() {
        let tone = generate_test_tone(440.0, 0.2, DEFAULT_SAMPLE_RATE);
        let shifted = pitch_shift(&tone, 0.0);
        assert_eq!(shifted.sample_rate, tone.sample_rate);
        assert_eq!(shifted, tone);
    }

    #[test_case(1.0 ; "one cent")]
    #[test_case(24.0 ; "spread")]
    #[test_case(1200.0 ; "octave")]
    fn test_positive_cents_shortens(cents: f64) {
        let tone = generate_test_tone(440.0, 0.5, DEFAULT_SAMPLE_RATE);
        let shifted = pitch_shift(&tone, cents);
        assert_eq!(shifted.sample_rate, DEFAULT_SAMPLE_RATE);
        assert!(shifted.len() < tone.len());
    }

    #[test_case(-1.0 ; "one cent")]
    #[test_case(-24.0 ; "spread")]
    #[test_case(-1200.0 ; "octave")]
    fn test_negative_cents_lengthens(cents: f64) {
        let tone = generate_test_tone(440.0, 0.5, DEFAULT_SAMPLE_RATE);
        let shifted = pitch_shift(&tone, cents);
        assert_eq!(shifted.sample_rate, DEFAULT_SAMPLE_RATE);
        assert!(shifted.len() > tone.len());
    }

    #[test_case(1.0, 44100, 0.036 ; "one cent up, short 44.1k")]
    #[test_case(-1.0, 44100, 0.036 ; "one cent down, short 44.1k")]
    #[test_case(3.0, 44100, 0.005 ; "tiny 44.1k buffer")]
    #[test_case(1.0, 8000, 0.02 ; "one cent at 8k")]
    fn test_short_buffers_move_with_shift(cents: f64, rate: u32, secs: f32) {
        let tone = generate_test_tone(440.0, secs, rate);
        let shifted = pitch_shift(&tone, cents);
        assert_eq!(shifted.sample_rate, rate);
        if cents > 0.0 {
            assert!(shifted.len() < tone.len(), "{} -> {}", tone.len(), shifted.len());
        } else {
            assert!(shifted.len() > tone.len(), "{} -> {}", tone.len(), shifted.len());
        }
    }

    #[test]
    fn test_octave_up_halves_length() {
        let tone = generate_test_tone(440.0, 1.0, DEFAULT_SAMPLE_RATE);
        let shifted = pitch_shift(&tone, 1200.0);
        assert_eq!(shifted.len(), tone.len() / 2);
    }
}
