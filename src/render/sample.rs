//! Per-sample rendering
//!
//! Every render of a [`WeaponFireSample`] follows the same steps:
//! normalize to the sample's headroom, optionally fold to mono, shape the
//! envelope for the render kind, strip silence, and finally apply a seeded
//! random pitch shift.

use crate::engine::{fade_in, fade_out, strip_silence, AudioBuffer, SilenceParams};
use crate::render::pitch::{pitch_shift, random_cents};
use crate::sample::WeaponFireSample;

/// Seed used for level inspection renders
pub const VOLUME_PROBE_SEED: u64 = 42;

/// What a rendered shot is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderKind {
    /// The whole shot, no envelope
    Default,
    /// A shot inside an auto-fire or burst sequence, faded out early
    Loop,
    /// The decay that follows the last shot, faded in
    Tail,
}

impl RenderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderKind::Default => "default",
            RenderKind::Loop => "loop",
            RenderKind::Tail => "tail",
        }
    }
}

impl WeaponFireSample {
    /// Render this sample as `kind`
    ///
    /// # Arguments
    /// * `mono` - Fold to one channel before shaping
    /// * `seed` - Seed for the random pitch offset
    /// * `skip_pitch` - Leave pitch and length untouched
    pub fn render(&self, kind: RenderKind, mono: bool, seed: u64, skip_pitch: bool) -> AudioBuffer {
        let mut buffer = self.source().normalized(self.tuning().headroom_db.abs());
        if mono {
            buffer = buffer.to_mono();
        }

        let shaped = match kind {
            RenderKind::Default => buffer,
            RenderKind::Loop => self.shape_loop(buffer),
            RenderKind::Tail => self.shape_tail(buffer),
        };

        let stripped = strip_silence(&shaped, &SilenceParams::default());
        if skip_pitch {
            stripped
        } else {
            pitch_shift(&stripped, self.random_pitch_from_seed(seed))
        }
    }

    pub fn render_default(&self, mono: bool, seed: u64, skip_pitch: bool) -> AudioBuffer {
        self.render(RenderKind::Default, mono, seed, skip_pitch)
    }

    pub fn render_looped(&self, mono: bool, seed: u64, skip_pitch: bool) -> AudioBuffer {
        self.render(RenderKind::Loop, mono, seed, skip_pitch)
    }

    pub fn render_tail(&self, mono: bool, seed: u64, skip_pitch: bool) -> AudioBuffer {
        self.render(RenderKind::Tail, mono, seed, skip_pitch)
    }

    /// Pitch offset in cents this sample gets for `seed`
    pub fn random_pitch_from_seed(&self, seed: u64) -> f64 {
        random_cents(seed, self.tuning().rand_offset_cents)
    }

    /// (peak, average) dBFS of an unpitched default render, to 2 decimals
    pub fn get_volumes(&self, mono: bool) -> (f32, f32) {
        let render = self.render_default(mono, VOLUME_PROBE_SEED, true);
        (round2(render.peak_dbfs()), round2(render.rms_dbfs()))
    }

    fn shape_loop(&self, buffer: AudioBuffer) -> AudioBuffer {
        let tuning = self.tuning();
        if tuning.loop_fadeout_start_ms > 0 && tuning.loop_fadeout_length_ms > 0 {
            fade_out(
                &buffer,
                tuning.loop_fadeout_start_ms as f64,
                tuning.loop_fadeout_length_ms as f64,
            )
        } else {
            buffer
        }
    }

    fn shape_tail(&self, buffer: AudioBuffer) -> AudioBuffer {
        let tuning = self.tuning();
        if tuning.tail_offset_ms > 0 && tuning.tail_fadein_ms > 0 {
            // drop the first tail_offset_ms; nothing left means keep it all
            let len = buffer.len();
            let offset = buffer.ms_to_samples(tuning.tail_offset_ms as f64).min(len);
            let start = if offset == len { 0 } else { offset };
            let cropped = buffer.slice(start, len);
            fade_in(&cropped, 0.0, tuning.tail_fadein_ms as f64)
        } else {
            buffer
        }
    }
}

fn round2(db: f32) -> f32 {
    if db.is_finite() {
        (db * 100.0).round() / 100.0
    } else {
        db
    }
}
