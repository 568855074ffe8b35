//! Envelope shaping
//!
//! Gain ramps and silence stripping. Levels are measured on all channels
//! pooled together.

use super::buffer::{db_to_linear, AudioBuffer};

/// Level treated as "no signal" by fades (-120 dB)
pub const SILENCE_DB: f32 = -120.0;

/// Silence stripping parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceParams {
    /// Shortest run of quiet audio that counts as silence, in ms
    pub min_silence_ms: f64,
    /// Level below which a window is quiet, in dBFS
    pub threshold_db: f32,
    /// Audio kept around each non-silent span, in ms
    pub padding_ms: f64,
}

impl Default for SilenceParams {
    fn default() -> Self {
        Self {
            min_silence_ms: 111.0,
            threshold_db: -72.0,
            padding_ms: 100.0,
        }
    }
}

/// Ramp the gain from `from_db` to `to_db` over `[start_ms, start_ms + duration_ms)`
///
/// The ramp is linear in amplitude. Audio before the ramp is untouched,
/// audio after it keeps the `to_db` gain.
pub fn fade(
    buffer: &AudioBuffer,
    from_db: f32,
    to_db: f32,
    start_ms: f64,
    duration_ms: f64,
) -> AudioBuffer {
    let mut out = buffer.clone();
    let len = out.len();
    let start = out.ms_to_samples(start_ms).min(len);
    let end = (start + out.ms_to_samples(duration_ms)).min(len);
    let span = end - start;

    let from = db_to_linear(from_db);
    let to = db_to_linear(to_db);
    let step = if span > 0 { (to - from) / span as f32 } else { 0.0 };

    for channel in out.samples.iter_mut() {
        for (i, sample) in channel[start..end].iter_mut().enumerate() {
            *sample *= from + step * i as f32;
        }
        for sample in channel[end..].iter_mut() {
            *sample *= to;
        }
    }

    out
}

/// Fade from silence up to unity gain
pub fn fade_in(buffer: &AudioBuffer, start_ms: f64, duration_ms: f64) -> AudioBuffer {
    fade(buffer, SILENCE_DB, 0.0, start_ms, duration_ms)
}

/// Fade from unity gain down to silence
pub fn fade_out(buffer: &AudioBuffer, start_ms: f64, duration_ms: f64) -> AudioBuffer {
    fade(buffer, 0.0, SILENCE_DB, start_ms, duration_ms)
}

/// Find the spans of `buffer` that are not silent, as `[start, end)` frames
///
/// A sliding window of `min_silence_ms` advances 1 ms at a time; windows
/// whose RMS falls below the threshold are quiet, and runs of quiet windows
/// form the silent spans. Buffers shorter than the window are never silent.
pub fn detect_nonsilent(buffer: &AudioBuffer, params: &SilenceParams) -> Vec<(usize, usize)> {
    let len = buffer.len();
    let window = buffer.ms_to_samples(params.min_silence_ms);
    if len == 0 {
        return Vec::new();
    }
    if window == 0 || len < window {
        return vec![(0, len)];
    }

    // Prefix sums of squared samples, all channels pooled
    let mut energy = Vec::with_capacity(len + 1);
    energy.push(0.0_f64);
    let mut acc = 0.0_f64;
    for i in 0..len {
        for channel in &buffer.samples {
            let s = channel[i] as f64;
            acc += s * s;
        }
        energy.push(acc);
    }

    let threshold = db_to_linear(params.threshold_db) as f64;
    let denom = (window * buffer.channels().max(1)) as f64;
    let is_quiet = |start: usize| {
        let rms = ((energy[start + window] - energy[start]) / denom).sqrt();
        rms < threshold
    };

    let seek = buffer.ms_to_samples(1.0).max(1);
    let last_start = len - window;
    let mut starts: Vec<usize> = (0..=last_start).step_by(seek).collect();
    if starts.last() != Some(&last_start) {
        starts.push(last_start);
    }

    let mut silent: Vec<(usize, usize)> = Vec::new();
    for start in starts.into_iter().filter(|&s| is_quiet(s)) {
        match silent.last_mut() {
            Some((_, end)) if start <= *end => *end = start + window,
            _ => silent.push((start, start + window)),
        }
    }

    let mut nonsilent = Vec::new();
    let mut cursor = 0;
    for (start, end) in silent {
        if start > cursor {
            nonsilent.push((cursor, start));
        }
        cursor = end;
    }
    if cursor < len {
        nonsilent.push((cursor, len));
    }

    nonsilent
}

/// Remove silence from the edges of `buffer` and collapse long interior gaps
///
/// Non-silent spans keep `padding_ms` of context on each side. Spans whose
/// padding overlaps are merged; the rest are joined with a crossfade of half
/// the padding. All-silent input strips to an empty buffer.
pub fn strip_silence(buffer: &AudioBuffer, params: &SilenceParams) -> AudioBuffer {
    let len = buffer.len();
    let pad = buffer.ms_to_samples(params.padding_ms);

    let mut chunks: Vec<(usize, usize)> = Vec::new();
    for (start, end) in detect_nonsilent(buffer, params) {
        let start = start.saturating_sub(pad);
        let end = (end + pad).min(len);
        match chunks.last_mut() {
            Some((_, prev_end)) if start <= *prev_end => *prev_end = end,
            _ => chunks.push((start, end)),
        }
    }

    let mut iter = chunks.into_iter();
    let Some((start, end)) = iter.next() else {
        return buffer.slice(0, 0);
    };

    let crossfade = pad / 2;
    iter.fold(buffer.slice(start, end), |joined, (start, end)| {
        append_crossfade(&joined, &buffer.slice(start, end), crossfade)
    })
}

/// Join two buffers, overlapping the last `crossfade` frames of `a` with the
/// first frames of `b`
///
/// The crossfade shrinks to fit whichever buffer is shorter.
pub fn append_crossfade(a: &AudioBuffer, b: &AudioBuffer, crossfade: usize) -> AudioBuffer {
    let b = b.synced_to(a.sample_rate, a.channels());
    let xf = crossfade.min(a.len()).min(b.len());

    let mut out = a.slice(0, a.len() - xf);
    if xf > 0 {
        let span_ms = xf as f64 * 1000.0 / a.sample_rate.max(1) as f64;
        let mut overlap = fade_out(&a.slice(a.len() - xf, a.len()), 0.0, span_ms);
        overlap.overlay(&fade_in(&b.slice(0, xf), 0.0, span_ms), 0);
        out.append(&overlap);
    }
    out.append(&b.slice(xf, b.len()));
    out
}
