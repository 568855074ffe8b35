//! Variation orchestration
//!
//! Renders several takes of every category (defaults, tails, bursts, loops)
//! and feeds the loudness gained by normalizing the loops back into the
//! tails and defaults, so all categories sit at a comparable level.

use std::collections::HashSet;

use log::{debug, info};
use rayon::prelude::*;

use crate::engine::AudioBuffer;
use crate::error::{Result, SalvoError};
use crate::render::mixer::mix_sequence;
use crate::render::seed::SeedSource;
use crate::render::sequence::{plan_sequence, render_sequence};
use crate::sample::WeaponFireSample;
use crate::settings::LoopSettings;

/// Compensation stops this far below full scale, in dB
pub const CLIP_MARGIN_DB: f32 = 0.01;

/// Mixed into the settings seed to start the tail seed stream
pub const TAIL_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Starting seeds of the seeded stages of a full render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSeeds {
    pub tails: u64,
    pub bursts: u64,
    pub loops: u64,
}

impl StageSeeds {
    /// Derive the stage seeds from the user-facing settings seed
    ///
    /// Bursts use the seed as is and loops use it times 1000. Tails get
    /// the seed salted with [`TAIL_SEED_SALT`], never the burst seed.
    pub fn from_setting(seed: i64) -> Self {
        let bursts = seed as u64;
        Self {
            tails: bursts ^ TAIL_SEED_SALT,
            bursts,
            loops: seed.wrapping_mul(1000) as u64,
        }
    }
}

/// Mixed takes of one sequence category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variations {
    pub buffers: Vec<AudioBuffer>,
    /// Mean normalization gain over the takes, 0 when nothing moved
    pub mean_gain_diff_db: f32,
}

/// Every category of a full render, ready to export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryRenders {
    pub defaults: Vec<AudioBuffer>,
    pub tails: Vec<AudioBuffer>,
    pub bursts: Vec<AudioBuffer>,
    pub loops: Vec<AudioBuffer>,
    /// Boost the loop takes got from normalization
    pub loop_gain_diff_db: f32,
}

/// Mean of the collected gain diffs, or 0 if their sum is not positive
pub fn mean_gain_diff(diffs: &[f32]) -> f32 {
    let sum: f32 = diffs.iter().sum();
    if sum > 0.0 {
        sum / diffs.len() as f32
    } else {
        0.0
    }
}

/// Render and mix `variations` takes of a burst or auto-fire sequence
///
/// `seed` seeds one [`SeedSource`] for the whole call. All takes are
/// planned from it in order before any rendering starts.
///
/// # Errors
/// * `EmptyLibrary` - If `samples` is empty
pub fn generate_sequences(
    samples: &[&WeaponFireSample],
    settings: &LoopSettings,
    is_burst: bool,
    seed: u64,
    variations: usize,
) -> Result<Variations> {
    if samples.is_empty() {
        return Err(SalvoError::EmptyLibrary);
    }

    let (count, rpm) = settings.count_and_rpm(is_burst);
    let kind = if is_burst { "Burst" } else { "Auto" };

    debug!("Generating {} variations - {} ...", variations, kind);
    let mut seeds = SeedSource::new(seed);
    let plans = (0..variations)
        .map(|_| plan_sequence(samples, count, &mut seeds))
        .collect::<Result<Vec<_>>>()?;

    debug!("Mixing audio - {} ...", kind);
    let results = plans
        .par_iter()
        .map(|plan| {
            let shots = render_sequence(samples, plan, settings.mono_loop);
            mix_sequence(&shots, rpm, settings.normalize)
        })
        .collect::<Result<Vec<_>>>()?;

    let diffs: Vec<f32> = results.iter().map(|r| r.gain_diff_db).collect();
    Ok(Variations {
        mean_gain_diff_db: mean_gain_diff(&diffs),
        buffers: results.into_iter().map(|r| r.buffer).collect(),
    })
}

/// `(sample index, seed)` of every tail, in output order
///
/// Each sample gets `max(variations, 1)` entries. Seeds come from one
/// [`SeedSource`] and are never handed out twice in a call.
pub fn plan_tails(sample_count: usize, variations: usize, seed: u64) -> Vec<(usize, u64)> {
    let per_sample = variations.max(1);
    let mut seeds = SeedSource::new(seed);
    let mut used = HashSet::new();

    let mut jobs = Vec::with_capacity(sample_count * per_sample);
    for index in 0..sample_count {
        for _ in 0..per_sample {
            let mut tail_seed = seeds.next_seed();
            while !used.insert(tail_seed) {
                tail_seed = seeds.next_seed();
            }
            jobs.push((index, tail_seed));
        }
    }
    jobs
}

/// Render `max(variations, 1)` tails of every sample, sample by sample
///
/// Each tail gets its own seed from [`plan_tails`].
pub fn generate_tails(
    samples: &[&WeaponFireSample],
    mono: bool,
    variations: usize,
    seed: u64,
) -> Vec<AudioBuffer> {
    plan_tails(samples.len(), variations, seed)
        .par_iter()
        .map(|&(index, seed)| samples[index].render_tail(mono, seed, false))
        .collect()
}

/// Unpitched stereo default render of every sample
pub fn render_defaults(samples: &[&WeaponFireSample]) -> Vec<AudioBuffer> {
    samples
        .par_iter()
        .map(|sample| sample.render_default(false, 0, true))
        .collect()
}

/// Gain that moves `buffer` up by `boost_db` without clipping it
pub fn compensation_gain(buffer: &AudioBuffer, boost_db: f32) -> f32 {
    (-buffer.peak_dbfs() - CLIP_MARGIN_DB).min(boost_db)
}

/// Apply [`compensation_gain`] to every buffer, if `boost_db` is positive
pub fn compensate(buffers: &mut [AudioBuffer], boost_db: f32) {
    if boost_db <= 0.0 {
        return;
    }
    buffers.par_iter_mut().for_each(|buffer| {
        let gain = compensation_gain(buffer, boost_db);
        buffer.apply_gain(gain);
    });
}

/// Render every category of a full export
///
/// Each seeded stage starts from its own [`StageSeeds`] entry. Only tails
/// and defaults are compensated. `progress` receives one status line per
/// stage.
///
/// # Errors
/// * `EmptyLibrary` - If `samples` is empty
pub fn render_all(
    samples: &[&WeaponFireSample],
    settings: &LoopSettings,
    progress: &mut dyn FnMut(&str),
) -> Result<CategoryRenders> {
    if samples.is_empty() {
        return Err(SalvoError::EmptyLibrary);
    }

    let variations = settings.variations as usize;
    let seeds = StageSeeds::from_setting(settings.seed);

    progress("Generating sounds ...");
    progress("Rendering defaults ...");
    let mut defaults = render_defaults(samples);

    progress("Rendering tails ...");
    let mut tails = generate_tails(samples, settings.mono_tail, variations, seeds.tails);

    progress("Rendering bursts ...");
    let bursts = generate_sequences(samples, settings, true, seeds.bursts, variations)?;

    progress("Rendering loops ...");
    let loops = generate_sequences(samples, settings, false, seeds.loops, variations)?;

    let boost = loops.mean_gain_diff_db;
    if boost > 0.0 {
        progress("Adjusting volumes (tails, defaults) ...");
        compensate(&mut tails, boost);
        compensate(&mut defaults, boost);
    }

    info!(
        "Rendered {} defaults, {} tails, {} bursts, {} loops (loop boost {:.2} dB)",
        defaults.len(),
        tails.len(),
        bursts.buffers.len(),
        loops.buffers.len(),
        boost
    );

    Ok(CategoryRenders {
        defaults,
        tails,
        bursts: bursts.buffers,
        loops: loops.buffers,
        loop_gain_diff_db: boost,
    })
}
