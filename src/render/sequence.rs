//! Shot sequence generation
//!
//! A sequence is planned first, as a list of (sample, seed) draws, and only
//! then rendered. Planning is sequential and cheap; rendering is where the
//! time goes and runs in parallel.

use rand::Rng;
use rayon::prelude::*;

use crate::engine::AudioBuffer;
use crate::error::{Result, SalvoError};
use crate::render::seed::SeedSource;
use crate::sample::WeaponFireSample;

/// One planned shot: which sample fires, and the seed for its pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotDraw {
    pub sample_index: usize,
    pub seed: u64,
}

/// Index of the first solo sample, if any
pub fn solo_index(samples: &[&WeaponFireSample]) -> Option<usize> {
    samples.iter().position(|s| s.is_solo())
}

/// Plan `count` shots over `samples`
///
/// Every draw comes from a generator seeded fresh from `seeds`. A solo
/// sample replaces whatever index was drawn, but the draw itself still
/// happens so the seed stream does not shift when solo is toggled.
///
/// # Errors
/// * `EmptyLibrary` - If `samples` is empty
pub fn plan_sequence(
    samples: &[&WeaponFireSample],
    count: usize,
    seeds: &mut SeedSource,
) -> Result<Vec<ShotDraw>> {
    if samples.is_empty() {
        return Err(SalvoError::EmptyLibrary);
    }

    let solo = solo_index(samples);
    let plan = (0..count)
        .map(|_| {
            let drawn = seeds.draw().gen_range(0..samples.len());
            ShotDraw {
                sample_index: solo.unwrap_or(drawn),
                seed: seeds.next_seed(),
            }
        })
        .collect();

    Ok(plan)
}

/// Render every planned shot as a loop shot, in plan order
pub fn render_sequence(
    samples: &[&WeaponFireSample],
    plan: &[ShotDraw],
    mono: bool,
) -> Vec<AudioBuffer> {
    plan.par_iter()
        .map(|draw| samples[draw.sample_index].render_looped(mono, draw.seed, false))
        .collect()
}

/// Plan and render one sequence of `count` shots
pub fn generate_sequence(
    samples: &[&WeaponFireSample],
    count: usize,
    mono: bool,
    seeds: &mut SeedSource,
) -> Result<Vec<AudioBuffer>> {
    let plan = plan_sequence(samples, count, seeds)?;
    Ok(render_sequence(samples, &plan, mono))
}
