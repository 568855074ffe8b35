//! Seeded draws
//!
//! Every random decision in a render is made by a generator built fresh
//! from an explicit seed. A [`SeedSource`] hands those seeds out in a fixed
//! order, so a whole run is reproducible from one integer and independent
//! of the order in which the work is later executed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-shot seeds are drawn from `[0, SHOT_SEED_RANGE)`
pub const SHOT_SEED_RANGE: u64 = 999_999_999;

/// Deterministic supplier of per-draw generators
#[derive(Debug, Clone)]
pub struct SeedSource {
    rng: StdRng,
}

impl SeedSource {
    /// Start a source from a base seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Start a source from a user-facing (possibly negative) seed setting
    pub fn from_setting(seed: i64) -> Self {
        Self::new(seed as u64)
    }

    /// Next seed in `[0, SHOT_SEED_RANGE)`
    pub fn next_seed(&mut self) -> u64 {
        self.rng.gen_range(0..SHOT_SEED_RANGE)
    }

    /// A fresh generator for exactly one draw
    pub fn draw(&mut self) -> StdRng {
        StdRng::seed_from_u64(self.next_seed())
    }
}
