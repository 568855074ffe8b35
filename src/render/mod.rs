//! Rendering core
//!
//! Per-sample rendering, pitch randomization, sequence planning, mixing and
//! the variation pipeline that ties them together.

pub mod mixer;
pub mod pitch;
pub mod sample;
pub mod seed;
pub mod sequence;
pub mod variations;

pub use mixer::{mix_sequence, normalize_with_diff, time_between_ms, RenderResult, MIX_HEADROOM_DB};
pub use pitch::{pitch_shift, random_cents, rate_ratio};
pub use sample::RenderKind;
pub use seed::{SeedSource, SHOT_SEED_RANGE};
pub use sequence::{generate_sequence, plan_sequence, render_sequence, ShotDraw};
pub use variations::{
    compensate, compensation_gain, generate_sequences, generate_tails, mean_gain_diff, plan_tails,
    render_all, render_defaults, CategoryRenders, StageSeeds, Variations, TAIL_SEED_SALT,
};
