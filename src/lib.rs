//! Salvo - Weapon Fire Loop Generator
//!
//! Builds game weapon sounds from a handful of recorded shots: single shots,
//! auto-fire loops, bursts and fire tails, each in several variations.
//!
//! # Architecture
//!
//! - `engine`: audio buffers, envelopes, silence stripping and WAV I/O
//! - `sample`/`library`: source shots, their tuning, and the loaded set
//! - `render`: per-shot rendering, sequencing, mixing and variations
//! - `generator`: the session a front end drives, including full export
//!
//! Every random decision is a pure function of an explicit seed, so a render
//! is reproducible from the settings alone and safe to run in parallel.

pub mod cli;
pub mod engine;
pub mod error;
pub mod generator;
pub mod library;
pub mod project;
pub mod render;
pub mod sample;
pub mod settings;

pub use engine::{AudioBuffer, AudioCodec, ExportFormat, MemoryCodec, WavCodec};
pub use error::{Result, SalvoError};
pub use generator::{LogSink, LoopGenerator};
pub use library::SampleLibrary;
pub use project::ProjectDocument;
pub use render::{RenderKind, RenderResult, SeedSource, Variations};
pub use sample::{SampleProps, SampleTuning, WeaponFireSample};
pub use settings::LoopSettings;
