//! Audio Engine Module
//!
//! Audio primitives the renderer is built on:
//! - Audio buffer management
//! - Fades and silence stripping
//! - File I/O operations

pub mod buffer;
pub mod envelope;
pub mod io;

pub use buffer::{AudioBuffer, ChannelLayout, DEFAULT_SAMPLE_RATE};
pub use envelope::{fade, fade_in, fade_out, strip_silence, SilenceParams, SILENCE_DB};
pub use io::{
    export_audio, generate_stereo_test_tone, generate_test_tone, import_audio, AudioCodec,
    ExportFormat, MemoryCodec, WavCodec,
};
