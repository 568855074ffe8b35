//! CLI Module
//!
//! Command-line interface for the Salvo weapon-fire loop generator.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Salvo - weapon fire loop and tail generator
#[derive(Parser, Debug)]
#[command(name = "salvo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render defaults, tails, bursts and loops into <target>/<prefix>/render
    #[command(name = "render")]
    Render {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Render one preview sequence to <target>/preview_temp.wav
    #[command(name = "preview")]
    Preview {
        /// Preview a burst instead of an auto-fire loop
        #[arg(long)]
        burst: bool,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Print peak and average level of every sample
    #[command(name = "volumes")]
    Volumes {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Write config.json for the session
    #[command(name = "save-project")]
    SaveProject {
        #[command(flatten)]
        session: SessionArgs,
    },
}

/// Samples, project and setting overrides shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Sample WAV files to load
    pub files: Vec<PathBuf>,

    /// Project config.json to start from
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Directory renders are written to
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// Name of the render set
    #[arg(long)]
    pub prefix: Option<String>,

    /// Base seed for every random draw
    #[arg(long, allow_negative_numbers = true)]
    pub seed: Option<i64>,

    /// Takes rendered per category
    #[arg(long)]
    pub variations: Option<u32>,

    /// Shots in an auto-fire loop
    #[arg(long, allow_negative_numbers = true)]
    pub fire_count: Option<i64>,

    /// Shots in a burst
    #[arg(long, allow_negative_numbers = true)]
    pub burst_count: Option<i64>,

    /// Auto-fire rate in rounds per minute
    #[arg(long, allow_negative_numbers = true)]
    pub rpm: Option<i64>,

    /// Burst rate in rounds per minute
    #[arg(long, allow_negative_numbers = true)]
    pub rpm_burst: Option<i64>,

    /// Do not normalize mixed sequences
    #[arg(long)]
    pub no_normalize: bool,

    /// Output bit depth (16, 24 or 32 float)
    #[arg(long, default_value_t = 16)]
    pub bit_depth: u16,
}
