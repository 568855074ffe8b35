//! Salvo CLI - Weapon Fire Loop Generator
//!
//! Command-line interface for the Salvo loop generator.

use clap::Parser;
use env_logger::Env;
use log::info;

use salvo::cli::{commands, Cli, Commands};
use salvo::Result;

fn main() {
    let cli = Cli::parse();

    // Initialize logger
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("Salvo v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Salvo v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error [{}]: {}", e.error_code(), e);
        for suggestion in e.recovery_suggestions() {
            eprintln!("  - {}", suggestion);
        }
        std::process::exit(1);
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Render { session } => commands::render(&session),
        Commands::Preview { burst, session } => commands::preview(&session, burst),
        Commands::Volumes { session } => commands::volumes(&session),
        Commands::SaveProject { session } => commands::save_project(&session),
    }
}
