//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::cli::SessionArgs;
use crate::engine::{ExportFormat, WavCodec};
use crate::error::Result;
use crate::generator::LoopGenerator;
use crate::settings::LoopSettings;

/// Build a session from a project, sample files and overrides, in that order
pub fn build_session(args: &SessionArgs) -> Result<LoopGenerator> {
    let codec = WavCodec::new(ExportFormat::new(args.bit_depth));
    let mut generator = LoopGenerator::with_codec(Box::new(codec));

    if let Some(project) = &args.project {
        info!("Importing project: {}", project.display());
        generator.import_project(project)?;
    }

    let files = expand_sample_paths(&args.files);
    if !files.is_empty() {
        generator.open_files(&files)?;
    }

    apply_overrides(generator.settings_mut(), args);
    Ok(generator)
}

/// Replace every directory argument with the WAV files directly inside it
///
/// Files are passed through as given; files found in a directory come out
/// sorted by name.
pub fn expand_sample_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut expanded = Vec::new();
    for path in paths {
        if !path.is_dir() {
            expanded.push(path.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_wav(entry.path()))
            .map(|entry| entry.path().to_path_buf())
            .collect();
        found.sort();

        debug!("Found {} samples in {}", found.len(), path.display());
        expanded.extend(found);
    }
    expanded
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Apply command-line overrides on top of loaded settings
pub fn apply_overrides(settings: &mut LoopSettings, args: &SessionArgs) {
    if let Some(target) = &args.target {
        settings.target_path = target.clone();
    }
    if let Some(prefix) = &args.prefix {
        settings.prefix = prefix.clone();
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if let Some(variations) = args.variations {
        settings.variations = variations;
    }
    if let Some(count) = args.fire_count {
        settings.set_fire_count(count);
    }
    if let Some(count) = args.burst_count {
        settings.set_burst_count(count);
    }
    if let Some(rpm) = args.rpm {
        settings.set_rpm(rpm);
    }
    if let Some(rpm) = args.rpm_burst {
        settings.set_rpm_burst(rpm);
    }
    if args.no_normalize {
        settings.normalize = false;
    }
}

/// Run a full export.
pub fn render(args: &SessionArgs) -> Result<()> {
    let mut generator = build_session(args)?;
    let written = generator.export_all()?;

    println!(
        "Rendered {} files to {}",
        written.len(),
        generator.settings().output_dir().display()
    );
    Ok(())
}

/// Render and write a preview sequence.
pub fn preview(args: &SessionArgs, burst: bool) -> Result<()> {
    let mut generator = build_session(args)?;
    if burst {
        generator.render_preview_burst()?;
    } else {
        generator.render_preview_loop()?;
    }

    match generator.export_preview()? {
        Some(path) => println!("Preview written: {}", path.display()),
        None => println!("No samples loaded, nothing to preview"),
    }
    Ok(())
}

/// Print peak and average levels.
pub fn volumes(args: &SessionArgs) -> Result<()> {
    let generator = build_session(args)?;

    println!("{:<32} {:>10} {:>10}", "Sample", "Peak dB", "Avg dB");
    for (name, peak, average) in generator.get_volumes() {
        println!("{:<32} {:>10.2} {:>10.2}", name, peak, average);
    }
    Ok(())
}

/// Save the session's project document.
pub fn save_project(args: &SessionArgs) -> Result<()> {
    let generator = build_session(args)?;
    let path = generator.export_project()?;

    println!("Project saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::engine::io::{export_audio, generate_test_tone};
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_parse_render_overrides() {
        let cli = Cli::try_parse_from([
            "salvo", "render", "a.wav", "b.wav", "--prefix", "smg", "--seed", "-3", "--rpm", "0",
            "--no-normalize",
        ])
        .unwrap();

        let Some(Commands::Render { session }) = cli.command else {
            panic!("Expected render command");
        };
        assert_eq!(session.files, vec![PathBuf::from("a.wav"), PathBuf::from("b.wav")]);

        let mut settings = LoopSettings::default();
        apply_overrides(&mut settings, &session);
        assert_eq!(settings.prefix, "smg");
        assert_eq!(settings.seed, -3);
        assert_eq!(settings.rpm(), 1);
        assert!(!settings.normalize);
        assert_eq!(settings.fire_count(), 31);
    }

    #[test]
    fn test_parse_preview_burst() {
        let cli = Cli::try_parse_from(["salvo", "-v", "preview", "--burst"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Preview { burst: true, .. })));
    }

    #[test]
    fn test_expand_sample_paths() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.wav"), "").unwrap();
        std::fs::write(dir.path().join("a.WAV"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.wav"), "").unwrap();

        let expanded = expand_sample_paths(&[PathBuf::from("loose.wav"), dir.path().to_path_buf()]);
        assert_eq!(
            expanded,
            vec![
                PathBuf::from("loose.wav"),
                dir.path().join("a.WAV"),
                dir.path().join("b.wav"),
            ]
        );
    }

    #[test]
    fn test_save_project_from_files() {
        let dir = tempdir().unwrap();
        let sample = dir.path().join("shot.wav");
        export_audio(
            &generate_test_tone(440.0, 0.3, 48000),
            &sample,
            ExportFormat::default(),
        )
        .unwrap();

        let args = SessionArgs {
            files: vec![sample],
            target: Some(dir.path().to_path_buf()),
            prefix: Some("pistol".to_string()),
            bit_depth: 16,
            ..SessionArgs::default()
        };
        save_project(&args).unwrap();

        assert!(dir.path().join("pistol").join("config.json").exists());
    }
}
