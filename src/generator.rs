//! Loop generator session
//!
//! [`LoopGenerator`] is what a front end talks to: it holds the library,
//! the loop settings, the selected sample, a properties clipboard and the
//! last preview, and runs the full export. Progress lines go both to the
//! `log` facade and to a caller-supplied [`LogSink`].

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use rand::Rng;

use crate::engine::{AudioBuffer, AudioCodec};
use crate::error::{Result, SalvoError};
use crate::library::SampleLibrary;
use crate::project::{ensure_dir, ProjectDocument};
use crate::render::variations::{generate_sequences, generate_tails, render_all};
use crate::render::{Variations, SHOT_SEED_RANGE};
use crate::sample::{SampleTuning, WeaponFireSample};
use crate::settings::LoopSettings;

/// Receives one-line progress messages
pub type LogSink = Box<dyn FnMut(&str) + Send>;

/// Width progress paths are shortened to
pub const LOG_PATH_WIDTH: usize = 44;

/// Characters kept from the start of a shortened path
pub const LOG_PATH_HEAD: usize = 5;

/// Name of the preview file written into the target directory
pub const PREVIEW_FILE_STEM: &str = "preview_temp";

/// Subdirectory of `<target>/<prefix>` exports are written to
pub const RENDER_DIR: &str = "render";

/// Shorten `text` to its first `head` characters, `...`, and its tail
///
/// Text of at most `max_width` characters is returned as is.
pub fn prevent_overflow(text: &str, max_width: usize, head: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_width {
        return text.to_string();
    }

    let tail_len = max_width.saturating_sub(head);
    let start: String = chars[..head.min(chars.len())].iter().collect();
    let end: String = chars[chars.len() - tail_len.min(chars.len())..].iter().collect();
    format!("{}...{}", start, end)
}

/// Stateful front-end session
pub struct LoopGenerator {
    settings: LoopSettings,
    library: SampleLibrary,
    codec: Box<dyn AudioCodec>,
    current_sample: Option<PathBuf>,
    clipboard: Option<SampleTuning>,
    current_preview: Option<AudioBuffer>,
    sink: LogSink,
}

impl LoopGenerator {
    /// Create a session with default settings that reports to `sink`
    pub fn new(codec: Box<dyn AudioCodec>, sink: LogSink) -> Self {
        Self {
            settings: LoopSettings::default(),
            library: SampleLibrary::new(),
            codec,
            current_sample: None,
            clipboard: None,
            current_preview: None,
            sink,
        }
    }

    /// Create a session whose progress only goes to the `log` facade
    pub fn with_codec(codec: Box<dyn AudioCodec>) -> Self {
        Self::new(codec, Box::new(|_: &str| {}))
    }

    fn log(&mut self, text: &str) {
        info!("{}", text);
        (self.sink)(text);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut LoopSettings {
        &mut self.settings
    }

    pub fn library(&self) -> &SampleLibrary {
        &self.library
    }

    pub fn current_sample(&self) -> Option<&WeaponFireSample> {
        self.current_sample
            .as_deref()
            .and_then(|path| self.library.get(path))
    }

    pub fn clipboard(&self) -> Option<&SampleTuning> {
        self.clipboard.as_ref()
    }

    pub fn current_preview(&self) -> Option<&AudioBuffer> {
        self.current_preview.as_ref()
    }

    pub fn set_loop_settings(&mut self, settings: LoopSettings) {
        self.settings = settings;
    }

    pub fn set_target_directory(&mut self, path: impl Into<PathBuf>) {
        self.settings.target_path = path.into();
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// Load samples; the first one in library order becomes current
    pub fn open_files(&mut self, paths: &[PathBuf]) -> Result<()> {
        self.library.load_files(paths, self.codec.as_ref())?;
        self.select_first();
        Ok(())
    }

    /// Select the sample stored under `path`
    ///
    /// # Errors
    /// * `SampleNotFound` - If the library has no such sample
    pub fn set_current_sample(&mut self, path: &Path) -> Result<()> {
        if !self.library.contains(path) {
            return Err(SalvoError::SampleNotFound {
                path: path.to_path_buf(),
            });
        }
        self.current_sample = Some(path.to_path_buf());
        Ok(())
    }

    /// Drop the current sample from the library; nothing is selected after
    pub fn remove_current_sample(&mut self) {
        if let Some(path) = self.current_sample.take() {
            self.library.remove(&path);
        }
    }

    /// Replace the current sample's tuning
    pub fn set_current_tuning(&mut self, tuning: SampleTuning) -> Result<()> {
        match self.current_sample.clone() {
            Some(path) => {
                self.library.update_tuning(&path, tuning)?;
                self.current_preview = None;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Remember the current sample's tuning
    pub fn copy_current_sample_props(&mut self) {
        if let Some(sample) = self.current_sample() {
            self.clipboard = Some(*sample.tuning());
        }
    }

    /// Apply the remembered tuning to the current sample
    ///
    /// The tuning is clamped against the current sample's audio and the
    /// cached preview is dropped.
    pub fn paste_current_sample_props(&mut self) -> Result<()> {
        match self.clipboard {
            Some(tuning) => self.set_current_tuning(tuning),
            None => Ok(()),
        }
    }

    /// Point the current sample at another file and load it
    pub fn change_path_current_sample(&mut self, path: &Path) -> Result<()> {
        if let Some(current) = self.current_sample.clone() {
            self.library.change_path(&current, path, self.codec.as_ref())?;
            self.current_sample = Some(path.to_path_buf());
            self.current_preview = None;
        }
        Ok(())
    }

    /// Re-decode every sample from disk
    pub fn reload_samples(&mut self) -> Result<()> {
        self.log("Reloading samples ...");
        self.library.reload(self.codec.as_ref())?;
        self.select_first();
        self.current_preview = None;
        self.log("Ready");
        Ok(())
    }

    fn select_first(&mut self) {
        if let Some(first) = self.library.first() {
            self.current_sample = Some(first.path().to_path_buf());
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Mix `variations` takes of a burst or auto-fire sequence
    pub fn generate_sequences(&self, is_burst: bool, seed: u64, variations: usize) -> Result<Variations> {
        generate_sequences(&self.library.samples(), &self.settings, is_burst, seed, variations)
    }

    /// Render `max(variations, 1)` tails per sample
    pub fn generate_tails(&self, variations: usize, seed: u64) -> Vec<AudioBuffer> {
        generate_tails(&self.library.samples(), self.settings.mono_tail, variations, seed)
    }

    /// Render one burst with the settings seed as the current preview
    pub fn render_preview_burst(&mut self) -> Result<()> {
        self.render_preview(true)
    }

    /// Render one auto-fire loop with the settings seed as the current preview
    pub fn render_preview_loop(&mut self) -> Result<()> {
        self.render_preview(false)
    }

    fn render_preview(&mut self, is_burst: bool) -> Result<()> {
        if self.library.is_empty() {
            return Ok(());
        }

        let kind = if is_burst { "burst" } else { "loop" };
        self.log(&format!("Rendering preview {} ...", kind));
        let mut takes = self.generate_sequences(is_burst, self.settings.seed as u64, 1)?;
        self.current_preview = takes.buffers.pop();
        self.log("Ready");
        Ok(())
    }

    /// Loop render of the current sample with a fresh random seed
    pub fn render_current_loop_sample(&self) -> Option<AudioBuffer> {
        let sample = self.current_sample()?;
        Some(sample.render_looped(self.settings.mono_loop, random_seed(), false))
    }

    /// Tail render of the current sample with a fresh random seed
    pub fn render_current_tail_sample(&self) -> Option<AudioBuffer> {
        let sample = self.current_sample()?;
        Some(sample.render_tail(self.settings.mono_tail, random_seed(), false))
    }

    /// Write the current preview to `<target>/preview_temp.wav`
    pub fn export_preview(&mut self) -> Result<Option<PathBuf>> {
        let Some(preview) = self.current_preview.clone() else {
            return Ok(None);
        };

        let target = self.settings.target_path.clone();
        ensure_dir(&target)?;
        let path = self.export_buffer(&target, &preview, PREVIEW_FILE_STEM)?;
        Ok(Some(path))
    }

    // ========================================================================
    // Projects
    // ========================================================================

    /// Replace settings and library from a `config.json`
    pub fn import_project(&mut self, path: &Path) -> Result<()> {
        let document = ProjectDocument::load(path)?;
        self.library
            .load_props(document.sample_props, self.codec.as_ref())?;
        self.settings = document.loop_settings;
        self.current_sample = None;
        self.current_preview = None;
        self.select_first();
        Ok(())
    }

    /// Save settings and sample properties to `<target>/<prefix>/config.json`
    pub fn export_project(&self) -> Result<PathBuf> {
        let document = ProjectDocument {
            loop_settings: self.settings.clone(),
            sample_props: self.library.props(),
        };
        document.save(&self.settings.output_dir())
    }

    /// Render every category and write it to `<target>/<prefix>/render/`
    ///
    /// The render directory is cleared first. Files already written stay in
    /// place if a later one fails.
    pub fn export_all(&mut self) -> Result<Vec<PathBuf>> {
        let project_dir = self.settings.output_dir();
        ensure_dir(&project_dir)?;

        let render_dir = project_dir.join(RENDER_DIR);
        if render_dir.is_dir() {
            fs::remove_dir_all(&render_dir).map_err(|e| SalvoError::FileWriteError {
                path: render_dir.clone(),
                source: e,
            })?;
        }
        ensure_dir(&render_dir)?;

        let samples = self.library.samples();
        let sink = &mut self.sink;
        let renders = render_all(&samples, &self.settings, &mut |line: &str| {
            info!("{}", line);
            sink(line);
        })?;

        self.log("Exporting files ...");
        let prefix = self.settings.prefix.clone();
        let categories = [
            ("defaults", "default", &renders.defaults),
            ("tails", "tail", &renders.tails),
            ("bursts", "burst", &renders.bursts),
            ("loops", "loop", &renders.loops),
        ];

        let mut written = Vec::new();
        for (label, kind, buffers) in categories {
            self.log(&format!("Exporting {} ...", label));
            for (index, buffer) in buffers.iter().enumerate() {
                let stem = format!("{}_{}_{}", prefix, kind, index);
                written.push(self.export_buffer(&render_dir, buffer, &stem)?);
            }
        }

        self.log("Ready");
        Ok(written)
    }

    /// Peak and average dBFS of every sample's default render
    pub fn get_volumes(&self) -> Vec<(String, f32, f32)> {
        self.library
            .samples()
            .into_iter()
            .map(|sample| {
                let (peak, average) = sample.get_volumes(false);
                (sample.name().to_string(), peak, average)
            })
            .collect()
    }

    fn export_buffer(&mut self, dir: &Path, buffer: &AudioBuffer, stem: &str) -> Result<PathBuf> {
        let path = dir.join(format!("{}.wav", stem));
        self.codec.encode(buffer, &path)?;
        let shown = prevent_overflow(&path.display().to_string(), LOG_PATH_WIDTH, LOG_PATH_HEAD);
        self.log(&format!("Exported: {}", shown));
        Ok(path)
    }
}

fn random_seed() -> u64 {
    rand::thread_rng().gen_range(0..SHOT_SEED_RANGE)
}
