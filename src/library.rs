//! Sample library
//!
//! The one owned collection of loaded samples, keyed by file path. Lists
//! come out ordered by display name, then path.
//!
//! Operations that decode audio decode everything they need before touching
//! the library, so a failed decode leaves it as it was.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;

use crate::engine::{AudioBuffer, AudioCodec};
use crate::error::{Result, SalvoError};
use crate::sample::{display_name, SampleProps, SampleTuning, WeaponFireSample};

/// Loaded samples, keyed by path
#[derive(Debug, Clone, Default)]
pub struct SampleLibrary {
    samples: BTreeMap<PathBuf, WeaponFireSample>,
}

impl SampleLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.samples.contains_key(path)
    }

    /// Get a sample by path
    pub fn get(&self, path: &Path) -> Option<&WeaponFireSample> {
        self.samples.get(path)
    }

    /// All samples, ordered by name then path
    pub fn samples(&self) -> Vec<&WeaponFireSample> {
        let mut list: Vec<&WeaponFireSample> = self.samples.values().collect();
        list.sort_by(|a, b| (a.name(), a.path()).cmp(&(b.name(), b.path())));
        list
    }

    /// First sample in library order
    pub fn first(&self) -> Option<&WeaponFireSample> {
        self.samples().into_iter().next()
    }

    /// Persisted form of every sample, in library order
    pub fn props(&self) -> Vec<SampleProps> {
        self.samples().into_iter().map(|s| s.props()).collect()
    }

    /// Decode `paths` and add them with default tuning
    ///
    /// A path that is already loaded is replaced.
    ///
    /// # Errors
    /// * `DecodeFailure` - If any file fails to decode; nothing is added
    pub fn load_files(&mut self, paths: &[PathBuf], codec: &dyn AudioCodec) -> Result<usize> {
        let decoded = decode_all(paths, codec)?;
        for (path, buffer) in decoded {
            let name = display_name(&path);
            debug!("Loaded {} ({:.0} ms)", path.display(), buffer.duration_ms());
            self.update_sample(WeaponFireSample::new(buffer, path, name));
        }
        info!("Library holds {} samples", self.len());
        Ok(paths.len())
    }

    /// Insert or replace the sample stored under its path
    pub fn update_sample(&mut self, sample: WeaponFireSample) {
        self.samples.insert(sample.path().to_path_buf(), sample);
    }

    /// Remove the sample stored under `path`
    pub fn remove(&mut self, path: &Path) -> Option<WeaponFireSample> {
        self.samples.remove(path)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Replace the tuning of the sample under `path`
    ///
    /// # Errors
    /// * `SampleNotFound` - If no sample is stored under `path`
    pub fn update_tuning(&mut self, path: &Path, tuning: SampleTuning) -> Result<()> {
        let sample = self.get_mut(path)?;
        sample.set_tuning(tuning);
        Ok(())
    }

    /// Set or clear the solo flag of the sample under `path`
    ///
    /// # Errors
    /// * `SampleNotFound` - If no sample is stored under `path`
    pub fn set_solo(&mut self, path: &Path, solo: bool) -> Result<()> {
        self.get_mut(path)?.set_solo(solo);
        Ok(())
    }

    /// Re-decode every sample from its path
    ///
    /// Source audio and display name are replaced; tuning is kept.
    pub fn reload(&mut self, codec: &dyn AudioCodec) -> Result<()> {
        let paths: Vec<PathBuf> = self.samples.keys().cloned().collect();
        let decoded = decode_all(&paths, codec)?;
        for (path, buffer) in decoded {
            let name = display_name(&path);
            if let Some(sample) = self.samples.get_mut(&path) {
                sample.replace_source(buffer, name);
            }
        }
        debug!("Reloaded {} samples", paths.len());
        Ok(())
    }

    /// Move the sample under `from` to the file at `to` and load its audio
    ///
    /// # Errors
    /// * `SampleNotFound` - If no sample is stored under `from`
    /// * `DecodeFailure` - If `to` fails to decode; the library is unchanged
    pub fn change_path(&mut self, from: &Path, to: &Path, codec: &dyn AudioCodec) -> Result<()> {
        if !self.contains(from) {
            return Err(SalvoError::SampleNotFound {
                path: from.to_path_buf(),
            });
        }

        let buffer = codec.decode(to)?;
        if let Some(mut sample) = self.samples.remove(from) {
            sample.set_path(to.to_path_buf());
            sample.replace_source(buffer, display_name(to));
            self.update_sample(sample);
        }
        Ok(())
    }

    /// Replace the library with samples rebuilt from persisted properties
    ///
    /// # Errors
    /// * `DecodeFailure` - If any file fails to decode; the library is unchanged
    pub fn load_props(&mut self, props: Vec<SampleProps>, codec: &dyn AudioCodec) -> Result<()> {
        let paths: Vec<PathBuf> = props.iter().map(|p| p.path.clone()).collect();
        let decoded = decode_all(&paths, codec)?;

        self.clear();
        for (props, (_, buffer)) in props.into_iter().zip(decoded) {
            let name = display_name(&props.path);
            self.update_sample(WeaponFireSample::from_props(
                buffer,
                SampleProps { name, ..props },
            ));
        }
        Ok(())
    }

    fn get_mut(&mut self, path: &Path) -> Result<&mut WeaponFireSample> {
        self.samples
            .get_mut(path)
            .ok_or_else(|| SalvoError::SampleNotFound {
                path: path.to_path_buf(),
            })
    }
}

/// Decode every path, in order, failing on the first error
fn decode_all(paths: &[PathBuf], codec: &dyn AudioCodec) -> Result<Vec<(PathBuf, AudioBuffer)>> {
    paths
        .par_iter()
        .map(|path| codec.decode(path).map(|buffer| (path.clone(), buffer)))
        .collect()
}
