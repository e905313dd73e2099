//! Filter presets
//!
//! A preset names a filter, its type and cutoff. Presets are stored one per
//! file as `<dir>/<filter_name>.json`. The filter math itself lives outside
//! this crate, behind [`FilterProcessor`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{BeatstackError, Result};
use crate::model::song::is_safe_name;

const PRESET_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    #[serde(rename = "Low-pass")]
    LowPass,
    #[serde(rename = "High-pass")]
    HighPass,
    #[serde(rename = "Band-pass")]
    BandPass,
    #[serde(rename = "Band-stop")]
    BandStop,
    Butterworth,
    #[serde(rename = "Chebyshev I")]
    ChebyshevI,
    #[serde(rename = "Chebyshev II")]
    ChebyshevII,
    Elliptic,
    Bessel,
}

impl FilterType {
    pub const ALL: [FilterType; 9] = [
        FilterType::LowPass,
        FilterType::HighPass,
        FilterType::BandPass,
        FilterType::BandStop,
        FilterType::Butterworth,
        FilterType::ChebyshevI,
        FilterType::ChebyshevII,
        FilterType::Elliptic,
        FilterType::Bessel,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterType::LowPass => "Low-pass",
            FilterType::HighPass => "High-pass",
            FilterType::BandPass => "Band-pass",
            FilterType::BandStop => "Band-stop",
            FilterType::Butterworth => "Butterworth",
            FilterType::ChebyshevI => "Chebyshev I",
            FilterType::ChebyshevII => "Chebyshev II",
            FilterType::Elliptic => "Elliptic",
            FilterType::Bessel => "Bessel",
        }
    }

    /// Parse a display label, ignoring case
    pub fn from_label(label: &str) -> Option<Self> {
        FilterType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub filter_name: String,
    pub filter_type: FilterType,
    /// Cutoff in Hz
    pub cutoff_frequency: f64,
}

impl FilterPreset {
    pub fn new(filter_name: &str, filter_type: FilterType, cutoff_frequency: f64) -> Self {
        FilterPreset {
            filter_name: filter_name.to_string(),
            filter_type,
            cutoff_frequency,
        }
    }
}

/// Applies a filter preset to mono samples
pub trait FilterProcessor {
    fn process(&self, samples: &[f32], sample_rate: u32, preset: &FilterPreset)
        -> Result<Vec<f32>>;
}

/// Directory of preset files
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PresetStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the preset `filter_name`; names that could leave the
    /// directory are refused
    fn preset_path(&self, filter_name: &str) -> Result<PathBuf> {
        if !is_safe_name(filter_name) {
            return Err(BeatstackError::InvalidPresetName {
                name: filter_name.to_string(),
            });
        }
        Ok(self
            .dir
            .join(format!("{}.{}", filter_name, PRESET_EXTENSION)))
    }

    /// Write `preset`, replacing a preset with the same name
    pub fn save(&self, preset: &FilterPreset) -> Result<PathBuf> {
        let path = self.preset_path(&preset.filter_name)?;

        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| BeatstackError::DirectoryCreateError {
                path: self.dir.clone(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(preset)?;
        fs::write(&path, content).map_err(|e| BeatstackError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;

        info!("Saved filter preset '{}'", preset.filter_name);
        Ok(path)
    }

    pub fn load(&self, filter_name: &str) -> Result<FilterPreset> {
        let path = self.preset_path(filter_name)?;
        if !path.exists() {
            return Err(BeatstackError::PresetNotFound { path });
        }

        let content = fs::read_to_string(&path).map_err(|e| BeatstackError::FileReadError {
            path: path.clone(),
            source: e,
        })?;
        let preset: FilterPreset = serde_json::from_str(&content)?;
        debug!("Loaded filter preset '{}'", filter_name);
        Ok(preset)
    }

    /// Names of all stored presets, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some(PRESET_EXTENSION)
            })
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .collect();

        names.sort();
        Ok(names)
    }

    pub fn delete(&self, filter_name: &str) -> Result<()> {
        let path = self.preset_path(filter_name)?;
        if !path.exists() {
            return Err(BeatstackError::PresetNotFound { path });
        }
        fs::remove_file(&path).map_err(|e| BeatstackError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;
        info!("Deleted filter preset '{}'", filter_name);
        Ok(())
    }
}
