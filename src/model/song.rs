//! Song: decoded audio plus the frame span its stack is built on

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::io::import_wav;
use crate::engine::time::{duration_secs, FrameNumber, FrameRate};
use crate::error::{BeatstackError, Result};

/// Letters, digits, spaces, hyphens and underscores only; safe as a file stem
pub(crate) fn is_safe_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ')
}

/// Check a song name
pub fn validate_song_name(name: &str) -> Result<()> {
    if !is_safe_name(name) {
        warn!("Rejected song name '{}'", name);
        return Err(BeatstackError::InvalidSongName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    name: String,
    /// Source WAV, if the song came from disk
    path: Option<PathBuf>,
    source_sha256: Option<String>,
    sample_rate: u32,
    sample_count: usize,
    frame_qty: FrameNumber,

    #[serde(skip)]
    samples: Vec<f32>,
    /// Filtered versions of `samples`, keyed by filter name
    #[serde(skip)]
    filtered: BTreeMap<String, Vec<f32>>,
}

impl Song {
    /// Build a song from mono samples already in memory
    pub fn from_samples(
        name: &str,
        samples: Vec<f32>,
        sample_rate: u32,
        frame_rate: FrameRate,
    ) -> Result<Self> {
        validate_song_name(name)?;
        if samples.is_empty() {
            return Err(BeatstackError::EmptyAudio);
        }

        let frame_qty = frame_rate.frame_qty(duration_secs(samples.len(), sample_rate));
        Ok(Song {
            name: name.to_string(),
            path: None,
            source_sha256: None,
            sample_rate,
            sample_count: samples.len(),
            frame_qty,
            samples,
            filtered: BTreeMap::new(),
        })
    }

    /// Read a WAV file, down-mixed to mono
    pub fn from_wav(path: &Path, name: &str, frame_rate: FrameRate) -> Result<Self> {
        validate_song_name(name)?;
        let audio = import_wav(path)?;
        let mut song = Song::from_samples(name, audio.samples, audio.sample_rate, frame_rate)?;
        song.path = Some(path.to_path_buf());
        song.source_sha256 = Some(hash_file(path)?);

        info!(
            "Loaded song '{}' from {}: {:.2}s at {} Hz, {} frames",
            name,
            path.display(),
            song.duration_secs(),
            song.sample_rate,
            song.frame_qty
        );
        Ok(song)
    }

    /// Re-read the samples of a deserialized song from its source file
    ///
    /// A changed source file is reported but still loaded. Songs without a
    /// source path keep whatever samples they hold.
    pub fn reload_samples(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let audio = import_wav(&path)?;
        let hash = hash_file(&path)?;
        if self.source_sha256.as_deref() != Some(hash.as_str()) {
            warn!(
                "Source of song '{}' changed since it was saved: {}",
                self.name,
                path.display()
            );
        }
        if audio.samples.len() != self.sample_count || audio.sample_rate != self.sample_rate {
            warn!(
                "Song '{}' now has {} samples at {} Hz (saved: {} at {} Hz)",
                self.name,
                audio.samples.len(),
                audio.sample_rate,
                self.sample_count,
                self.sample_rate
            );
        }

        self.samples = audio.samples;
        self.sample_rate = audio.sample_rate;
        self.source_sha256 = Some(hash);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn source_sha256(&self) -> Option<&str> {
        self.source_sha256.as_deref()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frame_qty(&self) -> FrameNumber {
        self.frame_qty
    }

    pub fn duration_secs(&self) -> f64 {
        duration_secs(self.sample_count, self.sample_rate)
    }

    /// Waveform x coordinates on the frame axis
    pub fn frame_axis(&self, frame_rate: FrameRate) -> Vec<f64> {
        frame_rate.frame_axis(self.samples.len(), self.sample_rate)
    }

    /// Store a processed copy of the audio under `filter_name`, replacing any
    /// earlier one with that name
    pub fn add_filtered_audio(&mut self, filter_name: &str, samples: Vec<f32>) {
        info!("Stored filtered audio '{}' on song '{}'", filter_name, self.name);
        self.filtered.insert(filter_name.to_string(), samples);
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filtered.keys().map(String::as_str)
    }

    /// Samples to play: the original, or the named filtered copy
    pub fn audio_source(&self, filter_name: Option<&str>) -> Result<&[f32]> {
        match filter_name {
            None => Ok(&self.samples),
            Some(filter) => self
                .filtered
                .get(filter)
                .map(Vec::as_slice)
                .ok_or_else(|| BeatstackError::FilterNotFound {
                    song: self.name.clone(),
                    filter: filter.to_string(),
                }),
        }
    }
}

fn hash_file(path: &Path) -> Result<String> {
    let content = fs::read(path).map_err(|e| BeatstackError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(format!("{:x}", Sha256::digest(&content)))
}
