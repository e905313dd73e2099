//! Session: the explicit context every editing and playback component works on
//!
//! Holds all songs and their stacks, plus the "loaded" pointers naming the
//! song and stack currently being edited. Components receive the session (or
//! a stack borrowed from it) instead of reaching for global state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::{AudioAnalyzer, BeatGrid, OnsetPool};
use crate::config::Config;
use crate::engine::time::FrameRate;
use crate::error::{BeatstackError, Result};
use crate::model::event::Color;
use crate::model::song::Song;
use crate::model::stack::{InsertReport, Stack, MAX_LAYER_NAME_LEN};
use crate::state::presets::{FilterPreset, FilterProcessor};

fn default_max_layer_name_len() -> usize {
    MAX_LAYER_NAME_LEN
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    frame_rate: FrameRate,
    songs: BTreeMap<String, Song>,
    loaded_song: Option<String>,
    stacks: BTreeMap<String, Stack>,
    loaded_stack: Option<String>,
    save_path: Option<PathBuf>,
    #[serde(default)]
    onset_pool: OnsetPool,
    #[serde(skip, default = "default_max_layer_name_len")]
    max_layer_name_len: usize,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(FrameRate::default())
    }
}

impl Session {
    pub fn new(frame_rate: FrameRate) -> Self {
        Session {
            frame_rate,
            songs: BTreeMap::new(),
            loaded_song: None,
            stacks: BTreeMap::new(),
            loaded_stack: None,
            save_path: None,
            onset_pool: OnsetPool::new(),
            max_layer_name_len: MAX_LAYER_NAME_LEN,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut session = Session::new(config.frame_rate);
        session.max_layer_name_len = config.max_layer_name_len;
        session
    }

    /// Apply the configured layer-name limit to every stack, used after load
    pub fn apply_config(&mut self, config: &Config) {
        self.max_layer_name_len = config.max_layer_name_len;
        for stack in self.stacks.values_mut() {
            stack.set_max_layer_name_len(config.max_layer_name_len);
        }
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    pub fn set_save_path(&mut self, path: impl Into<PathBuf>) {
        self.save_path = Some(path.into());
    }

    // ========================================================================
    // Songs
    // ========================================================================

    /// Add a song and create its empty stack
    ///
    /// The first song added becomes the loaded one.
    pub fn add_song(&mut self, song: Song) -> Result<()> {
        let name = song.name().to_string();
        if self.songs.contains_key(&name) {
            warn!("Song '{}' is already in the session", name);
            return Err(BeatstackError::SongExists { name });
        }

        let stack =
            Stack::new(&name, song.frame_qty()).with_max_layer_name_len(self.max_layer_name_len);
        self.stacks.insert(name.clone(), stack);
        self.songs.insert(name.clone(), song);
        info!("Added song '{}'", name);

        if self.loaded_song.is_none() {
            self.load_song(&name)?;
        }
        Ok(())
    }

    /// Make `name` the loaded song and its stack the loaded stack
    pub fn load_song(&mut self, name: &str) -> Result<()> {
        if !self.songs.contains_key(name) {
            warn!("Cannot load missing song '{}'", name);
            return Err(BeatstackError::SongNotFound {
                name: name.to_string(),
            });
        }
        if !self.stacks.contains_key(name) {
            return Err(BeatstackError::StackNotFound {
                name: name.to_string(),
            });
        }
        self.loaded_song = Some(name.to_string());
        self.loaded_stack = Some(name.to_string());
        info!("Loaded song '{}'", name);
        Ok(())
    }

    pub fn song(&self, name: &str) -> Option<&Song> {
        self.songs.get(name)
    }

    pub fn songs(&self) -> impl Iterator<Item = &Song> {
        self.songs.values()
    }

    pub fn loaded_song(&self) -> Option<&Song> {
        self.loaded_song.as_deref().and_then(|name| self.songs.get(name))
    }

    pub fn loaded_song_name(&self) -> Option<&str> {
        self.loaded_song.as_deref()
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.get(name)
    }

    pub fn loaded_stack(&self) -> Option<&Stack> {
        self.loaded_stack
            .as_deref()
            .and_then(|name| self.stacks.get(name))
    }

    pub fn loaded_stack_mut(&mut self) -> Result<&mut Stack> {
        let name = self
            .loaded_stack
            .as_deref()
            .ok_or(BeatstackError::NoSongLoaded)?;
        self.stacks
            .get_mut(name)
            .ok_or_else(|| BeatstackError::StackNotFound {
                name: name.to_string(),
            })
    }

    /// Run a filter over the loaded song and keep the result under the
    /// preset's name as an alternate playback source
    pub fn apply_filter(
        &mut self,
        preset: &FilterPreset,
        processor: &dyn FilterProcessor,
    ) -> Result<()> {
        let name = self
            .loaded_song
            .clone()
            .ok_or(BeatstackError::NoSongLoaded)?;
        let song = self
            .songs
            .get_mut(&name)
            .ok_or(BeatstackError::SongNotFound { name: name.clone() })?;

        let filtered = processor.process(song.samples(), song.sample_rate(), preset)?;
        song.add_filtered_audio(&preset.filter_name, filtered);
        Ok(())
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    pub fn onset_pool(&self) -> &OnsetPool {
        &self.onset_pool
    }

    pub fn onset_pool_mut(&mut self) -> &mut OnsetPool {
        &mut self.onset_pool
    }

    /// Detect onsets in the loaded song (or its filtered copy) and store them
    /// in the onset pool, returning the pool number
    pub fn detect_onsets(
        &mut self,
        analyzer: &dyn AudioAnalyzer,
        filter: Option<&str>,
        name: Option<&str>,
    ) -> Result<u32> {
        let song = self.loaded_song().ok_or(BeatstackError::NoSongLoaded)?;
        let samples = song.audio_source(filter)?;
        let onsets = analyzer.onsets(samples, song.sample_rate(), self.frame_rate)?;
        let song_name = song.name().to_string();
        self.onset_pool
            .add(onsets, &song_name, filter, name, None)
    }

    /// Create events in `layer` of the loaded stack at the frames of onset
    /// pool item `number`
    pub fn insert_onsets(
        &mut self,
        number: u32,
        layer: &str,
        color: Option<Color>,
    ) -> Result<InsertReport> {
        let item = self
            .onset_pool
            .get(number)
            .ok_or(BeatstackError::OnsetPoolItemNotFound { number })?;
        let frames: Vec<i64> = item.frames.iter().map(|f| *f as i64).collect();
        let name = item.name.clone();
        self.loaded_stack_mut()?
            .add_events_at_frames(layer, &frames, Some(&name), color)
    }

    /// Detect beats in the loaded song and mark each one in `layer`
    pub fn insert_beats(
        &mut self,
        analyzer: &dyn AudioAnalyzer,
        layer: &str,
        color: Option<Color>,
    ) -> Result<(BeatGrid, InsertReport)> {
        let song = self.loaded_song().ok_or(BeatstackError::NoSongLoaded)?;
        let grid = analyzer.beats(song.samples(), song.sample_rate(), self.frame_rate)?;
        info!("Detected tempo {:.1} BPM, {} beats", grid.tempo_bpm, grid.beats.len());

        let frames: Vec<i64> = grid.beats.iter().map(|f| *f as i64).collect();
        let report = self
            .loaded_stack_mut()?
            .add_events_at_frames(layer, &frames, Some("beat"), color)?;
        Ok((grid, report))
    }

    /// Re-read song audio from disk after deserialization
    ///
    /// A song whose source cannot be read keeps no samples; the others still
    /// load. Returns the failures by song name.
    pub fn reload_audio(&mut self) -> Vec<(String, BeatstackError)> {
        let mut failures = Vec::new();
        for (name, song) in self.songs.iter_mut() {
            if let Err(e) = song.reload_samples() {
                warn!("Audio of song '{}' could not be reloaded: {}", name, e);
                failures.push((name.clone(), e));
            }
        }
        failures
    }

    /// Check every stack and the loaded pointers
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, stack) in &self.stacks {
            if name != stack.name() {
                return Err(format!("stack '{}' is stored under '{}'", stack.name(), name));
            }
            if !self.songs.contains_key(name) {
                return Err(format!("stack '{}' has no song", name));
            }
            stack
                .validate()
                .map_err(|reason| format!("stack '{}': {}", name, reason))?;
        }
        for name in self.songs.keys() {
            if !self.stacks.contains_key(name) {
                return Err(format!("song '{}' has no stack", name));
            }
        }
        if let Some(name) = &self.loaded_song {
            if !self.songs.contains_key(name) {
                return Err(format!("loaded song '{}' does not exist", name));
            }
        }
        if let Some(name) = &self.loaded_stack {
            if !self.stacks.contains_key(name) {
                return Err(format!("loaded stack '{}' does not exist", name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::presets::FilterType;

    fn song(name: &str, seconds: usize) -> Song {
        Song::from_samples(name, vec![0.1; 100 * seconds], 100, FrameRate::default()).unwrap()
    }

    struct Halve;

    impl FilterProcessor for Halve {
        fn process(&self, samples: &[f32], _rate: u32, _preset: &FilterPreset) -> Result<Vec<f32>> {
            Ok(samples.iter().map(|s| s * 0.5).collect())
        }
    }

    #[test]
    fn test_first_song_becomes_loaded() {
        let mut session = Session::default();
        session.add_song(song("intro", 2)).unwrap();
        session.add_song(song("outro", 3)).unwrap();

        assert_eq!(session.loaded_song_name(), Some("intro"));
        assert_eq!(session.loaded_stack().unwrap().frame_qty(), 60);
        assert_eq!(session.stack("outro").unwrap().frame_qty(), 90);
    }

    #[test]
    fn test_duplicate_song_rejected() {
        let mut session = Session::default();
        session.add_song(song("intro", 1)).unwrap();
        assert!(matches!(
            session.add_song(song("intro", 1)),
            Err(BeatstackError::SongExists { .. })
        ));
    }

    #[test]
    fn test_load_switches_stack() {
        let mut session = Session::default();
        session.add_song(song("intro", 1)).unwrap();
        session.add_song(song("outro", 1)).unwrap();
        session.load_song("outro").unwrap();
        assert_eq!(session.loaded_stack_mut().unwrap().name(), "outro");
        assert!(session.load_song("bridge").is_err());
        assert_eq!(session.loaded_song_name(), Some("outro"));
    }

    #[test]
    fn test_no_song_loaded() {
        let mut session = Session::default();
        assert!(matches!(
            session.loaded_stack_mut(),
            Err(BeatstackError::NoSongLoaded)
        ));
    }

    #[test]
    fn test_apply_filter_stores_alternate_source() {
        let mut session = Session::default();
        session.add_song(song("intro", 1)).unwrap();
        let preset = FilterPreset::new("soft", FilterType::LowPass, 800.0);

        session.apply_filter(&preset, &Halve).unwrap();

        let song = session.loaded_song().unwrap();
        let filtered = song.audio_source(Some("soft")).unwrap();
        assert!((filtered[0] - 0.05).abs() < 1e-6);
    }

    struct FixedAnalyzer;

    impl AudioAnalyzer for FixedAnalyzer {
        fn beats(&self, _: &[f32], _: u32, _: FrameRate) -> Result<BeatGrid> {
            Ok(BeatGrid {
                tempo_bpm: 120.0,
                beats: vec![0, 15, 30, 45, 60],
            })
        }

        fn onsets(&self, _: &[f32], _: u32, _: FrameRate) -> Result<Vec<u32>> {
            Ok(vec![3, 9, 27])
        }
    }

    #[test]
    fn test_onsets_through_pool() {
        let mut session = Session::default();
        session.add_song(song("intro", 2)).unwrap();
        session.loaded_stack_mut().unwrap().create_layer("onsets").unwrap();

        let number = session.detect_onsets(&FixedAnalyzer, None, None).unwrap();
        assert_eq!(number, 1);
        assert_eq!(session.onset_pool().get(1).unwrap().parent_song, "intro");

        let report = session.insert_onsets(number, "onsets", None).unwrap();
        assert_eq!(report.inserted, vec![3, 9, 27]);
        let stack = session.loaded_stack().unwrap();
        assert_eq!(stack.get_event("onsets", 9).unwrap().name(), "onset_1");
        assert!(session.insert_onsets(5, "onsets", None).is_err());
    }

    #[test]
    fn test_beats_past_end_are_skipped() {
        let mut session = Session::default();
        session.add_song(song("intro", 2)).unwrap();
        session.loaded_stack_mut().unwrap().create_layer("beats").unwrap();

        let (grid, report) = session.insert_beats(&FixedAnalyzer, "beats", None).unwrap();
        assert_eq!(grid.tempo_bpm, 120.0);
        assert_eq!(report.inserted, vec![0, 15, 30, 45]);
        assert_eq!(report.skipped, vec![60]);
    }

    #[test]
    fn test_validate_detects_dangling_pointer() {
        let mut session = Session::default();
        session.add_song(song("intro", 1)).unwrap();
        assert!(session.validate().is_ok());

        session.loaded_stack = Some("ghost".to_string());
        assert!(session.validate().is_err());
    }
}
