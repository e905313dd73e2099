//! CLI Command Implementations
//!
//! Each project command loads the project file, applies one change to the
//! loaded stack and writes the file back.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use log::info;

use crate::config::Config;
use crate::engine::{format_frame_label, FrameNumber, PlaybackEngine, SilentOutput};
use crate::error::{BeatstackError, Result};
use crate::model::{Color, Session, Song, Stack};
use crate::state::{load_project, save_project, FilterPreset, FilterType, PresetStore};

fn open(project: &Path, config: &Config) -> Result<Session> {
    let mut session = load_project(project)?;
    session.apply_config(config);
    Ok(session)
}

/// Load, apply `change` to the loaded stack, save
fn update_stack<T>(
    project: &Path,
    config: &Config,
    change: impl FnOnce(&mut Stack) -> Result<T>,
) -> Result<T> {
    let mut session = open(project, config)?;
    let result = change(session.loaded_stack_mut()?)?;
    save_project(&mut session, project)?;
    Ok(result)
}

/// Create an empty project file.
pub fn new_project(path: &Path, config: &Config) -> Result<()> {
    info!("Creating project at: {}", path.display());
    let mut session = Session::from_config(config);
    save_project(&mut session, path)?;
    println!("Project created: {}", path.display());
    Ok(())
}

/// Import a WAV file as a new song.
pub fn add_song(project: &Path, wav: &Path, name: Option<&str>, config: &Config) -> Result<()> {
    let mut session = open(project, config)?;
    let name = match name {
        Some(name) => name.to_string(),
        None => wav
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default(),
    };

    let song = Song::from_wav(wav, &name, session.frame_rate())?;
    let frame_qty = song.frame_qty();
    session.add_song(song)?;
    save_project(&mut session, project)?;

    println!("Added song '{}' ({} frames)", name, frame_qty);
    Ok(())
}

pub fn select_song(project: &Path, name: &str, config: &Config) -> Result<()> {
    let mut session = open(project, config)?;
    session.load_song(name)?;
    save_project(&mut session, project)?;
    println!("Loaded song: {}", name);
    Ok(())
}

pub fn add_layer(project: &Path, name: &str, config: &Config) -> Result<()> {
    let number = update_stack(project, config, |stack| stack.create_layer(name))?;
    println!("Created layer '{}' (#{})", name, number);
    Ok(())
}

pub fn remove_layer(project: &Path, name: &str, config: &Config) -> Result<()> {
    let layer = update_stack(project, config, |stack| stack.remove_layer(name))?;
    println!("Removed layer '{}' with {} events", name, layer.len());
    Ok(())
}

pub fn add_event(
    project: &Path,
    layer: &str,
    frame: FrameNumber,
    name: Option<&str>,
    color: Option<Color>,
    config: &Config,
) -> Result<()> {
    let id = update_stack(project, config, |stack| {
        stack.add_event(layer, frame, color, name)
    })?;
    println!("Added event {} at frame {} in '{}'", id, frame, layer);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn add_series(
    project: &Path,
    layer: &str,
    start: FrameNumber,
    qty: u32,
    spacing: u32,
    name: Option<&str>,
    color: Option<Color>,
    config: &Config,
) -> Result<()> {
    let report = update_stack(project, config, |stack| {
        stack.add_event_series(layer, start, qty, spacing, name, color)
    })?;
    println!("Inserted {} events in '{}'", report.inserted.len(), layer);
    if !report.skipped.is_empty() {
        println!("Skipped frames: {:?}", report.skipped);
    }
    Ok(())
}

pub fn delete_event(project: &Path, layer: &str, frame: FrameNumber, config: &Config) -> Result<()> {
    let event = update_stack(project, config, |stack| stack.delete_event(layer, frame))?;
    println!("Deleted '{}' at frame {} in '{}'", event.name(), frame, layer);
    Ok(())
}

pub fn nudge(
    project: &Path,
    layer: &str,
    frame: FrameNumber,
    delta: i64,
    config: &Config,
) -> Result<()> {
    let new_frame = update_stack(project, config, |stack| {
        stack.nudge_event(layer, frame, delta)
    })?;
    println!("Moved event in '{}': {} -> {}", layer, frame, new_frame);
    Ok(())
}

pub fn move_event(
    project: &Path,
    layer: &str,
    from: FrameNumber,
    to: FrameNumber,
    config: &Config,
) -> Result<()> {
    update_stack(project, config, |stack| stack.move_event(layer, from, to))?;
    println!("Moved event in '{}': {} -> {}", layer, from, to);
    Ok(())
}

pub fn change_layer(
    project: &Path,
    from_layer: &str,
    to_layer: &str,
    frame: FrameNumber,
    config: &Config,
) -> Result<()> {
    update_stack(project, config, |stack| {
        stack.change_event_layer(from_layer, to_layer, frame)
    })?;
    println!("Moved event at frame {}: '{}' -> '{}'", frame, from_layer, to_layer);
    Ok(())
}

/// Print songs, the loaded stack and its events.
pub fn print_state(project: &Path, config: &Config) -> Result<()> {
    let session = open(project, config)?;

    println!("Project: {}", project.display());
    println!("Frame rate: {}", session.frame_rate());
    println!();

    println!("=== Songs ===");
    for song in session.songs() {
        let marker = if session.loaded_song_name() == Some(song.name()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {} ({:.2}s, {} Hz, {} frames)",
            marker,
            song.name(),
            song.duration_secs(),
            song.sample_rate(),
            song.frame_qty()
        );
    }

    let Some(stack) = session.loaded_stack() else {
        println!();
        println!("No song loaded");
        return Ok(());
    };

    println!();
    println!("=== Stack '{}' ===", stack.name());
    for layer in stack.layers_ordered() {
        println!("[{}] {} ({} events)", layer.layer_number(), layer.name(), layer.len());
        for event in layer.events() {
            println!(
                "    {:>6}  {:<20} {}",
                event.frame_number(),
                event.name(),
                event.color()
            );
        }
    }

    let pool = session.onset_pool();
    if !pool.is_empty() {
        println!();
        println!("=== Onset pool ===");
        for item in pool.items() {
            println!(
                "#{} {} ({} onsets from '{}')",
                item.number,
                item.name,
                item.frames.len(),
                item.parent_song
            );
        }
    }

    Ok(())
}

/// Run the playback clock over the loaded song, printing the position once a
/// second.
pub fn play(
    project: &Path,
    seconds: f64,
    from: FrameNumber,
    config: &Config,
) -> Result<()> {
    let session = open(project, config)?;
    let song = session.loaded_song().ok_or(BeatstackError::NoSongLoaded)?;
    let duration = Duration::try_from_secs_f64(seconds)
        .map_err(|_| BeatstackError::InvalidDuration { seconds })?;
    let frame_rate = session.frame_rate();
    let frame_qty = song.frame_qty();

    let mut engine = PlaybackEngine::new(
        frame_rate,
        Box::new(SilentOutput::new()),
        &config.playback_dir,
    );
    engine.load_song(song, None)?;

    let fps = frame_rate.fps();
    let last_second = AtomicU32::new(u32::MAX);
    engine.subscribe(move |frame| {
        let second = frame / fps;
        if last_second.swap(second, Ordering::Relaxed) != second {
            println!("{}", format_frame_label(frame, frame_qty));
        }
    });

    engine.goto(from)?;
    info!("Playing '{}' from frame {} for {:.2}s", song.name(), from, seconds);
    engine.play()?;
    thread::sleep(duration);
    engine.pause()?;

    println!("Stopped at {}", engine.time_label());
    engine.stop()?;
    Ok(())
}

pub fn save_preset(name: &str, filter_type: FilterType, cutoff: f64, config: &Config) -> Result<()> {
    let store = PresetStore::new(&config.filters_dir);
    let path = store.save(&FilterPreset::new(name, filter_type, cutoff))?;
    println!("Saved preset '{}' to {}", name, path.display());
    Ok(())
}

pub fn list_presets(config: &Config) -> Result<()> {
    let store = PresetStore::new(&config.filters_dir);
    let names = store.list()?;
    if names.is_empty() {
        println!("No presets in {}", store.dir().display());
        return Ok(());
    }
    for name in names {
        let preset = store.load(&name)?;
        println!(
            "{}: {} at {} Hz",
            preset.filter_name, preset.filter_type, preset.cutoff_frequency
        );
    }
    Ok(())
}

pub fn delete_preset(name: &str, config: &Config) -> Result<()> {
    PresetStore::new(&config.filters_dir).delete(name)?;
    println!("Deleted preset '{}'", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{export_wav, generate_test_tone};
    use tempfile::tempdir;

    fn project_with_song(dir: &Path) -> (std::path::PathBuf, Config) {
        let config = Config {
            filters_dir: dir.join("filters"),
            playback_dir: dir.join("playback"),
            ..Config::default()
        };
        let wav = dir.join("groove.wav");
        let tone = generate_test_tone(110.0, 2.0, 8000);
        export_wav(&tone.samples, tone.sample_rate, &wav).unwrap();

        let project = dir.join("groove.json");
        new_project(&project, &config).unwrap();
        add_song(&project, &wav, None, &config).unwrap();
        (project, config)
    }

    #[test]
    fn test_edit_commands_persist() {
        let dir = tempdir().unwrap();
        let (project, config) = project_with_song(dir.path());

        add_layer(&project, "kick", &config).unwrap();
        add_layer(&project, "snare", &config).unwrap();
        add_event(&project, "kick", 10, Some("K"), None, &config).unwrap();
        nudge(&project, "kick", 10, 5, &config).unwrap();
        change_layer(&project, "kick", "snare", 15, &config).unwrap();

        let session = load_project(&project).unwrap();
        let stack = session.loaded_stack().unwrap();
        assert_eq!(stack.name(), "groove");
        assert!(stack.get_event("kick", 15).is_none());
        assert_eq!(stack.get_event("snare", 15).unwrap().name(), "K");
    }

    #[test]
    fn test_failed_edit_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let (project, config) = project_with_song(dir.path());
        add_layer(&project, "kick", &config).unwrap();
        add_event(&project, "kick", 10, None, None, &config).unwrap();
        let before = std::fs::read_to_string(&project).unwrap();

        let err = add_event(&project, "kick", 10, None, None, &config).unwrap_err();
        assert!(matches!(err, BeatstackError::FrameOccupied { .. }));
        assert_eq!(std::fs::read_to_string(&project).unwrap(), before);
    }

    #[test]
    fn test_series_and_delete() {
        let dir = tempdir().unwrap();
        let (project, config) = project_with_song(dir.path());
        add_layer(&project, "hat", &config).unwrap();
        // 2 s at 30 fps is 60 frames, so frame 64 is skipped
        add_series(&project, "hat", 0, 9, 8, None, None, &config).unwrap();
        delete_event(&project, "hat", 8, &config).unwrap();

        let session = load_project(&project).unwrap();
        let frames: Vec<_> = session
            .loaded_stack()
            .unwrap()
            .layer("hat")
            .unwrap()
            .frames()
            .collect();
        assert_eq!(frames, vec![0, 16, 24, 32, 40, 48, 56]);
    }

    #[test]
    fn test_play_without_song() {
        let dir = tempdir().unwrap();
        let config = Config {
            playback_dir: dir.path().join("playback"),
            ..Config::default()
        };
        let project = dir.path().join("empty.json");
        new_project(&project, &config).unwrap();
        assert!(matches!(
            play(&project, 0.0, 0, &config),
            Err(BeatstackError::NoSongLoaded)
        ));
    }

    #[test]
    fn test_play_short() {
        let dir = tempdir().unwrap();
        let (project, config) = project_with_song(dir.path());
        play(&project, 0.05, 30, &config).unwrap();
        assert!(play(&project, 0.0, 60, &config).is_err());
    }

    #[test]
    fn test_play_rejects_unusable_durations() {
        let dir = tempdir().unwrap();
        let (project, config) = project_with_song(dir.path());
        for seconds in [f64::INFINITY, f64::NAN, 1e30, -1.0] {
            assert!(matches!(
                play(&project, seconds, 0, &config),
                Err(BeatstackError::InvalidDuration { .. })
            ));
        }
    }

    #[test]
    fn test_preset_commands() {
        let dir = tempdir().unwrap();
        let config = Config {
            filters_dir: dir.path().join("filters"),
            ..Config::default()
        };
        save_preset("lows", FilterType::LowPass, 150.0, &config).unwrap();
        list_presets(&config).unwrap();
        delete_preset("lows", &config).unwrap();
        assert!(delete_preset("lows", &config).is_err());
    }
}
