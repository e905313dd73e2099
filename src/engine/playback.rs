//! Playback engine: the clock plus an audio output driven from it
//!
//! The clock is the only source of the displayed frame. The audio output is
//! told where to be (play, pause, seek) and never read back.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::engine::clock::{ClockState, PlaybackClock};
use crate::engine::io::export_wav;
use crate::engine::time::{format_frame_label, FrameNumber, FrameRate};
use crate::error::{BeatstackError, Result};
use crate::model::song::Song;

/// Media player the engine controls
pub trait AudioOutput: Send {
    /// Load the media file at `path`, replacing whatever was loaded
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    /// Jump to `millis` from the start of the media
    fn seek(&mut self, millis: u64) -> Result<()>;
}

/// Command received by a [`SilentOutput`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCommand {
    Load(PathBuf),
    Play,
    Pause,
    Stop,
    Seek(u64),
}

/// Output that plays nothing and remembers every command it was given
///
/// Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct SilentOutput {
    history: Arc<Mutex<Vec<OutputCommand>>>,
}

impl SilentOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<OutputCommand> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, command: OutputCommand) -> Result<()> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
        Ok(())
    }
}

impl AudioOutput for SilentOutput {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.record(OutputCommand::Load(path.to_path_buf()))
    }

    fn play(&mut self) -> Result<()> {
        self.record(OutputCommand::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.record(OutputCommand::Pause)
    }

    fn stop(&mut self) -> Result<()> {
        self.record(OutputCommand::Stop)
    }

    fn seek(&mut self, millis: u64) -> Result<()> {
        self.record(OutputCommand::Seek(millis))
    }
}

/// One independent playback session (main transport or a filter preview)
pub struct PlaybackEngine {
    clock: PlaybackClock,
    output: Box<dyn AudioOutput>,
    playback_dir: PathBuf,
    rendered: Option<PathBuf>,
    frame_qty: FrameNumber,
}

impl fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("clock", &self.clock)
            .field("rendered", &self.rendered)
            .field("frame_qty", &self.frame_qty)
            .finish()
    }
}

impl PlaybackEngine {
    pub fn new(
        frame_rate: FrameRate,
        output: Box<dyn AudioOutput>,
        playback_dir: impl Into<PathBuf>,
    ) -> Self {
        PlaybackEngine {
            clock: PlaybackClock::new(frame_rate),
            output,
            playback_dir: playback_dir.into(),
            rendered: None,
            frame_qty: 0,
        }
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Register a per-frame callback on the clock
    pub fn subscribe(&self, subscriber: impl Fn(FrameNumber) + Send + 'static) {
        self.clock.subscribe(subscriber);
    }

    pub fn state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn rendered_path(&self) -> Option<&Path> {
        self.rendered.as_deref()
    }

    /// Render `song` (or its filtered copy named `filter`) to a WAV file and
    /// hand it to the output, rewinding the clock to frame 0
    pub fn load_song(&mut self, song: &Song, filter: Option<&str>) -> Result<PathBuf> {
        let samples = song.audio_source(filter)?;

        self.clock.stop();
        self.clock.reset();
        self.output.stop()?;

        fs::create_dir_all(&self.playback_dir).map_err(|e| {
            BeatstackError::DirectoryCreateError {
                path: self.playback_dir.clone(),
                source: e,
            }
        })?;
        let path = self
            .playback_dir
            .join(format!("{}-{}.wav", song.name(), Uuid::new_v4()));
        export_wav(samples, song.sample_rate(), &path)?;
        self.output.load(&path)?;

        self.discard_rendered();
        self.rendered = Some(path.clone());
        self.frame_qty = song.frame_qty();

        info!(
            "Playback source for '{}' ({}) rendered to {}",
            song.name(),
            filter.unwrap_or("original"),
            path.display()
        );
        Ok(path)
    }

    /// Start from stopped, or resume from paused
    pub fn play(&mut self) -> Result<()> {
        match self.clock.state() {
            ClockState::Stopped => {
                let millis = self.clock.frame_rate().millis_at(self.clock.current_frame());
                self.output.seek(millis)?;
                self.clock.start()?;
                self.output.play()
            }
            ClockState::Paused => {
                self.clock.resume();
                self.output.play()
            }
            ClockState::Running => Ok(()),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.clock.state() != ClockState::Running {
            return Ok(());
        }
        self.clock.pause();
        self.output.pause()
    }

    /// Back to frame 0; running playback restarts from the top
    pub fn reset(&mut self) -> Result<()> {
        self.clock.reset();
        if self.clock.state() == ClockState::Running {
            self.output.stop()?;
            self.output.play()
        } else {
            self.output.seek(0)
        }
    }

    /// Stop playback and terminate the clock thread
    pub fn stop(&mut self) -> Result<()> {
        self.clock.stop();
        self.output.stop()
    }

    /// Seek clock and audio to `frame`
    pub fn goto(&mut self, frame: FrameNumber) -> Result<()> {
        if self.rendered.is_some() && frame >= self.frame_qty {
            warn!("Cannot seek to frame {} of {}", frame, self.frame_qty);
            return Err(BeatstackError::FrameOutOfBounds {
                frame: frame as i64,
                frame_qty: self.frame_qty,
            });
        }
        self.clock.set_clock_time(frame);
        self.output.seek(self.clock.frame_rate().millis_at(frame))
    }

    /// Transport label for the current position
    pub fn time_label(&self) -> String {
        format_frame_label(self.clock.current_frame(), self.frame_qty)
    }

    fn discard_rendered(&mut self) {
        if let Some(old) = self.rendered.take() {
            if let Err(e) = fs::remove_file(&old) {
                warn!("Could not remove {}: {}", old.display(), e);
            } else {
                debug!("Removed {}", old.display());
            }
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.clock.stop();
        self.discard_rendered();
    }
}
