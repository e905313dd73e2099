//! Error handling for Beatstack
//!
//! Every rejection names the offending layer, frame, song or path so the
//! caller can surface it to the user verbatim.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::time::FrameNumber;

/// Result type alias for Beatstack operations
pub type Result<T> = std::result::Result<T, BeatstackError>;

/// Broad classification of an error, used by callers to pick a dialog style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The operation would break a model invariant and was not applied
    Structural,
    /// Something that was asked for does not exist
    LookupMiss,
    /// Loading failed and nothing was installed
    Fatal,
    /// Filesystem or audio I/O failure
    Io,
}

/// Main error type for Beatstack operations
#[derive(Error, Debug)]
pub enum BeatstackError {
    // Structural violations
    #[error("Frame {frame} is already occupied in layer '{layer}'")]
    FrameOccupied { layer: String, frame: FrameNumber },

    #[error("Frame {frame} is outside the timeline (0..{frame_qty})")]
    FrameOutOfBounds { frame: i64, frame_qty: FrameNumber },

    #[error("Layer already exists: '{name}'")]
    LayerExists { name: String },

    #[error("Invalid layer name '{name}': {reason}")]
    InvalidLayerName { name: String, reason: String },

    #[error("Invalid song name '{name}': use only letters, numbers, spaces, hyphens and underscores")]
    InvalidSongName { name: String },

    #[error("Invalid filter preset name '{name}': use only letters, numbers, spaces, hyphens and underscores")]
    InvalidPresetName { name: String },

    #[error("Song already exists: '{name}'")]
    SongExists { name: String },

    #[error("Invalid color '{value}': expected #rrggbb")]
    InvalidColor { value: String },

    #[error("Invalid frame rate: {fps} (must be greater than zero)")]
    InvalidFrameRate { fps: u32 },

    #[error("Onset pool number {number} is already in use")]
    PoolNumberTaken { number: u32 },

    #[error("Invalid duration: {seconds} seconds")]
    InvalidDuration { seconds: f64 },

    // Lookup misses
    #[error("Layer not found: '{name}'")]
    LayerNotFound { name: String },

    #[error("No event at frame {frame} in layer '{layer}'")]
    EventNotFound { layer: String, frame: FrameNumber },

    #[error("Event {id} is not in the stack")]
    UnknownEvent { id: String },

    #[error("No event is open for editing")]
    NoEventOpen,

    #[error("No layer at plot row {layer_number}")]
    LayerNumberNotFound { layer_number: usize },

    #[error("Song not found: '{name}'")]
    SongNotFound { name: String },

    #[error("Stack not found: '{name}'")]
    StackNotFound { name: String },

    #[error("No song is loaded")]
    NoSongLoaded,

    #[error("Filter not found on song '{song}': '{filter}'")]
    FilterNotFound { song: String, filter: String },

    #[error("No onset pool item number {number}")]
    OnsetPoolItemNotFound { number: u32 },

    #[error("Filter preset not found: {path}")]
    PresetNotFound { path: PathBuf },

    // Fatal load errors
    #[error("Project file is empty: {path}")]
    EmptyProjectFile { path: PathBuf },

    #[error("Corrupt project file {path}: {reason}")]
    CorruptProject { path: PathBuf, reason: String },

    // File and audio errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio { reason: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    #[error("Audio output error: {reason}")]
    AudioOutput { reason: String },

    #[error("Failed to start the playback clock thread: {reason}")]
    ClockStart { reason: String },

    #[error("Audio analysis failed: {reason}")]
    Analysis { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BeatstackError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            BeatstackError::FrameOccupied { .. } => "FRAME_OCCUPIED",
            BeatstackError::FrameOutOfBounds { .. } => "FRAME_OUT_OF_BOUNDS",
            BeatstackError::LayerExists { .. } => "LAYER_EXISTS",
            BeatstackError::InvalidLayerName { .. } => "INVALID_LAYER_NAME",
            BeatstackError::InvalidSongName { .. } => "INVALID_SONG_NAME",
            BeatstackError::InvalidPresetName { .. } => "INVALID_PRESET_NAME",
            BeatstackError::SongExists { .. } => "SONG_EXISTS",
            BeatstackError::InvalidColor { .. } => "INVALID_COLOR",
            BeatstackError::InvalidFrameRate { .. } => "INVALID_FRAME_RATE",
            BeatstackError::PoolNumberTaken { .. } => "POOL_NUMBER_TAKEN",
            BeatstackError::InvalidDuration { .. } => "INVALID_DURATION",
            BeatstackError::LayerNotFound { .. } => "LAYER_NOT_FOUND",
            BeatstackError::EventNotFound { .. } => "EVENT_NOT_FOUND",
            BeatstackError::UnknownEvent { .. } => "UNKNOWN_EVENT",
            BeatstackError::NoEventOpen => "NO_EVENT_OPEN",
            BeatstackError::LayerNumberNotFound { .. } => "LAYER_NUMBER_NOT_FOUND",
            BeatstackError::SongNotFound { .. } => "SONG_NOT_FOUND",
            BeatstackError::StackNotFound { .. } => "STACK_NOT_FOUND",
            BeatstackError::NoSongLoaded => "NO_SONG_LOADED",
            BeatstackError::FilterNotFound { .. } => "FILTER_NOT_FOUND",
            BeatstackError::OnsetPoolItemNotFound { .. } => "ONSET_POOL_ITEM_NOT_FOUND",
            BeatstackError::PresetNotFound { .. } => "PRESET_NOT_FOUND",
            BeatstackError::EmptyProjectFile { .. } => "EMPTY_PROJECT_FILE",
            BeatstackError::CorruptProject { .. } => "CORRUPT_PROJECT",
            BeatstackError::FileNotFound { .. } => "FILE_NOT_FOUND",
            BeatstackError::FileReadError { .. } => "FILE_READ_ERROR",
            BeatstackError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            BeatstackError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            BeatstackError::InvalidAudio { .. } => "INVALID_AUDIO",
            BeatstackError::EmptyAudio => "EMPTY_AUDIO",
            BeatstackError::AudioOutput { .. } => "AUDIO_OUTPUT_ERROR",
            BeatstackError::ClockStart { .. } => "CLOCK_START_ERROR",
            BeatstackError::Analysis { .. } => "ANALYSIS_ERROR",
            BeatstackError::Io(_) => "IO_ERROR",
            BeatstackError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BeatstackError::FrameOccupied { .. }
            | BeatstackError::FrameOutOfBounds { .. }
            | BeatstackError::LayerExists { .. }
            | BeatstackError::InvalidLayerName { .. }
            | BeatstackError::InvalidSongName { .. }
            | BeatstackError::InvalidPresetName { .. }
            | BeatstackError::SongExists { .. }
            | BeatstackError::InvalidColor { .. }
            | BeatstackError::InvalidFrameRate { .. }
            | BeatstackError::PoolNumberTaken { .. }
            | BeatstackError::InvalidDuration { .. } => ErrorKind::Structural,

            BeatstackError::LayerNotFound { .. }
            | BeatstackError::EventNotFound { .. }
            | BeatstackError::UnknownEvent { .. }
            | BeatstackError::NoEventOpen
            | BeatstackError::LayerNumberNotFound { .. }
            | BeatstackError::SongNotFound { .. }
            | BeatstackError::StackNotFound { .. }
            | BeatstackError::NoSongLoaded
            | BeatstackError::FilterNotFound { .. }
            | BeatstackError::OnsetPoolItemNotFound { .. }
            | BeatstackError::PresetNotFound { .. } => ErrorKind::LookupMiss,

            BeatstackError::EmptyProjectFile { .. } | BeatstackError::CorruptProject { .. } => {
                ErrorKind::Fatal
            }

            _ => ErrorKind::Io,
        }
    }

    /// Check if the user can fix this and retry without restarting anything
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Fatal)
    }

    /// Get a short recovery suggestion for the user
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            BeatstackError::FrameOccupied { .. } => {
                Some("Delete the existing event first or pick a free frame.")
            }
            BeatstackError::FrameOutOfBounds { .. } => {
                Some("Events must stay between the first and last frame of the song.")
            }
            BeatstackError::LayerExists { .. } => Some("Choose a different layer name."),
            BeatstackError::InvalidLayerName { .. } => {
                Some("Layer names must be non-empty and at most 20 characters.")
            }
            BeatstackError::NoSongLoaded => Some("Add a song to the project first."),
            BeatstackError::InvalidDuration { .. } => {
                Some("Give a finite, non-negative number of seconds.")
            }
            BeatstackError::EmptyProjectFile { .. } | BeatstackError::CorruptProject { .. } => {
                Some("The project could not be loaded. Restore it from a backup copy.")
            }
            BeatstackError::FileNotFound { .. } => Some("Check the file path and try again."),
            _ => None,
        }
    }
}
