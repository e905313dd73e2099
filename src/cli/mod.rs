//! CLI Module
//!
//! Command-line interface for editing Beatstack project files.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::Color;
use crate::state::FilterType;

/// Beatstack - frame-accurate audio event annotation
#[derive(Parser, Debug)]
#[command(name = "beatstack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty project file
    #[command(name = "new-project")]
    NewProject {
        /// Path for the new project file
        path: PathBuf,
    },

    /// Add a WAV file as a song (and an empty stack for it)
    #[command(name = "add-song")]
    AddSong {
        /// Project file
        project: PathBuf,
        /// WAV file to import
        wav: PathBuf,
        /// Song name (defaults to the file stem)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Make a song the loaded one
    #[command(name = "select-song")]
    SelectSong {
        /// Project file
        project: PathBuf,
        name: String,
    },

    /// Create a layer in the loaded stack
    #[command(name = "add-layer")]
    AddLayer {
        /// Project file
        project: PathBuf,
        name: String,
    },

    /// Remove a layer and its events
    #[command(name = "remove-layer")]
    RemoveLayer {
        /// Project file
        project: PathBuf,
        name: String,
    },

    /// Create an event
    #[command(name = "add-event")]
    AddEvent {
        /// Project file
        project: PathBuf,
        layer: String,
        frame: u32,
        #[arg(short, long)]
        name: Option<String>,
        /// Color as #rrggbb
        #[arg(long)]
        color: Option<Color>,
    },

    /// Create evenly spaced events
    #[command(name = "add-series")]
    AddSeries {
        /// Project file
        project: PathBuf,
        layer: String,
        #[arg(long, default_value_t = 0)]
        start: u32,
        #[arg(long)]
        qty: u32,
        #[arg(long, default_value_t = 1)]
        spacing: u32,
        #[arg(short, long)]
        name: Option<String>,
        /// Color as #rrggbb
        #[arg(long)]
        color: Option<Color>,
    },

    /// Delete an event
    #[command(name = "delete-event")]
    DeleteEvent {
        /// Project file
        project: PathBuf,
        layer: String,
        frame: u32,
    },

    /// Shift an event by a number of frames
    #[command(name = "nudge")]
    Nudge {
        /// Project file
        project: PathBuf,
        layer: String,
        frame: u32,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },

    /// Move an event to another frame of the same layer
    #[command(name = "move-event")]
    MoveEvent {
        /// Project file
        project: PathBuf,
        layer: String,
        from: u32,
        to: u32,
    },

    /// Move an event to another layer at the same frame
    #[command(name = "change-layer")]
    ChangeLayer {
        /// Project file
        project: PathBuf,
        from_layer: String,
        to_layer: String,
        frame: u32,
    },

    /// Print songs, layers and events
    #[command(name = "print-state")]
    PrintState {
        /// Project file
        project: PathBuf,
    },

    /// Run the playback clock over the loaded song without sound
    #[command(name = "play")]
    Play {
        /// Project file
        project: PathBuf,
        /// How long to play
        #[arg(long, default_value_t = 2.0)]
        seconds: f64,
        /// Frame to start from
        #[arg(long, default_value_t = 0)]
        from: u32,
    },

    /// Save a filter preset
    #[command(name = "save-preset")]
    SavePreset {
        name: String,
        /// Filter type, e.g. "Low-pass" or "Chebyshev I"
        #[arg(long = "type", value_parser = parse_filter_type)]
        filter_type: FilterType,
        /// Cutoff frequency in Hz
        #[arg(long)]
        cutoff: f64,
    },

    /// List saved filter presets
    #[command(name = "list-presets")]
    ListPresets,

    /// Delete a filter preset
    #[command(name = "delete-preset")]
    DeletePreset { name: String },
}

fn parse_filter_type(value: &str) -> Result<FilterType, String> {
    FilterType::from_label(value).ok_or_else(|| {
        let known: Vec<&str> = FilterType::ALL.iter().map(FilterType::label).collect();
        format!("unknown filter type '{}' (expected one of: {})", value, known.join(", "))
    })
}
