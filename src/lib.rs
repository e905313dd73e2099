//! Beatstack - frame-accurate audio event annotation
//!
//! A song is cut into fixed-rate frames. Each song owns a stack of named
//! layers, and each layer holds at most one event per frame.
//!
//! # Architecture
//!
//! - `model`: songs, stacks, layers and events, plus the session tying them
//!   together
//! - `edit`: selection, scatter-plot mirror and drag/nudge controller
//! - `engine`: frame timing, WAV I/O, playback clock and transport
//! - `analysis`: beat/onset detector seam and the onset pool
//! - `state`: project files and filter presets
//! - `cli`: the `beatstack-cli` command set

pub mod analysis;
pub mod cli;
pub mod config;
pub mod edit;
pub mod engine;
pub mod error;
pub mod model;
pub mod state;

pub use config::Config;
pub use error::{BeatstackError, Result};
