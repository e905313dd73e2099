//! Audio Engine Module
//!
//! - Frame/time conversions
//! - WAV file I/O
//! - The playback clock and the engine driving audio output from it

pub mod clock;
pub mod io;
pub mod playback;
pub mod time;

pub use clock::{ClockState, FrameSubscriber, PlaybackClock};
pub use io::{export_wav, generate_test_tone, import_wav, MonoAudio};
pub use playback::{AudioOutput, OutputCommand, PlaybackEngine, SilentOutput};
pub use time::{
    duration_secs, format_frame_label, FrameNumber, FrameRate, DEFAULT_FRAME_RATE,
};
