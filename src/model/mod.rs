//! Annotation model
//!
//! - [`Event`]: one annotation at a frame
//! - [`Layer`]: a named track of events, at most one per frame
//! - [`Stack`]: all layers of one song, owner of every mutation
//! - [`Song`] and [`Session`]: the audio and the active editing context

pub mod event;
pub mod layer;
pub mod session;
pub mod song;
pub mod stack;

pub use event::{Color, Event, EventId, DEFAULT_EVENT_NAME};
pub use layer::Layer;
pub use session::Session;
pub use song::{validate_song_name, Song};
pub use stack::{InsertReport, Stack, MAX_LAYER_NAME_LEN};
