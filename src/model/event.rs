//! Event entity: a single annotation at one frame of one layer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::time::FrameNumber;
use crate::error::{BeatstackError, Result};

/// Name given to events created without one
pub const DEFAULT_EVENT_NAME: &str = "Default";

/// Stable identity of an event, independent of its frame and layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        EventId(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RGB color, written as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional)
    ///
    /// # Example
    /// ```
    /// use beatstack::model::Color;
    /// let red = Color::from_hex("#ff0000").unwrap();
    /// assert_eq!(red, Color::rgb(255, 0, 0));
    /// assert_eq!(red.to_hex(), "#ff0000");
    /// ```
    pub fn from_hex(value: &str) -> Result<Self> {
        let invalid = || BeatstackError::InvalidColor {
            value: value.to_string(),
        };

        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };

        Ok(Color {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl FromStr for Color {
    type Err = BeatstackError;

    fn from_str(s: &str) -> Result<Self> {
        Color::from_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = BeatstackError;

    fn try_from(value: String) -> Result<Self> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> String {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A single point annotation
///
/// The frame and owner fields are only changed by the owning [`Stack`](super::Stack),
/// which keeps them equal to the event's key in its layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    frame_number: FrameNumber,
    name: String,
    color: Color,
    parent_layer_name: String,
    parent_layer_number: usize,
}

impl Event {
    pub(crate) fn new(
        frame_number: FrameNumber,
        name: Option<&str>,
        color: Option<Color>,
        parent_layer_name: &str,
        parent_layer_number: usize,
    ) -> Self {
        Event {
            id: EventId::new(),
            frame_number,
            name: name.unwrap_or(DEFAULT_EVENT_NAME).to_string(),
            color: color.unwrap_or_default(),
            parent_layer_name: parent_layer_name.to_string(),
            parent_layer_number,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn frame_number(&self) -> FrameNumber {
        self.frame_number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn parent_layer_name(&self) -> &str {
        &self.parent_layer_name
    }

    pub fn parent_layer_number(&self) -> usize {
        self.parent_layer_number
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub(crate) fn set_frame_number(&mut self, frame_number: FrameNumber) {
        self.frame_number = frame_number;
    }

    pub(crate) fn set_parent(&mut self, layer_name: &str, layer_number: usize) {
        self.parent_layer_name = layer_name.to_string();
        self.parent_layer_number = layer_number;
    }
}
