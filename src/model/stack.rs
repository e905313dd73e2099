//! Stack: all layers of one song, and the authority for every event mutation
//!
//! Each mutation either applies completely or returns an error and leaves the
//! stack untouched. Rejections are logged at `warn`, lookup misses at `debug`.
//!
//! Invariants kept by every operation:
//! - an event's frame field equals its key in the owning layer
//! - an event's owner fields name the layer that holds it
//! - at most one event per frame in a layer
//! - every frame lies in `[0, frame_qty)`
//! - layer numbers are unique, and new layers take the lowest free one

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::time::FrameNumber;
use crate::error::{BeatstackError, Result};
use crate::model::event::{Color, Event, EventId};
use crate::model::layer::Layer;

/// Longest layer name accepted by default
pub const MAX_LAYER_NAME_LEN: usize = 20;

fn default_max_layer_name_len() -> usize {
    MAX_LAYER_NAME_LEN
}

/// Outcome of a bulk insertion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// Frames that received a new event
    pub inserted: Vec<FrameNumber>,
    /// Frames that were occupied or outside the timeline
    pub skipped: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    name: String,
    frame_qty: FrameNumber,
    layers: BTreeMap<String, Layer>,
    #[serde(skip, default = "default_max_layer_name_len")]
    max_layer_name_len: usize,
}

impl Stack {
    /// Create an empty stack for the song `name` spanning `frame_qty` frames
    pub fn new(name: &str, frame_qty: FrameNumber) -> Self {
        Stack {
            name: name.to_string(),
            frame_qty,
            layers: BTreeMap::new(),
            max_layer_name_len: MAX_LAYER_NAME_LEN,
        }
    }

    pub fn with_max_layer_name_len(mut self, max_len: usize) -> Self {
        self.max_layer_name_len = max_len;
        self
    }

    pub(crate) fn set_max_layer_name_len(&mut self, max_len: usize) {
        self.max_layer_name_len = max_len;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_qty(&self) -> FrameNumber {
        self.frame_qty
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Create an empty layer in the lowest free slot and return that slot
    pub fn create_layer(&mut self, name: &str) -> Result<usize> {
        self.check_layer_name(name)?;

        if self.layers.contains_key(name) {
            warn!("Layer '{}' already exists in stack '{}'", name, self.name);
            return Err(BeatstackError::LayerExists {
                name: name.to_string(),
            });
        }

        let layer_number = self.lowest_free_layer_number();
        self.layers
            .insert(name.to_string(), Layer::new(name, layer_number));
        info!(
            "Created layer '{}' (number {}) in stack '{}'",
            name, layer_number, self.name
        );
        Ok(layer_number)
    }

    /// Remove a layer together with its events
    ///
    /// Other layers keep their numbers; the freed slot is reused by the next
    /// `create_layer`.
    pub fn remove_layer(&mut self, name: &str) -> Result<Layer> {
        match self.layers.remove(name) {
            Some(layer) => {
                info!(
                    "Removed layer '{}' with {} events from stack '{}'",
                    name,
                    layer.len(),
                    self.name
                );
                Ok(layer)
            }
            None => {
                warn!("Cannot remove missing layer '{}'", name);
                Err(BeatstackError::LayerNotFound {
                    name: name.to_string(),
                })
            }
        }
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        let layer = self.layers.get(name);
        if layer.is_none() {
            debug!("No layer '{}' in stack '{}'", name, self.name);
        }
        layer
    }

    /// Layer occupying plot row `layer_number`
    pub fn layer_by_number(&self, layer_number: usize) -> Option<&Layer> {
        let layer = self
            .layers
            .values()
            .find(|layer| layer.layer_number() == layer_number);
        if layer.is_none() {
            debug!("No layer at row {} in stack '{}'", layer_number, self.name);
        }
        layer
    }

    /// Layers sorted by layer number (bottom row first)
    pub fn layers_ordered(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self.layers.values().collect();
        layers.sort_by_key(|layer| layer.layer_number());
        layers
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn get_layer_qty(&self) -> usize {
        self.layers.len()
    }

    /// Layer number of `name`, or `None` (logged) when absent
    pub fn get_layer_index(&self, name: &str) -> Option<usize> {
        self.layer(name).map(Layer::layer_number)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Create an event at `frame` in `layer_name`; never overwrites
    ///
    /// # Example
    /// ```
    /// use beatstack::model::{Color, Stack};
    /// let mut stack = Stack::new("song", 2400);
    /// stack.create_layer("kick").unwrap();
    /// stack.add_event("kick", 100, Some(Color::rgb(255, 0, 0)), Some("K1")).unwrap();
    /// assert!(stack.add_event("kick", 100, None, None).is_err());
    /// ```
    pub fn add_event(
        &mut self,
        layer_name: &str,
        frame: FrameNumber,
        color: Option<Color>,
        name: Option<&str>,
    ) -> Result<EventId> {
        self.check_bounds(frame as i64)?;
        let layer = self.layer_mut(layer_name)?;
        let event = Event::new(frame, name, color, layer_name, layer.layer_number());

        layer.insert(event).map_err(|e| {
            warn!("Rejected new event: {}", e);
            e
        })
    }

    /// Remove and return the event at `frame`
    pub fn delete_event(&mut self, layer_name: &str, frame: FrameNumber) -> Result<Event> {
        let layer = self.layer_mut(layer_name)?;
        match layer.remove(frame) {
            Some(event) => {
                debug!("Deleted event at frame {} from '{}'", frame, layer_name);
                Ok(event)
            }
            None => {
                warn!("Nothing to delete at frame {} in '{}'", frame, layer_name);
                Err(BeatstackError::EventNotFound {
                    layer: layer_name.to_string(),
                    frame,
                })
            }
        }
    }

    pub fn get_event(&self, layer_name: &str, frame: FrameNumber) -> Option<&Event> {
        self.layer(layer_name)?.get_event(frame)
    }

    /// Change the name and/or color of an existing event
    pub fn edit_event(
        &mut self,
        layer_name: &str,
        frame: FrameNumber,
        name: Option<&str>,
        color: Option<Color>,
    ) -> Result<()> {
        let event = self.event_mut(layer_name, frame)?;
        if let Some(name) = name {
            event.set_name(name);
        }
        if let Some(color) = color {
            event.set_color(color);
        }
        Ok(())
    }

    /// Shift an event by `delta` frames within its layer, returning the new frame
    pub fn nudge_event(
        &mut self,
        layer_name: &str,
        frame: FrameNumber,
        delta: i64,
    ) -> Result<FrameNumber> {
        let target = self.check_bounds((frame as i64).saturating_add(delta)).map_err(|e| {
            warn!("Rejected nudge of frame {} by {}: {}", frame, delta, e);
            e
        })?;
        self.move_event(layer_name, frame, target)?;
        Ok(target)
    }

    /// Move an event to `new_frame` in the same layer
    ///
    /// Moving to the frame it already occupies changes nothing.
    pub fn move_event(
        &mut self,
        layer_name: &str,
        old_frame: FrameNumber,
        new_frame: FrameNumber,
    ) -> Result<()> {
        self.check_bounds(new_frame as i64).map_err(|e| {
            warn!("Rejected move in '{}': {}", layer_name, e);
            e
        })?;

        let layer = self.layer_mut(layer_name)?;
        if !layer.contains_frame(old_frame) {
            warn!("No event to move at frame {} in '{}'", old_frame, layer_name);
            return Err(BeatstackError::EventNotFound {
                layer: layer_name.to_string(),
                frame: old_frame,
            });
        }
        if old_frame == new_frame {
            return Ok(());
        }
        if layer.contains_frame(new_frame) {
            warn!(
                "Rejected move {} -> {} in '{}': target occupied",
                old_frame, new_frame, layer_name
            );
            return Err(BeatstackError::FrameOccupied {
                layer: layer_name.to_string(),
                frame: new_frame,
            });
        }

        layer.rekey(old_frame, new_frame);
        debug!("Moved event {} -> {} in '{}'", old_frame, new_frame, layer_name);
        Ok(())
    }

    /// Re-parent the event at `frame` from one layer to another at the same frame
    pub fn change_event_layer(
        &mut self,
        from_layer: &str,
        to_layer: &str,
        frame: FrameNumber,
    ) -> Result<()> {
        if from_layer == to_layer {
            return Ok(());
        }

        // Check everything before touching either layer
        let source = self.layer_ref(from_layer)?;
        if !source.contains_frame(frame) {
            warn!("No event at frame {} in '{}' to re-layer", frame, from_layer);
            return Err(BeatstackError::EventNotFound {
                layer: from_layer.to_string(),
                frame,
            });
        }
        if self.layer_ref(to_layer)?.contains_frame(frame) {
            warn!(
                "Cannot move frame {} from '{}' to '{}': occupied",
                frame, from_layer, to_layer
            );
            return Err(BeatstackError::FrameOccupied {
                layer: to_layer.to_string(),
                frame,
            });
        }

        let event = self
            .layer_mut(from_layer)?
            .remove(frame)
            .ok_or_else(|| BeatstackError::EventNotFound {
                layer: from_layer.to_string(),
                frame,
            })?;
        self.layer_mut(to_layer)?.insert(event)?;
        debug!(
            "Moved event at frame {} from '{}' to '{}'",
            frame, from_layer, to_layer
        );
        Ok(())
    }

    /// Create `qty` events starting at `start`, `spacing` frames apart
    ///
    /// Frames that are occupied or past the end of the song are skipped and
    /// reported rather than overwritten.
    pub fn add_event_series(
        &mut self,
        layer_name: &str,
        start: FrameNumber,
        qty: u32,
        spacing: u32,
        name: Option<&str>,
        color: Option<Color>,
    ) -> Result<InsertReport> {
        let frames: Vec<i64> = (0..qty as i64)
            .map(|i| start as i64 + i * spacing.max(1) as i64)
            .collect();
        self.add_events_at_frames(layer_name, &frames, name, color)
    }

    /// Insert one event per frame, skipping frames that cannot take one
    pub fn add_events_at_frames(
        &mut self,
        layer_name: &str,
        frames: &[i64],
        name: Option<&str>,
        color: Option<Color>,
    ) -> Result<InsertReport> {
        self.layer_ref(layer_name)?;

        let mut report = InsertReport::default();
        for &frame in frames {
            let added = self
                .check_bounds(frame)
                .and_then(|frame| self.add_event(layer_name, frame, color, name).map(|_| frame));
            match added {
                Ok(frame) => report.inserted.push(frame),
                Err(_) => report.skipped.push(frame),
            }
        }

        if !report.skipped.is_empty() {
            warn!(
                "Skipped {} of {} frames in '{}'",
                report.skipped.len(),
                frames.len(),
                layer_name
            );
        }
        Ok(report)
    }

    /// Look an event up by identity
    pub fn find_event(&self, id: EventId) -> Option<&Event> {
        self.layers
            .values()
            .flat_map(|layer| layer.events())
            .find(|event| event.id() == id)
    }

    /// Layer name and frame currently holding `id`
    pub fn locate(&self, id: EventId) -> Option<(String, FrameNumber)> {
        self.find_event(id)
            .map(|event| (event.parent_layer_name().to_string(), event.frame_number()))
    }

    /// All events in layer-number then frame order
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.layers_ordered().into_iter().flat_map(|layer| layer.events())
    }

    pub fn event_count(&self) -> usize {
        self.layers.values().map(Layer::len).sum()
    }

    /// Check every structural invariant, describing the first violation found
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut numbers = BTreeSet::new();
        let mut ids = BTreeSet::new();

        for (key, layer) in &self.layers {
            if key != layer.name() {
                return Err(format!("layer '{}' is stored under key '{}'", layer.name(), key));
            }
            if !numbers.insert(layer.layer_number()) {
                return Err(format!(
                    "layer number {} is used more than once",
                    layer.layer_number()
                ));
            }
            for (frame, event) in layer.entries() {
                if event.frame_number() != frame {
                    return Err(format!(
                        "event keyed at frame {} in '{}' says frame {}",
                        frame,
                        key,
                        event.frame_number()
                    ));
                }
                if event.parent_layer_name() != key
                    || event.parent_layer_number() != layer.layer_number()
                {
                    return Err(format!(
                        "event at frame {} in '{}' claims owner '{}'",
                        frame,
                        key,
                        event.parent_layer_name()
                    ));
                }
                if frame >= self.frame_qty {
                    return Err(format!(
                        "event at frame {} in '{}' is past frame_qty {}",
                        frame, key, self.frame_qty
                    ));
                }
                if !ids.insert(event.id()) {
                    return Err(format!("event {} appears more than once", event.id()));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn check_layer_name(&self, name: &str) -> Result<()> {
        let reason = if name.trim().is_empty() {
            Some("name is empty".to_string())
        } else if name.chars().count() > self.max_layer_name_len {
            Some(format!(
                "name is longer than {} characters",
                self.max_layer_name_len
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => {
                warn!("Rejected layer name '{}': {}", name, reason);
                Err(BeatstackError::InvalidLayerName {
                    name: name.to_string(),
                    reason,
                })
            }
            None => Ok(()),
        }
    }

    fn check_bounds(&self, frame: i64) -> Result<FrameNumber> {
        if frame < 0 || frame >= self.frame_qty as i64 {
            return Err(BeatstackError::FrameOutOfBounds {
                frame,
                frame_qty: self.frame_qty,
            });
        }
        Ok(frame as FrameNumber)
    }

    fn lowest_free_layer_number(&self) -> usize {
        let used: BTreeSet<usize> = self.layers.values().map(Layer::layer_number).collect();
        (0..).find(|n| !used.contains(n)).unwrap_or(used.len())
    }

    fn layer_ref(&self, name: &str) -> Result<&Layer> {
        self.layers.get(name).ok_or_else(|| {
            warn!("Layer '{}' not found in stack '{}'", name, self.name);
            BeatstackError::LayerNotFound {
                name: name.to_string(),
            }
        })
    }

    fn layer_mut(&mut self, name: &str) -> Result<&mut Layer> {
        let stack_name = &self.name;
        self.layers.get_mut(name).ok_or_else(|| {
            warn!("Layer '{}' not found in stack '{}'", name, stack_name);
            BeatstackError::LayerNotFound {
                name: name.to_string(),
            }
        })
    }

    fn event_mut(&mut self, layer_name: &str, frame: FrameNumber) -> Result<&mut Event> {
        self.layer_mut(layer_name)?
            .get_event_mut(frame)
            .ok_or_else(|| BeatstackError::EventNotFound {
                layer: layer_name.to_string(),
                frame,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drum_stack() -> Stack {
        let mut stack = Stack::new("song", 2400);
        stack.create_layer("kick").unwrap();
        stack.create_layer("snare").unwrap();
        stack
    }

    #[test]
    fn test_layer_numbers_fill_lowest_slot() {
        let mut stack = Stack::new("song", 100);
        assert_eq!(stack.create_layer("a").unwrap(), 0);
        assert_eq!(stack.create_layer("b").unwrap(), 1);
        assert_eq!(stack.create_layer("c").unwrap(), 2);

        stack.remove_layer("a").unwrap();
        assert_eq!(stack.get_layer_index("b"), Some(1));
        assert_eq!(stack.create_layer("d").unwrap(), 0);
        assert_eq!(stack.create_layer("e").unwrap(), 3);
    }

    #[test]
    fn test_duplicate_layer_rejected() {
        let mut stack = drum_stack();
        assert!(matches!(
            stack.create_layer("kick"),
            Err(BeatstackError::LayerExists { .. })
        ));
        assert_eq!(stack.get_layer_qty(), 2);
    }

    #[test]
    fn test_layer_name_limits() {
        let mut stack = Stack::new("song", 100);
        assert!(stack.create_layer("").is_err());
        assert!(stack.create_layer("   ").is_err());
        assert!(stack.create_layer(&"x".repeat(21)).is_err());
        assert!(stack.create_layer(&"x".repeat(20)).is_ok());

        let mut short = Stack::new("song", 100).with_max_layer_name_len(3);
        assert!(short.create_layer("hats").is_err());
        assert!(short.create_layer("hat").is_ok());
    }

    #[test]
    fn test_add_event_bounds() {
        let mut stack = drum_stack();
        assert!(stack.add_event("kick", 0, None, None).is_ok());
        assert!(stack.add_event("kick", 2399, None, None).is_ok());
        assert!(matches!(
            stack.add_event("kick", 2400, None, None),
            Err(BeatstackError::FrameOutOfBounds { frame: 2400, .. })
        ));
        assert!(matches!(
            stack.add_event("tom", 5, None, None),
            Err(BeatstackError::LayerNotFound { .. })
        ));
    }

    #[test]
    fn test_nudge_rejects_occupied_and_out_of_range() {
        let mut stack = drum_stack();
        stack.add_event("kick", 10, None, Some("a")).unwrap();
        stack.add_event("kick", 12, None, Some("b")).unwrap();
        let before = stack.clone();

        assert!(matches!(
            stack.nudge_event("kick", 10, 2),
            Err(BeatstackError::FrameOccupied { frame: 12, .. })
        ));
        assert!(matches!(
            stack.nudge_event("kick", 10, -11),
            Err(BeatstackError::FrameOutOfBounds { frame: -1, .. })
        ));
        assert!(stack.nudge_event("kick", 12, 2388).is_err());
        assert_eq!(stack, before);

        assert_eq!(stack.nudge_event("kick", 10, -10).unwrap(), 0);
        assert_eq!(stack.get_event("kick", 0).unwrap().name(), "a");
    }

    #[test]
    fn test_nudge_by_extreme_delta_is_rejected() {
        let mut stack = drum_stack();
        stack.add_event("kick", 10, None, None).unwrap();
        let before = stack.clone();

        assert!(matches!(
            stack.nudge_event("kick", 10, i64::MAX),
            Err(BeatstackError::FrameOutOfBounds { frame: i64::MAX, .. })
        ));
        assert!(matches!(
            stack.nudge_event("kick", 10, i64::MIN),
            Err(BeatstackError::FrameOutOfBounds { .. })
        ));
        assert_eq!(stack, before);
    }

    #[test]
    fn test_move_to_same_frame_is_noop() {
        let mut stack = drum_stack();
        stack.add_event("kick", 50, None, None).unwrap();
        let before = stack.clone();
        stack.move_event("kick", 50, 50).unwrap();
        assert_eq!(stack, before);
    }

    #[test]
    fn test_move_missing_event() {
        let mut stack = drum_stack();
        assert!(matches!(
            stack.move_event("kick", 1, 2),
            Err(BeatstackError::EventNotFound { frame: 1, .. })
        ));
    }

    #[test]
    fn test_change_layer_to_occupied_frame_is_atomic() {
        let mut stack = drum_stack();
        stack.add_event("kick", 30, None, Some("k")).unwrap();
        stack.add_event("snare", 30, None, Some("s")).unwrap();
        let before = stack.clone();

        assert!(stack.change_event_layer("kick", "snare", 30).is_err());
        assert!(stack.change_event_layer("kick", "tom", 30).is_err());
        assert_eq!(stack, before);
    }

    #[test]
    fn test_change_layer_restamps_owner() {
        let mut stack = drum_stack();
        let id = stack.add_event("kick", 30, None, None).unwrap();
        stack.change_event_layer("kick", "snare", 30).unwrap();

        let event = stack.get_event("snare", 30).unwrap();
        assert_eq!(event.id(), id);
        assert_eq!(event.parent_layer_name(), "snare");
        assert_eq!(event.parent_layer_number(), 1);
        assert!(stack.get_event("kick", 30).is_none());
        assert!(stack.validate().is_ok());
    }

    #[test]
    fn test_delete_event() {
        let mut stack = drum_stack();
        stack.add_event("kick", 5, None, Some("gone")).unwrap();
        assert_eq!(stack.delete_event("kick", 5).unwrap().name(), "gone");
        assert!(matches!(
            stack.delete_event("kick", 5),
            Err(BeatstackError::EventNotFound { .. })
        ));
    }

    #[test]
    fn test_edit_event() {
        let mut stack = drum_stack();
        stack.add_event("kick", 5, None, None).unwrap();
        stack
            .edit_event("kick", 5, Some("K"), Some(Color::rgb(1, 2, 3)))
            .unwrap();
        let event = stack.get_event("kick", 5).unwrap();
        assert_eq!(event.name(), "K");
        assert_eq!(event.color(), Color::rgb(1, 2, 3));
        assert!(stack.edit_event("kick", 6, Some("x"), None).is_err());
    }

    #[test]
    fn test_event_series_skips_bad_frames() {
        let mut stack = Stack::new("song", 20);
        stack.create_layer("kick").unwrap();
        stack.add_event("kick", 8, None, Some("existing")).unwrap();

        let report = stack
            .add_event_series("kick", 0, 6, 4, Some("beat"), None)
            .unwrap();

        assert_eq!(report.inserted, vec![0, 4, 12, 16]);
        assert_eq!(report.skipped, vec![8, 20]);
        assert_eq!(stack.get_event("kick", 8).unwrap().name(), "existing");
        assert_eq!(stack.get_event("kick", 12).unwrap().name(), "beat");
    }

    #[test]
    fn test_remove_layer_drops_events() {
        let mut stack = drum_stack();
        let id = stack.add_event("kick", 1, None, None).unwrap();
        let removed = stack.remove_layer("kick").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(stack.find_event(id).is_none());
        assert_eq!(stack.get_layer_index("snare"), Some(1));
    }

    #[test]
    fn test_locate() {
        let mut stack = drum_stack();
        let id = stack.add_event("snare", 77, None, None).unwrap();
        assert_eq!(stack.locate(id), Some(("snare".to_string(), 77)));
    }

    #[test]
    fn test_events_in_row_order() {
        let mut stack = drum_stack();
        stack.add_event("snare", 1, None, None).unwrap();
        stack.add_event("kick", 9, None, None).unwrap();
        let owners: Vec<&str> = stack.events().map(Event::parent_layer_name).collect();
        assert_eq!(owners, vec!["kick", "snare"]);
        assert_eq!(stack.event_count(), 2);
    }
}
