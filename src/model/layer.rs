//! Layer: one named track holding at most one event per frame

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::time::FrameNumber;
use crate::error::{BeatstackError, Result};
use crate::model::event::{Event, EventId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    name: String,
    layer_number: usize,
    events: BTreeMap<FrameNumber, Event>,
}

impl Layer {
    pub(crate) fn new(name: &str, layer_number: usize) -> Self {
        Layer {
            name: name.to_string(),
            layer_number,
            events: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertical slot of the layer on the plot
    pub fn layer_number(&self) -> usize {
        self.layer_number
    }

    /// Event at `frame`, or `None` (logged) when the frame is empty
    pub fn get_event(&self, frame: FrameNumber) -> Option<&Event> {
        let event = self.events.get(&frame);
        if event.is_none() {
            debug!("No event at frame {} in layer '{}'", frame, self.name);
        }
        event
    }

    pub(crate) fn get_event_mut(&mut self, frame: FrameNumber) -> Option<&mut Event> {
        self.events.get_mut(&frame)
    }

    pub fn contains_frame(&self, frame: FrameNumber) -> bool {
        self.events.contains_key(&frame)
    }

    /// Frame currently holding the event with `id`
    pub fn frame_of(&self, id: EventId) -> Option<FrameNumber> {
        self.events
            .iter()
            .find(|(_, event)| event.id() == id)
            .map(|(frame, _)| *frame)
    }

    /// Events in frame order
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Occupied frames in ascending order
    pub fn frames(&self) -> impl Iterator<Item = FrameNumber> + '_ {
        self.events.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Insert an event at its own frame, refusing to overwrite
    pub(crate) fn insert(&mut self, mut event: Event) -> Result<EventId> {
        let frame = event.frame_number();
        if self.events.contains_key(&frame) {
            return Err(BeatstackError::FrameOccupied {
                layer: self.name.clone(),
                frame,
            });
        }
        event.set_parent(&self.name, self.layer_number);
        let id = event.id();
        self.events.insert(frame, event);
        Ok(id)
    }

    pub(crate) fn remove(&mut self, frame: FrameNumber) -> Option<Event> {
        self.events.remove(&frame)
    }

    /// Move the event keyed at `from` to `to`, keeping key and field in step
    ///
    /// The caller has checked that `from` is occupied and `to` is free.
    pub(crate) fn rekey(&mut self, from: FrameNumber, to: FrameNumber) {
        if let Some(mut event) = self.events.remove(&from) {
            event.set_frame_number(to);
            self.events.insert(to, event);
        }
    }

    /// Iterate `(key, event)` pairs, used when checking consistency
    pub(crate) fn entries(&self) -> impl Iterator<Item = (FrameNumber, &Event)> {
        self.events.iter().map(|(frame, event)| (*frame, event))
    }
}
