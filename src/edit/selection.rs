//! Ordered set of selected events
//!
//! Holds event ids only, so a deleted event never dangles: anything that
//! resolves an id checks it against the stack first, and
//! [`Selection::retain_existing`] prunes ids that no longer resolve.

use crate::model::{EventId, Stack};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<EventId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with `id`, returning the ids that were dropped
    pub fn select(&mut self, id: EventId) -> Vec<EventId> {
        let dropped: Vec<EventId> = self.ids.drain(..).filter(|old| *old != id).collect();
        self.ids.push(id);
        dropped
    }

    /// Append `id` unless already selected; returns whether it was added
    pub fn add(&mut self, id: EventId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn remove(&mut self, id: EventId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|selected| *selected != id);
        self.ids.len() != before
    }

    /// Empty the selection, returning what was selected
    pub fn clear(&mut self) -> Vec<EventId> {
        std::mem::take(&mut self.ids)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.ids.contains(&id)
    }

    /// Selected ids in selection order
    pub fn ids(&self) -> &[EventId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drop ids whose events are no longer in `stack`
    pub fn retain_existing(&mut self, stack: &Stack) -> Vec<EventId> {
        let (kept, gone): (Vec<EventId>, Vec<EventId>) = self
            .ids
            .iter()
            .copied()
            .partition(|id| stack.find_event(*id).is_some());
        self.ids = kept;
        gone
    }
}
