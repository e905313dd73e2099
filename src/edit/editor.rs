//! Selection and drag controller
//!
//! [`StackEditor`] holds the transient editing state of one stack: the
//! selection, the scatter plot, the playback mode and the drag session.
//! [`EditSession`] pairs it with the stack being edited and implements
//! [`EventSink`], the interface a presentation layer feeds raw gestures into.
//!
//! A drag snapshots the frame of every selected event when it starts. Each
//! delta is applied to that snapshot and moves plot points only; the stack is
//! written once, when the drag ends.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info, warn};

use crate::edit::plot::{PlotDelta, RoiRect, ScatterPlot};
use crate::edit::selection::Selection;
use crate::engine::time::FrameNumber;
use crate::error::{BeatstackError, Result};
use crate::model::{Color, EventId, Layer, Stack};

/// What a plain click on the plot does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// Clicks only manage the selection
    #[default]
    Play,
    /// Clicks pick the event under the pointer
    Edit,
    /// Clicks create an event under the pointer
    Record,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Play => write!(f, "Play"),
            PlaybackMode::Edit => write!(f, "Edit"),
            PlaybackMode::Record => write!(f, "Record"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        /// Frame of each dragged event when the drag started
        baseline: BTreeMap<EventId, FrameNumber>,
        /// Latest whole-frame offset from the baseline
        delta: i64,
    },
}

/// Result of committing a drag
#[derive(Debug, Default)]
pub struct DragOutcome {
    pub moved: Vec<EventId>,
    /// Events left at their original frame, with the reason
    pub rejected: Vec<(EventId, BeatstackError)>,
}

/// Result of a click on empty plot space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Added(EventId),
    Selected(EventId),
    Cleared,
    Ignored,
}

/// Gesture interface the presentation layer drives
pub trait EventSink {
    /// Plain click on an event
    fn on_select(&mut self, id: EventId) -> Result<()>;
    /// Shift-click on an event
    fn on_add_to_selection(&mut self, id: EventId) -> Result<()>;
    fn on_clear_selection(&mut self);
    /// Rectangle drag over the plot; returns the events added
    fn on_region_select(&mut self, rect: RoiRect) -> Vec<EventId>;
    /// Pointer pressed on `origin` and started moving; returns whether a
    /// drag session began
    fn on_drag_start(&mut self, origin: EventId) -> bool;
    /// Pointer moved `delta` since the drag started
    fn on_drag(&mut self, delta: PlotDelta);
    fn on_drag_end(&mut self) -> DragOutcome;
    /// Right-click on the event at `frame` of `layer`: open it for editing
    fn on_right_click(&mut self, layer: &str, frame: FrameNumber) -> Result<EventId>;
    /// Click on the plot background at plot coordinates
    fn on_plot_click(&mut self, x: f64, y: f64, shift: bool) -> Result<ClickOutcome>;
}

/// Editing state for one stack
#[derive(Debug, Clone, Default)]
pub struct StackEditor {
    selection: Selection,
    plot: ScatterPlot,
    drag: DragState,
    mode: PlaybackMode,
    editing: Option<EventId>,
}

impl StackEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Editor with its plot built from `stack`
    pub fn for_stack(stack: &Stack) -> Self {
        let mut editor = Self::new();
        editor.rebuild(stack);
        editor
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn plot(&self) -> &ScatterPlot {
        &self.plot
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        info!("Playback mode set to {}", mode);
        self.mode = mode;
    }

    /// Event opened by the last right-click
    pub fn editing(&self) -> Option<EventId> {
        self.editing
    }

    /// Regenerate the plot from `stack` and forget ids that no longer exist
    pub fn rebuild(&mut self, stack: &Stack) {
        self.drag = DragState::Idle;
        self.selection.retain_existing(stack);
        if self.editing.map_or(false, |id| stack.find_event(id).is_none()) {
            self.editing = None;
        }
        self.plot.rebuild(stack);
        for id in self.selection.ids() {
            self.plot.set_selected(*id, true);
        }
    }
}

/// A stack and its editor, borrowed together for one burst of input
pub struct EditSession<'a> {
    stack: &'a mut Stack,
    editor: &'a mut StackEditor,
}

impl<'a> EditSession<'a> {
    pub fn new(stack: &'a mut Stack, editor: &'a mut StackEditor) -> Self {
        EditSession { stack, editor }
    }

    pub fn stack(&self) -> &Stack {
        &*self.stack
    }

    pub fn editor(&self) -> &StackEditor {
        &*self.editor
    }

    /// Add an event and its plot point
    pub fn add_event(
        &mut self,
        layer: &str,
        frame: FrameNumber,
        color: Option<Color>,
        name: Option<&str>,
    ) -> Result<EventId> {
        let id = self.stack.add_event(layer, frame, color, name)?;
        self.editor.plot.sync(self.stack, id);
        Ok(id)
    }

    /// Change name and/or color of the event opened for editing
    pub fn edit_current(&mut self, name: Option<&str>, color: Option<Color>) -> Result<()> {
        let id = self.editor.editing.ok_or(BeatstackError::NoEventOpen)?;
        let (layer, frame) = self.locate(id)?;
        self.stack.edit_event(&layer, frame, name, color)?;
        self.editor.plot.sync(self.stack, id);
        Ok(())
    }

    /// Delete one event and its plot point
    pub fn delete_event(&mut self, layer: &str, frame: FrameNumber) -> Result<()> {
        let id = self.stack.delete_event(layer, frame)?.id();
        self.forget(id);
        Ok(())
    }

    /// Remove a layer; its events leave the plot and the selection with it
    pub fn remove_layer(&mut self, name: &str) -> Result<Layer> {
        let layer = self.stack.remove_layer(name)?;
        for event in layer.events() {
            self.forget(event.id());
        }
        Ok(layer)
    }

    /// Delete every selected event, model and plot together
    pub fn delete_selected(&mut self) -> Vec<EventId> {
        let mut deleted = Vec::new();
        for id in self.editor.selection.clear() {
            if let Some((layer, frame)) = self.stack.locate(id) {
                if self.stack.delete_event(&layer, frame).is_ok() {
                    deleted.push(id);
                }
            }
            self.editor.plot.sync(self.stack, id);
        }
        if self.editor.editing.map_or(false, |id| deleted.contains(&id)) {
            self.editor.editing = None;
        }
        info!("Deleted {} selected events", deleted.len());
        deleted
    }

    /// Shift every selected event by `delta` frames within its layer
    pub fn nudge_selected(&mut self, delta: i64) -> DragOutcome {
        let baseline = self.snapshot_selection();
        self.commit(&baseline, delta)
    }

    /// Move every selected event to `to_layer`, keeping its frame
    pub fn change_selected_layer(&mut self, to_layer: &str) -> DragOutcome {
        let mut outcome = DragOutcome::default();
        for id in self.editor.selection.ids().to_vec() {
            let result = self
                .locate(id)
                .and_then(|(layer, frame)| self.stack.change_event_layer(&layer, to_layer, frame));
            match result {
                Ok(()) => outcome.moved.push(id),
                Err(e) => outcome.rejected.push((id, e)),
            }
            self.editor.plot.sync(self.stack, id);
        }
        outcome
    }

    fn forget(&mut self, id: EventId) {
        self.editor.selection.remove(id);
        self.editor.plot.remove(id);
        if self.editor.editing == Some(id) {
            self.editor.editing = None;
        }
    }

    fn locate(&self, id: EventId) -> Result<(String, FrameNumber)> {
        self.stack.locate(id).ok_or_else(|| {
            debug!("Event {} is no longer in the stack", id);
            BeatstackError::UnknownEvent { id: id.to_string() }
        })
    }

    /// Frame of every selected event that still exists
    fn snapshot_selection(&mut self) -> BTreeMap<EventId, FrameNumber> {
        for gone in self.editor.selection.retain_existing(self.stack) {
            self.editor.plot.remove(gone);
        }
        self.editor
            .selection
            .ids()
            .iter()
            .filter_map(|id| self.stack.locate(*id).map(|(_, frame)| (*id, frame)))
            .collect()
    }

    /// Write `baseline + delta` into the stack
    ///
    /// Events are moved leading edge first so members of the same selection
    /// never land on each other. A rejected event stays at its baseline frame.
    fn commit(&mut self, baseline: &BTreeMap<EventId, FrameNumber>, delta: i64) -> DragOutcome {
        let mut outcome = DragOutcome::default();
        let mut order: Vec<(EventId, FrameNumber)> =
            baseline.iter().map(|(id, frame)| (*id, *frame)).collect();
        if delta > 0 {
            order.sort_by(|a, b| b.1.cmp(&a.1));
        } else {
            order.sort_by(|a, b| a.1.cmp(&b.1));
        }

        for (id, base) in order {
            if delta != 0 {
                let result = self
                    .locate(id)
                    .and_then(|(layer, _)| self.stack.nudge_event(&layer, base, delta));
                match result {
                    Ok(_) => outcome.moved.push(id),
                    Err(e) => {
                        warn!("Event {} stays at frame {}: {}", id, base, e);
                        outcome.rejected.push((id, e));
                    }
                }
            }
            self.editor.plot.sync(self.stack, id);
        }
        outcome
    }
}

impl EventSink for EditSession<'_> {
    fn on_select(&mut self, id: EventId) -> Result<()> {
        self.locate(id)?;
        for old in self.editor.selection.select(id) {
            self.editor.plot.set_selected(old, false);
        }
        self.editor.plot.set_selected(id, true);
        Ok(())
    }

    fn on_add_to_selection(&mut self, id: EventId) -> Result<()> {
        self.locate(id)?;
        if self.editor.selection.add(id) {
            self.editor.plot.set_selected(id, true);
        }
        Ok(())
    }

    fn on_clear_selection(&mut self) {
        for old in self.editor.selection.clear() {
            self.editor.plot.set_selected(old, false);
        }
    }

    fn on_region_select(&mut self, rect: RoiRect) -> Vec<EventId> {
        let mut added = Vec::new();
        for id in self.editor.plot.points_in_rect(&rect) {
            if self.editor.selection.add(id) {
                self.editor.plot.set_selected(id, true);
                added.push(id);
            }
        }
        debug!("Region select added {} events", added.len());
        added
    }

    fn on_drag_start(&mut self, origin: EventId) -> bool {
        if self.editor.is_dragging() || !self.editor.selection.contains(origin) {
            return false;
        }
        let baseline = self.snapshot_selection();
        if baseline.is_empty() {
            return false;
        }
        debug!("Drag started with {} events", baseline.len());
        self.editor.drag = DragState::Dragging { baseline, delta: 0 };
        true
    }

    fn on_drag(&mut self, delta: PlotDelta) {
        let frames = delta.frames();
        let StackEditor { drag, plot, .. } = &mut *self.editor;
        if let DragState::Dragging {
            baseline,
            delta: current,
        } = drag
        {
            *current = frames;
            for (id, base) in baseline.iter() {
                plot.set_visual_frame(*id, (*base as i64).saturating_add(frames));
            }
        }
    }

    fn on_drag_end(&mut self) -> DragOutcome {
        match std::mem::take(&mut self.editor.drag) {
            DragState::Idle => DragOutcome::default(),
            DragState::Dragging { baseline, delta } => {
                let outcome = self.commit(&baseline, delta);
                debug!(
                    "Drag ended: {} moved, {} rejected",
                    outcome.moved.len(),
                    outcome.rejected.len()
                );
                outcome
            }
        }
    }

    fn on_right_click(&mut self, layer: &str, frame: FrameNumber) -> Result<EventId> {
        let id = self
            .stack
            .get_event(layer, frame)
            .map(|event| event.id())
            .ok_or_else(|| BeatstackError::EventNotFound {
                layer: layer.to_string(),
                frame,
            })?;
        self.editor.editing = Some(id);
        Ok(id)
    }

    fn on_plot_click(&mut self, x: f64, y: f64, shift: bool) -> Result<ClickOutcome> {
        if !shift {
            self.on_clear_selection();
        }

        let mode = self.editor.mode;
        if mode == PlaybackMode::Play {
            return Ok(if shift {
                ClickOutcome::Ignored
            } else {
                ClickOutcome::Cleared
            });
        }

        if x < -0.5 || y < 0.0 {
            return Err(BeatstackError::FrameOutOfBounds {
                frame: x.round() as i64,
                frame_qty: self.stack.frame_qty(),
            });
        }
        let frame = x.round() as FrameNumber;
        let layer_number = y.floor() as usize;
        let layer = self
            .stack
            .layer_by_number(layer_number)
            .map(|layer| layer.name().to_string())
            .ok_or(BeatstackError::LayerNumberNotFound { layer_number })?;

        match mode {
            PlaybackMode::Record => {
                let id = self.add_event(&layer, frame, None, None)?;
                Ok(ClickOutcome::Added(id))
            }
            PlaybackMode::Edit => {
                let id = self
                    .stack
                    .get_event(&layer, frame)
                    .map(|event| event.id())
                    .ok_or_else(|| BeatstackError::EventNotFound {
                        layer: layer.clone(),
                        frame,
                    })?;
                self.on_select(id)?;
                Ok(ClickOutcome::Selected(id))
            }
            PlaybackMode::Play => Ok(ClickOutcome::Ignored),
        }
    }
}
