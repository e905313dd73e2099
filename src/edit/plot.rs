//! Scatter plot adapter
//!
//! One point per event at `(frame, layer_number + 0.5)`. The points are pure
//! presentation: they are never saved and are rebuilt from the stack
//! whenever the model changes underneath them. During a drag a point's `x`
//! may run ahead of its event's frame until the drag is committed.

use std::collections::BTreeMap;

use crate::engine::time::FrameNumber;
use crate::model::{Color, Event, EventId, Stack};

/// Offset of a point's `y` inside its layer row
pub const ROW_CENTER: f64 = 0.5;

/// Vertical plot position of layer `layer_number`
pub fn row_y(layer_number: usize) -> f64 {
    layer_number as f64 + ROW_CENTER
}

/// Movement of the pointer since a drag began, in plot units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlotDelta {
    pub x: f64,
    pub y: f64,
}

impl PlotDelta {
    pub fn new(x: f64, y: f64) -> Self {
        PlotDelta { x, y }
    }

    /// Whole frames moved
    pub fn frames(&self) -> i64 {
        self.x.round() as i64
    }
}

/// Rectangular region in plot coordinates (frame on x, layer row on y)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiRect {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl RoiRect {
    /// Rectangle spanning two corners given in any order
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        RoiRect {
            x_min: x0.min(x1),
            x_max: x0.max(x1),
            y_min: y0.min(y1),
            y_max: y0.max(y1),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotPoint {
    pub event: EventId,
    pub layer_name: String,
    pub name: String,
    pub color: Color,
    pub x: f64,
    pub y: f64,
    pub selected: bool,
}

impl PlotPoint {
    fn from_event(event: &Event) -> Self {
        PlotPoint {
            event: event.id(),
            layer_name: event.parent_layer_name().to_string(),
            name: event.name().to_string(),
            color: event.color(),
            x: event.frame_number() as f64,
            y: row_y(event.parent_layer_number()),
            selected: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScatterPlot {
    points: BTreeMap<EventId, PlotPoint>,
}

impl ScatterPlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regenerate every point from `stack`, keeping selection flags of
    /// events that still exist
    pub fn rebuild(&mut self, stack: &Stack) {
        let previous = std::mem::take(&mut self.points);
        for event in stack.events() {
            let mut point = PlotPoint::from_event(event);
            point.selected = previous
                .get(&event.id())
                .map(|old| old.selected)
                .unwrap_or(false);
            self.points.insert(event.id(), point);
        }
    }

    /// Bring the point for `id` back in line with the model, removing it if
    /// the event is gone
    pub fn sync(&mut self, stack: &Stack, id: EventId) {
        match stack.find_event(id) {
            Some(event) => {
                let selected = self.points.get(&id).map(|p| p.selected).unwrap_or(false);
                let mut point = PlotPoint::from_event(event);
                point.selected = selected;
                self.points.insert(id, point);
            }
            None => {
                self.points.remove(&id);
            }
        }
    }

    pub fn remove(&mut self, id: EventId) -> Option<PlotPoint> {
        self.points.remove(&id)
    }

    pub fn point(&self, id: EventId) -> Option<&PlotPoint> {
        self.points.get(&id)
    }

    pub fn points(&self) -> impl Iterator<Item = &PlotPoint> {
        self.points.values()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Move a point horizontally without touching the model
    pub fn set_visual_frame(&mut self, id: EventId, frame: i64) {
        if let Some(point) = self.points.get_mut(&id) {
            point.x = frame as f64;
        }
    }

    pub fn set_selected(&mut self, id: EventId, selected: bool) {
        if let Some(point) = self.points.get_mut(&id) {
            point.selected = selected;
        }
    }

    /// Events whose points fall inside `rect`, ordered by row then frame
    pub fn points_in_rect(&self, rect: &RoiRect) -> Vec<EventId> {
        let mut hits: Vec<&PlotPoint> = self
            .points
            .values()
            .filter(|point| rect.contains(point.x, point.y))
            .collect();
        hits.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
        hits.into_iter().map(|point| point.event).collect()
    }

    /// Event drawn at `frame` in row `layer_number`
    pub fn point_at(&self, frame: FrameNumber, layer_number: usize) -> Option<EventId> {
        let y = row_y(layer_number);
        self.points
            .values()
            .find(|point| point.x == frame as f64 && point.y == y)
            .map(|point| point.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> Stack {
        let mut stack = Stack::new("song", 1000);
        stack.create_layer("kick").unwrap();
        stack.create_layer("snare").unwrap();
        stack.add_event("kick", 10, None, None).unwrap();
        stack.add_event("kick", 20, None, None).unwrap();
        stack.add_event("snare", 15, None, None).unwrap();
        stack
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let stack = stack();
        let mut plot = ScatterPlot::new();
        plot.rebuild(&stack);
        let first: Vec<PlotPoint> = plot.points().cloned().collect();
        plot.rebuild(&stack);
        let second: Vec<PlotPoint> = plot.points().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(plot.len(), 3);
    }

    #[test]
    fn test_point_coordinates() {
        let stack = stack();
        let mut plot = ScatterPlot::new();
        plot.rebuild(&stack);
        let id = stack.get_event("snare", 15).unwrap().id();
        let point = plot.point(id).unwrap();
        assert_eq!(point.x, 15.0);
        assert_eq!(point.y, 1.5);
        assert_eq!(plot.point_at(15, 1), Some(id));
    }

    #[test]
    fn test_rect_hits() {
        let stack = stack();
        let mut plot = ScatterPlot::new();
        plot.rebuild(&stack);

        let rect = RoiRect::from_corners(25.0, 2.0, 12.0, 0.0);
        let hits = plot.points_in_rect(&rect);
        assert_eq!(
            hits,
            vec![
                stack.get_event("kick", 20).unwrap().id(),
                stack.get_event("snare", 15).unwrap().id(),
            ]
        );
    }

    #[test]
    fn test_sync_removes_deleted() {
        let mut stack = stack();
        let mut plot = ScatterPlot::new();
        plot.rebuild(&stack);
        let id = stack.delete_event("kick", 10).unwrap().id();
        plot.sync(&stack, id);
        assert!(plot.point(id).is_none());
    }

    #[test]
    fn test_delta_rounds_to_frames() {
        assert_eq!(PlotDelta::new(2.4, 0.0).frames(), 2);
        assert_eq!(PlotDelta::new(-2.6, 3.0).frames(), -3);
    }
}
