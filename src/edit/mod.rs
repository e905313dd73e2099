//! Interactive editing
//!
//! - [`Selection`]: ordered ids of the selected events
//! - [`ScatterPlot`]: the plot points the events are drawn as
//! - [`StackEditor`] / [`EditSession`]: click, select and drag handling

pub mod editor;
pub mod plot;
pub mod selection;

pub use editor::{
    ClickOutcome, DragOutcome, DragState, EditSession, EventSink, PlaybackMode, StackEditor,
};
pub use plot::{row_y, PlotDelta, PlotPoint, RoiRect, ScatterPlot, ROW_CENTER};
pub use selection::Selection;
