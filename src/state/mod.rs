//! State Management Module
//!
//! Project files and filter presets.

pub mod presets;
pub mod project;

pub use presets::{FilterPreset, FilterProcessor, FilterType, PresetStore};
pub use project::{load_project, save_project, ProjectDocument, BEATSTACK_VERSION};
