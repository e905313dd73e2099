//! Application configuration
//!
//! Read from a JSON file; every field is optional and falls back to its
//! default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::time::FrameRate;
use crate::error::{BeatstackError, Result};
use crate::model::MAX_LAYER_NAME_LEN;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeline frames per second
    pub frame_rate: FrameRate,
    pub max_layer_name_len: usize,
    /// Where filter presets are kept
    pub filters_dir: PathBuf,
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Where rendered playback files are written
    pub playback_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            frame_rate: FrameRate::default(),
            max_layer_name_len: MAX_LAYER_NAME_LEN,
            filters_dir: PathBuf::from("filters"),
            log_filter: "info".to_string(),
            playback_dir: std::env::temp_dir().join("beatstack"),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| BeatstackError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Config::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Config> {
        let config: Config = serde_json::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.frame_rate.fps(), 30);
        assert_eq!(config.max_layer_name_len, 20);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_str(r#"{ "frame_rate": 24, "log_filter": "debug" }"#).unwrap();
        assert_eq!(config.frame_rate.fps(), 24);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.filters_dir, PathBuf::from("filters"));
    }

    #[test]
    fn test_zero_frame_rate_rejected() {
        assert!(Config::from_str(r#"{ "frame_rate": 0 }"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beatstack.json");
        fs::write(&path, r#"{ "max_layer_name_len": 8 }"#).unwrap();
        assert_eq!(Config::from_file(&path).unwrap().max_layer_name_len, 8);
        assert!(Config::from_file(&dir.path().join("missing.json")).is_err());
    }
}
