//! Project file persistence
//!
//! A project is one pretty-printed JSON file holding the whole [`Session`]:
//! songs (metadata and source path, not samples), stacks with their layers
//! and events, the loaded pointers, the onset pool and the save path.
//! Plot points are not stored; callers rebuild them from the loaded stacks.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{BeatstackError, Result};
use crate::model::Session;

/// Crate version written into every project file
pub const BEATSTACK_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub beatstack_version: String,
    pub saved_at: DateTime<Utc>,
    pub session: Session,
}

/// Write `session` to `path`, remembering `path` as its save path
pub fn save_project(session: &mut Session, path: &Path) -> Result<()> {
    session.set_save_path(path);

    let document = ProjectDocument {
        beatstack_version: BEATSTACK_VERSION.to_string(),
        saved_at: Utc::now(),
        session: session.clone(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| BeatstackError::DirectoryCreateError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let content = serde_json::to_string_pretty(&document)?;
    fs::write(path, content).map_err(|e| BeatstackError::FileWriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!("Saved project to {}", path.display());
    Ok(())
}

/// Read a project file
///
/// Nothing is returned unless the whole file parses and every stack passes
/// validation. Song audio is re-read from the source files; a song whose
/// source cannot be read loads without samples and is reported.
///
/// # Errors
/// * `FileNotFound` - If `path` does not exist
/// * `EmptyProjectFile` - If the file is empty
/// * `CorruptProject` - If the file does not parse or fails validation
pub fn load_project(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Err(BeatstackError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| BeatstackError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    if content.trim().is_empty() {
        return Err(BeatstackError::EmptyProjectFile {
            path: path.to_path_buf(),
        });
    }

    let document: ProjectDocument =
        serde_json::from_str(&content).map_err(|e| BeatstackError::CorruptProject {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let mut session = document.session;
    session
        .validate()
        .map_err(|reason| BeatstackError::CorruptProject {
            path: path.to_path_buf(),
            reason,
        })?;

    let failures = session.reload_audio();
    if !failures.is_empty() {
        warn!("{} song(s) loaded without audio", failures.len());
    }
    session.set_save_path(path);

    info!(
        "Loaded project {} (saved {} by version {})",
        path.display(),
        document.saved_at.to_rfc3339(),
        document.beatstack_version
    );
    Ok(session)
}
