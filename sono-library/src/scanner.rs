//! Folder scanning for playable tracks

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File extensions the player accepts
const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Error type for folder scanning
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One playable file found in a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub path: PathBuf,
    /// Display title derived from the file stem
    pub title: String,
}

/// List the playable files directly inside `dir`
///
/// Subdirectories are not descended into. Results are sorted by filename
/// so that playlist indices stay stable across rescans of an unchanged
/// folder.
pub fn scan_folder(dir: &Path) -> Result<Vec<TrackEntry>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if AUDIO_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                files.push(path);
            }
        }
    }

    files.sort();
    debug!("scanned {} playable tracks in {}", files.len(), dir.display());

    Ok(files
        .into_iter()
        .map(|path| {
            let title = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Unknown")
                .to_string();
            TrackEntry { path, title }
        })
        .collect())
}
