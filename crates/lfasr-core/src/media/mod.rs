//! Media classification, audio extraction and input discovery.

mod discover;
pub(crate) mod extract;
mod probe;

use std::path::Path;

pub use discover::{DEFAULT_EXTENSIONS, find_media_files};
pub use extract::{AudioExtractor, FfmpegExtractor, PreparedMedia, prepare_media};
pub use probe::{AudioHints, probe_hints};

use crate::error::{LfasrError, Result};

/// Formats the upload endpoint accepts as-is
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "opus", "m4a", "mp3"];

/// Containers that must go through audio extraction first
pub const EXTRACT_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "m4v", "webm", "ogg", "aac",
];

/// How a file has to be handled before upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Upload directly
    Audio,
    /// Extract an audio track first
    NeedsExtraction,
}

/// Lower-cased extension of `path`, or an empty string
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Classify by extension; anything outside the known sets is `UnsupportedFormat`.
pub fn classify(path: &Path) -> Result<MediaKind> {
    let extension = extension_of(path);
    if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        Ok(MediaKind::Audio)
    } else if EXTRACT_EXTENSIONS.contains(&extension.as_str()) {
        Ok(MediaKind::NeedsExtraction)
    } else {
        Err(LfasrError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        })
    }
}
