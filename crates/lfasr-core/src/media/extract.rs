//! Audio extraction from video containers via FFmpeg.
//!
//! Extracted audio lives in a temp file owned by `PreparedMedia`; dropping it removes
//! the file, so every exit path of the pipeline that created it cleans up.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempPath;
use tracing::{debug, info};

use super::{MediaKind, classify};
use crate::error::{LfasrError, Result};

/// Turns a video (or other container) into an uploadable audio file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Write the audio track to a new temp file and return its path.
    async fn extract(&self, input: &Path) -> Result<TempPath>;
}

/// Extractor that shells out to `ffmpeg`
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    program: PathBuf,
}

impl FfmpegExtractor {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }

    /// Use a specific ffmpeg binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, input: &Path) -> Result<TempPath> {
        let output = tempfile::Builder::new()
            .prefix("lfasr_extract_")
            .suffix(".mp3")
            .tempfile()?
            .into_temp_path();

        info!("Extracting audio from {}", input.display());

        let result = tokio::process::Command::new(&self.program)
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(input)
            .args(["-vn", "-codec:a", "libmp3lame", "-b:a", "128k", "-y"])
            .arg(&output)
            .output()
            .await
            .map_err(|e| {
                LfasrError::Extraction(format!(
                    "failed to execute {}: {e}. Make sure ffmpeg is installed.",
                    self.program.display()
                ))
            })?;

        if !result.status.success() {
            // `output` drops here and removes the partial file
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(LfasrError::Extraction(format!(
                "ffmpeg failed for {}: {}",
                input.display(),
                stderr.trim()
            )));
        }

        debug!("Extracted audio to {}", output.display());
        Ok(output)
    }
}

/// An uploadable audio file plus the temp file backing it, if one was created.
#[derive(Debug)]
pub struct PreparedMedia {
    audio_path: PathBuf,
    source_path: PathBuf,
    temp: Option<TempPath>,
}

impl PreparedMedia {
    /// Path to upload
    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Path the caller supplied
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn is_extracted(&self) -> bool {
        self.temp.is_some()
    }
}

/// Validate `path` and run extraction when its container needs it.
///
/// Fails with `UnsupportedFormat` for unknown extensions, and for extractable containers
/// when no extractor is configured.
pub async fn prepare_media(
    path: &Path,
    extractor: Option<&dyn AudioExtractor>,
) -> Result<PreparedMedia> {
    if !path.is_file() {
        return Err(LfasrError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path.display()),
        )));
    }

    match classify(path)? {
        MediaKind::Audio => Ok(PreparedMedia {
            audio_path: path.to_path_buf(),
            source_path: path.to_path_buf(),
            temp: None,
        }),
        MediaKind::NeedsExtraction => {
            let Some(extractor) = extractor else {
                return Err(LfasrError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    extension: super::extension_of(path),
                });
            };
            let temp = extractor.extract(path).await?;
            Ok(PreparedMedia {
                audio_path: temp.to_path_buf(),
                source_path: path.to_path_buf(),
                temp: Some(temp),
            })
        }
    }
}
