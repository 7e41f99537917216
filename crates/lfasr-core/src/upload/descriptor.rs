//! Chunk planning for one upload.

use std::path::{Path, PathBuf};

use crate::config::MAX_FILE_SIZE;
use crate::error::{LfasrError, Result};

/// Size facts about the file being uploaded, computed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDescriptor {
    pub file_path: PathBuf,
    pub file_size: u64,
    pub file_name: String,
    pub slice_size: u64,
}

/// Byte range of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: u64,
    pub offset: u64,
    pub len: u64,
}

impl UploadDescriptor {
    /// Reject empty and oversized files before anything touches the network.
    pub fn new(
        file_path: &Path,
        file_size: u64,
        file_name: impl Into<String>,
        slice_size: u64,
    ) -> Result<Self> {
        if slice_size == 0 {
            return Err(LfasrError::Configuration(
                "slice size must be greater than zero".into(),
            ));
        }
        if file_size == 0 {
            return Err(LfasrError::upload(
                format!("{} is empty", file_path.display()),
                None,
            ));
        }
        if file_size > MAX_FILE_SIZE {
            return Err(LfasrError::upload(
                format!(
                    "{} is {:.1} MB, above the {} MB limit",
                    file_path.display(),
                    file_size as f64 / 1024.0 / 1024.0,
                    MAX_FILE_SIZE / 1024 / 1024
                ),
                None,
            ));
        }
        Ok(Self {
            file_path: file_path.to_path_buf(),
            file_size,
            file_name: file_name.into(),
            slice_size,
        })
    }

    pub fn chunk_count(&self) -> u64 {
        self.file_size.div_ceil(self.slice_size)
    }

    pub fn chunks(&self) -> impl Iterator<Item = ChunkSpan> + '_ {
        (0..self.chunk_count()).map(move |index| {
            let offset = index * self.slice_size;
            ChunkSpan {
                index,
                offset,
                len: self.slice_size.min(self.file_size - offset),
            }
        })
    }
}

/// Produces the service's slice ids: a 10-letter base-26 counter starting at `aaaaaaaaaa`.
#[derive(Debug, Clone)]
pub struct SliceIdGenerator {
    current: [u8; 10],
    started: bool,
}

impl SliceIdGenerator {
    pub fn new() -> Self {
        Self {
            current: [b'a'; 10],
            started: false,
        }
    }
}

impl Default for SliceIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for SliceIdGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.started {
            for byte in self.current.iter_mut().rev() {
                if *byte == b'z' {
                    *byte = b'a';
                } else {
                    *byte += 1;
                    break;
                }
            }
        }
        self.started = true;
        Some(self.current.iter().map(|b| *b as char).collect())
    }
}
