//! Chunked upload: prepare a task, send the file in fixed-size slices, then merge.

mod descriptor;
mod uploader;

pub use descriptor::{ChunkSpan, SliceIdGenerator, UploadDescriptor};
pub use uploader::ChunkedUploader;
