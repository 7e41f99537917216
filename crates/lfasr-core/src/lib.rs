pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod poller;
pub mod settings;
pub mod signer;
pub mod task;
pub mod transcript;
pub mod upload;

pub use api::{Endpoint, HttpTransport, RawResult, RawSegment, Transport};
pub use batch::{BatchItem, BatchItemStatus, BatchReport, BatchScheduler, REPORT_FILE_NAME};
pub use config::{ClientConfig, Credentials, PollOptions, RetryPolicy, SpeakerOptions};
pub use error::{ApiError, BatchItemError, ErrorKind, LfasrError, Result};
pub use media::{DEFAULT_EXTENSIONS, FfmpegExtractor, find_media_files};
pub use pipeline::{OutputPaths, TranscribeOutcome, Transcriber};
pub use poller::TaskStatusPoller;
pub use settings::Settings;
pub use signer::{RequestSigner, Signature};
pub use task::{StatusCode, Task};
pub use transcript::{FormattedTranscript, Segment, SpeakerGroup, format};
pub use upload::{ChunkedUploader, UploadDescriptor};
