//! One file, end to end: upload, wait, format, persist.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{HttpTransport, RawResult, Transport};
use crate::config::{ClientConfig, PollOptions};
use crate::error::{LfasrError, Result};
use crate::media::{AudioExtractor, FfmpegExtractor};
use crate::poller::TaskStatusPoller;
use crate::transcript::{format, segments_from_raw};
use crate::upload::ChunkedUploader;

/// Where one input's transcript files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub text: PathBuf,
    pub raw: PathBuf,
}

impl OutputPaths {
    pub fn from_stem(output_dir: &Path, stem: &str) -> Self {
        Self {
            text: output_dir.join(format!("{stem}_transcript.txt")),
            raw: output_dir.join(format!("{stem}_transcript.json")),
        }
    }

    /// Paths for a single input, named after its stem
    pub fn for_input(input: &Path, output_dir: &Path) -> Self {
        Self::from_stem(output_dir, &stem_of(input))
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("audio")
        .to_string()
}

/// Output paths for a batch, in input order.
///
/// The first input with a given stem gets the plain name; later ones get `-2`, `-3`, ...
pub fn plan_outputs(inputs: &[PathBuf], output_dir: &Path) -> Vec<OutputPaths> {
    let mut taken: HashSet<String> = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = stem_of(input);
            let mut candidate = stem.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{stem}-{n}");
                n += 1;
            }
            OutputPaths::from_stem(output_dir, &candidate)
        })
        .collect()
}

/// Result of a finished pipeline run
#[derive(Debug, Clone)]
pub struct TranscribeOutcome {
    pub task_id: String,
    pub outputs: OutputPaths,
    pub full_text: String,
    pub raw: RawResult,
}

/// Uploader and poller sharing one configuration and transport.
#[derive(Clone)]
pub struct Transcriber {
    uploader: ChunkedUploader,
    poller: TaskStatusPoller,
    poll: PollOptions,
}

impl Transcriber {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>, poll: PollOptions) -> Result<Self> {
        poll.validate()?;
        let poller = TaskStatusPoller::new(&config, transport.clone())?;
        let uploader = ChunkedUploader::new(config, transport)?;
        Ok(Self {
            uploader,
            poller,
            poll,
        })
    }

    /// HTTP transport plus FFmpeg extraction
    pub fn connect(config: ClientConfig, poll: PollOptions) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.clone())?);
        Ok(Self::new(config, transport, poll)?.with_extractor(Arc::new(FfmpegExtractor::new())))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn AudioExtractor>) -> Self {
        self.uploader = self.uploader.with_extractor(extractor);
        self
    }

    pub fn uploader(&self) -> &ChunkedUploader {
        &self.uploader
    }

    pub fn poller(&self) -> &TaskStatusPoller {
        &self.poller
    }

    pub fn poll_options(&self) -> &PollOptions {
        &self.poll
    }

    /// Run the whole pipeline for `input` and write both output files.
    ///
    /// Errors raised after the upload carry the task id so the caller can resume.
    pub async fn transcribe(
        &self,
        input: &Path,
        outputs: &OutputPaths,
        cancel: &CancellationToken,
    ) -> Result<TranscribeOutcome> {
        let task = self.uploader.upload(input).await?;
        let raw = self
            .poller
            .wait_for_result(&task.task_id, &self.poll, cancel)
            .await?;

        let full_text = format(&segments_from_raw(&raw));
        write_outputs(outputs, &full_text, &raw).await?;
        info!("Wrote {}", outputs.text.display());

        Ok(TranscribeOutcome {
            task_id: task.task_id,
            outputs: outputs.clone(),
            full_text,
            raw,
        })
    }
}

/// Write the formatted text and the raw segment array.
pub async fn write_outputs(outputs: &OutputPaths, full_text: &str, raw: &RawResult) -> Result<()> {
    for path in [&outputs.text, &outputs.raw] {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_string_pretty(raw)
        .map_err(|e| LfasrError::Io(std::io::Error::other(e)))?;
    tokio::fs::write(&outputs.text, full_text).await?;
    tokio::fs::write(&outputs.raw, json).await?;
    Ok(())
}
