//! prepare → upload slices → merge

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

use super::descriptor::{ChunkSpan, SliceIdGenerator, UploadDescriptor};
use crate::api::{ApiRequest, ContentPart, Endpoint, Envelope, PrepareReply, Transport};
use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{ApiError, LfasrError, Result};
use crate::media::{AudioExtractor, PreparedMedia, extension_of, prepare_media, probe_hints};
use crate::signer::RequestSigner;
use crate::task::{StatusCode, Task};

/// Uploads media files and returns the task the service created for them.
#[derive(Clone)]
pub struct ChunkedUploader {
    transport: Arc<dyn Transport>,
    signer: RequestSigner,
    config: ClientConfig,
    extractor: Option<Arc<dyn AudioExtractor>>,
}

impl ChunkedUploader {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let signer = RequestSigner::new(Arc::new(config.credentials.clone()))?;
        Ok(Self {
            transport,
            signer,
            config,
            extractor: None,
        })
    }

    /// Accept video containers by extracting their audio first
    pub fn with_extractor(mut self, extractor: Arc<dyn AudioExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Validate, extract if needed, and upload `path`.
    ///
    /// Any extracted temp file is removed before this returns, on success or failure.
    pub async fn upload(&self, path: &Path) -> Result<Task> {
        let media = prepare_media(path, self.extractor.as_deref()).await?;
        self.upload_prepared(&media).await
    }

    /// Upload media that has already been validated and extracted.
    pub async fn upload_prepared(&self, media: &PreparedMedia) -> Result<Task> {
        let audio_path = media.audio_path();
        let file_size = tokio::fs::metadata(audio_path).await?.len();
        let descriptor = UploadDescriptor::new(
            audio_path,
            file_size,
            upload_file_name(media),
            self.config.slice_size,
        )?;

        info!(
            "Uploading {} ({:.1} MB, {} slices)",
            media.source_path().display(),
            file_size as f64 / 1024.0 / 1024.0,
            descriptor.chunk_count()
        );

        let task_id = self.prepare(&descriptor).await?;
        info!("Prepared task {task_id}");

        self.upload_slices(&task_id, &descriptor).await?;
        self.merge(&task_id, &descriptor).await?;

        info!("Upload of task {task_id} complete");
        Ok(Task::new(task_id, StatusCode::Merged))
    }

    async fn prepare(&self, descriptor: &UploadDescriptor) -> Result<String> {
        let hints = probe_hints(&descriptor.file_path);

        let mut fields = self.signer.auth_fields();
        fields.extend([
            ("file_len", descriptor.file_size.to_string()),
            ("file_name", descriptor.file_name.clone()),
            ("slice_num", descriptor.chunk_count().to_string()),
            ("file_type", extension_of(&descriptor.file_path)),
            ("lfasr_type", "0".to_string()),
            // Field name as spelled by the service
            ("has_seperate", self.config.speakers.separate.to_string()),
        ]);
        if self.config.speakers.separate {
            fields.push((
                "speaker_number",
                self.config.speakers.speaker_number.to_string(),
            ));
        }
        if let Some(rate) = hints.sample_rate {
            fields.push(("sample_rate", rate.to_string()));
        }
        if let Some(channels) = hints.channels {
            fields.push(("channels", channels.to_string()));
        }

        let envelope = self
            .transport
            .send(Endpoint::Prepare, ApiRequest::form(fields))
            .await
            .map_err(|e| LfasrError::upload("prepare request failed", Some(e)))?;
        let reply = PrepareReply::try_from(envelope)
            .map_err(|e| LfasrError::upload("prepare was not accepted", Some(e)))?;
        Ok(reply.task_id)
    }

    async fn upload_slices(&self, task_id: &str, descriptor: &UploadDescriptor) -> Result<()> {
        let mut file = tokio::fs::File::open(&descriptor.file_path).await?;
        let total = descriptor.chunk_count();

        for (span, slice_id) in descriptor.chunks().zip(SliceIdGenerator::new()) {
            let bytes = read_span(&mut file, span).await?;
            let policy = &self.config.retry;

            send_with_retry(policy, &format!("slice {}/{total}", span.index + 1), || {
                let mut fields = self.signer.auth_fields();
                fields.push(("task_id", task_id.to_string()));
                fields.push(("slice_id", slice_id.clone()));
                let request = ApiRequest::multipart(
                    fields,
                    ContentPart {
                        file_name: descriptor.file_name.clone(),
                        bytes: bytes.clone(),
                    },
                );
                self.transport.send(Endpoint::Upload, request)
            })
            .await
            .and_then(Envelope::into_ack)
            .map_err(|e| {
                LfasrError::upload(
                    format!("slice {}/{total} of task {task_id} failed", span.index + 1),
                    Some(e),
                )
            })?;

            info!("Uploaded slice {}/{total}", span.index + 1);
        }
        Ok(())
    }

    async fn merge(&self, task_id: &str, descriptor: &UploadDescriptor) -> Result<()> {
        let mut fields = self.signer.auth_fields();
        fields.push(("task_id", task_id.to_string()));
        fields.push(("file_name", descriptor.file_name.clone()));

        self.transport
            .send(Endpoint::Merge, ApiRequest::form(fields))
            .await
            .and_then(Envelope::into_ack)
            .map_err(|e| LfasrError::upload(format!("merge of task {task_id} failed"), Some(e)))
    }
}

/// Name reported to the service: the caller's file name, with the extracted
/// audio's extension when extraction happened.
fn upload_file_name(media: &PreparedMedia) -> String {
    let source = media.source_path();
    if media.is_extracted() {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        format!("{stem}.{}", extension_of(media.audio_path()))
    } else {
        source
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("audio")
            .to_string()
    }
}

async fn read_span(file: &mut tokio::fs::File, span: ChunkSpan) -> Result<Vec<u8>> {
    file.seek(std::io::SeekFrom::Start(span.offset)).await?;
    let mut buf = vec![0u8; span.len as usize];
    file.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the policy
/// runs out of attempts. Each call builds (and signs) a fresh request.
async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut attempt: F,
) -> std::result::Result<Envelope, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Envelope, ApiError>>,
{
    let mut failures = 0;
    loop {
        match attempt().await {
            Ok(envelope) => return Ok(envelope),
            Err(e) if e.is_retryable() && failures + 1 < policy.max_attempts => {
                failures += 1;
                let delay = policy.delay_for(failures);
                warn!(
                    "{what} failed (attempt {failures}/{}): {e}; retrying in {}ms",
                    policy.max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                debug!("{what} giving up after {} attempt(s)", failures + 1);
                return Err(e);
            }
        }
    }
}
