//! Concurrent batch processing.
//!
//! A fixed pool of worker tasks pulls items from a work channel and runs the full
//! pipeline for each one. Outcomes come back over a result channel tagged with their
//! input index, so the report keeps input order whatever the completion order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{BatchItemError, ErrorKind, LfasrError, Result};
use crate::pipeline::{OutputPaths, Transcriber, plan_outputs};

/// File name of the report written into the output directory
pub const REPORT_FILE_NAME: &str = "batch_process_report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Outcome of one input, owned by the worker processing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub status: BatchItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchItemError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl BatchItem {
    fn pending(input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            input_path,
            output_path,
            status: BatchItemStatus::Pending,
            error: None,
            task_id: None,
        }
    }
}

/// Aggregate outcome of one batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
    pub started_at: DateTime<Utc>,
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    fn from_items(items: Vec<BatchItem>, started_at: DateTime<Utc>, elapsed_secs: f64) -> Self {
        let succeeded = items
            .iter()
            .filter(|i| i.status == BatchItemStatus::Succeeded)
            .count();
        Self {
            total: items.len(),
            succeeded,
            failed: items.len() - succeeded,
            elapsed_secs,
            started_at,
            items,
        }
    }

    /// Write the report as pretty JSON into `output_dir` and return its path.
    pub async fn write_to(&self, output_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(REPORT_FILE_NAME);
        let json =
            serde_json::to_string_pretty(self).map_err(|e| LfasrError::Io(std::io::Error::other(e)))?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

struct WorkItem {
    index: usize,
    item: BatchItem,
    outputs: OutputPaths,
}

/// Runs independent pipelines under a worker cap.
pub struct BatchScheduler {
    transcriber: Arc<Transcriber>,
    cancel: CancellationToken,
}

impl BatchScheduler {
    pub fn new(transcriber: Transcriber) -> Self {
        Self {
            transcriber: Arc::new(transcriber),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops every in-flight wait; cancelled items are recorded as failed.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process `inputs` with at most `max_workers` pipelines in flight and write the report.
    ///
    /// Item failures are recorded in the report. Only a failure to write the report is
    /// returned as an error.
    pub async fn run(
        &self,
        inputs: Vec<PathBuf>,
        output_dir: &Path,
        max_workers: usize,
    ) -> Result<BatchReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let total = inputs.len();
        let workers = max_workers.max(1).min(total.max(1));

        info!("Processing {total} file(s) with {workers} worker(s)");

        let plans = plan_outputs(&inputs, output_dir);
        let pending: Vec<BatchItem> = inputs
            .into_iter()
            .zip(&plans)
            .map(|(input, outputs)| BatchItem::pending(input, outputs.text.clone()))
            .collect();

        let (work_tx, work_rx) = mpsc::unbounded_channel();
        for (index, (item, outputs)) in pending.iter().cloned().zip(plans).enumerate() {
            // The receiver outlives this loop
            let _ = work_tx.send(WorkItem {
                index,
                item,
                outputs,
            });
        }
        drop(work_tx);

        let work_rx = Arc::new(Mutex::new(work_rx));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(usize, BatchItem)>();

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                let transcriber = self.transcriber.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    loop {
                        let next = work_rx.lock().await.recv().await;
                        let Some(work) = next else { break };
                        let index = work.index;
                        let finished = process_item(&transcriber, work, &cancel, total).await;
                        if done_tx.send((index, finished)).is_err() {
                            break;
                        }
                    }
                    info!("Worker {worker} finished");
                })
            })
            .collect();
        drop(done_tx);

        let mut slots: Vec<Option<BatchItem>> = vec![None; total];
        while let Some((index, item)) = done_rx.recv().await {
            slots[index] = Some(item);
        }

        let mut lost = Vec::new();
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!("Batch worker stopped unexpectedly: {e}");
                lost.push(e.to_string());
            }
        }

        let items = fill_unfinished(slots, pending, &lost);
        let report = BatchReport::from_items(items, started_at, clock.elapsed().as_secs_f64());
        let path = report.write_to(output_dir).await?;
        info!(
            "Batch done: {} succeeded, {} failed; report at {}",
            report.succeeded,
            report.failed,
            path.display()
        );
        Ok(report)
    }
}

/// Items without an outcome belonged to a worker that died; record them as failed.
fn fill_unfinished(
    slots: Vec<Option<BatchItem>>,
    pending: Vec<BatchItem>,
    lost_workers: &[String],
) -> Vec<BatchItem> {
    let cause = if lost_workers.is_empty() {
        "no outcome was reported".to_string()
    } else {
        lost_workers.join("; ")
    };
    slots
        .into_iter()
        .zip(pending)
        .map(|(slot, pending)| {
            slot.unwrap_or_else(|| {
                warn!("{} was never completed", pending.input_path.display());
                BatchItem {
                    status: BatchItemStatus::Failed,
                    error: Some(BatchItemError {
                        kind: ErrorKind::Io,
                        message: format!("worker stopped before finishing this item: {cause}"),
                    }),
                    ..pending
                }
            })
        })
        .collect()
}

async fn process_item(
    transcriber: &Transcriber,
    work: WorkItem,
    cancel: &CancellationToken,
    total: usize,
) -> BatchItem {
    let WorkItem {
        index,
        mut item,
        outputs,
    } = work;
    item.status = BatchItemStatus::Running;
    info!("[{}/{total}] {}", index + 1, item.input_path.display());

    match transcriber.transcribe(&item.input_path, &outputs, cancel).await {
        Ok(outcome) => {
            item.status = BatchItemStatus::Succeeded;
            item.task_id = Some(outcome.task_id);
        }
        Err(e) => {
            warn!("[{}/{total}] {} failed: {e}", index + 1, item.input_path.display());
            item.status = BatchItemStatus::Failed;
            item.task_id = e.task_id().map(str::to_string);
            item.error = Some(BatchItemError::from(&e));
        }
    }
    item
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::api::testing::{ScriptedTransport, happy_path};
    use crate::api::{ApiRequest, Endpoint, Envelope, Transport};
    use crate::config::{ClientConfig, Credentials, PollOptions};
    use crate::error::ApiError;
    use crate::pipeline::tests::transcriber;

    fn write(path: &Path, bytes: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_item_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![
            dir.path().join("in/one.wav"),
            dir.path().join("in/notes.txt"),
            dir.path().join("in/two.mp3"),
        ];
        for input in &inputs {
            write(input, b"0123456789");
        }
        let out = dir.path().join("out");
        let transport = Arc::new(ScriptedTransport::happy());

        let report = BatchScheduler::new(transcriber(&transport))
            .run(inputs.clone(), &out, 2)
            .await
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);

        let failed = &report.items[1];
        assert_eq!(failed.status, BatchItemStatus::Failed);
        assert_eq!(
            failed.error.as_ref().map(|e| e.kind),
            Some(ErrorKind::UnsupportedFormat)
        );
        assert!(out.join("one_transcript.txt").exists());
        assert!(out.join("one_transcript.json").exists());
        assert!(out.join("two_transcript.txt").exists());
        assert!(!out.join("notes_transcript.txt").exists());
        assert_eq!(
            std::fs::read_to_string(out.join("two_transcript.txt")).unwrap(),
            "task-two.mp3"
        );
    }

    #[tokio::test]
    async fn test_report_keeps_input_order_and_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<PathBuf> = ["c.wav", "a.wav", "b.wav", "d.wav", "e.wav"]
            .iter()
            .map(|n| dir.path().join(n))
            .collect();
        for input in &inputs {
            write(input, b"abc");
        }
        let transport = Arc::new(ScriptedTransport::happy());

        let report = BatchScheduler::new(transcriber(&transport))
            .run(inputs.clone(), dir.path(), 4)
            .await
            .unwrap();

        let order: Vec<&PathBuf> = report.items.iter().map(|i| &i.input_path).collect();
        assert_eq!(order, inputs.iter().collect::<Vec<_>>());
        assert!(
            report
                .items
                .iter()
                .all(|i| i.status == BatchItemStatus::Succeeded && i.task_id.is_some())
        );
        assert_eq!(transport.count(Endpoint::Merge), 5);

        let written: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(REPORT_FILE_NAME)).unwrap(),
        )
        .unwrap();
        assert_eq!(written["total"], 5);
        assert_eq!(written["succeeded"], 5);
        assert_eq!(written["items"][0]["status"], "succeeded");
        assert!(written["started_at"].is_string());
    }

    #[tokio::test]
    async fn test_colliding_stems_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![dir.path().join("a/talk.wav"), dir.path().join("b/talk.wav")];
        for input in &inputs {
            write(input, b"abc");
        }
        let out = dir.path().join("out");
        let transport = Arc::new(ScriptedTransport::happy());

        let report = BatchScheduler::new(transcriber(&transport))
            .run(inputs, &out, 2)
            .await
            .unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.items[0].output_path, out.join("talk_transcript.txt"));
        assert_eq!(report.items[1].output_path, out.join("talk-2_transcript.txt"));
        assert!(out.join("talk-2_transcript.json").exists());
    }

    #[tokio::test]
    async fn test_empty_batch_and_zero_workers() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::happy());

        let report = BatchScheduler::new(transcriber(&transport))
            .run(Vec::new(), dir.path(), 0)
            .await
            .unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.failed, 0);
        assert!(dir.path().join(REPORT_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_failed_wait_records_task_id() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("x.wav");
        write(&input, b"abc");
        let transport = Arc::new(ScriptedTransport::happy());
        transport.push_progress(&[-7]);

        let report = BatchScheduler::new(transcriber(&transport))
            .run(vec![input], dir.path(), 1)
            .await
            .unwrap();

        let item = &report.items[0];
        assert_eq!(item.status, BatchItemStatus::Failed);
        assert_eq!(item.task_id.as_deref(), Some("task-x.wav"));
        assert_eq!(
            item.error.as_ref().map(|e| e.kind),
            Some(ErrorKind::Transcription)
        );
    }

    /// Counts pipelines between `prepare` and `getResult`, pausing on every call.
    #[derive(Default)]
    struct GaugeTransport {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Transport for GaugeTransport {
        async fn send(
            &self,
            endpoint: Endpoint,
            request: ApiRequest,
        ) -> std::result::Result<Envelope, ApiError> {
            if endpoint == Endpoint::Prepare {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            if endpoint == Endpoint::GetResult {
                self.active.fetch_sub(1, Ordering::SeqCst);
            }
            happy_path(endpoint, &request)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pipelines_in_flight_never_exceed_workers() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<PathBuf> = (0..8).map(|i| dir.path().join(format!("{i}.wav"))).collect();
        for input in &inputs {
            write(input, b"abc");
        }
        let gauge = Arc::new(GaugeTransport::default());
        let config = ClientConfig::new(Credentials::new("app", "secret").unwrap()).with_slice_size(4);
        let poll = PollOptions::new(Duration::from_secs(1), Duration::from_secs(60));
        let transcriber = Transcriber::new(config, gauge.clone(), poll).unwrap();

        let report = BatchScheduler::new(transcriber)
            .run(inputs, dir.path(), 3)
            .await
            .unwrap();

        assert_eq!(report.succeeded, 8);
        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak {peak} exceeds the worker cap");
        assert!(peak > 1, "pipelines never overlapped");
        assert_eq!(gauge.active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_worker_leaves_failed_item_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![
            dir.path().join("a.wav"),
            dir.path().join("boom.wav"),
            dir.path().join("c.wav"),
        ];
        for input in &inputs {
            write(input, b"abc");
        }
        let transport = Arc::new(ScriptedTransport::with_handler(|endpoint, request| {
            if endpoint == Endpoint::Prepare && request.field("file_name") == Some("boom.wav") {
                panic!("transport blew up");
            }
            happy_path(endpoint, request)
        }));

        let report = BatchScheduler::new(transcriber(&transport))
            .run(inputs, dir.path(), 2)
            .await
            .unwrap();

        assert_eq!(report.succeeded, 2);
        let lost = &report.items[1];
        assert_eq!(lost.status, BatchItemStatus::Failed);
        let error = lost.error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Io);
        assert!(error.message.contains("worker stopped"));
    }

    #[test]
    fn test_unfinished_slots_carry_the_worker_failure() {
        let pending = vec![
            BatchItem::pending("a.wav".into(), "a_transcript.txt".into()),
            BatchItem::pending("b.wav".into(), "b_transcript.txt".into()),
        ];
        let done = BatchItem {
            status: BatchItemStatus::Succeeded,
            ..pending[0].clone()
        };

        let items = fill_unfinished(
            vec![Some(done.clone()), None],
            pending,
            &["task 7 panicked".to_string()],
        );

        assert_eq!(items[0], done);
        assert_eq!(items[1].status, BatchItemStatus::Failed);
        let error = items[1].error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Io);
        assert!(error.message.contains("task 7 panicked"));
    }
}
