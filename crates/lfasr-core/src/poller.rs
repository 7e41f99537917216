//! Task status polling.
//!
//! Status codes only move forward: skips are fine, a step back is treated as a service
//! fault. Every query and every sleep in the wait loop races the deadline and the
//! caller's token, so a hung request cannot hold the loop past `timeout`.

use std::sync::Arc;

use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiRequest, Endpoint, Progress, RawResult, Transport};
use crate::config::{ClientConfig, PollOptions};
use crate::error::{ApiError, LfasrError, Result};
use crate::signer::RequestSigner;
use crate::task::StatusCode;

/// Read-only queries against an existing task.
#[derive(Clone)]
pub struct TaskStatusPoller {
    transport: Arc<dyn Transport>,
    signer: RequestSigner,
}

impl TaskStatusPoller {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let signer = RequestSigner::new(Arc::new(config.credentials.clone()))?;
        Ok(Self { transport, signer })
    }

    /// One `getProgress` query.
    pub async fn get_status(&self, task_id: &str) -> Result<StatusCode> {
        let envelope = self
            .transport
            .send(Endpoint::GetProgress, self.query(task_id))
            .await?;
        let progress = Progress::try_from(envelope).map_err(|e| query_error(task_id, e))?;

        StatusCode::from_code(progress.status).ok_or_else(|| LfasrError::Transcription {
            task_id: task_id.to_string(),
            status: Some(progress.status),
            message: format!("unknown status code {} ({})", progress.status, progress.desc),
        })
    }

    /// One `getResult` query. Only meaningful once the task is terminal.
    pub async fn fetch_result(&self, task_id: &str) -> Result<RawResult> {
        let envelope = self
            .transport
            .send(Endpoint::GetResult, self.query(task_id))
            .await?;
        RawResult::try_from(envelope).map_err(|e| query_error(task_id, e))
    }

    /// Poll until the task is terminal, then fetch its result.
    pub async fn wait_for_result(
        &self,
        task_id: &str,
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<RawResult> {
        options.validate()?;

        let started = Instant::now();
        let deadline = started + options.timeout;
        let mut last: Option<StatusCode> = None;

        loop {
            let queried = tokio::select! {
                _ = cancel.cancelled() => return Err(stopped(task_id, last)),
                queried = timeout_at(deadline, self.get_status(task_id)) => queried,
            };
            let Ok(queried) = queried else {
                return Err(timed_out(task_id, last, started));
            };

            match queried {
                Ok(status) => {
                    if let Some(previous) = last
                        && status < previous
                    {
                        return Err(LfasrError::Transcription {
                            task_id: task_id.to_string(),
                            status: Some(status.code()),
                            message: format!("status went back from {previous} to {status}"),
                        });
                    }
                    if last != Some(status) {
                        info!("Task {task_id}: {status}");
                    } else {
                        debug!("Task {task_id}: still {status}");
                    }
                    last = Some(status);

                    if status.is_terminal() {
                        break;
                    }
                }
                Err(LfasrError::Api(e)) if e.is_retryable() => {
                    warn!("Status query for task {task_id} failed: {e}; will retry");
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(timed_out(task_id, last, started));
            }

            let nap = options.interval.min(deadline - now);
            tokio::select! {
                _ = cancel.cancelled() => return Err(stopped(task_id, last)),
                _ = sleep(nap) => {}
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(stopped(task_id, last)),
            fetched = timeout_at(deadline, self.fetch_result(task_id)) => {
                fetched.map_err(|_| timed_out(task_id, last, started))?
            }
        }
    }

    fn query(&self, task_id: &str) -> ApiRequest {
        let mut fields = self.signer.auth_fields();
        fields.push(("task_id", task_id.to_string()));
        ApiRequest::form(fields)
    }
}

fn timed_out(task_id: &str, last_status: Option<StatusCode>, started: Instant) -> LfasrError {
    LfasrError::Timeout {
        task_id: task_id.to_string(),
        last_status,
        elapsed: started.elapsed(),
    }
}

fn stopped(task_id: &str, last_status: Option<StatusCode>) -> LfasrError {
    info!("Stopped waiting for task {task_id}");
    LfasrError::Cancelled {
        task_id: task_id.to_string(),
        last_status,
    }
}

/// A service rejection of a query is a transcription failure; anything else stays an API error.
fn query_error(task_id: &str, err: ApiError) -> LfasrError {
    match err {
        ApiError::Rejected { err_no, message } => LfasrError::Transcription {
            task_id: task_id.to_string(),
            status: None,
            message: format!("service rejected query (err_no {err_no}): {message}"),
        },
        other => LfasrError::Api(other),
    }
}
