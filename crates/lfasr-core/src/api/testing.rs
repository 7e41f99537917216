//! Scripted in-memory transport for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ApiRequest, Endpoint, Envelope, Transport};
use crate::error::ApiError;

type Handler = Box<dyn Fn(Endpoint, &ApiRequest) -> Result<Envelope, ApiError> + Send + Sync>;

/// A call seen by the transport
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub endpoint: Endpoint,
    pub fields: Vec<(&'static str, String)>,
    pub content_len: Option<usize>,
}

impl RecordedCall {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Replies from per-endpoint queues first, then from the fallback handler.
pub(crate) struct ScriptedTransport {
    queues: Mutex<HashMap<Endpoint, VecDeque<Result<Envelope, ApiError>>>>,
    fallback: Handler,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    /// Every endpoint succeeds; task ids are derived from the uploaded file name.
    pub fn happy() -> Self {
        Self::with_handler(happy_path)
    }

    pub fn with_handler(
        handler: impl Fn(Endpoint, &ApiRequest) -> Result<Envelope, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            fallback: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, endpoint: Endpoint, reply: Result<Envelope, ApiError>) -> &Self {
        self.queues
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn push_progress(&self, statuses: &[i64]) -> &Self {
        for status in statuses {
            self.push(Endpoint::GetProgress, Ok(progress(*status)));
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, endpoint: Endpoint, request: ApiRequest) -> Result<Envelope, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            endpoint,
            fields: request.fields.clone(),
            content_len: request.content.as_ref().map(|c| c.bytes.len()),
        });

        let queued = self
            .queues
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(|q| q.pop_front());
        match queued {
            Some(reply) => reply,
            None => (self.fallback)(endpoint, &request),
        }
    }
}

pub(crate) fn progress(status: i64) -> Envelope {
    Envelope::success(Some(Value::String(
        json!({"status": status, "desc": "scripted"}).to_string(),
    )))
}

pub(crate) fn segments(items: &[(&str, &str)]) -> Envelope {
    let data: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(i, (speaker, text))| {
            json!({
                "bg": (i * 1000).to_string(),
                "ed": (i * 1000 + 900).to_string(),
                "onebest": text,
                "speaker": speaker,
            })
        })
        .collect();
    Envelope::success(Some(Value::String(Value::Array(data).to_string())))
}

pub(crate) fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        body: "busy".into(),
    }
}

pub(crate) fn happy_path(endpoint: Endpoint, request: &ApiRequest) -> Result<Envelope, ApiError> {
    match endpoint {
        Endpoint::Prepare => {
            let name = request.field("file_name").unwrap_or("unnamed");
            Ok(Envelope::success(Some(Value::String(format!("task-{name}")))))
        }
        Endpoint::Upload | Endpoint::Merge => Ok(Envelope::success(None)),
        Endpoint::GetProgress => Ok(progress(9)),
        Endpoint::GetResult => {
            let task_id = request.field("task_id").unwrap_or("");
            Ok(segments(&[("0", task_id)]))
        }
    }
}
