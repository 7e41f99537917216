//! Transport boundary for the lfasr HTTP API.
//!
//! Every endpoint answers with the same envelope (`ok`, `err_no`, `failed`, `data`).
//! `Transport` sends one request and returns the envelope; `types` turns it into a typed
//! reply per endpoint so nothing downstream inspects raw JSON.

mod http;
#[cfg(test)]
pub(crate) mod testing;
mod types;

use async_trait::async_trait;

use crate::error::ApiError;

pub use http::HttpTransport;
pub use types::{Envelope, PrepareReply, Progress, RawResult, RawSegment};

/// API endpoints used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Prepare,
    Upload,
    Merge,
    GetProgress,
    GetResult,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Prepare => "/prepare",
            Endpoint::Upload => "/upload",
            Endpoint::Merge => "/merge",
            Endpoint::GetProgress => "/getProgress",
            Endpoint::GetResult => "/getResult",
        }
    }

    /// Endpoints that only read remote state
    pub fn is_query(&self) -> bool {
        matches!(self, Endpoint::GetProgress | Endpoint::GetResult)
    }
}

/// Binary part of a multipart upload
#[derive(Debug, Clone)]
pub struct ContentPart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One signed request: form fields plus an optional binary part.
///
/// Requests without content go out url-encoded; requests with content go out as multipart.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub fields: Vec<(&'static str, String)>,
    pub content: Option<ContentPart>,
}

impl ApiRequest {
    pub fn form(fields: Vec<(&'static str, String)>) -> Self {
        Self {
            fields,
            content: None,
        }
    }

    pub fn multipart(fields: Vec<(&'static str, String)>, content: ContentPart) -> Self {
        Self {
            fields,
            content: Some(content),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Sends requests to the service.
///
/// Implementations must be safe to share across batch workers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: Endpoint, request: ApiRequest) -> Result<Envelope, ApiError>;
}
