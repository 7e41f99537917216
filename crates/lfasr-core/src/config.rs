//! Client configuration passed explicitly into every component.

use std::fmt;
use std::time::Duration;

use crate::error::{LfasrError, Result};

pub const DEFAULT_BASE_URL: &str = "https://raasr.xfyun.cn/api";
/// Slice size accepted by the upload endpoint
pub const DEFAULT_SLICE_SIZE: u64 = 10 * 1024 * 1024;
/// Largest file the service accepts
pub const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 5 * 60 * 60;
pub const DEFAULT_MAX_WORKERS: usize = 1;

/// Environment variable names for credentials
pub const ENV_APP_ID: &str = "XFYUN_APP_ID";
pub const ENV_SECRET_KEY: &str = "XFYUN_SECRET_KEY";

/// Application credentials issued by the iFlytek console.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_id: String,
    secret_key: String,
}

impl Credentials {
    /// Fails if either value is blank.
    pub fn new(app_id: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let app_id = app_id.into().trim().to_string();
        let secret_key = secret_key.into().trim().to_string();
        if app_id.is_empty() {
            return Err(LfasrError::Configuration("app id is empty".into()));
        }
        if secret_key.is_empty() {
            return Err(LfasrError::Configuration("secret key is empty".into()));
        }
        Ok(Self { app_id, secret_key })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub(crate) fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Server-side diarization parameters sent with `prepare`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerOptions {
    pub separate: bool,
    pub speaker_number: u32,
}

impl Default for SpeakerOptions {
    fn default() -> Self {
        Self {
            separate: true,
            speaker_number: 2,
        }
    }
}

/// Bounded retry with exponential backoff for a single chunk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based count of failures so far)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Polling cadence for `wait_for_result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollOptions {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(LfasrError::Configuration(
                "poll interval must be greater than zero".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(LfasrError::Configuration(
                "poll timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

/// Everything a client needs to talk to the service. Immutable once built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub base_url: String,
    pub slice_size: u64,
    pub speakers: SpeakerOptions,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            slice_size: DEFAULT_SLICE_SIZE,
            speakers: SpeakerOptions::default(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_slice_size(mut self, slice_size: u64) -> Self {
        self.slice_size = slice_size;
        self
    }

    pub fn with_speakers(mut self, speakers: SpeakerOptions) -> Self {
        self.speakers = speakers;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check invariants before any request is made.
    pub fn validate(&self) -> Result<()> {
        if self.slice_size == 0 {
            return Err(LfasrError::Configuration(
                "slice size must be greater than zero".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(LfasrError::Configuration(
                "retry policy needs at least one attempt".into(),
            ));
        }
        if self.speakers.separate && self.speakers.speaker_number == 0 {
            return Err(LfasrError::Configuration(
                "speaker number must be at least 1 when separation is enabled".into(),
            ));
        }

        let trimmed = self.base_url.trim();
        let after_scheme = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"));
        match after_scheme {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
            Some(_) => Err(LfasrError::Configuration(format!(
                "invalid base URL '{trimmed}': missing host"
            ))),
            None => Err(LfasrError::Configuration(format!(
                "invalid base URL '{trimmed}': must start with http:// or https://"
            ))),
        }
    }

    /// Full URL for an endpoint path such as `/prepare`
    pub(crate) fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim().trim_end_matches('/'), path)
    }
}
