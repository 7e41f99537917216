use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress marker reported by `getProgress`.
///
/// Variants are ordered by the service's processing sequence, so `<` means "earlier".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Created,
    Uploaded,
    Merged,
    Transcribing,
    PostProcessing,
    Done,
    ResultUploaded,
}

impl StatusCode {
    /// Numeric code used on the wire
    pub fn code(&self) -> i64 {
        match self {
            StatusCode::Created => 0,
            StatusCode::Uploaded => 1,
            StatusCode::Merged => 2,
            StatusCode::Transcribing => 3,
            StatusCode::PostProcessing => 4,
            StatusCode::Done => 5,
            StatusCode::ResultUploaded => 9,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(StatusCode::Created),
            1 => Some(StatusCode::Uploaded),
            2 => Some(StatusCode::Merged),
            3 => Some(StatusCode::Transcribing),
            4 => Some(StatusCode::PostProcessing),
            5 => Some(StatusCode::Done),
            9 => Some(StatusCode::ResultUploaded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Created => "created",
            StatusCode::Uploaded => "uploaded",
            StatusCode::Merged => "merged",
            StatusCode::Transcribing => "transcribing",
            StatusCode::PostProcessing => "post-processing",
            StatusCode::Done => "done",
            StatusCode::ResultUploaded => "result-uploaded",
        }
    }

    /// Results can only be fetched from a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusCode::Done | StatusCode::ResultUploaded)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

/// A server-side transcription job.
///
/// `task_id` is opaque: it is only ever echoed back to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub status: StatusCode,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub(crate) fn new(task_id: String, status: StatusCode) -> Self {
        Self {
            task_id,
            status,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_and_order() {
        let all = [
            StatusCode::Created,
            StatusCode::Uploaded,
            StatusCode::Merged,
            StatusCode::Transcribing,
            StatusCode::PostProcessing,
            StatusCode::Done,
            StatusCode::ResultUploaded,
        ];
        for pair in all.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].code() < pair[1].code());
        }
        for status in all {
            assert_eq!(StatusCode::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(StatusCode::from_code(-1), None);
        assert_eq!(StatusCode::from_code(6), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(StatusCode::Done.is_terminal());
        assert!(StatusCode::ResultUploaded.is_terminal());
        assert!(!StatusCode::PostProcessing.is_terminal());
    }
}
