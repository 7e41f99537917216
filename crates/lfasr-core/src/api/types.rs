//! Wire envelope and typed per-endpoint replies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub ok: i64,
    #[serde(default)]
    pub err_no: i64,
    #[serde(default)]
    pub failed: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn success(data: Option<Value>) -> Self {
        Self {
            ok: 0,
            err_no: 0,
            failed: None,
            data,
        }
    }

    pub fn failure(err_no: i64, message: impl Into<String>) -> Self {
        Self {
            ok: -1,
            err_no,
            failed: Some(message.into()),
            data: None,
        }
    }

    /// Split into the payload or a rejection
    fn into_data(self) -> Result<Option<Value>, ApiError> {
        if self.ok == 0 {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected {
                err_no: self.err_no,
                message: self.failed.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }

    /// Payload that must be present, decoded as `T`.
    ///
    /// The service double-encodes most payloads as JSON strings; both forms are accepted.
    fn into_typed<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self.into_data()? {
            Some(Value::String(s)) => serde_json::from_str(&s)
                .map_err(|e| ApiError::Decode(format!("{e} in payload {s:?}"))),
            Some(Value::Null) | None => Err(ApiError::Decode("missing data".into())),
            Some(value) => serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string())),
        }
    }

    /// Success with no meaningful payload (upload and merge)
    pub fn into_ack(self) -> Result<(), ApiError> {
        self.into_data().map(|_| ())
    }
}

/// `prepare` reply: the task id assigned to the upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReply {
    pub task_id: String,
}

impl TryFrom<Envelope> for PrepareReply {
    type Error = ApiError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.into_data()? {
            Some(Value::String(task_id)) if !task_id.trim().is_empty() => Ok(Self { task_id }),
            other => Err(ApiError::Decode(format!(
                "prepare returned no task id (data: {other:?})"
            ))),
        }
    }
}

/// `getProgress` reply. `status` stays raw so the poller decides how to treat unknown codes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Progress {
    pub status: i64,
    #[serde(default)]
    pub desc: String,
}

impl TryFrom<Envelope> for Progress {
    type Error = ApiError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        envelope.into_typed()
    }
}

/// One raw segment from `getResult`.
///
/// Times are milliseconds encoded as strings. Fields the client does not use are kept
/// in `extra` so the persisted raw result matches what the service sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    #[serde(default)]
    pub bg: String,
    #[serde(default)]
    pub ed: String,
    #[serde(default)]
    pub onebest: String,
    #[serde(
        default,
        deserialize_with = "speaker_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub speaker: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn speaker_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `getResult` reply: the segment array in service order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawResult {
    pub segments: Vec<RawSegment>,
}

impl TryFrom<Envelope> for RawResult {
    type Error = ApiError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.into_data()? {
            // A finished task with no speech has no payload
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(Self::default()),
            data => Envelope::success(data).into_typed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: &str) -> Envelope {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_prepare_reply() {
        let envelope = parse(r#"{"ok":0,"err_no":0,"failed":null,"data":"abc123"}"#);
        let reply = PrepareReply::try_from(envelope).unwrap();
        assert_eq!(reply.task_id, "abc123");
    }

    #[test]
    fn test_prepare_without_task_id_is_decode_error() {
        let envelope = parse(r#"{"ok":0,"data":""}"#);
        assert!(matches!(
            PrepareReply::try_from(envelope),
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn test_rejection_carries_err_no() {
        let envelope = parse(r#"{"ok":-1,"err_no":26600,"failed":"转写业务通用错误","data":null}"#);
        match PrepareReply::try_from(envelope) {
            Err(ApiError::Rejected { err_no, message }) => {
                assert_eq!(err_no, 26600);
                assert_eq!(message, "转写业务通用错误");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_progress_from_string_payload() {
        let envelope = parse(r#"{"ok":0,"data":"{\"status\":3,\"desc\":\"音频转写中\"}"}"#);
        let progress = Progress::try_from(envelope).unwrap();
        assert_eq!(progress.status, 3);
        assert_eq!(progress.desc, "音频转写中");
    }

    #[test]
    fn test_progress_from_object_payload() {
        let envelope = Envelope::success(Some(json!({"status": 9})));
        let progress = Progress::try_from(envelope).unwrap();
        assert_eq!(progress.status, 9);
        assert_eq!(progress.desc, "");
    }

    #[test]
    fn test_result_from_string_payload_keeps_extra_fields() {
        let data = r#"[{"bg":"0","ed":"1200","onebest":"你好","speaker":"1","si":"0"}]"#;
        let envelope = Envelope::success(Some(Value::String(data.to_string())));
        let result = RawResult::try_from(envelope).unwrap();
        assert_eq!(result.segments.len(), 1);
        let segment = &result.segments[0];
        assert_eq!(segment.onebest, "你好");
        assert_eq!(segment.speaker.as_deref(), Some("1"));
        assert_eq!(segment.extra.get("si"), Some(&json!("0")));

        let round = serde_json::to_value(&result).unwrap();
        assert_eq!(round[0]["si"], "0");
    }

    #[test]
    fn test_result_numeric_speaker() {
        let envelope = Envelope::success(Some(json!([{"bg":"0","ed":"5","onebest":"a","speaker":2}])));
        let result = RawResult::try_from(envelope).unwrap();
        assert_eq!(result.segments[0].speaker.as_deref(), Some("2"));
    }

    #[test]
    fn test_empty_result_is_empty_list() {
        let result = RawResult::try_from(Envelope::success(None)).unwrap();
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_ack() {
        assert!(Envelope::success(None).into_ack().is_ok());
        assert!(Envelope::failure(1, "nope").into_ack().is_err());
    }
}
