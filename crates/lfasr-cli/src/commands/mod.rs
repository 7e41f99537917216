pub mod batch;
pub mod config;
pub mod result;
pub mod transcribe;
pub mod upload;

use lfasr_core::LfasrError;
use serde::Serialize;
use serde_json::Value;

/// JSON document printed on stdout for every command
#[derive(Debug, Serialize)]
pub struct Status {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Status {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            task_id: None,
            full_text: None,
            data: None,
        }
    }

    /// Status for a failed command; `code` is the process exit code.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let core = err.chain().find_map(|e| e.downcast_ref::<LfasrError>());
        Self {
            code: core.map(LfasrError::exit_code).unwrap_or(1),
            message: format!("{err:#}"),
            task_id: core.and_then(LfasrError::task_id).map(str::to_string),
            full_text: None,
            data: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_full_text(mut self, full_text: impl Into<String>) -> Self {
        self.full_text = Some(full_text.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn print(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: failed to render status: {e}"),
        }
    }
}
