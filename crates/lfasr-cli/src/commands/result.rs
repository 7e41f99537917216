use std::path::Path;

use anyhow::Result;
use lfasr_core::pipeline::write_outputs;
use lfasr_core::transcript::segments_from_raw;
use lfasr_core::{OutputPaths, format};
use serde_json::json;

use super::Status;
use crate::app::{App, cancel_on_ctrl_c};
use crate::args::PollArgs;

pub async fn run(
    app: &App,
    task_id: &str,
    wait: bool,
    output_dir: Option<&Path>,
    poll: &PollArgs,
) -> Result<Status> {
    let transcriber = app.transcriber(app.poll_options(poll))?;
    let poller = transcriber.poller();

    let raw = if wait {
        let cancel = cancel_on_ctrl_c();
        poller
            .wait_for_result(task_id, transcriber.poll_options(), &cancel)
            .await?
    } else {
        let status = poller.get_status(task_id).await?;
        if !status.is_terminal() {
            return Ok(Status::ok(format!("task is not finished yet: {status}"))
                .with_task_id(task_id)
                .with_data(json!({"status": status.code(), "name": status.as_str()})));
        }
        poller.fetch_result(task_id).await?
    };

    let full_text = format(&segments_from_raw(&raw));
    let mut status = Status::ok("transcription complete")
        .with_task_id(task_id)
        .with_full_text(full_text.clone());

    if let Some(dir) = output_dir {
        let outputs = OutputPaths::from_stem(dir, task_id);
        write_outputs(&outputs, &full_text, &raw).await?;
        status = status.with_data(json!({
            "text_path": outputs.text,
            "raw_path": outputs.raw,
        }));
    }
    Ok(status)
}
