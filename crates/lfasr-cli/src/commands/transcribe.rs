use std::path::Path;

use anyhow::Result;
use lfasr_core::OutputPaths;
use serde_json::json;

use super::Status;
use crate::app::{App, cancel_on_ctrl_c, ensure_ffmpeg_for};
use crate::args::PollArgs;

pub async fn run(
    app: &App,
    file: &Path,
    output_dir: Option<&Path>,
    poll: &PollArgs,
) -> Result<Status> {
    ensure_ffmpeg_for([file]).await?;
    let transcriber = app.transcriber(app.poll_options(poll))?;

    let dir = output_dir
        .or_else(|| file.parent())
        .unwrap_or_else(|| Path::new("."));
    let outputs = OutputPaths::for_input(file, dir);
    let cancel = cancel_on_ctrl_c();

    let outcome = transcriber.transcribe(file, &outputs, &cancel).await?;

    Ok(Status::ok("transcription complete")
        .with_task_id(outcome.task_id)
        .with_full_text(outcome.full_text)
        .with_data(json!({
            "text_path": outcome.outputs.text,
            "raw_path": outcome.outputs.raw,
        })))
}
