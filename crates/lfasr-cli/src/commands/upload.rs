use std::path::Path;

use anyhow::Result;
use serde_json::json;

use super::Status;
use crate::app::{App, ensure_ffmpeg_for};

pub async fn run(app: &App, file: &Path) -> Result<Status> {
    ensure_ffmpeg_for([file]).await?;
    let transcriber = app.transcriber(app.settings.poll_options())?;
    let task = transcriber.uploader().upload(file).await?;

    Ok(Status::ok("upload complete")
        .with_task_id(task.task_id.clone())
        .with_data(json!({
            "status": task.status.code(),
            "created_at": task.created_at,
        })))
}
