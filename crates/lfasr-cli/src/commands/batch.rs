use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use lfasr_core::{BatchScheduler, find_media_files};
use tracing::info;

use super::Status;
use crate::app::{App, cancel_on_ctrl_c, ensure_ffmpeg_for};
use crate::args::PollArgs;

pub async fn run(
    app: &App,
    inputs: &[PathBuf],
    output_dir: Option<&Path>,
    workers: Option<usize>,
    extensions: Option<&[String]>,
    poll: &PollArgs,
) -> Result<Status> {
    let files = collect_inputs(inputs, extensions)?;
    if files.is_empty() {
        bail!("no media files found in the given inputs");
    }
    ensure_ffmpeg_for(files.iter().map(PathBuf::as_path)).await?;

    let output_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_dir(&inputs[0]));
    let workers = workers.unwrap_or_else(|| app.settings.max_workers());
    info!("Found {} file(s); writing to {}", files.len(), output_dir.display());

    let scheduler = BatchScheduler::new(app.transcriber(app.poll_options(poll))?)
        .with_cancellation(cancel_on_ctrl_c());
    let report = scheduler.run(files, &output_dir, workers).await?;

    let code = if report.failed == 0 { 0 } else { 1 };
    Ok(Status::ok(format!(
        "{} of {} file(s) transcribed, {} failed",
        report.succeeded, report.total, report.failed
    ))
    .with_code(code)
    .with_data(serde_json::to_value(&report)?))
}

/// Expand directories into their media files; explicit files are kept as given.
fn collect_inputs(inputs: &[PathBuf], extensions: Option<&[String]>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(find_media_files(input, extensions)?);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn default_output_dir(first_input: &Path) -> PathBuf {
    if first_input.is_dir() {
        return first_input.to_path_buf();
    }
    match first_input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_expands_directories_and_keeps_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("skip.txt"), b"x").unwrap();
        let explicit = dir.path().join("skip.txt");

        let files = collect_inputs(&[dir.path().to_path_buf(), explicit.clone()], None).unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("a.mp4"), dir.path().join("b.wav"), explicit]
        );
    }

    #[test]
    fn test_default_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(default_output_dir(dir.path()), dir.path());
        assert_eq!(
            default_output_dir(Path::new("media/a.wav")),
            PathBuf::from("media")
        );
        assert_eq!(default_output_dir(Path::new("a.wav")), PathBuf::from("."));
    }
}
