use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use lfasr_core::media::{MediaKind, classify};
use lfasr_core::{ClientConfig, LfasrError, PollOptions, Settings, Transcriber};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::args::{CredentialArgs, PollArgs};

/// Settings plus command-line overrides, resolved per command
pub struct App {
    pub settings: Settings,
    credentials: CredentialArgs,
}

impl App {
    pub fn new(settings: Settings, credentials: CredentialArgs) -> Self {
        Self {
            settings,
            credentials,
        }
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let credentials = self.settings.resolve_credentials(
            self.credentials.app_id.clone(),
            self.credentials.secret_key.clone(),
        )?;
        let config = self.settings.client_config(credentials);
        config.validate()?;
        Ok(config)
    }

    pub fn poll_options(&self, args: &PollArgs) -> PollOptions {
        let stored = self.settings.poll_options();
        PollOptions::new(
            args.interval
                .map(Duration::from_secs)
                .unwrap_or(stored.interval),
            args.timeout
                .map(Duration::from_secs)
                .unwrap_or(stored.timeout),
        )
    }

    pub fn transcriber(&self, poll: PollOptions) -> Result<Transcriber> {
        Ok(Transcriber::connect(self.client_config()?, poll)?)
    }
}

/// Fail early with install hints when a video input will need FFmpeg.
pub async fn ensure_ffmpeg_for<'a>(inputs: impl IntoIterator<Item = &'a Path>) -> Result<()> {
    let needs_ffmpeg = inputs
        .into_iter()
        .any(|p| matches!(classify(p), Ok(MediaKind::NeedsExtraction)));
    if !needs_ffmpeg {
        return Ok(());
    }

    if tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
        .is_err()
    {
        return Err(LfasrError::Extraction(
            "FFmpeg is not installed or not in PATH. It is needed to extract audio from video. \
             Install it with `sudo apt install ffmpeg`, `brew install ffmpeg`, \
             or from https://ffmpeg.org/download.html"
                .into(),
        )
        .into());
    }
    Ok(())
}

/// Token cancelled on the first Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, stopping");
                trigger.cancel();
            }
            Err(e) => warn!("Could not listen for Ctrl-C: {e}"),
        }
    });
    token
}
