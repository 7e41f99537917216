use anyhow::{Result, bail};
use lfasr_core::LfasrError;
use serde_json::json;

use super::Status;
use crate::app::App;
use crate::args::ConfigArgs;

pub fn run(app: &App, args: &ConfigArgs) -> Result<Status> {
    let mut settings = app.settings.clone();
    let mut changed = false;

    if let Some(app_id) = &args.app_id {
        settings.app_id = Some(app_id.trim().to_string());
        changed = true;
    }
    if let Some(secret_key) = &args.secret_key {
        settings.secret_key = Some(secret_key.trim().to_string());
        changed = true;
    }
    if let Some(base_url) = &args.base_url {
        settings.base_url = Some(base_url.trim().to_string());
        changed = true;
    }
    if let Some(slice_size) = args.slice_size {
        if slice_size == 0 {
            return Err(LfasrError::Configuration("slice size must be greater than zero".into()).into());
        }
        settings.slice_size = Some(slice_size);
        changed = true;
    }
    if let Some(interval) = args.interval {
        if interval == 0 {
            return Err(LfasrError::Configuration("poll interval must be greater than zero".into()).into());
        }
        settings.poll_interval_secs = Some(interval);
        changed = true;
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err(LfasrError::Configuration("poll timeout must be greater than zero".into()).into());
        }
        settings.poll_timeout_secs = Some(timeout);
        changed = true;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(LfasrError::Configuration("worker count must be at least 1".into()).into());
        }
        settings.max_workers = Some(workers);
        changed = true;
    }

    if changed {
        let path = settings.save()?;
        return Ok(Status::ok(format!("settings saved to {}", path.display()))
            .with_data(redacted(&settings)));
    }

    if args.show {
        return Ok(Status::ok("current settings").with_data(redacted(&settings)));
    }

    bail!("nothing to do; pass --show or a setting to change (see `lfasr config --help`)")
}

/// Settings as JSON with the secret masked
fn redacted(settings: &lfasr_core::Settings) -> serde_json::Value {
    let mut value = serde_json::to_value(settings).unwrap_or_else(|_| json!({}));
    if let Some(secret) = value.get_mut("secret_key") {
        *secret = json!(mask(secret.as_str().unwrap_or("")));
    }
    value
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_hides_short_secrets_entirely() {
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask("d41d8cd98f00b204"), "d41d****");
    }

    #[test]
    fn test_redacted_masks_secret_only() {
        let settings = lfasr_core::Settings {
            app_id: Some("5f8e2b1c".into()),
            secret_key: Some("d41d8cd98f00b204e9800998ecf8427e".into()),
            ..Default::default()
        };
        let value = redacted(&settings);
        assert_eq!(value["app_id"], "5f8e2b1c");
        assert_eq!(value["secret_key"], "d41d****");
    }
}
