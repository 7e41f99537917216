//! Persistent user settings.
//!
//! Stored as JSON at `<config dir>/lfasr/settings.json`. Every field is optional;
//! command-line flags override the environment, which overrides this file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{
    ClientConfig, Credentials, DEFAULT_MAX_WORKERS, ENV_APP_ID, ENV_SECRET_KEY, PollOptions,
};
use crate::error::{LfasrError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

impl Settings {
    /// Default settings file location
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lfasr").join("settings.json"))
    }

    /// Load from the default location. A missing or unreadable file gives defaults.
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No settings at {}: {e}", path.display());
                return Self::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring invalid settings file {}: {e}", path.display());
            Self::default()
        })
    }

    /// Save to the default location and return the path written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path().ok_or_else(|| {
            LfasrError::Configuration("could not determine the config directory".into())
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| LfasrError::Io(std::io::Error::other(e)))?;
        std::fs::write(path, json)?;

        // Holds the secret key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Credentials from flags, then the process environment, then this file.
    pub fn resolve_credentials(
        &self,
        app_id: Option<String>,
        secret_key: Option<String>,
    ) -> Result<Credentials> {
        self.resolve_credentials_with(app_id, secret_key, |name| std::env::var(name).ok())
    }

    /// Same as `resolve_credentials` with an explicit environment lookup.
    pub fn resolve_credentials_with(
        &self,
        app_id: Option<String>,
        secret_key: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials> {
        let pick = |flag: Option<String>, var: &str, stored: &Option<String>| {
            flag.filter(|v| !v.trim().is_empty())
                .or_else(|| env(var).filter(|v| !v.trim().is_empty()))
                .or_else(|| stored.clone())
        };

        let app_id = pick(app_id, ENV_APP_ID, &self.app_id).ok_or_else(|| {
            LfasrError::Configuration(format!(
                "no app id configured; pass --app-id, set {ENV_APP_ID}, or run `lfasr config --set-app-id`"
            ))
        })?;
        let secret_key = pick(secret_key, ENV_SECRET_KEY, &self.secret_key).ok_or_else(|| {
            LfasrError::Configuration(format!(
                "no secret key configured; pass --secret-key, set {ENV_SECRET_KEY}, or run `lfasr config --set-secret-key`"
            ))
        })?;

        Credentials::new(app_id, secret_key)
    }

    /// Client configuration with stored overrides applied
    pub fn client_config(&self, credentials: Credentials) -> ClientConfig {
        let mut config = ClientConfig::new(credentials);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(slice_size) = self.slice_size {
            config = config.with_slice_size(slice_size);
        }
        config
    }

    /// Poll options with stored overrides applied
    pub fn poll_options(&self) -> PollOptions {
        let defaults = PollOptions::default();
        PollOptions::new(
            self.poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            self.poll_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        )
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers.unwrap_or(DEFAULT_MAX_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("none.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");
        let settings = Settings {
            app_id: Some("app".into()),
            secret_key: Some("secret".into()),
            max_workers: Some(4),
            poll_interval_secs: Some(5),
            ..Settings::default()
        };

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path);

        assert_eq!(loaded, settings);
        assert_eq!(loaded.max_workers(), 4);
        assert_eq!(loaded.poll_options().interval, Duration::from_secs(5));
        assert_eq!(loaded.poll_options().timeout, PollOptions::default().timeout);
    }

    #[test]
    fn test_credential_precedence() {
        let stored = Settings {
            app_id: Some("file-app".into()),
            secret_key: Some("file-secret".into()),
            ..Settings::default()
        };
        let env = |name: &str| (name == ENV_APP_ID).then(|| "env-app".to_string());

        let from_env = stored.resolve_credentials_with(None, None, env).unwrap();
        assert_eq!(from_env.app_id(), "env-app");
        assert_eq!(from_env.secret_key(), "file-secret");

        let from_flag = stored
            .resolve_credentials_with(Some("flag-app".into()), None, env)
            .unwrap();
        assert_eq!(from_flag.app_id(), "flag-app");

        let from_file = stored.resolve_credentials_with(None, None, no_env).unwrap();
        assert_eq!(from_file.app_id(), "file-app");
    }

    #[test]
    fn test_missing_credentials_is_configuration_error() {
        let err = Settings::default()
            .resolve_credentials_with(Some("app".into()), None, no_env)
            .unwrap_err();
        assert!(matches!(err, LfasrError::Configuration(msg) if msg.contains(ENV_SECRET_KEY)));
    }

    #[test]
    fn test_client_config_overrides() {
        let settings = Settings {
            base_url: Some("http://localhost:9000/api".into()),
            slice_size: Some(1024),
            ..Settings::default()
        };
        let config = settings.client_config(Credentials::new("a", "b").unwrap());
        assert_eq!(config.base_url, "http://localhost:9000/api");
        assert_eq!(config.slice_size, 1024);
    }
}
