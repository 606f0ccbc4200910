//! Uploader configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/vitals/uploader.toml`
//! - Windows: `%APPDATA%/vitals/uploader.toml`
//!
//! `--config PATH` overrides the location.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vitals_upload::ClientConfig;

/// Uploader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Start a processing job once the upload finishes.
    #[serde(default = "default_true")]
    pub process_after_upload: bool,

    /// Capacity of the progress event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Server endpoints, credentials and transfer limits.
    #[serde(default)]
    pub server: ClientConfig,
}

fn default_true() -> bool {
    true
}

fn default_event_buffer() -> usize {
    256
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            process_after_upload: default_true(),
            event_buffer: default_event_buffer(),
            server: ClientConfig::default(),
        }
    }
}

impl UploaderConfig {
    /// Loads configuration from `path` (or the default location), creating
    /// a default file if none exists.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: UploaderConfig = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = UploaderConfig::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix (may contain a bearer token).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("vitals").join("uploader.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("vitals")
            .join("uploader.toml"))
    }
}
