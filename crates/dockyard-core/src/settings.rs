use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "local_discourse";

const DEFAULT_STOP_GRACE_SECS: u64 = 600;
const DEFAULT_COMMIT_WAIT_MS: u64 = 2000;

/// Launcher defaults, read from `~/.config/dockyard/settings.toml`.
///
/// Every field has a default, so a partial or missing file is fine. Command
/// line flags are applied on top by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub conf_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub namespace: String,
    /// Fixed scratch directory for builds; a fresh temporary one when unset.
    pub build_dir: Option<PathBuf>,
    /// Engine client binary; probed on `PATH` when unset.
    pub docker_path: Option<String>,
    pub stop_grace_secs: u64,
    pub commit_wait_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conf_dir: PathBuf::from("containers"),
            templates_dir: PathBuf::from("."),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            build_dir: None,
            docker_path: None,
            stop_grace_secs: DEFAULT_STOP_GRACE_SECS,
            commit_wait_ms: DEFAULT_COMMIT_WAIT_MS,
        }
    }
}

impl Settings {
    /// Load the default settings file, falling back to defaults when it does not exist.
    pub fn load_default() -> Result<Self, CoreError> {
        match default_settings_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CoreError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write these settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let content = self.to_toml().map_err(|message| CoreError::Settings {
            path: path.to_path_buf(),
            message,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| e.to_string())
    }

    pub fn commit_wait(&self) -> Duration {
        Duration::from_millis(self.commit_wait_ms)
    }

    pub fn docker_program(&self) -> &str {
        self.docker_path.as_deref().unwrap_or("docker")
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/dockyard/settings.toml"))
}
