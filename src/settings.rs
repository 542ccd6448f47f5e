//! Persisted automation settings.
//!
//! Stored as JSON at `{data_dir}/.taskdeck/settings.json`. Environment
//! variables seed the defaults when no settings file exists:
//! - `TASKDECK_AUTOMATION` - enable the worker trigger (`1`/`true`/`yes`/`on`)
//! - `TASKDECK_WORKER_COMMAND` - worker command line (shell-tokenized)
//! - `TASKDECK_WORKER_LOG` - worker log file, relative to the data directory

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Worker command used when nothing is configured.
pub const DEFAULT_WORKER_COMMAND: &str = "taskdeck-worker";

/// Default worker log file, relative to the data directory.
pub const DEFAULT_LOG_PATH: &str = ".taskdeck/worker.log";

/// The settings record exposed over the API and persisted to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether a Backlog -> To Do transition launches the worker.
    #[serde(default)]
    pub automation_enabled: bool,
    /// Worker command line, shell-tokenized before spawning.
    #[serde(default = "default_worker_command")]
    pub worker_command: String,
    /// Worker log file; relative paths resolve against the data directory.
    #[serde(default = "default_log_path")]
    pub log_path: String,
}

fn default_worker_command() -> String {
    DEFAULT_WORKER_COMMAND.to_string()
}

fn default_log_path() -> String {
    DEFAULT_LOG_PATH.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            automation_enabled: false,
            worker_command: default_worker_command(),
            log_path: default_log_path(),
        }
    }
}

/// In-memory settings with disk persistence.
#[derive(Debug)]
pub struct SettingsStore {
    settings: RwLock<Settings>,
    storage_path: PathBuf,
}

impl SettingsStore {
    /// Create a settings store, loading from disk if a file exists and
    /// falling back to environment-seeded defaults otherwise.
    pub async fn new(data_dir: &Path) -> Self {
        let storage_path = data_dir.join(".taskdeck/settings.json");

        let settings = if storage_path.exists() {
            match Self::load_from_path(&storage_path) {
                Ok(s) => {
                    tracing::info!("Loaded settings from {}", storage_path.display());
                    s
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to load settings from {}: {}, using defaults",
                        storage_path.display(),
                        e
                    );
                    Self::defaults_from_env()
                }
            }
        } else {
            Self::defaults_from_env()
        };

        Self {
            settings: RwLock::new(settings),
            storage_path,
        }
    }

    fn defaults_from_env() -> Settings {
        Settings {
            automation_enabled: env_bool("TASKDECK_AUTOMATION", false),
            worker_command: std::env::var("TASKDECK_WORKER_COMMAND")
                .unwrap_or_else(|_| default_worker_command()),
            log_path: std::env::var("TASKDECK_WORKER_LOG").unwrap_or_else(|_| default_log_path()),
        }
    }

    fn load_from_path(path: &Path) -> Result<Settings, std::io::Error> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    async fn save_to_disk(&self) -> Result<(), std::io::Error> {
        let settings = self.settings.read().await;

        if let Some(parent) = self.storage_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&*settings)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(&self.storage_path, contents)?;
        tracing::debug!("Saved settings to {}", self.storage_path.display());
        Ok(())
    }

    /// Get a clone of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Replace the settings and persist to disk.
    pub async fn update(&self, new_settings: Settings) -> Result<(), std::io::Error> {
        let mut settings = self.settings.write().await;
        *settings = new_settings;
        drop(settings);
        self.save_to_disk().await
    }
}

/// Parse an environment variable as a boolean, returning `default` when it
/// is unset. `1`, `true`, `yes`, `y`, `on` (case-insensitive) mean `true`.
fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn starts_with_defaults_when_no_file_exists() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path()).await;
        let settings = store.get().await;
        assert!(!settings.automation_enabled);
        assert_eq!(settings.worker_command, DEFAULT_WORKER_COMMAND);
        assert_eq!(settings.log_path, DEFAULT_LOG_PATH);
    }

    #[tokio::test]
    async fn update_persists_across_store_instances() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path()).await;
        store
            .update(Settings {
                automation_enabled: true,
                worker_command: "my-worker --fast".to_string(),
                log_path: "logs/worker.log".to_string(),
            })
            .await
            .unwrap();

        let reopened = SettingsStore::new(dir.path()).await;
        let settings = reopened.get().await;
        assert!(settings.automation_enabled);
        assert_eq!(settings.worker_command, "my-worker --fast");
        assert_eq!(settings.log_path, "logs/worker.log");
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".taskdeck");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("settings.json"), "not json").unwrap();

        let store = SettingsStore::new(dir.path()).await;
        assert_eq!(store.get().await.worker_command, DEFAULT_WORKER_COMMAND);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }
}
