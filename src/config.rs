//! Configuration for the server binary.
//!
//! Everything comes from environment variables:
//! - `TASKDECK_DIR` - Optional. Data directory (settings, default worker
//!   log). Defaults to the current directory.
//! - `TASKDECK_FILE` - Optional. Path of the task document. Defaults to
//!   `{TASKDECK_DIR}/tasks.txt`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `4100`.

use std::path::PathBuf;

use thiserror::Error;

/// Default file name of the task document inside the data directory.
pub const DEFAULT_DOCUMENT_NAME: &str = "tasks.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory; relative worker log paths resolve against it.
    pub data_dir: PathBuf,

    /// The single task document everything reads and writes.
    pub document_path: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = std::env::var("TASKDECK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let document_path = std::env::var("TASKDECK_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join(DEFAULT_DOCUMENT_NAME));

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "4100".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{e}")))?;

        Ok(Self {
            data_dir,
            document_path,
            host,
            port,
        })
    }

    /// Config rooted at a specific directory (useful for testing).
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        let data_dir = dir.into();
        let document_path = data_dir.join(DEFAULT_DOCUMENT_NAME);
        Self {
            data_dir,
            document_path,
            host: "127.0.0.1".to_string(),
            port: 4100,
        }
    }
}
