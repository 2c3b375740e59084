use crate::{AppError, AppResult};

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use tracing::debug;

/// Per-user directories for settings, catalog, logs and recordings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    /// Platform directories for this application.
    #[track_caller]
    pub fn discover() -> AppResult<Self> {
        let proj_dirs = ProjectDirs::from("com", "class-recorder", "Class-Recorder")
            .ok_or_else(|| AppError::config("Failed to get project directories"))?;

        Ok(Self::from_dirs(proj_dirs.config_dir(), proj_dirs.data_dir()))
    }

    /// Paths rooted at explicit directories.
    pub fn from_dirs(config_dir: &Path, data_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Create the config, data and log directories if missing.
    #[track_caller]
    pub fn ensure(&self) -> AppResult<()> {
        for dir in [self.config_dir.clone(), self.data_dir.clone(), self.log_dir()] {
            if !dir.exists() {
                fs::create_dir_all(&dir)?;
                debug!(dir = ?dir, "Created directory");
            }
        }
        Ok(())
    }

    /// Optional `.env` next to the catalog.
    pub fn env_file(&self) -> PathBuf {
        self.config_dir.join(".env")
    }

    /// Lecture catalog.
    pub fn catalog_file(&self) -> PathBuf {
        self.config_dir.join("catalog.toml")
    }

    /// Directory for rolling log files.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Recording directory used when `RECORDING_PATH` is unset.
    pub fn default_recording_dir(&self) -> PathBuf {
        self.data_dir.join("recordings")
    }
}
