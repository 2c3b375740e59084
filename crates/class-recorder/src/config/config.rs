//! Configuration management for class-recorder.
//!
//! Settings come from the process environment, optionally seeded from `.env`
//! files. Everything is validated once at startup; a bad value stops the
//! application before the tray appears.

use crate::{
    AppError, AppResult,
    config::{
        AppPaths, DEFAULT_ALLOWED_FILE_TYPES, DEFAULT_MAX_UPLOAD_MB, DEFAULT_OBS_HOST,
        DEFAULT_OBS_PORT, DEFAULT_SERVICE_ACCOUNT_FILE, DriveConfig, ObsConfig, UploadConfig,
    },
};

use class_recorder_core::AllowedTypes;

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, instrument, warn};

const WRITE_CHECK_FILE_NAME: &str = ".class-recorder-write-check";

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Google Drive destination.
    pub drive: DriveConfig,
    /// Upload checks.
    pub upload: UploadConfig,
    /// OBS connection.
    pub obs: ObsConfig,
    /// Directory OBS records into.
    pub recording_path: PathBuf,
}

impl Config {
    /// Load `.env` files, then build the configuration from the environment.
    ///
    /// The working directory's `.env` is read first, then the one in the
    /// config directory. Variables already set are never overridden.
    #[track_caller]
    #[instrument(skip(paths))]
    pub fn load(paths: &AppPaths) -> AppResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = ?path, "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable .env"),
        }

        let env_file = paths.env_file();
        if env_file.exists() {
            if let Err(e) = dotenvy::from_path(&env_file) {
                warn!(path = ?env_file, error = %e, "Ignoring unreadable .env");
            }
        }

        let config = Self::from_lookup(|key| std::env::var(key).ok(), paths.default_recording_dir())?;

        info!(
            recording_path = ?config.recording_path,
            obs = %config.obs.endpoint().url(),
            max_upload_mb = config.upload.max_upload_mb,
            allowed = %config.upload.allowed_types,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Build and validate a configuration from `lookup`.
    ///
    /// Blank values count as unset.
    #[track_caller]
    pub fn from_lookup<F>(lookup: F, default_recording_dir: PathBuf) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let folder_id = get("GOOGLE_DRIVE_FOLDER_ID")
            .ok_or_else(|| AppError::config("GOOGLE_DRIVE_FOLDER_ID is required"))?;

        let service_account_file = PathBuf::from(
            get("GOOGLE_SERVICE_ACCOUNT_FILE")
                .unwrap_or_else(|| DEFAULT_SERVICE_ACCOUNT_FILE.to_string()),
        );
        if !service_account_file.is_file() {
            return Err(AppError::config(format!(
                "GOOGLE_SERVICE_ACCOUNT_FILE not found at: {:?}",
                service_account_file
            )));
        }

        let max_upload_mb = match get("MAX_UPLOAD_SIZE") {
            None => DEFAULT_MAX_UPLOAD_MB,
            Some(raw) => match raw.parse::<u64>() {
                Ok(mb) if mb > 0 => mb,
                _ => {
                    return Err(AppError::config(format!(
                        "MAX_UPLOAD_SIZE must be a positive number of megabytes, got {:?}",
                        raw
                    )));
                }
            },
        };

        let raw_types =
            get("ALLOWED_FILE_TYPES").unwrap_or_else(|| DEFAULT_ALLOWED_FILE_TYPES.to_string());
        let allowed_types = AllowedTypes::parse(&raw_types).ok_or_else(|| {
            AppError::config(format!(
                "ALLOWED_FILE_TYPES lists no extensions: {:?}",
                raw_types
            ))
        })?;

        let host = get("OBS_HOST").unwrap_or_else(|| DEFAULT_OBS_HOST.to_string());
        let port = match get("OBS_PORT") {
            None => DEFAULT_OBS_PORT,
            Some(raw) => match raw.parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    return Err(AppError::config(format!(
                        "OBS_PORT must be a port number, got {:?}",
                        raw
                    )));
                }
            },
        };
        // Passwords keep their exact value; only an entirely empty one disables auth.
        let password = lookup("OBS_PASSWORD").filter(|value| !value.is_empty());

        let recording_path = get("RECORDING_PATH")
            .map(PathBuf::from)
            .unwrap_or(default_recording_dir);
        ensure_writable_dir(&recording_path)?;

        Ok(Config {
            drive: DriveConfig {
                folder_id,
                service_account_file,
            },
            upload: UploadConfig {
                max_upload_mb,
                allowed_types,
            },
            obs: ObsConfig {
                host,
                port,
                password,
            },
            recording_path,
        })
    }
}

#[track_caller]
fn ensure_writable_dir(dir: &Path) -> AppResult<()> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::config(format!("RECORDING_PATH {:?} cannot be created: {}", dir, e))
    })?;

    let marker = dir.join(WRITE_CHECK_FILE_NAME);
    fs::write(&marker, b"").map_err(|e| {
        AppError::config(format!("RECORDING_PATH {:?} is not writable: {}", dir, e))
    })?;
    if let Err(e) = fs::remove_file(&marker) {
        warn!(path = ?marker, error = %e, "Failed to remove write check file");
    }

    Ok(())
}
