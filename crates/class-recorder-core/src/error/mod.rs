use std::{panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use thiserror::Error;

/// Recording and upload errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// OBS websocket could not be reached or the session broke.
    #[error("OBS connection error: {reason} {location}")]
    ConnectionError {
        /// Description of the transport failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A recording is already in progress.
    #[error("A recording is already in progress {location}")]
    AlreadyRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No recording is in progress.
    #[error("No recording is in progress {location}")]
    NotRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// OBS answered a request with a failure status.
    #[error("OBS rejected {request} (code {code}): {comment} {location}")]
    ObsRequestRejected {
        /// Request type that failed.
        request: String,
        /// OBS request status code.
        code: u16,
        /// Comment supplied by OBS, if any.
        comment: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// File to upload is missing or unreadable.
    #[error("File not found: {path:?} {location}")]
    FileNotFoundError {
        /// Path that could not be read.
        path: PathBuf,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// File exceeds the configured upload ceiling.
    #[error("File is {actual_bytes} bytes, limit is {limit_bytes} bytes {location}")]
    FileTooLarge {
        /// Size of the rejected file.
        actual_bytes: u64,
        /// Configured ceiling.
        limit_bytes: u64,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// File extension is not in the allow-list.
    #[error("File type {extension:?} not allowed. Allowed types: {allowed} {location}")]
    UnsupportedFileType {
        /// Extension of the rejected file (lowercase, without dot).
        extension: String,
        /// Human-readable allow-list.
        allowed: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Drive folder lookup or creation failed.
    #[error("Drive access failed at {segment:?}: {reason} {location}")]
    DriveAccessError {
        /// Path segment (folder name) being resolved.
        segment: String,
        /// Description of the API failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Transfer failed after the upload started.
    #[error("Upload failed after {bytes_transferred} bytes: {reason} {location}")]
    UploadFailed {
        /// Bytes acknowledged by Drive before the failure.
        bytes_transferred: u64,
        /// Description of the transport failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Access token could not be obtained.
    #[error("Credentials error: {reason} {location}")]
    Credentials {
        /// Description of the token provider failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Local filesystem operation failed.
    #[error("IO error: {source} {location}")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl CoreError {
    /// Whether the error came from pre-upload validation.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            CoreError::FileNotFoundError { .. }
                | CoreError::FileTooLarge { .. }
                | CoreError::UnsupportedFileType { .. }
        )
    }

    /// Build a `ConnectionError` at the caller's location.
    #[track_caller]
    pub(crate) fn connection(reason: impl std::fmt::Display) -> Self {
        CoreError::ConnectionError {
            reason: reason.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Build a `DriveAccessError` at the caller's location.
    #[track_caller]
    pub(crate) fn drive(segment: &str, reason: impl std::fmt::Display) -> Self {
        CoreError::DriveAccessError {
            segment: segment.to_string(),
            reason: reason.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for CoreError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        CoreError::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
