//! Desktop notifications for operation outcomes.

use class_recorder_core::CoreError;

use notify_rust::Notification;
use tracing::{debug, warn};

const APP_NAME: &str = "Class Recorder";

/// Shows desktop notifications without blocking the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Notifier;

impl Notifier {
    /// Informational notification.
    pub fn info(&self, summary: &str, body: &str) {
        show(summary.to_string(), body.to_string());
    }

    /// Failure notification naming the step that failed.
    pub fn failure(&self, step: &str, body: &str) {
        show(format!("{} failed", step), body.to_string());
    }

    /// Failure notification for a core error.
    pub fn core_failure(&self, step: &str, error: &CoreError) {
        self.failure(step, &describe(error));
    }
}

fn show(summary: String, body: String) {
    // The D-Bus round trip blocks; keep it off the async workers.
    tokio::task::spawn_blocking(move || {
        match Notification::new()
            .appname(APP_NAME)
            .summary(&summary)
            .body(&body)
            .show()
        {
            Ok(_) => debug!(summary = %summary, "Notification shown"),
            Err(e) => warn!(summary = %summary, error = %e, "Failed to show notification"),
        }
    });
}

/// Operator-facing text for a core error, without source locations.
pub fn describe(error: &CoreError) -> String {
    match error {
        CoreError::ConnectionError { reason, .. } => {
            format!("Could not reach OBS: {}. Is OBS running with the websocket server enabled?", reason)
        }
        CoreError::AlreadyRecording { .. } => "OBS is already recording.".to_string(),
        CoreError::NotRecording { .. } => "OBS is not recording.".to_string(),
        CoreError::ObsRequestRejected {
            request,
            code,
            comment,
            ..
        } => format!("OBS refused {} (code {}): {}", request, code, comment),
        CoreError::FileNotFoundError { path, .. } => {
            format!("Recording not found or unreadable: {}", path.display())
        }
        CoreError::FileTooLarge {
            actual_bytes,
            limit_bytes,
            ..
        } => format!(
            "Recording is {} MB, the limit is {} MB.",
            megabytes(*actual_bytes),
            megabytes(*limit_bytes)
        ),
        CoreError::UnsupportedFileType {
            extension, allowed, ..
        } => format!("Files of type .{} are not allowed (allowed: {}).", extension, allowed),
        CoreError::DriveAccessError {
            segment, reason, ..
        } => format!("Google Drive folder \"{}\" could not be prepared: {}", segment, reason),
        CoreError::UploadFailed {
            bytes_transferred,
            reason,
            ..
        } => format!(
            "Transfer stopped after {} MB: {}",
            megabytes(*bytes_transferred),
            reason
        ),
        CoreError::Credentials { reason, .. } => {
            format!("Google credentials were rejected: {}", reason)
        }
        CoreError::Io { source, .. } => format!("File operation failed: {}", source),
    }
}

fn megabytes(bytes: u64) -> u64 {
    bytes.div_ceil(1024 * 1024)
}
