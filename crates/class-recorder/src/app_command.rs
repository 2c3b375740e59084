use class_recorder_core::{CoreResult, DriveFile, UploadEvent};

use std::path::PathBuf;

use uuid::Uuid;

/// Commands delivered to the application loop.
///
/// The hotkey handler sends [`AppCommand::ToggleRecording`]; background
/// tasks report back with the remaining variants.
#[derive(Debug)]
pub enum AppCommand {
    /// Start or stop recording, whichever applies.
    ToggleRecording,
    /// OBS answered a start request.
    RecordingStarted {
        /// Session the request was made for.
        session_id: Uuid,
        /// Outcome.
        result: CoreResult<()>,
    },
    /// OBS stopped and the output was renamed.
    RecordingStopped {
        /// Session being stopped.
        session_id: Uuid,
        /// Final local file or the failure.
        result: CoreResult<PathBuf>,
    },
    /// Progress from the running upload.
    UploadProgress(UploadEvent),
    /// The upload finished.
    UploadFinished {
        /// Uploaded file or the failure.
        result: CoreResult<DriveFile>,
    },
    /// Request application shutdown.
    Shutdown,
}
