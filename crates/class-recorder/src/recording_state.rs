use class_recorder_core::FolderPath;

use std::path::PathBuf;

use chrono::{DateTime, Local};
use uuid::Uuid;

/// One recording, from start until it is uploaded or discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    /// Unique session ID for log correlation.
    pub session_id: Uuid,
    /// Lecture the recording belongs to.
    pub folder: FolderPath,
    /// When recording started.
    pub started_at: DateTime<Local>,
    /// When recording stopped.
    pub stopped_at: Option<DateTime<Local>>,
    /// Final local file, known once stopped and renamed.
    pub file_path: Option<PathBuf>,
}

impl RecordingSession {
    /// A session that just started for `folder`.
    pub fn start(folder: FolderPath) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            folder,
            started_at: Local::now(),
            stopped_at: None,
            file_path: None,
        }
    }

    /// An already finished recording found on disk, filed under `folder`.
    pub fn from_file(folder: FolderPath, file_path: PathBuf, recorded_at: DateTime<Local>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            folder,
            started_at: recorded_at,
            stopped_at: Some(recorded_at),
            file_path: Some(file_path),
        }
    }

    /// Record the stop time and final file.
    pub fn finish(&mut self, file_path: PathBuf) {
        self.stopped_at = Some(Local::now());
        self.file_path = Some(file_path);
    }

    /// Whether the recording has a file ready for upload.
    pub fn is_finished(&self) -> bool {
        self.file_path.is_some()
    }
}
