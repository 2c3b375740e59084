use crate::CoreError;

use std::path::PathBuf;

/// Progress notifications emitted by the orchestrator, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Pre-upload checks passed.
    Validated {
        /// File size in bytes.
        size_bytes: u64,
    },
    /// Destination folder chain resolved.
    FolderResolved {
        /// Innermost folder id.
        folder_id: String,
    },
    /// Bytes acknowledged by Drive so far.
    Progress {
        /// Acknowledged bytes.
        bytes_sent: u64,
        /// `bytes_sent / size`, in `0.0..=1.0`, non-decreasing.
        fraction: f64,
    },
}

/// Outcome of pre-upload validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// Not checked yet.
    Pending,
    /// Passed every check.
    Valid,
    /// Failed a check; the file will not be sent.
    Rejected,
}

/// Terminal result of an upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// Drive accepted the file.
    Succeeded {
        /// Remote file id.
        file_id: String,
    },
    /// The attempt failed.
    Failed {
        /// User-facing reason.
        reason: String,
    },
}

/// Book-keeping for one upload attempt, driven by [`UploadEvent`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    /// Local file being uploaded.
    pub source: PathBuf,
    /// Destination folder once resolved.
    pub target_folder_id: Option<String>,
    /// Size reported at validation.
    pub declared_size: Option<u64>,
    /// Validation outcome.
    pub validation: ValidationStatus,
    /// Highest progress fraction seen.
    pub progress: f64,
    /// Set once the attempt is over.
    pub result: Option<UploadResult>,
}

impl UploadTask {
    /// A pending task for `source`.
    pub fn new(source: PathBuf) -> Self {
        Self {
            source,
            target_folder_id: None,
            declared_size: None,
            validation: ValidationStatus::Pending,
            progress: 0.0,
            result: None,
        }
    }

    /// Whether a result has been recorded.
    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    /// Progress as a whole percentage.
    pub fn percent(&self) -> u8 {
        (self.progress.clamp(0.0, 1.0) * 100.0).floor() as u8
    }

    /// Fold an event into the task. Ignored once terminal.
    pub fn apply(&mut self, event: &UploadEvent) {
        if self.is_terminal() {
            return;
        }

        match event {
            UploadEvent::Validated { size_bytes } => {
                self.validation = ValidationStatus::Valid;
                self.declared_size = Some(*size_bytes);
            }
            UploadEvent::FolderResolved { folder_id } => {
                self.target_folder_id = Some(folder_id.clone());
            }
            UploadEvent::Progress { fraction, .. } => {
                self.progress = self.progress.max(*fraction);
            }
        }
    }

    /// Record success.
    pub fn succeed(&mut self, file_id: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.progress = 1.0;
        self.result = Some(UploadResult::Succeeded {
            file_id: file_id.into(),
        });
    }

    /// Record failure; validation errors mark the task rejected.
    pub fn fail(&mut self, error: &CoreError) {
        if self.is_terminal() {
            return;
        }
        if error.is_validation_failure() {
            self.validation = ValidationStatus::Rejected;
        }
        self.result = Some(UploadResult::Failed {
            reason: error.to_string(),
        });
    }
}
