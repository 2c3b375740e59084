use crate::{
    CoreResult, FolderPath,
    drive::{DriveApi, DriveFile, FolderResolver, ResumableUpload, http::mime_type_for},
    naming::lecture_file_name,
    upload::{UploadEvent, UploadPolicy},
};

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

/// What to upload and where it belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Local recording.
    pub file_path: PathBuf,
    /// Destination names.
    pub folder: FolderPath,
    /// Date stamped into the remote file name.
    pub lecture_date: NaiveDate,
}

/// Validates, resolves the destination and uploads one file.
///
/// Nothing is retried: a failed attempt is reported and the caller decides
/// whether to start over.
pub struct UploadOrchestrator {
    drive: Arc<dyn DriveApi>,
    policy: UploadPolicy,
    root_folder_id: String,
}

impl UploadOrchestrator {
    /// Orchestrator uploading below `root_folder_id`.
    pub fn new(drive: Arc<dyn DriveApi>, policy: UploadPolicy, root_folder_id: String) -> Self {
        Self {
            drive,
            policy,
            root_folder_id,
        }
    }

    /// Active policy.
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Run one upload, reporting progress on `events`.
    ///
    /// Validation runs before any Drive call. Progress fractions are
    /// non-decreasing and end at `1.0` on success.
    ///
    /// # Errors
    ///
    /// `FileNotFoundError`, `FileTooLarge`, `UnsupportedFileType`,
    /// `DriveAccessError` or `UploadFailed`.
    #[instrument(skip(self, events), fields(file = ?request.file_path, folder = %request.folder))]
    pub async fn upload(
        &self,
        request: &UploadRequest,
        events: &mpsc::UnboundedSender<UploadEvent>,
    ) -> CoreResult<DriveFile> {
        let validated = self.policy.validate(&request.file_path).await?;
        let _ = events.send(UploadEvent::Validated {
            size_bytes: validated.size_bytes,
        });

        let resolver = FolderResolver::new(self.drive.as_ref());
        let folders = resolver
            .resolve_path(&self.root_folder_id, &request.folder)
            .await?;
        debug!(
            class_id = folders.class_id(),
            chapter_id = folders.chapter_id(),
            folder_id = folders.leaf(),
            "Folder chain resolved"
        );
        let _ = events.send(UploadEvent::FolderResolved {
            folder_id: folders.leaf().to_string(),
        });

        let existing = resolver
            .count_files(folders.chapter_id(), &validated.extension)
            .await?;
        let remote_name = lecture_file_name(
            &request.folder,
            request.lecture_date,
            existing + 1,
            &validated.extension,
        );

        let total = validated.size_bytes;
        let high_water = AtomicU64::new(0);
        let on_ack = |acked: u64| {
            let acked = acked.min(total);
            let previous = high_water.fetch_max(acked, Ordering::AcqRel);
            if acked > previous {
                let _ = events.send(UploadEvent::Progress {
                    bytes_sent: acked,
                    fraction: fraction(acked, total),
                });
            }
        };

        let file = self
            .drive
            .upload_resumable(
                ResumableUpload {
                    path: &validated.path,
                    parent_id: folders.leaf(),
                    name: &remote_name,
                    size: total,
                    mime_type: mime_type_for(&validated.extension),
                },
                &on_ack,
            )
            .await?;

        if total == 0 || high_water.load(Ordering::Acquire) < total {
            let _ = events.send(UploadEvent::Progress {
                bytes_sent: total,
                fraction: 1.0,
            });
        }

        info!(file_id = %file.id, name = %file.name, url = %file.view_url(), "File uploaded");

        Ok(file)
    }
}

fn fraction(acked: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        acked as f64 / total as f64
    }
}
