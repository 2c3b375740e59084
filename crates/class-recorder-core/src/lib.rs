//! Class-recorder Core Library
//!
//! OBS recording control and Google Drive lecture uploads.
//!
//! # Example
//!
//! ```no_run
//! use class_recorder_core::{
//!     AllowedTypes, CoreResult, FolderPath, HttpDrive, ServiceAccountTokens, UploadOrchestrator,
//!     UploadPolicy, UploadRequest,
//! };
//!
//! use std::{path::Path, sync::Arc};
//!
//! async fn upload() -> CoreResult<()> {
//!     let tokens = ServiceAccountTokens::from_file(Path::new("service-account.json"))?;
//!     let drive = Arc::new(HttpDrive::new(Arc::new(tokens))?);
//!     let policy = UploadPolicy::from_megabytes(500, AllowedTypes::Any);
//!     let orchestrator = UploadOrchestrator::new(drive, policy, "ROOT".to_string());
//!
//!     let (events_tx, _events_rx) = tokio::sync::mpsc::unbounded_channel();
//!     let request = UploadRequest {
//!         file_path: "lecture.mp4".into(),
//!         folder: FolderPath::new("Algebra", "Quadratics", "Factoring"),
//!         lecture_date: chrono::Local::now().date_naive(),
//!     };
//!
//!     let file = orchestrator.upload(&request, &events_tx).await?;
//!     println!("Uploaded: {}", file.view_url());
//!     Ok(())
//! }
//! ```

mod drive;
mod error;
pub mod naming;
mod obs;
mod upload;

pub use {
    drive::{
        DEFAULT_SUBTOPIC, DRIVE_FILE_SCOPE, DriveApi, DriveFile, FOLDER_MIME_TYPE, FolderPath,
        FolderResolver, HttpDrive, ResolvedFolders, ResumableUpload, ServiceAccountTokens,
        TokenSource, UPLOAD_CHUNK_SIZE,
    },
    error::{CoreError, Result as CoreResult},
    obs::{
        OUTPUT_NOT_RUNNING, OUTPUT_RUNNING, ObsConnector, ObsController, ObsEndpoint, ObsSession,
        ObsState, ObsTransport,
    },
    upload::{
        AllowedTypes, UploadEvent, UploadOrchestrator, UploadPolicy, UploadRequest, UploadResult,
        UploadTask, ValidatedFile, ValidationStatus, extension_of, normalize_extension,
    },
};

#[cfg(test)]
mod tests;
