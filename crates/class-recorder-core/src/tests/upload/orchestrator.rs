use crate::{
    AllowedTypes, CoreError, FolderPath, UploadEvent, UploadOrchestrator, UploadPolicy,
    UploadRequest, tests::fakes::MemoryDrive,
};

use std::{path::Path, sync::Arc};

use chrono::NaiveDate;
use tempfile::TempDir;
use tokio::sync::mpsc;

const MIB: u64 = 1024 * 1024;
const ROOT: &str = "ROOT";

#[allow(clippy::unwrap_used)]
fn sparse_file(dir: &TempDir, name: &str, size: u64) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::File::create(&path).unwrap().set_len(size).unwrap();
    path
}

fn request(path: &Path) -> UploadRequest {
    UploadRequest {
        file_path: path.to_path_buf(),
        folder: FolderPath::new("Algebra", "Quadratics", "Factoring"),
        lecture_date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap_or_default(),
    }
}

fn orchestrator(drive: &Arc<MemoryDrive>, policy: UploadPolicy) -> UploadOrchestrator {
    UploadOrchestrator::new(drive.clone(), policy, ROOT.to_string())
}

fn drain(rx: &mut mpsc::UnboundedReceiver<UploadEvent>) -> Vec<UploadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn fractions(events: &[UploadEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            UploadEvent::Progress { fraction, .. } => Some(*fraction),
            _ => None,
        })
        .collect()
}

/// WHAT: A 10 MiB recording lands in a freshly created folder chain
/// WHY: This is the everyday path from a finished lecture to Drive
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_valid_recording_when_uploading_then_file_lands_in_subtopic_folder() {
    // Given: A 10 MiB file, a 500 MB ceiling and an empty root
    let dir = tempfile::tempdir().unwrap();
    let path = sparse_file(&dir, "lecture.mp4", 10 * MIB);
    let drive = Arc::new(MemoryDrive::new());
    let uploader = orchestrator(&drive, UploadPolicy::from_megabytes(500, AllowedTypes::Any));
    let (tx, mut rx) = mpsc::unbounded_channel();

    // When: Uploading
    let file = uploader.upload(&request(&path), &tx).await.unwrap();

    // Then: The chain exists once and the file sits in the subtopic folder
    assert_eq!(drive.folders_created(), 3);
    let class = &drive.children_named(ROOT, "Algebra")[0];
    let chapter = &drive.children_named(&class.id, "Quadratics")[0];
    let subtopic = &drive.children_named(&chapter.id, "Factoring")[0];
    let stored = drive.children_named(&subtopic.id, &file.name);
    assert_eq!(stored.len(), 1);
    assert_eq!(file.name, "Algebra_Quadratics_Factoring_18-10-2026_Class_1.mp4");
    assert_eq!(file.mime_type, "video/mp4");

    // And: Events arrive in order with monotonic progress ending at 1.0
    let events = drain(&mut rx);
    assert_eq!(events[0], UploadEvent::Validated { size_bytes: 10 * MIB });
    assert_eq!(
        events[1],
        UploadEvent::FolderResolved {
            folder_id: subtopic.id.clone()
        }
    );
    let progress = fractions(&events);
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!((progress[progress.len() - 1] - 1.0).abs() < f64::EPSILON);
}

/// WHAT: A second lecture in the same chapter gets the next number
/// WHY: Lecture numbers count what is already in the chapter
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_previous_lecture_when_uploading_again_then_number_increments() {
    // Given: One lecture already uploaded
    let dir = tempfile::tempdir().unwrap();
    let path = sparse_file(&dir, "lecture.mp4", MIB);
    let drive = Arc::new(MemoryDrive::new());
    let uploader = orchestrator(&drive, UploadPolicy::from_megabytes(500, AllowedTypes::Any));
    let (tx, _rx) = mpsc::unbounded_channel();
    uploader.upload(&request(&path), &tx).await.unwrap();

    // When: Uploading again
    let second = uploader.upload(&request(&path), &tx).await.unwrap();

    // Then: Class_2, and no extra folders
    assert_eq!(second.name, "Algebra_Quadratics_Factoring_18-10-2026_Class_2.mp4");
    assert_eq!(drive.folders_created(), 3);
}

/// WHAT: An oversized file is refused before any Drive call
/// WHY: Nothing should be created remotely for a file that cannot be sent
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_file_over_ceiling_when_uploading_then_too_large_without_drive_calls() {
    // Given: A 600 MiB sparse file against a 500 MB ceiling
    let dir = tempfile::tempdir().unwrap();
    let path = sparse_file(&dir, "long.mp4", 600 * MIB);
    let drive = Arc::new(MemoryDrive::new());
    let uploader = orchestrator(&drive, UploadPolicy::from_megabytes(500, AllowedTypes::Any));
    let (tx, mut rx) = mpsc::unbounded_channel();

    // When: Uploading
    let result = uploader.upload(&request(&path), &tx).await;

    // Then: FileTooLarge, zero Drive calls, no events
    assert!(matches!(result, Err(CoreError::FileTooLarge { .. })));
    assert_eq!(drive.calls(), 0);
    assert!(drain(&mut rx).is_empty());
}

/// WHAT: A disallowed extension is refused before any Drive call
/// WHY: The allow-list is a local check
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_disallowed_type_when_uploading_then_unsupported_without_drive_calls() {
    // Given: An .flv file with only mp4 allowed
    let dir = tempfile::tempdir().unwrap();
    let path = sparse_file(&dir, "lecture.flv", MIB);
    let drive = Arc::new(MemoryDrive::new());
    let policy = UploadPolicy::from_megabytes(500, AllowedTypes::parse("mp4").unwrap());
    let uploader = orchestrator(&drive, policy);
    let (tx, _rx) = mpsc::unbounded_channel();

    // When: Uploading
    let result = uploader.upload(&request(&path), &tx).await;

    // Then: UnsupportedFileType and no Drive traffic
    assert!(matches!(result, Err(CoreError::UnsupportedFileType { .. })));
    assert_eq!(drive.calls(), 0);
}

/// WHAT: A transfer failure reports how far it got and keeps the folders
/// WHY: The next attempt reuses the chain instead of recreating it
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_transfer_breaks_when_uploading_then_upload_failed_with_bytes_sent() {
    // Given: Drive drops the transfer after 3 MiB
    let dir = tempfile::tempdir().unwrap();
    let path = sparse_file(&dir, "lecture.mp4", 8 * MIB);
    let drive = Arc::new(MemoryDrive::new());
    drive.with(|s| s.fail_upload_after = Some(3 * MIB));
    let uploader = orchestrator(&drive, UploadPolicy::from_megabytes(500, AllowedTypes::Any));
    let (tx, mut rx) = mpsc::unbounded_channel();

    // When: Uploading
    let result = uploader.upload(&request(&path), &tx).await;

    // Then: UploadFailed at 3 MiB, progress stopped short, folders remain
    match result {
        Err(CoreError::UploadFailed {
            bytes_transferred, ..
        }) => assert_eq!(bytes_transferred, 3 * MIB),
        other => unreachable!("expected UploadFailed, got {other:?}"),
    }
    let progress = fractions(&drain(&mut rx));
    assert!(progress.iter().all(|f| *f < 1.0));
    assert_eq!(drive.folders_created(), 3);

    // And: A retry succeeds without new folders
    drive.with(|s| s.fail_upload_after = None);
    uploader.upload(&request(&path), &tx).await.unwrap();
    assert_eq!(drive.folders_created(), 3);
}

/// WHAT: An empty file still finishes at 100%
/// WHY: Drive acknowledges nothing for zero bytes
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_empty_file_when_uploading_then_progress_completes() {
    // Given: A zero-byte recording
    let dir = tempfile::tempdir().unwrap();
    let path = sparse_file(&dir, "empty.mp4", 0);
    let drive = Arc::new(MemoryDrive::new());
    let uploader = orchestrator(&drive, UploadPolicy::from_megabytes(500, AllowedTypes::Any));
    let (tx, mut rx) = mpsc::unbounded_channel();

    // When: Uploading
    uploader.upload(&request(&path), &tx).await.unwrap();

    // Then: A single final progress event at 1.0
    assert_eq!(fractions(&drain(&mut rx)), vec![1.0]);
}

/// WHAT: A Drive outage during resolution surfaces as DriveAccessError
/// WHY: The operator sees which folder could not be reached
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_drive_lookup_fails_when_uploading_then_drive_access_error() {
    // Given: Lookups of the class fail
    let dir = tempfile::tempdir().unwrap();
    let path = sparse_file(&dir, "lecture.mp4", MIB);
    let drive = Arc::new(MemoryDrive::new());
    drive.with(|s| s.fail_lookups_of = Some("Algebra".to_string()));
    let uploader = orchestrator(&drive, UploadPolicy::from_megabytes(500, AllowedTypes::Any));
    let (tx, _rx) = mpsc::unbounded_channel();

    // When: Uploading
    let result = uploader.upload(&request(&path), &tx).await;

    // Then: DriveAccessError and nothing created
    assert!(matches!(result, Err(CoreError::DriveAccessError { .. })));
    assert_eq!(drive.folders_created(), 0);
}
