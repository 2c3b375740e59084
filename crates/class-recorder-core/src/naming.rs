//! File names for recordings and uploaded lectures.

use crate::{CoreError, CoreResult, FolderPath};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use chrono::NaiveDate;
use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// How long to wait for OBS to flush the output file after stopping.
pub const RECORDING_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Extension used when the OBS output has none.
pub const DEFAULT_RECORDING_EXTENSION: &str = "mp4";

/// Keep alphanumerics, space, `-` and `_`.
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect()
}

fn with_extension(base: String, extension: &str) -> String {
    if extension.is_empty() {
        base
    } else {
        format!("{}.{}", base, extension)
    }
}

/// Local name for a finished recording:
/// `{class}_{chapter}_{subtopic}_{DD-MM-YYYY}.{ext}`.
pub fn recording_file_name(folder: &FolderPath, date: NaiveDate, extension: &str) -> String {
    let base = format!(
        "{}_{}_{}_{}",
        sanitize_component(&folder.class),
        sanitize_component(&folder.chapter),
        sanitize_component(&folder.subtopic),
        date.format("%d-%m-%Y"),
    );
    with_extension(base, extension)
}

/// Remote name for the `number`-th lecture of a chapter:
/// `{class}_{chapter}_{subtopic}_{DD-MM-YYYY}_Class_{n}.{ext}`.
pub fn lecture_file_name(
    folder: &FolderPath,
    date: NaiveDate,
    number: usize,
    extension: &str,
) -> String {
    let base = format!(
        "{}_{}_{}_{}_Class_{}",
        folder.class,
        folder.chapter,
        folder.subtopic,
        date.format("%d-%m-%Y"),
        number,
    );
    with_extension(base, extension)
}

/// First of `name`, `stem_1.ext`, `stem_2.ext`, ... not present in `dir`.
pub async fn unique_target(dir: &Path, name: &str) -> CoreResult<PathBuf> {
    let candidate = dir.join(name);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = as_path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut counter: u32 = 1;
    loop {
        let candidate = dir.join(with_extension(format!("{}_{}", stem, counter), &extension));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Wait for `path` to appear, polling until `timeout`.
pub async fn wait_for_file(path: &Path, timeout: Duration) -> CoreResult<()> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if tokio::fs::try_exists(path).await? {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CoreError::FileNotFoundError {
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        tokio::time::sleep(FLUSH_POLL_INTERVAL).await;
    }
}

/// Rename `actual` to `desired_name` in the same directory; collisions get
/// a numeric suffix.
async fn rename_into_place(actual: &Path, desired_name: &str) -> CoreResult<PathBuf> {
    if actual.file_name().is_some_and(|name| name == desired_name) {
        debug!("Recording already has the desired name");
        return Ok(actual.to_path_buf());
    }

    let dir = actual.parent().unwrap_or_else(|| Path::new("."));
    let target = unique_target(dir, desired_name).await?;

    tokio::fs::rename(actual, &target).await?;

    info!(from = ?actual, to = ?target, "Recording renamed");

    Ok(target)
}

/// Most recently modified visible file in `dir` changed at or after `since`.
pub async fn newest_file_since(dir: &Path, since: SystemTime) -> CoreResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        if modified < since {
            continue;
        }
        if newest.as_ref().is_none_or(|(best, _)| modified > *best) {
            newest = Some((modified, entry.path()));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// Give the stopped recording its lecture name without ever losing it.
///
/// If OBS's reported `output` never shows up within `flush_timeout`, the
/// newest file written to the same directory since `started_at` is renamed
/// instead. When no file can be found or renamed, the best known path is
/// returned as is.
#[instrument]
pub async fn settle_recording(
    output: &Path,
    desired_name: &str,
    started_at: SystemTime,
    flush_timeout: Duration,
) -> PathBuf {
    let actual = match wait_for_file(output, flush_timeout).await {
        Ok(()) => output.to_path_buf(),
        Err(e) => {
            let dir = output.parent().unwrap_or_else(|| Path::new("."));
            match newest_file_since(dir, started_at).await {
                Ok(Some(found)) => {
                    warn!(output = ?output, found = ?found, "OBS output missing, using newest recording");
                    found
                }
                Ok(None) => {
                    warn!(output = ?output, error = ?e, "OBS output missing, keeping reported path");
                    return output.to_path_buf();
                }
                Err(scan) => {
                    warn!(output = ?output, error = ?scan, "Could not scan recordings folder");
                    return output.to_path_buf();
                }
            }
        }
    };

    match rename_into_place(&actual, desired_name).await {
        Ok(path) => path,
        Err(e) => {
            warn!(path = ?actual, error = ?e, "Rename failed, keeping the OBS file name");
            actual
        }
    }
}
