use crate::{CoreError, CoreResult};

use std::{
    collections::BTreeSet,
    fmt,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use tracing::{debug, instrument};

const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Extensions accepted for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedTypes {
    /// Wildcard: every extension is accepted.
    Any,
    /// Only these extensions (lowercase, without the leading dot).
    Only(BTreeSet<String>),
}

impl AllowedTypes {
    /// Parse a comma-separated list such as `"mp4, .MKV"` or `"*"`.
    ///
    /// Returns `None` when the list holds no entries.
    pub fn parse(raw: &str) -> Option<Self> {
        let entries: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();

        if entries.is_empty() {
            return None;
        }

        if entries.contains(&"*") {
            return Some(AllowedTypes::Any);
        }

        let extensions: BTreeSet<String> = entries
            .into_iter()
            .map(normalize_extension)
            .filter(|ext| !ext.is_empty())
            .collect();

        if extensions.is_empty() {
            None
        } else {
            Some(AllowedTypes::Only(extensions))
        }
    }

    /// Whether `extension` (any case, with or without dot) is accepted.
    pub fn allows(&self, extension: &str) -> bool {
        match self {
            AllowedTypes::Any => true,
            AllowedTypes::Only(set) => set.contains(&normalize_extension(extension)),
        }
    }
}

impl fmt::Display for AllowedTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedTypes::Any => write!(f, "*"),
            AllowedTypes::Only(set) => {
                let listed: Vec<String> = set.iter().map(|ext| format!(".{}", ext)).collect();
                write!(f, "{}", listed.join(", "))
            }
        }
    }
}

/// Lowercase an extension and strip any leading dot.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Extension of `path`, normalized; empty when it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| normalize_extension(&ext.to_string_lossy()))
        .unwrap_or_default()
}

/// A file that passed every pre-upload check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    /// Local path.
    pub path: PathBuf,
    /// Size at validation time.
    pub size_bytes: u64,
    /// Normalized extension, possibly empty.
    pub extension: String,
}

/// Size ceiling and extension allow-list applied before any upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    max_bytes: u64,
    allowed: AllowedTypes,
}

impl UploadPolicy {
    /// Policy with a ceiling given in megabytes (MiB).
    pub fn from_megabytes(max_megabytes: u64, allowed: AllowedTypes) -> Self {
        Self {
            max_bytes: max_megabytes.saturating_mul(BYTES_PER_MEGABYTE),
            allowed,
        }
    }

    /// Ceiling in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Accepted extensions.
    pub fn allowed(&self) -> &AllowedTypes {
        &self.allowed
    }

    /// Reject sizes strictly above the ceiling.
    #[track_caller]
    pub fn check_size(&self, size_bytes: u64) -> CoreResult<()> {
        if size_bytes > self.max_bytes {
            return Err(CoreError::FileTooLarge {
                actual_bytes: size_bytes,
                limit_bytes: self.max_bytes,
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    /// Reject extensions outside the allow-list.
    #[track_caller]
    pub fn check_extension(&self, extension: &str) -> CoreResult<()> {
        if !self.allowed.allows(extension) {
            return Err(CoreError::UnsupportedFileType {
                extension: normalize_extension(extension),
                allowed: self.allowed.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    /// Existence/readability, size, then extension.
    #[instrument(skip(self))]
    pub async fn validate(&self, path: &Path) -> CoreResult<ValidatedFile> {
        let not_found = || CoreError::FileNotFoundError {
            path: path.to_path_buf(),
            location: ErrorLocation::from(Location::caller()),
        };

        let metadata = tokio::fs::metadata(path).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }
        // Opening proves readability without reading the contents.
        tokio::fs::File::open(path).await.map_err(|_| not_found())?;

        let size_bytes = metadata.len();
        self.check_size(size_bytes)?;

        let extension = extension_of(path);
        self.check_extension(&extension)?;

        debug!(size_bytes, extension = %extension, "File validated");

        Ok(ValidatedFile {
            path: path.to_path_buf(),
            size_bytes,
            extension,
        })
    }
}
