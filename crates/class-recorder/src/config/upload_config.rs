use class_recorder_core::{AllowedTypes, UploadPolicy};

/// Pre-upload checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Size ceiling in megabytes.
    pub max_upload_mb: u64,
    /// Accepted extensions.
    pub allowed_types: AllowedTypes,
}

impl UploadConfig {
    /// Policy enforcing these settings.
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy::from_megabytes(self.max_upload_mb, self.allowed_types.clone())
    }
}
