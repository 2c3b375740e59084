use std::path::PathBuf;

/// Google Drive destination and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveConfig {
    /// Root folder every class folder is created under.
    pub folder_id: String,
    /// Service-account key file.
    pub service_account_file: PathBuf,
}
