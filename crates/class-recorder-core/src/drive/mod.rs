mod auth;
mod folders;
pub(crate) mod http;

pub use {
    auth::{DRIVE_FILE_SCOPE, ServiceAccountTokens, TokenSource},
    folders::{DEFAULT_SUBTOPIC, FolderPath, FolderResolver, ResolvedFolders},
    http::{HttpDrive, UPLOAD_CHUNK_SIZE},
};

use crate::CoreResult;

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Browser URL template for an uploaded file.
const DRIVE_VIEW_URL: &str = "https://drive.google.com/file/d/";

/// The subset of a Drive file resource this crate reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Drive file id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// MIME type; folders use [`FOLDER_MIME_TYPE`].
    #[serde(default)]
    pub mime_type: String,
    /// Link to view the file in a browser, when requested.
    #[serde(default)]
    pub web_view_link: Option<String>,
}

impl DriveFile {
    /// Whether this entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Browser link, falling back to the canonical view URL.
    pub fn view_url(&self) -> String {
        self.web_view_link
            .clone()
            .unwrap_or_else(|| format!("{}{}/view", DRIVE_VIEW_URL, self.id))
    }
}

/// Parameters of one resumable upload.
#[derive(Debug, Clone, Copy)]
pub struct ResumableUpload<'a> {
    /// Local file to send.
    pub path: &'a Path,
    /// Destination folder id.
    pub parent_id: &'a str,
    /// Remote file name.
    pub name: &'a str,
    /// Total bytes to send.
    pub size: u64,
    /// Content type announced to Drive.
    pub mime_type: &'a str,
}

/// The Drive operations the resolver and orchestrator rely on.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Non-trashed folders named exactly `name` directly under `parent_id`,
    /// in the API's default order.
    async fn find_folders(&self, parent_id: &str, name: &str) -> CoreResult<Vec<DriveFile>>;

    /// All non-trashed children of `parent_id`.
    async fn list_children(&self, parent_id: &str) -> CoreResult<Vec<DriveFile>>;

    /// Create a folder named `name` under `parent_id`.
    async fn create_folder(&self, parent_id: &str, name: &str) -> CoreResult<DriveFile>;

    /// Send a file as a single resumable transfer.
    ///
    /// `on_ack` receives the running count of bytes Drive has acknowledged.
    /// Failures after the session starts are `CoreError::UploadFailed`.
    async fn upload_resumable(
        &self,
        upload: ResumableUpload<'_>,
        on_ack: &(dyn Fn(u64) + Send + Sync),
    ) -> CoreResult<DriveFile>;
}
