//! Google Drive v3 REST client.
//!
//! Folder queries, folder creation and the resumable upload protocol:
//! one `POST` opens a session, then fixed-size chunks are `PUT` with a
//! `Content-Range` header. Drive answers `308` with a `Range` header while the
//! transfer is incomplete and `200`/`201` with the file resource at the end.

use crate::{
    CoreError, CoreResult,
    drive::{DriveApi, DriveFile, FOLDER_MIME_TYPE, ResumableUpload, TokenSource},
};

use std::{io::SeekFrom, panic::Location, sync::Arc};

use async_trait::async_trait;
use error_location::ErrorLocation;
use reqwest::{
    Client, Response, StatusCode,
    header::{CONTENT_RANGE, LOCATION, RANGE},
    redirect,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, instrument};

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FILE_FIELDS: &str = "id, name, mimeType, webViewLink";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, webViewLink)";

/// Bytes per upload chunk. Drive requires a multiple of 256 KiB.
pub const UPLOAD_CHUNK_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Drive client backed by `reqwest`.
pub struct HttpDrive {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    files_url: String,
    upload_url: String,
    chunk_size: u64,
}

impl HttpDrive {
    /// Build a client that authenticates with `tokens`.
    #[track_caller]
    pub fn new(tokens: Arc<dyn TokenSource>) -> CoreResult<Self> {
        Self::with_endpoints(tokens, FILES_URL, UPLOAD_URL, UPLOAD_CHUNK_SIZE)
    }

    /// Client talking to other `files` and `upload` endpoints.
    #[track_caller]
    pub(crate) fn with_endpoints(
        tokens: Arc<dyn TokenSource>,
        files_url: &str,
        upload_url: &str,
        chunk_size: u64,
    ) -> CoreResult<Self> {
        // Drive's 308 "Resume Incomplete" must reach us, not the redirect logic.
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| CoreError::DriveAccessError {
                segment: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self {
            client,
            tokens,
            files_url: files_url.to_string(),
            upload_url: upload_url.to_string(),
            chunk_size,
        })
    }

    async fn list(&self, query: &str, segment: &str) -> CoreResult<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.tokens.access_token().await?;

            let mut request = self.client.get(&self.files_url).bearer_auth(token).query(&[
                ("q", query),
                ("spaces", "drive"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
                ("pageSize", "1000"),
                ("fields", LIST_FIELDS),
            ]);
            if let Some(page_token) = &page_token {
                request = request.query(&[("pageToken", page_token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| CoreError::drive(segment, e))?;
            let page: FileList = read_json(response, segment).await?;

            files.extend(page.files);

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(files)
    }

    async fn open_session(&self, upload: &ResumableUpload<'_>) -> CoreResult<String> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| upload_failed(0, e))?;

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(token)
            .query(&[
                ("uploadType", "resumable"),
                ("supportsAllDrives", "true"),
                ("fields", FILE_FIELDS),
            ])
            .header("X-Upload-Content-Type", upload.mime_type)
            .header("X-Upload-Content-Length", upload.size.to_string())
            .json(&json!({ "name": upload.name, "parents": [upload.parent_id] }))
            .send()
            .await
            .map_err(|e| upload_failed(0, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upload_failed(
                0,
                format!("Session request returned HTTP {}: {}", status, body),
            ));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| upload_failed(0, "Session response carried no Location header"))
    }

    async fn put_chunk(
        &self,
        session_uri: &str,
        content_range: String,
        body: Vec<u8>,
        acked: u64,
    ) -> CoreResult<Response> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| upload_failed(acked, e))?;

        self.client
            .put(session_uri)
            .bearer_auth(token)
            .header(CONTENT_RANGE, content_range)
            .body(body)
            .send()
            .await
            .map_err(|e| upload_failed(acked, e))
    }
}

#[async_trait]
impl DriveApi for HttpDrive {
    #[instrument(skip(self))]
    async fn find_folders(&self, parent_id: &str, name: &str) -> CoreResult<Vec<DriveFile>> {
        self.list(&folder_query(parent_id, name), name).await
    }

    #[instrument(skip(self))]
    async fn list_children(&self, parent_id: &str) -> CoreResult<Vec<DriveFile>> {
        self.list(&children_query(parent_id), parent_id).await
    }

    #[instrument(skip(self))]
    async fn create_folder(&self, parent_id: &str, name: &str) -> CoreResult<DriveFile> {
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(&self.files_url)
            .bearer_auth(token)
            .query(&[("supportsAllDrives", "true"), ("fields", FILE_FIELDS)])
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent_id],
            }))
            .send()
            .await
            .map_err(|e| CoreError::drive(name, e))?;

        let folder: DriveFile = read_json(response, name).await?;
        info!(folder_id = %folder.id, name, "Drive folder created");

        Ok(folder)
    }

    #[instrument(skip(self, upload, on_ack), fields(name = upload.name, size = upload.size))]
    async fn upload_resumable(
        &self,
        upload: ResumableUpload<'_>,
        on_ack: &(dyn Fn(u64) + Send + Sync),
    ) -> CoreResult<DriveFile> {
        let session_uri = self.open_session(&upload).await?;
        debug!("Resumable session opened");

        let mut file = tokio::fs::File::open(upload.path)
            .await
            .map_err(|e| upload_failed(0, e))?;

        let total = upload.size;
        let mut acked: u64 = 0;

        loop {
            let (content_range, body) = if acked >= total {
                // Nothing left to send; ask Drive to finish the file.
                (format!("bytes */{}", total), Vec::new())
            } else {
                let end = (acked + self.chunk_size).min(total);
                let mut body = vec![0u8; (end - acked) as usize];
                file.seek(SeekFrom::Start(acked))
                    .await
                    .map_err(|e| upload_failed(acked, e))?;
                file.read_exact(&mut body)
                    .await
                    .map_err(|e| upload_failed(acked, e))?;
                (format!("bytes {}-{}/{}", acked, end - 1, total), body)
            };

            let response = self
                .put_chunk(&session_uri, content_range, body, acked)
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => {
                    on_ack(total);
                    let file: DriveFile = response
                        .json()
                        .await
                        .map_err(|e| upload_failed(total, e))?;
                    info!(file_id = %file.id, "Upload complete");
                    return Ok(file);
                }
                StatusCode::PERMANENT_REDIRECT => {
                    let confirmed = response
                        .headers()
                        .get(RANGE)
                        .and_then(|value| value.to_str().ok())
                        .and_then(parse_range_end)
                        .map_or(0, |last| last + 1);

                    if confirmed <= acked {
                        return Err(upload_failed(acked, "Drive did not acknowledge the chunk"));
                    }
                    if confirmed > total {
                        return Err(upload_failed(
                            acked,
                            format!(
                                "Drive acknowledged {} bytes of a {} byte file",
                                confirmed, total
                            ),
                        ));
                    }

                    acked = confirmed;
                    on_ack(acked);
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(upload_failed(
                        acked,
                        format!("Chunk returned HTTP {}: {}", status, body),
                    ));
                }
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, segment: &str) -> CoreResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CoreError::drive(
            segment,
            format!("HTTP {}: {}", status, body),
        ));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| CoreError::drive(segment, e))
}

#[track_caller]
fn upload_failed(bytes_transferred: u64, reason: impl std::fmt::Display) -> CoreError {
    CoreError::UploadFailed {
        bytes_transferred,
        reason: reason.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Quote a value for a Drive `q` string literal.
pub(crate) fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Query for folders named exactly `name` directly under `parent_id`.
pub(crate) fn folder_query(parent_id: &str, name: &str) -> String {
    format!(
        "name = '{}' and mimeType = '{}' and '{}' in parents and trashed = false",
        escape_query_literal(name),
        FOLDER_MIME_TYPE,
        escape_query_literal(parent_id),
    )
}

/// Query for every non-trashed child of `parent_id`.
pub(crate) fn children_query(parent_id: &str) -> String {
    format!(
        "'{}' in parents and trashed = false",
        escape_query_literal(parent_id)
    )
}

/// Last acknowledged byte offset from a `Range: bytes=0-N` header.
pub(crate) fn parse_range_end(header: &str) -> Option<u64> {
    let (start, end) = header.trim().strip_prefix("bytes=")?.split_once('-')?;
    if start.trim() != "0" {
        return None;
    }
    end.trim().parse().ok()
}

/// Content type announced for a file extension.
pub(crate) fn mime_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "flv" => "video/x-flv",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "ts" => "video/mp2t",
        _ => "application/octet-stream",
    }
}
