use crate::{CoreError, CoreResult};

use std::{panic::Location, path::Path};

use async_trait::async_trait;
use error_location::ErrorLocation;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use tracing::{info, instrument};

/// OAuth scope limited to files created by this application.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Supplies bearer tokens for Drive requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently valid access token.
    async fn access_token(&self) -> CoreResult<String>;
}

/// Tokens minted from a Google service-account key file.
pub struct ServiceAccountTokens {
    account: CustomServiceAccount,
}

impl ServiceAccountTokens {
    /// Load a service-account JSON key.
    #[track_caller]
    #[instrument]
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let account =
            CustomServiceAccount::from_file(path).map_err(|e| CoreError::Credentials {
                reason: format!("Failed to load service account {:?}: {}", path, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(path = ?path, "Service account loaded");

        Ok(Self { account })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> CoreResult<String> {
        let token = self
            .account
            .token(&[DRIVE_FILE_SCOPE])
            .await
            .map_err(|e| CoreError::Credentials {
                reason: format!("Failed to obtain access token: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(token.as_str().to_string())
    }
}
