mod catalog;
#[allow(clippy::module_inception)]
mod config;
mod drive_config;
mod obs_config;
mod paths;
mod upload_config;

pub(crate) use {
    catalog::{Catalog, CatalogChapter, CatalogClass},
    config::Config,
    drive_config::DriveConfig,
    obs_config::ObsConfig,
    paths::AppPaths,
    upload_config::UploadConfig,
};

pub(crate) const DEFAULT_SERVICE_ACCOUNT_FILE: &str = "service-account.json";
pub(crate) const DEFAULT_MAX_UPLOAD_MB: u64 = 100;
pub(crate) const DEFAULT_ALLOWED_FILE_TYPES: &str = "*";
pub(crate) const DEFAULT_OBS_HOST: &str = "localhost";
pub(crate) const DEFAULT_OBS_PORT: u16 = 4455;
