mod controller;
pub(crate) mod protocol;
mod session;

pub use {
    controller::{ObsController, ObsState},
    protocol::{OUTPUT_NOT_RUNNING, OUTPUT_RUNNING},
    session::{ObsEndpoint, ObsSession},
};

use crate::CoreResult;

use async_trait::async_trait;
use serde_json::Value;

/// A connected OBS session able to issue requests.
#[async_trait]
pub trait ObsTransport: Send {
    /// Issue one request and return its `responseData` (`Null` when absent).
    ///
    /// Transport failures must surface as `CoreError::ConnectionError` so the
    /// controller knows to drop the session.
    async fn request(&mut self, request_type: &str, request_data: Option<Value>)
    -> CoreResult<Value>;
}

/// Opens new OBS sessions.
#[async_trait]
pub trait ObsConnector: Send + Sync {
    /// Session type produced by this connector.
    type Transport: ObsTransport;

    /// Open and identify a new session.
    async fn connect(&self) -> CoreResult<Self::Transport>;
}
