use crate::{
    CoreError, CoreResult,
    obs::{ObsConnector, ObsEndpoint, ObsTransport, protocol::{OUTPUT_NOT_RUNNING, OUTPUT_RUNNING}},
};

use std::{panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

/// Recording state as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObsState {
    /// No recording issued by this controller is running.
    Idle,
    /// `StartRecord` succeeded and no `StopRecord` has completed yet.
    Recording,
}

/// Issues start/stop recording commands to OBS over a reusable session.
///
/// The session is opened lazily and cached. Any transport failure drops the
/// cached session so the next call reconnects; nothing is retried here.
pub struct ObsController<C: ObsConnector = ObsEndpoint> {
    connector: C,
    session: Option<C::Transport>,
    state: ObsState,
    record_directory: Option<PathBuf>,
}

impl<C: ObsConnector> ObsController<C> {
    /// Create an idle, disconnected controller.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            session: None,
            state: ObsState::Idle,
            record_directory: None,
        }
    }

    /// Ask OBS to write recordings into `directory` before each start.
    pub fn with_record_directory(mut self, directory: PathBuf) -> Self {
        self.record_directory = Some(directory);
        self
    }

    /// Current state.
    pub fn state(&self) -> ObsState {
        self.state
    }

    /// Whether a session is currently cached.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session now instead of on first use.
    #[instrument(skip(self))]
    pub async fn connect(&mut self) -> CoreResult<()> {
        if self.session.is_none() {
            self.session = Some(self.connector.connect().await?);
        }
        Ok(())
    }

    /// Drop the cached session.
    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            debug!("OBS session dropped");
        }
    }

    /// Start recording.
    ///
    /// # Errors
    ///
    /// `AlreadyRecording` if this controller or OBS itself is already
    /// recording, `ConnectionError` if OBS is unreachable.
    #[instrument(skip(self))]
    pub async fn start_recording(&mut self) -> CoreResult<()> {
        if self.state == ObsState::Recording {
            return Err(CoreError::AlreadyRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let status = self.call("GetRecordStatus", None).await?;
        if status
            .get("outputActive")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            warn!("OBS is already recording outside this application");
            return Err(CoreError::AlreadyRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(directory) = self.record_directory.clone() {
            let data = json!({ "recordDirectory": directory.to_string_lossy() });
            match self.call("SetRecordDirectory", Some(data)).await {
                Ok(_) => debug!(directory = ?directory, "Record directory set"),
                // Older OBS builds lack the request; OBS keeps its own setting.
                Err(CoreError::ObsRequestRejected { code, comment, .. }) => {
                    warn!(code, comment = %comment, "OBS refused SetRecordDirectory");
                }
                Err(e) => return Err(e),
            }
        }

        match self.call("StartRecord", None).await {
            Ok(_) => {}
            // Someone started OBS between the status check and now.
            Err(CoreError::ObsRequestRejected { code, .. }) if code == OUTPUT_RUNNING => {
                warn!("OBS started recording outside this application");
                return Err(CoreError::AlreadyRecording {
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Err(e) => return Err(e),
        }
        self.state = ObsState::Recording;

        info!("OBS recording started");

        Ok(())
    }

    /// Stop recording and return the output file path reported by OBS.
    ///
    /// # Errors
    ///
    /// `NotRecording` if nothing is recording, `ConnectionError` on transport
    /// failure (the state stays `Recording` so the operator can retry).
    #[instrument(skip(self))]
    pub async fn stop_recording(&mut self) -> CoreResult<PathBuf> {
        if self.state == ObsState::Idle {
            return Err(CoreError::NotRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let data = match self.call("StopRecord", None).await {
            Ok(data) => data,
            Err(CoreError::ObsRequestRejected { code, .. }) if code == OUTPUT_NOT_RUNNING => {
                warn!("OBS reports it is not recording");
                self.state = ObsState::Idle;
                return Err(CoreError::NotRecording {
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Err(e) => return Err(e),
        };

        self.state = ObsState::Idle;

        let output_path = data
            .get("outputPath")
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| CoreError::ConnectionError {
                reason: "StopRecord response carried no outputPath".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(output_path = ?output_path, "OBS recording stopped");

        Ok(output_path)
    }

    async fn call(&mut self, request_type: &str, request_data: Option<Value>) -> CoreResult<Value> {
        self.connect().await?;
        let Some(session) = self.session.as_mut() else {
            return Err(CoreError::connection("OBS session unavailable"));
        };

        match session.request(request_type, request_data).await {
            Err(e @ CoreError::ConnectionError { .. }) => {
                warn!(request = request_type, error = %e, "OBS session lost");
                self.session = None;
                Err(e)
            }
            other => other,
        }
    }
}
