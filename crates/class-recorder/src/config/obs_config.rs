use class_recorder_core::ObsEndpoint;

/// OBS websocket connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsConfig {
    /// Host OBS listens on.
    pub host: String,
    /// Websocket port.
    pub port: u16,
    /// Websocket password; `None` when authentication is disabled.
    pub password: Option<String>,
}

impl ObsConfig {
    /// Endpoint for the OBS controller.
    pub fn endpoint(&self) -> ObsEndpoint {
        ObsEndpoint {
            host: self.host.clone(),
            port: self.port,
            password: self.password.clone(),
        }
    }
}
