use crate::{
    CoreError, CoreResult,
    obs::{
        ObsConnector, ObsTransport,
        protocol::{
            Frame, Hello, Identified, Identify, OP_EVENT, OP_HELLO, OP_IDENTIFIED, OP_IDENTIFY,
            OP_REQUEST, OP_REQUEST_RESPONSE, RPC_VERSION, Request, RequestResponse,
            authentication_string,
        },
    },
};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;
use futures_util::{SinkExt, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, instrument, trace};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Address and credentials of the local OBS websocket server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsEndpoint {
    /// Host name, usually `localhost`.
    pub host: String,
    /// Websocket server port (OBS default 4455).
    pub port: u16,
    /// Server password; `None` when authentication is disabled in OBS.
    pub password: Option<String>,
}

impl ObsEndpoint {
    /// Websocket URL for this endpoint.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl ObsConnector for ObsEndpoint {
    type Transport = ObsSession;

    async fn connect(&self) -> CoreResult<ObsSession> {
        ObsSession::connect(self).await
    }
}

/// An identified OBS websocket v5 session.
pub struct ObsSession {
    stream: WsStream,
}

impl ObsSession {
    /// Connect, answer the `Hello` challenge and wait for `Identified`.
    #[instrument(skip(endpoint), fields(url = %endpoint.url()))]
    pub async fn connect(endpoint: &ObsEndpoint) -> CoreResult<Self> {
        let (stream, _response) = connect_async(endpoint.url())
            .await
            .map_err(|e| CoreError::connection(format!("Failed to connect to OBS: {}", e)))?;

        let mut session = Self { stream };

        let hello: Hello = session.read_op(OP_HELLO).await?;
        debug!(
            obs_websocket_version = ?hello.obs_web_socket_version,
            rpc_version = hello.rpc_version,
            "Received Hello"
        );

        let authentication = match (&hello.authentication, &endpoint.password) {
            (Some(challenge), Some(password)) => Some(authentication_string(
                password,
                &challenge.salt,
                &challenge.challenge,
            )),
            (Some(_), None) => {
                return Err(CoreError::ConnectionError {
                    reason: "OBS requires a password but none is configured".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            (None, _) => None,
        };

        session
            .send_op(
                OP_IDENTIFY,
                &Identify {
                    rpc_version: RPC_VERSION,
                    authentication,
                    event_subscriptions: 0,
                },
            )
            .await?;

        let identified: Identified = session.read_op(OP_IDENTIFIED).await?;

        info!(
            rpc_version = identified.negotiated_rpc_version,
            "Connected to OBS websocket"
        );

        Ok(session)
    }

    async fn send_op<T: Serialize>(&mut self, op: u8, d: &T) -> CoreResult<()> {
        let text = serde_json::to_string(&Frame { op, d })
            .map_err(|e| CoreError::connection(format!("Failed to encode message: {}", e)))?;

        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| CoreError::connection(format!("Failed to send message: {}", e)))
    }

    /// Read frames until one with `op` arrives. Events are skipped.
    async fn read_op<T: DeserializeOwned>(&mut self, op: u8) -> CoreResult<T> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    let frame: Frame<Value> = serde_json::from_str(&text).map_err(|e| {
                        CoreError::connection(format!("Malformed OBS message: {}", e))
                    })?;

                    if frame.op == op {
                        return serde_json::from_value(frame.d).map_err(|e| {
                            CoreError::connection(format!("Malformed OBS payload: {}", e))
                        });
                    }

                    if frame.op != OP_EVENT {
                        debug!(op = frame.op, expected = op, "Skipping unexpected OBS message");
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("{} ({})", f.reason.as_str(), u16::from(f.code)))
                        .unwrap_or_else(|| "no reason given".to_string());
                    return Err(CoreError::connection(format!(
                        "OBS closed the connection: {}",
                        reason
                    )));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(CoreError::connection(format!("Websocket error: {}", e)));
                }
                None => {
                    return Err(CoreError::connection("OBS websocket stream ended"));
                }
            }
        }
    }
}

#[async_trait]
impl ObsTransport for ObsSession {
    async fn request(
        &mut self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> CoreResult<Value> {
        let request_id = Uuid::new_v4().to_string();

        self.send_op(
            OP_REQUEST,
            &Request {
                request_type,
                request_id: request_id.clone(),
                request_data,
            },
        )
        .await?;

        loop {
            let response: RequestResponse = self.read_op(OP_REQUEST_RESPONSE).await?;
            if response.request_id != request_id {
                trace!(request_id = %response.request_id, "Ignoring response to another request");
                continue;
            }

            if !response.request_status.result {
                return Err(CoreError::ObsRequestRejected {
                    request: response.request_type,
                    code: response.request_status.code,
                    comment: response.request_status.comment.unwrap_or_default(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            debug!(request = request_type, "OBS request succeeded");
            return Ok(response.response_data.unwrap_or(Value::Null));
        }
    }
}
