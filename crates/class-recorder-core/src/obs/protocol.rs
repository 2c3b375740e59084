//! OBS websocket v5 message shapes.
//!
//! Every frame is `{ "op": <opcode>, "d": <payload> }`. Only the opcodes the
//! controller needs are modelled.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// RPC version requested during identification.
pub(crate) const RPC_VERSION: u32 = 1;

pub(crate) const OP_HELLO: u8 = 0;
pub(crate) const OP_IDENTIFY: u8 = 1;
pub(crate) const OP_IDENTIFIED: u8 = 2;
pub(crate) const OP_EVENT: u8 = 5;
pub(crate) const OP_REQUEST: u8 = 6;
pub(crate) const OP_REQUEST_RESPONSE: u8 = 7;

/// Request status code OBS returns when the record output is already running.
pub const OUTPUT_RUNNING: u16 = 500;
/// Request status code OBS returns when the record output is not running.
pub const OUTPUT_NOT_RUNNING: u16 = 501;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Frame<T> {
    pub op: u8,
    pub d: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Hello {
    #[serde(default)]
    pub obs_web_socket_version: Option<String>,
    pub rpc_version: u32,
    #[serde(default)]
    pub authentication: Option<AuthChallenge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthChallenge {
    pub challenge: String,
    pub salt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Identify {
    pub rpc_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    /// Bitmask of event categories; zero because the controller ignores events.
    pub event_subscriptions: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Identified {
    pub negotiated_rpc_version: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Request<'a> {
    pub request_type: &'a str,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestResponse {
    pub request_type: String,
    pub request_id: String,
    pub request_status: RequestStatus,
    #[serde(default)]
    pub response_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestStatus {
    pub result: bool,
    pub code: u16,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Compute the `authentication` string for an `Identify` message.
///
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`
pub(crate) fn authentication_string(password: &str, salt: &str, challenge: &str) -> String {
    let secret = BASE64.encode(Sha256::digest(format!("{password}{salt}").as_bytes()));
    BASE64.encode(Sha256::digest(format!("{secret}{challenge}").as_bytes()))
}
