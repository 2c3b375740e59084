use crate::obs::protocol::{
    AuthChallenge, Frame, Hello, Identify, OP_IDENTIFY, RPC_VERSION, RequestResponse,
    authentication_string,
};

use serde_json::json;

/// WHAT: Challenge response matches the documented obs-websocket example
/// WHY: A wrong digest locks the recorder out of password-protected OBS
#[test]
fn given_documented_challenge_when_authenticating_then_digest_matches() {
    // Given: The password, salt and challenge from the protocol documentation
    let password = "supersecretpassword";
    let salt = "lM1GncleQOaCu9lT1yeUZhFYnqhsLLP1G5lAGo3ixaI=";
    let challenge = "+IxH4CnCiqpX1rM9scsNynZzbOe4KhDeYcTNS3PDaeY=";

    // When: Computing the authentication string
    let auth = authentication_string(password, salt, challenge);

    // Then: It equals the documented value
    assert_eq!(auth, "1Ct943GAT+6YQUUX47Ia/ncufilbe6+oD6lY+5kaCu4=");
}

/// WHAT: Hello with an auth block deserializes its challenge and salt
/// WHY: The session decides whether to authenticate from this block
#[test]
#[allow(clippy::unwrap_used)]
fn given_hello_with_auth_when_parsing_then_challenge_present() {
    // Given: A Hello frame as OBS sends it
    let raw = json!({
        "op": 0,
        "d": {
            "obsWebSocketVersion": "5.1.0",
            "rpcVersion": 1,
            "authentication": { "challenge": "abc", "salt": "xyz" }
        }
    });

    // When: Parsing it
    let frame: Frame<Hello> = serde_json::from_value(raw).unwrap();

    // Then: The challenge is available
    assert_eq!(frame.op, 0);
    assert_eq!(frame.d.rpc_version, 1);
    let AuthChallenge { challenge, salt } = frame.d.authentication.unwrap();
    assert_eq!(challenge, "abc");
    assert_eq!(salt, "xyz");
}

/// WHAT: Identify without a password omits the authentication field
/// WHY: OBS rejects an Identify carrying an empty authentication string
#[test]
#[allow(clippy::unwrap_used)]
fn given_no_password_when_identifying_then_authentication_omitted() {
    // Given: An Identify with no authentication
    let frame = Frame {
        op: OP_IDENTIFY,
        d: Identify {
            rpc_version: RPC_VERSION,
            authentication: None,
            event_subscriptions: 0,
        },
    };

    // When: Serializing it
    let value = serde_json::to_value(&frame).unwrap();

    // Then: Only the version and subscriptions are sent
    assert_eq!(
        value,
        json!({ "op": 1, "d": { "rpcVersion": 1, "eventSubscriptions": 0 } })
    );
}

/// WHAT: A failed request response exposes its code and comment
/// WHY: Status 501 is how OBS says nothing is recording
#[test]
#[allow(clippy::unwrap_used)]
fn given_failed_response_when_parsing_then_status_code_exposed() {
    // Given: A RequestResponse for a rejected StopRecord
    let raw = json!({
        "requestType": "StopRecord",
        "requestId": "42",
        "requestStatus": { "result": false, "code": 501, "comment": "Output not running" }
    });

    // When: Parsing it
    let response: RequestResponse = serde_json::from_value(raw).unwrap();

    // Then: The status carries the code and no data is present
    assert!(!response.request_status.result);
    assert_eq!(response.request_status.code, 501);
    assert_eq!(
        response.request_status.comment.as_deref(),
        Some("Output not running")
    );
    assert!(response.response_data.is_none());
}
