use crate::{
    CoreError, ObsEndpoint, ObsSession, ObsTransport,
    obs::protocol::{OUTPUT_NOT_RUNNING, authentication_string},
};

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tokio_tungstenite::{
    WebSocketStream, accept_async,
    tungstenite::{
        Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};

const PASSWORD: &str = "hunter2";
const SALT: &str = "lM1GncleQOaCu9lT1yeUZhFYnqhsLLP1G5lAGo3ixaI=";
const CHALLENGE: &str = "+IxH4CnCiqpX1rM9scsNynZzbOe4KhDeYcTNS3PDaeY=";

/// What the scripted server sends back for one request.
enum Answer {
    Frames(Vec<Value>),
    Close,
}

/// Websocket server speaking just enough OBS v5 for one session.
struct ScriptedObs {
    port: u16,
    identify: Arc<Mutex<Option<Value>>>,
    handle: JoinHandle<()>,
}

impl ScriptedObs {
    /// `answer(request_type, request_id)` scripts the reply to each request.
    #[allow(clippy::unwrap_used)]
    async fn start<F>(require_auth: bool, mut answer: F) -> Self
    where
        F: FnMut(&str, &str) -> Answer + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let identify = Arc::new(Mutex::new(None));
        let seen_identify = Arc::clone(&identify);

        let handle = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };

            let mut hello = json!({ "obsWebSocketVersion": "5.5.0", "rpcVersion": 1 });
            if require_auth {
                hello["authentication"] = json!({ "challenge": CHALLENGE, "salt": SALT });
            }
            if ws.send(frame(0, hello)).await.is_err() {
                return;
            }

            let Some(identify_frame) = next_json(&mut ws).await else {
                return;
            };
            *seen_identify
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(identify_frame);
            if ws
                .send(frame(2, json!({ "negotiatedRpcVersion": 1 })))
                .await
                .is_err()
            {
                return;
            }

            while let Some(request) = next_json(&mut ws).await {
                let request_type = request["d"]["requestType"].as_str().unwrap_or_default();
                let request_id = request["d"]["requestId"].as_str().unwrap_or_default();

                match answer(request_type, request_id) {
                    Answer::Frames(frames) => {
                        for reply in frames {
                            if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                                return;
                            }
                        }
                    }
                    Answer::Close => {
                        let _ = ws
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::Away,
                                reason: "OBS is shutting down".into(),
                            })))
                            .await;
                        return;
                    }
                }
            }
        });

        Self {
            port,
            identify,
            handle,
        }
    }

    fn endpoint(&self, password: Option<&str>) -> ObsEndpoint {
        ObsEndpoint {
            host: "127.0.0.1".to_string(),
            port: self.port,
            password: password.map(str::to_string),
        }
    }

    fn identify(&self) -> Option<Value> {
        self.identify
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Drop for ScriptedObs {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn frame(op: u8, d: Value) -> Message {
    Message::Text(json!({ "op": op, "d": d }).to_string().into())
}

async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Option<Value> {
    loop {
        match ws.next().await? {
            Ok(Message::Text(text)) => return serde_json::from_str(&text).ok(),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn response(request_type: &str, request_id: &str, result: bool, code: u16, data: Value) -> Value {
    json!({
        "op": 7,
        "d": {
            "requestType": request_type,
            "requestId": request_id,
            "requestStatus": { "result": result, "code": code },
            "responseData": data
        }
    })
}

/// WHAT: Session answers the Hello challenge with the expected digest and subscribes to no events
/// WHY: Password-protected OBS rejects any other Identify
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_password_protected_obs_when_connecting_then_identify_carries_digest() {
    // Given: OBS requiring authentication
    let obs = ScriptedObs::start(true, |_, _| Answer::Frames(Vec::new())).await;

    // When: Connecting with the password
    let session = ObsSession::connect(&obs.endpoint(Some(PASSWORD))).await;

    // Then: Identified, with the challenge answered
    assert!(session.is_ok());
    let identify = obs.identify().unwrap();
    assert_eq!(identify["op"], 1);
    assert_eq!(identify["d"]["rpcVersion"], 1);
    assert_eq!(identify["d"]["eventSubscriptions"], 0);
    assert_eq!(
        identify["d"]["authentication"],
        authentication_string(PASSWORD, SALT, CHALLENGE)
    );
}

/// WHAT: Connecting without a password to an OBS that wants one fails
/// WHY: The user must be told to configure the password
#[tokio::test]
#[allow(clippy::panic)]
async fn given_auth_required_and_no_password_when_connecting_then_connection_error() {
    // Given: OBS requiring authentication
    let obs = ScriptedObs::start(true, |_, _| Answer::Frames(Vec::new())).await;

    // When: Connecting with no password configured
    let result = ObsSession::connect(&obs.endpoint(None)).await;

    // Then: ConnectionError naming the missing password
    match result {
        Err(CoreError::ConnectionError { reason, .. }) => assert!(reason.contains("password")),
        Err(other) => panic!("expected ConnectionError, got {other:?}"),
        Ok(_) => panic!("expected ConnectionError, got a session"),
    }
}

/// WHAT: Request returns the data of the response carrying its own request id
/// WHY: Events and stray responses on the socket must not be mistaken for the answer
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_events_and_stray_responses_when_requesting_then_matching_response_returned() {
    // Given: OBS that sends an event and an unrelated response before the real one
    let obs = ScriptedObs::start(false, |request_type, request_id| {
        Answer::Frames(vec![
            json!({ "op": 5, "d": { "eventType": "RecordStateChanged", "eventIntent": 64 } }),
            response(request_type, "someone-else", true, 100, json!({ "outputActive": true })),
            response(request_type, request_id, true, 100, json!({ "outputActive": false })),
        ])
    })
    .await;
    let mut session = ObsSession::connect(&obs.endpoint(None)).await.unwrap();

    // When: Asking for the record status
    let data = session.request("GetRecordStatus", None).await.unwrap();

    // Then: The matching response's data comes back
    assert_eq!(data["outputActive"], false);
}

/// WHAT: A response without responseData yields Null
/// WHY: StartRecord succeeds with no payload
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_response_without_data_when_requesting_then_null_returned() {
    // Given: OBS answering with only a status
    let obs = ScriptedObs::start(false, |request_type, request_id| {
        Answer::Frames(vec![json!({
            "op": 7,
            "d": {
                "requestType": request_type,
                "requestId": request_id,
                "requestStatus": { "result": true, "code": 100 }
            }
        })])
    })
    .await;
    let mut session = ObsSession::connect(&obs.endpoint(None)).await.unwrap();

    // When: Starting the recording
    let data = session.request("StartRecord", None).await.unwrap();

    // Then: Null
    assert_eq!(data, Value::Null);
}

/// WHAT: A failed request status becomes ObsRequestRejected with the OBS code
/// WHY: The controller maps specific codes to recording state errors
#[tokio::test]
#[allow(clippy::unwrap_used, clippy::panic)]
async fn given_failed_status_when_requesting_then_request_rejected_with_code() {
    // Given: OBS refusing StopRecord because nothing is recording
    let obs = ScriptedObs::start(false, |request_type, request_id| {
        Answer::Frames(vec![json!({
            "op": 7,
            "d": {
                "requestType": request_type,
                "requestId": request_id,
                "requestStatus": {
                    "result": false,
                    "code": OUTPUT_NOT_RUNNING,
                    "comment": "Output not running"
                }
            }
        })])
    })
    .await;
    let mut session = ObsSession::connect(&obs.endpoint(None)).await.unwrap();

    // When: Stopping
    let result = session.request("StopRecord", None).await;

    // Then: Rejected with code and comment
    match result {
        Err(CoreError::ObsRequestRejected {
            request,
            code,
            comment,
            ..
        }) => {
            assert_eq!(request, "StopRecord");
            assert_eq!(code, OUTPUT_NOT_RUNNING);
            assert_eq!(comment, "Output not running");
        }
        other => panic!("expected ObsRequestRejected, got {other:?}"),
    }
}

/// WHAT: A Close frame while waiting for a response is a ConnectionError
/// WHY: The controller drops the session and reconnects on the next request
#[tokio::test]
#[allow(clippy::unwrap_used, clippy::panic)]
async fn given_obs_closes_when_requesting_then_connection_error() {
    // Given: OBS that shuts down on the first request
    let obs = ScriptedObs::start(false, |_, _| Answer::Close).await;
    let mut session = ObsSession::connect(&obs.endpoint(None)).await.unwrap();

    // When: Requesting
    let result = session.request("GetRecordStatus", None).await;

    // Then: ConnectionError carrying the close reason
    match result {
        Err(CoreError::ConnectionError { reason, .. }) => {
            assert!(reason.contains("OBS is shutting down"));
        }
        other => panic!("expected ConnectionError, got {other:?}"),
    }
}

/// WHAT: Nothing listening on the port is a ConnectionError
/// WHY: OBS not running is the most common failure
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_nothing_listening_when_connecting_then_connection_error() {
    // Given: A port that was bound and released
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let endpoint = ObsEndpoint {
        host: "127.0.0.1".to_string(),
        port,
        password: None,
    };

    // When: Connecting
    let result = ObsSession::connect(&endpoint).await;

    // Then: ConnectionError
    assert!(matches!(result, Err(CoreError::ConnectionError { .. })));
}
