use crate::{CoreError, ObsController, ObsState, tests::fakes::FakeObs};

use std::path::PathBuf;

const OUTPUT: &str = "/recordings/2026-10-18 10-00-00.mkv";

/// WHAT: Starting from idle queries status, sets the directory, then records
/// WHY: Recordings must land in the configured folder
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_idle_controller_when_starting_then_recording_in_configured_directory() {
    // Given: An idle controller with a record directory
    let obs = FakeObs::new(OUTPUT);
    let mut controller =
        ObsController::new(obs.clone()).with_record_directory(PathBuf::from("/recordings"));

    // When: Starting a recording
    controller.start_recording().await.unwrap();

    // Then: OBS saw status, directory and start in that order
    assert_eq!(controller.state(), ObsState::Recording);
    assert_eq!(
        obs.with(|s| s.requests.clone()),
        vec!["GetRecordStatus", "SetRecordDirectory", "StartRecord"]
    );
    assert!(obs.with(|s| s.output_active));
}

/// WHAT: A second start while recording fails without contacting OBS
/// WHY: Double-starts would otherwise surface as raw OBS errors
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_recording_when_starting_again_then_already_recording() {
    // Given: A controller that is recording
    let obs = FakeObs::new(OUTPUT);
    let mut controller = ObsController::new(obs.clone());
    controller.start_recording().await.unwrap();
    let before = obs.with(|s| s.requests.len());

    // When: Starting again
    let result = controller.start_recording().await;

    // Then: AlreadyRecording and no new requests
    assert!(matches!(result, Err(CoreError::AlreadyRecording { .. })));
    assert_eq!(obs.with(|s| s.requests.len()), before);
    assert_eq!(controller.state(), ObsState::Recording);
}

/// WHAT: OBS already recording on its own blocks a start
/// WHY: The recorder must not take over a recording it did not begin
#[tokio::test]
async fn given_obs_recording_elsewhere_when_starting_then_already_recording() {
    // Given: OBS reports an active output
    let obs = FakeObs::new(OUTPUT);
    obs.with(|s| s.output_active = true);
    let mut controller = ObsController::new(obs.clone());

    // When: Starting
    let result = controller.start_recording().await;

    // Then: Rejected before StartRecord, state stays idle
    assert!(matches!(result, Err(CoreError::AlreadyRecording { .. })));
    assert_eq!(controller.state(), ObsState::Idle);
    assert!(!obs.with(|s| s.requests.iter().any(|r| r == "StartRecord")));
}

/// WHAT: StartRecord refused with OUTPUT_RUNNING after an idle status check is AlreadyRecording
/// WHY: OBS can be started by hand between the status check and the start request
#[tokio::test]
async fn given_obs_starts_after_status_check_when_starting_then_already_recording() {
    // Given: OBS reports idle but is recording by the time StartRecord arrives
    let obs = FakeObs::new(OUTPUT);
    obs.with(|s| s.starts_elsewhere = true);
    let mut controller = ObsController::new(obs.clone());

    // When: Starting
    let result = controller.start_recording().await;

    // Then: AlreadyRecording, the controller stays idle and the session is kept
    assert!(matches!(result, Err(CoreError::AlreadyRecording { .. })));
    assert_eq!(controller.state(), ObsState::Idle);
    assert!(controller.is_connected());
    assert_eq!(
        obs.with(|s| s.requests.clone()),
        vec!["GetRecordStatus", "StartRecord"]
    );
}

/// WHAT: Stopping while idle fails without contacting OBS
/// WHY: Stop must be meaningful only after a start
#[tokio::test]
async fn given_idle_controller_when_stopping_then_not_recording() {
    // Given: A fresh controller
    let obs = FakeObs::new(OUTPUT);
    let mut controller = ObsController::new(obs.clone());

    // When: Stopping
    let result = controller.stop_recording().await;

    // Then: NotRecording and OBS untouched
    assert!(matches!(result, Err(CoreError::NotRecording { .. })));
    assert_eq!(obs.with(|s| s.connects), 0);
}

/// WHAT: Stopping returns the path OBS reports and goes idle
/// WHY: The path is what gets renamed and uploaded
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_recording_when_stopping_then_output_path_returned() {
    // Given: A recording controller
    let obs = FakeObs::new(OUTPUT);
    let mut controller = ObsController::new(obs.clone());
    controller.start_recording().await.unwrap();

    // When: Stopping
    let path = controller.stop_recording().await.unwrap();

    // Then: Path comes back, state is idle and one session served both calls
    assert_eq!(path, PathBuf::from(OUTPUT));
    assert_eq!(controller.state(), ObsState::Idle);
    assert_eq!(obs.with(|s| s.connects), 1);
    assert!(controller.is_connected());
}

/// WHAT: Unreachable OBS surfaces as a connection error
/// WHY: The operator needs to know OBS is not running
#[tokio::test]
async fn given_unreachable_obs_when_starting_then_connection_error() {
    // Given: OBS refuses connections
    let obs = FakeObs::new(OUTPUT);
    obs.with(|s| s.unreachable = true);
    let mut controller = ObsController::new(obs);

    // When: Starting
    let result = controller.start_recording().await;

    // Then: ConnectionError, still idle, nothing cached
    assert!(matches!(result, Err(CoreError::ConnectionError { .. })));
    assert_eq!(controller.state(), ObsState::Idle);
    assert!(!controller.is_connected());
}

/// WHAT: A dropped session is reopened on the next call
/// WHY: OBS restarts must not require restarting the recorder
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_dropped_session_when_retrying_then_reconnects() {
    // Given: The first request fails at the transport level
    let obs = FakeObs::new(OUTPUT);
    obs.with(|s| s.drop_next_request = true);
    let mut controller = ObsController::new(obs.clone());

    // When: Starting twice
    let first = controller.start_recording().await;
    let second = controller.start_recording().await;

    // Then: The first fails, the second succeeds over a new session
    assert!(matches!(first, Err(CoreError::ConnectionError { .. })));
    second.unwrap();
    assert_eq!(obs.with(|s| s.connects), 2);
    assert_eq!(controller.state(), ObsState::Recording);
}

/// WHAT: A refused SetRecordDirectory does not block recording
/// WHY: OBS then records to its own configured folder
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_directory_request_rejected_when_starting_then_still_records() {
    // Given: OBS rejects SetRecordDirectory
    let obs = FakeObs::new(OUTPUT);
    obs.with(|s| s.reject_record_directory = true);
    let mut controller =
        ObsController::new(obs.clone()).with_record_directory(PathBuf::from("/recordings"));

    // When: Starting
    controller.start_recording().await.unwrap();

    // Then: Recording anyway
    assert_eq!(controller.state(), ObsState::Recording);
    assert!(obs.with(|s| s.output_active));
}

/// WHAT: OBS stopped behind our back maps to NotRecording and resets state
/// WHY: The controller must not stay stuck in Recording
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_obs_stopped_externally_when_stopping_then_not_recording_and_idle() {
    // Given: A recording the operator ended inside OBS itself
    let obs = FakeObs::new(OUTPUT);
    let mut controller = ObsController::new(obs.clone());
    controller.start_recording().await.unwrap();
    obs.with(|s| s.output_active = false);

    // When: Stopping
    let result = controller.stop_recording().await;

    // Then: NotRecording and idle
    assert!(matches!(result, Err(CoreError::NotRecording { .. })));
    assert_eq!(controller.state(), ObsState::Idle);
}

/// WHAT: A transport failure on stop keeps the Recording state
/// WHY: The operator can retry the stop once OBS is back
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_connection_lost_when_stopping_then_state_kept_for_retry() {
    // Given: A recording whose next request drops the connection
    let obs = FakeObs::new(OUTPUT);
    let mut controller = ObsController::new(obs.clone());
    controller.start_recording().await.unwrap();
    obs.with(|s| s.drop_next_request = true);

    // When: Stopping twice
    let first = controller.stop_recording().await;
    let second = controller.stop_recording().await;

    // Then: The retry succeeds
    assert!(matches!(first, Err(CoreError::ConnectionError { .. })));
    assert_eq!(second.unwrap(), PathBuf::from(OUTPUT));
    assert_eq!(controller.state(), ObsState::Idle);
}
