use crate::{
    AppCommand, AppResult, MenuAction, Notifier, RecordingSession, ShellState, Toggle, TrayCommand,
    config::{AppPaths, Catalog, Config},
    notifier::describe,
};

use class_recorder_core::{
    CoreError, CoreResult, ObsController, UploadOrchestrator, extension_of,
    naming::{
        DEFAULT_RECORDING_EXTENSION, RECORDING_FLUSH_TIMEOUT, newest_file_since,
        recording_file_name, settle_recording,
    },
};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};

use chrono::{DateTime, Local};
use tao::event_loop::EventLoopProxy;
use tokio::{
    sync::{Mutex, mpsc, watch},
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, instrument, warn};
use tray_icon::menu::MenuEvent;

/// How long Exit waits for OBS to stop a running recording.
const EXIT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Tooltip refresh rate while recording.
const ELAPSED_TICK: Duration = Duration::from_secs(1);

/// Main application state.
///
/// Runs on the async runtime thread. Tray updates go back to the main
/// thread through `tray_proxy` because `TrayIcon` is `!Send` and must remain
/// on the UI thread.
pub struct App {
    pub(crate) shell: ShellState,
    pub(crate) config: Arc<Config>,
    pub(crate) paths: AppPaths,
    pub(crate) obs: Arc<Mutex<ObsController>>,
    pub(crate) uploader: Arc<UploadOrchestrator>,
    pub(crate) notifier: Notifier,
    pub(crate) tray_proxy: EventLoopProxy<TrayCommand>,
    pub(crate) command_tx: mpsc::Sender<AppCommand>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl App {
    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Class Recorder starting");

        // MenuEvent::receiver() is a crossbeam receiver with a blocking
        // recv(); one blocking task forwards into the async side and stops
        // once tray_event_rx is dropped.
        let (tray_event_tx, mut tray_event_rx) = mpsc::channel(32);
        let tray_handle = tokio::task::spawn_blocking(move || {
            let receiver = MenuEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if tray_event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        self.render();

        let mut elapsed_tick = tokio::time::interval(ELAPSED_TICK);
        elapsed_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let recording = self.shell.can_stop();

            tokio::select! {
                Some(event) = tray_event_rx.recv() => {
                    match MenuAction::parse(&event.id.0) {
                        Some(action) => self.handle_action(action).await,
                        None => debug!(id = ?event.id, "Ignoring unknown menu item"),
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    if matches!(cmd, AppCommand::Shutdown) {
                        info!("Shutdown requested");
                        break;
                    }
                    self.handle_command(cmd);
                }

                _ = elapsed_tick.tick(), if recording => {}

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }

            self.render();
        }

        drop(tray_event_rx);

        self.stop_before_exit().await;

        match tokio::time::timeout(Duration::from_secs(1), tray_handle).await {
            Ok(Ok(())) => info!("Tray event forwarder stopped cleanly"),
            Ok(Err(e)) => error!(error = ?e, "Tray event forwarder task panicked"),
            Err(_) => info!(
                "Tray event forwarder did not stop within timeout, \
                     will be cleaned up on exit"
            ),
        }

        let _ = self.shutdown_tx.send(true);
        if self.tray_proxy.send_event(TrayCommand::Shutdown).is_err() {
            warn!("Tray event loop already closed");
        }
        info!("Class Recorder shut down successfully");

        Ok(())
    }

    /// Handle a tray menu click.
    #[instrument(skip(self))]
    async fn handle_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::SelectClass(name) => {
                if !self.shell.select_class(&name) {
                    debug!(class = %name, "Class selection ignored");
                }
            }
            MenuAction::SelectChapter(name) => {
                if !self.shell.select_chapter(&name) {
                    debug!(chapter = %name, "Chapter selection ignored");
                }
            }
            MenuAction::SelectSubtopic(name) => {
                if !self.shell.select_subtopic(&name) {
                    debug!(subtopic = %name, "Subtopic selection ignored");
                }
            }
            MenuAction::StartRecording => self.start_recording(),
            MenuAction::StopRecording => self.stop_recording(),
            MenuAction::Upload => self.start_upload(),
            MenuAction::UploadNewest => self.upload_newest().await,
            MenuAction::OpenLastUpload => {
                if let Some(url) = self.shell.last_upload_url() {
                    open_external(url);
                }
            }
            MenuAction::OpenRecordingsFolder => {
                open_external(&self.config.recording_path.to_string_lossy());
            }
            MenuAction::EditCatalog => {
                open_external(&self.paths.catalog_file().to_string_lossy());
            }
            MenuAction::ReloadCatalog => self.reload_catalog(),
            MenuAction::Exit => {
                info!("Exit requested from tray menu");
                if let Err(e) = self.command_tx.send(AppCommand::Shutdown).await {
                    error!(error = ?e, "Failed to send shutdown command");
                }
            }
        }
    }

    /// Handle a hotkey press or a background task result.
    #[instrument(skip(self))]
    fn handle_command(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::ToggleRecording => match self.shell.toggle() {
                Some(Toggle::Start) => self.start_recording(),
                Some(Toggle::Stop) => self.stop_recording(),
                None => self.notifier.info(
                    "Nothing to toggle",
                    "Pick a class and chapter, or wait for the current operation to finish.",
                ),
            },
            AppCommand::RecordingStarted { session_id, result } => match result {
                Ok(()) => {
                    self.shell.start_finished(session_id, true);
                    info!(session_id = %session_id, "Recording started");
                    if let Some(folder) = self.shell.selection().folder() {
                        self.notifier.info("Recording started", &folder.to_string());
                    }
                }
                Err(e) => {
                    self.shell.start_finished(session_id, false);
                    error!(session_id = %session_id, error = ?e, "Failed to start recording");
                    self.notifier.core_failure("Start recording", &e);
                }
            },
            AppCommand::RecordingStopped { session_id, result } => match result {
                Ok(path) => {
                    info!(session_id = %session_id, path = ?path, "Recording saved");
                    let name = file_name(&path);
                    self.shell.stop_succeeded(session_id, path);
                    self.notifier.info("Recording saved", &name);
                }
                Err(e) => {
                    let still_recording = matches!(e, CoreError::ConnectionError { .. });
                    self.shell.stop_failed(session_id, still_recording);
                    error!(session_id = %session_id, error = ?e, still_recording, "Failed to stop recording");
                    self.notifier.core_failure("Stop recording", &e);
                }
            },
            AppCommand::UploadProgress(event) => self.shell.apply_upload_event(&event),
            AppCommand::UploadFinished { result } => match result {
                Ok(file) => {
                    info!(file_id = %file.id, url = %file.view_url(), "Upload finished");
                    self.shell.upload_succeeded(&file);
                    self.notifier.info(
                        "Upload complete",
                        &format!("{}\n{}", file.name, file.view_url()),
                    );
                }
                Err(e) => {
                    error!(error = ?e, "Upload failed");
                    self.shell.upload_failed(&e);
                    self.notifier.failure(
                        "Upload",
                        &format!("{} The recording is kept for another try.", describe(&e)),
                    );
                }
            },
            AppCommand::Shutdown => {}
        }
    }

    fn start_recording(&mut self) {
        let Some(session) = self.shell.begin_start() else {
            self.notifier.info(
                "Cannot start recording",
                "Pick a class and chapter, and wait for running operations to finish.",
            );
            return;
        };

        info!(session_id = %session.session_id, folder = %session.folder, "Starting recording");

        let obs = Arc::clone(&self.obs);
        let command_tx = self.command_tx.clone();
        tokio::spawn(async move {
            let result = obs.lock().await.start_recording().await;
            let cmd = AppCommand::RecordingStarted {
                session_id: session.session_id,
                result,
            };
            if command_tx.send(cmd).await.is_err() {
                warn!("App loop gone before recording start was reported");
            }
        });
    }

    fn stop_recording(&mut self) {
        let Some(session) = self.shell.begin_stop() else {
            debug!("Stop ignored, nothing is recording");
            return;
        };

        info!(session_id = %session.session_id, "Stopping recording");

        let obs = Arc::clone(&self.obs);
        let command_tx = self.command_tx.clone();
        tokio::spawn(async move {
            let result = stop_and_rename(&obs, &session).await;
            let cmd = AppCommand::RecordingStopped {
                session_id: session.session_id,
                result,
            };
            if command_tx.send(cmd).await.is_err() {
                warn!("App loop gone before recording stop was reported");
            }
        });
    }

    fn start_upload(&mut self) {
        let Some(request) = self.shell.begin_upload() else {
            self.notifier.info(
                "Cannot upload",
                "Record a lecture and pick its class and chapter first.",
            );
            return;
        };

        info!(file = ?request.file_path, folder = %request.folder, "Starting upload");

        let uploader = Arc::clone(&self.uploader);
        let command_tx = self.command_tx.clone();
        tokio::spawn(async move {
            let (events_tx, mut events_rx) = mpsc::unbounded_channel();

            let progress_tx = command_tx.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(event) = events_rx.recv().await {
                    if progress_tx.send(AppCommand::UploadProgress(event)).await.is_err() {
                        break;
                    }
                }
            });

            let result = uploader.upload(&request, &events_tx).await;

            // Deliver every progress event before the result.
            drop(events_tx);
            if let Err(e) = forwarder.await {
                warn!(error = ?e, "Upload progress forwarder failed");
            }

            if command_tx.send(AppCommand::UploadFinished { result }).await.is_err() {
                warn!("App loop gone before upload result was reported");
            }
        });
    }

    /// File the newest recording on disk under the current selection and
    /// upload it.
    async fn upload_newest(&mut self) {
        if !self.shell.can_upload_newest() {
            self.notifier.info(
                "Cannot upload",
                "Pick a class and chapter, and wait for running operations to finish.",
            );
            return;
        }

        let dir = self.config.recording_path.clone();
        let path = match newest_file_since(&dir, SystemTime::UNIX_EPOCH).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                self.notifier
                    .info("Nothing to upload", &format!("No recordings in {}", dir.display()));
                return;
            }
            Err(e) => {
                error!(dir = ?dir, error = ?e, "Failed to scan recordings folder");
                self.notifier.core_failure("Find newest recording", &e);
                return;
            }
        };

        let recorded_at = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Local>::from(modified),
            Err(e) => {
                warn!(path = ?path, error = ?e, "No modification time, dating the lecture today");
                Local::now()
            }
        };

        info!(path = ?path, "Uploading newest recording");
        if self.shell.adopt_recording(path, recorded_at) {
            self.start_upload();
        }
    }

    fn reload_catalog(&mut self) {
        match Catalog::load_or_create(&self.paths.catalog_file()) {
            Ok(catalog) => {
                let classes = catalog.classes.len();
                self.shell.replace_catalog(catalog);
                self.notifier
                    .info("Catalog reloaded", &format!("{} classes available", classes));
            }
            Err(e) => {
                error!(error = ?e, "Failed to reload catalog");
                self.notifier.failure("Reload catalog", &e.to_string());
            }
        }
    }

    /// Best-effort stop so OBS is not left recording after exit.
    async fn stop_before_exit(&mut self) {
        if self.shell.recording_phase().is_some() {
            info!("Recording in progress, stopping before exit");
            let stop = async { self.obs.lock().await.stop_recording().await };
            match tokio::time::timeout(EXIT_STOP_TIMEOUT, stop).await {
                Ok(Ok(path)) => info!(path = ?path, "Recording stopped before exit"),
                Ok(Err(CoreError::NotRecording { .. })) => debug!("OBS was not recording"),
                Ok(Err(e)) => warn!(error = ?e, "Failed to stop recording before exit"),
                Err(_) => warn!("OBS did not stop the recording before exit"),
            }
        }

        // A stop still stuck on the lock keeps its session.
        match self.obs.try_lock() {
            Ok(mut obs) => obs.disconnect(),
            Err(_) => debug!("OBS busy at exit, leaving the session to the runtime"),
        }
    }

    fn render(&self) {
        if self
            .tray_proxy
            .send_event(TrayCommand::Render(self.shell.tray_view()))
            .is_err()
        {
            debug!("Tray event loop closed, skipping render");
        }
    }
}

/// Stop OBS and give the output its lecture name.
///
/// Once OBS has stopped the recording is never reported lost: a missing
/// output falls back to the newest file written since the start, and a
/// failed rename keeps OBS's own file name.
async fn stop_and_rename(
    obs: &Mutex<ObsController>,
    session: &RecordingSession,
) -> CoreResult<PathBuf> {
    let output = obs.lock().await.stop_recording().await?;

    let extension = match extension_of(&output) {
        ext if ext.is_empty() => DEFAULT_RECORDING_EXTENSION.to_string(),
        ext => ext,
    };
    let name = recording_file_name(&session.folder, session.started_at.date_naive(), &extension);

    Ok(settle_recording(
        &output,
        &name,
        SystemTime::from(session.started_at),
        RECORDING_FLUSH_TIMEOUT,
    )
    .await)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open_external(target: &str) {
    match open::that(target) {
        Ok(()) => info!(path = %target, "Opened"),
        Err(e) => error!(path = %target, error = ?e, "Failed to open"),
    }
}
