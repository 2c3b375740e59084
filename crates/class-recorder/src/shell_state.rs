//! Operator-facing state: current selection, recording and upload.
//!
//! Owned by [`App`](crate::App) and only touched from its event loop. Every
//! `begin_*` method checks the matching `can_*` rule and returns `None` when
//! the action is not allowed, so the menu and the hotkey share one set of
//! rules.

use crate::{
    RecordingSession, TrayIconState,
    config::Catalog,
    tray_view::{MenuChoice, MenuModel, TrayView},
};

use class_recorder_core::{
    CoreError, DEFAULT_SUBTOPIC, DriveFile, FolderPath, UploadEvent, UploadRequest, UploadTask,
};

use std::path::PathBuf;

use chrono::{DateTime, Local, TimeDelta};
use tracing::{debug, info, warn};
use uuid::Uuid;

const APP_NAME: &str = "Class Recorder";

/// Where an in-progress recording is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingPhase {
    /// `StartRecord` sent, waiting for OBS.
    Starting,
    /// OBS is recording.
    Recording,
    /// `StopRecord` sent, waiting for the file.
    Stopping,
}

/// What the recording toggle should do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Start a recording.
    Start,
    /// Stop the running recording.
    Stop,
}

#[derive(Debug, Clone)]
struct ActiveRecording {
    session: RecordingSession,
    phase: RecordingPhase,
}

/// Class, chapter and subtopic picked in the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected class.
    pub class: Option<String>,
    /// Selected chapter of the class.
    pub chapter: Option<String>,
    /// Selected subtopic; defaults to `Main`.
    pub subtopic: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            class: None,
            chapter: None,
            subtopic: DEFAULT_SUBTOPIC.to_string(),
        }
    }
}

impl Selection {
    /// Destination folder, once class and chapter are chosen.
    pub fn folder(&self) -> Option<FolderPath> {
        match (&self.class, &self.chapter) {
            (Some(class), Some(chapter)) => {
                Some(FolderPath::new(class.clone(), chapter.clone(), self.subtopic.clone()))
            }
            _ => None,
        }
    }
}

/// Selection, recording and upload state behind the tray.
#[derive(Debug, Clone)]
pub struct ShellState {
    catalog: Catalog,
    selection: Selection,
    active: Option<ActiveRecording>,
    finished: Option<RecordingSession>,
    upload: Option<UploadTask>,
    last_upload_url: Option<String>,
}

impl ShellState {
    /// Fresh state over `catalog` with nothing selected.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            selection: Selection::default(),
            active: None,
            finished: None,
            upload: None,
            last_upload_url: None,
        }
    }

    /// Current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Browser link of the last successful upload.
    pub fn last_upload_url(&self) -> Option<&str> {
        self.last_upload_url.as_deref()
    }

    /// Phase of the in-progress recording, if any.
    pub fn recording_phase(&self) -> Option<RecordingPhase> {
        self.active.as_ref().map(|a| a.phase)
    }

    /// Whether the selection may change.
    pub fn selection_enabled(&self) -> bool {
        self.active.is_none() && self.upload.is_none()
    }

    /// Swap in a reloaded catalog, keeping as much of the selection as
    /// still exists.
    pub fn replace_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;

        let class_known = self
            .selection
            .class
            .as_deref()
            .is_some_and(|class| self.catalog.class_names().contains(&class));
        if !class_known {
            self.selection = Selection::default();
            return;
        }

        let chapter_known = match (&self.selection.class, &self.selection.chapter) {
            (Some(class), Some(chapter)) => {
                self.catalog.chapter_names(class).contains(&chapter.as_str())
            }
            _ => false,
        };
        if !chapter_known {
            self.selection.chapter = None;
            self.selection.subtopic = DEFAULT_SUBTOPIC.to_string();
            return;
        }

        if let (Some(class), Some(chapter)) = (&self.selection.class, &self.selection.chapter) {
            let subtopics = self.catalog.subtopic_names(class, chapter);
            if !subtopics.contains(&self.selection.subtopic.as_str()) {
                self.selection.subtopic = first_subtopic(&subtopics);
            }
        }
    }

    /// Select a class; clears the chapter and resets the subtopic.
    ///
    /// Picking a different class also drops the finished recording, as it
    /// was made for the previous lecture.
    pub fn select_class(&mut self, class: &str) -> bool {
        if !self.selection_enabled() || !self.catalog.class_names().contains(&class) {
            return false;
        }

        if self.selection.class.as_deref() != Some(class) {
            if let Some(dropped) = self.finished.take() {
                info!(
                    session_id = %dropped.session_id,
                    file = ?dropped.file_path,
                    "Class changed, recording no longer offered for upload"
                );
            }
        }

        self.selection = Selection {
            class: Some(class.to_string()),
            chapter: None,
            subtopic: DEFAULT_SUBTOPIC.to_string(),
        };
        true
    }

    /// Select a chapter of the current class; resets the subtopic to the
    /// chapter's first.
    pub fn select_chapter(&mut self, chapter: &str) -> bool {
        if !self.selection_enabled() {
            return false;
        }
        let Some(class) = self.selection.class.clone() else {
            return false;
        };
        if !self.catalog.chapter_names(&class).contains(&chapter) {
            return false;
        }

        let subtopics = self.catalog.subtopic_names(&class, chapter);
        self.selection.subtopic = first_subtopic(&subtopics);
        self.selection.chapter = Some(chapter.to_string());
        true
    }

    /// Select a subtopic of the current chapter.
    pub fn select_subtopic(&mut self, subtopic: &str) -> bool {
        if !self.selection_enabled() {
            return false;
        }
        let (Some(class), Some(chapter)) = (&self.selection.class, &self.selection.chapter) else {
            return false;
        };
        if !self.catalog.subtopic_names(class, chapter).contains(&subtopic) {
            return false;
        }

        self.selection.subtopic = subtopic.to_string();
        true
    }

    /// Class and chapter chosen, nothing recording and nothing in flight.
    pub fn can_start(&self) -> bool {
        self.selection.folder().is_some() && self.active.is_none() && self.upload.is_none()
    }

    /// A recording is running and no stop is pending.
    pub fn can_stop(&self) -> bool {
        self.recording_phase() == Some(RecordingPhase::Recording)
    }

    /// A finished recording, a complete selection and no upload in flight.
    pub fn can_upload(&self) -> bool {
        self.finished.as_ref().is_some_and(RecordingSession::is_finished)
            && self.selection.folder().is_some()
            && self.upload.is_none()
            && self.active.is_none()
    }

    /// A complete selection, nothing recording and nothing in flight, so a
    /// file from disk may be filed under the selection.
    pub fn can_upload_newest(&self) -> bool {
        self.can_start()
    }

    /// Hotkey meaning: stop when recording, start when allowed.
    pub fn toggle(&self) -> Option<Toggle> {
        if self.can_stop() {
            Some(Toggle::Stop)
        } else if self.can_start() {
            Some(Toggle::Start)
        } else {
            None
        }
    }

    /// Open a new session for the selected lecture.
    pub fn begin_start(&mut self) -> Option<RecordingSession> {
        if !self.can_start() {
            return None;
        }
        let folder = self.selection.folder()?;
        let session = RecordingSession::start(folder);
        self.active = Some(ActiveRecording {
            session: session.clone(),
            phase: RecordingPhase::Starting,
        });
        Some(session)
    }

    /// OBS answered the start request.
    pub fn start_finished(&mut self, session_id: Uuid, started: bool) {
        let Some(active) = self.active_mut(session_id, RecordingPhase::Starting) else {
            return;
        };
        if started {
            active.phase = RecordingPhase::Recording;
        } else {
            self.active = None;
        }
    }

    /// Mark the running recording as stopping.
    pub fn begin_stop(&mut self) -> Option<RecordingSession> {
        if !self.can_stop() {
            return None;
        }
        let active = self.active.as_mut()?;
        active.phase = RecordingPhase::Stopping;
        Some(active.session.clone())
    }

    /// OBS stopped and the file was renamed to `file_path`.
    pub fn stop_succeeded(&mut self, session_id: Uuid, file_path: PathBuf) {
        if self.active_mut(session_id, RecordingPhase::Stopping).is_none() {
            return;
        }
        if let Some(ActiveRecording { mut session, .. }) = self.active.take() {
            session.finish(file_path);
            if let Some(replaced) = self.finished.replace(session) {
                debug!(session_id = %replaced.session_id, "Previous recording replaced");
            }
        }
    }

    /// Stopping failed; `still_recording` keeps the session so the operator
    /// can try again.
    pub fn stop_failed(&mut self, session_id: Uuid, still_recording: bool) {
        let Some(active) = self.active_mut(session_id, RecordingPhase::Stopping) else {
            return;
        };
        if still_recording {
            active.phase = RecordingPhase::Recording;
        } else {
            self.active = None;
        }
    }

    /// Create the upload task for the finished recording.
    pub fn begin_upload(&mut self) -> Option<UploadRequest> {
        if !self.can_upload() {
            return None;
        }
        let finished = self.finished.as_ref()?;
        let file_path = finished.file_path.clone()?;
        let request = UploadRequest {
            file_path: file_path.clone(),
            folder: self.selection.folder()?,
            lecture_date: finished.started_at.date_naive(),
        };
        self.upload = Some(UploadTask::new(file_path));
        Some(request)
    }

    /// Offer a recording found on disk for upload under the current
    /// selection, replacing any finished one.
    pub fn adopt_recording(&mut self, file_path: PathBuf, recorded_at: DateTime<Local>) -> bool {
        if !self.can_upload_newest() {
            return false;
        }
        let Some(folder) = self.selection.folder() else {
            return false;
        };
        let session = RecordingSession::from_file(folder, file_path, recorded_at);
        if let Some(replaced) = self.finished.replace(session) {
            debug!(session_id = %replaced.session_id, "Previous recording replaced");
        }
        true
    }

    /// Fold an orchestrator event into the running upload.
    pub fn apply_upload_event(&mut self, event: &UploadEvent) {
        if let Some(task) = self.upload.as_mut() {
            task.apply(event);
        }
    }

    /// Upload done: forget the recording and start the next lecture afresh.
    pub fn upload_succeeded(&mut self, file: &DriveFile) {
        if let Some(mut task) = self.upload.take() {
            task.succeed(file.id.clone());
        }
        self.finished = None;
        self.selection = Selection::default();
        self.last_upload_url = Some(file.view_url());
    }

    /// Upload failed: keep the recording so it can be retried.
    pub fn upload_failed(&mut self, error: &CoreError) {
        if let Some(mut task) = self.upload.take() {
            task.fail(error);
            debug!(validation = ?task.validation, "Upload task closed");
        }
    }

    /// Icon, tooltip and menu for the current state.
    pub fn tray_view(&self) -> TrayView {
        self.tray_view_at(Local::now())
    }

    /// Like [`tray_view`](Self::tray_view), timing the recording up to `now`.
    pub fn tray_view_at(&self, now: DateTime<Local>) -> TrayView {
        let (state, tooltip) = if let Some(active) = &self.active {
            let status = match active.phase {
                RecordingPhase::Starting => "Starting recording...".to_string(),
                RecordingPhase::Recording => format!(
                    "Recording {}",
                    format_elapsed(now - active.session.started_at)
                ),
                RecordingPhase::Stopping => "Saving recording...".to_string(),
            };
            (
                TrayIconState::Recording,
                format!("{APP_NAME} - {status}\n{}", active.session.folder),
            )
        } else if let Some(task) = &self.upload {
            (
                TrayIconState::Uploading,
                format!("{APP_NAME} - Uploading {}%", task.percent()),
            )
        } else if let Some(finished) = &self.finished {
            (
                TrayIconState::Idle,
                format!("{APP_NAME} - Recording ready to upload\n{}", finished.folder),
            )
        } else {
            (TrayIconState::Idle, format!("{APP_NAME} - Ready"))
        };

        TrayView {
            state,
            tooltip,
            menu: self.menu_model(),
        }
    }

    fn menu_model(&self) -> MenuModel {
        let class = self.selection.class.as_deref();
        let chapter = self.selection.chapter.as_deref();

        let classes = choices(self.catalog.class_names(), class);
        let chapters = class
            .map(|c| choices(self.catalog.chapter_names(c), chapter))
            .unwrap_or_default();
        let subtopics = match (class, chapter) {
            (Some(c), Some(ch)) => choices(
                self.catalog.subtopic_names(c, ch),
                Some(self.selection.subtopic.as_str()),
            ),
            _ => Vec::new(),
        };

        MenuModel {
            classes,
            chapters,
            subtopics,
            selection_enabled: self.selection_enabled(),
            can_start: self.can_start(),
            can_stop: self.can_stop(),
            can_upload: self.can_upload(),
            can_upload_newest: self.can_upload_newest(),
            has_last_upload: self.last_upload_url.is_some(),
        }
    }

    fn active_mut(&mut self, session_id: Uuid, phase: RecordingPhase) -> Option<&mut ActiveRecording> {
        match self.active.as_mut() {
            Some(active) if active.session.session_id == session_id && active.phase == phase => {
                Some(active)
            }
            _ => {
                warn!(session_id = %session_id, expected = ?phase, "Ignoring stale recording result");
                None
            }
        }
    }
}

/// `HH:MM:SS`; negative spans read as zero.
fn format_elapsed(elapsed: TimeDelta) -> String {
    let seconds = elapsed.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

fn first_subtopic(subtopics: &[&str]) -> String {
    subtopics
        .first()
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_SUBTOPIC.to_string())
}

fn choices(names: Vec<&str>, selected: Option<&str>) -> Vec<MenuChoice> {
    names
        .into_iter()
        .map(|name| MenuChoice {
            name: name.to_string(),
            selected: Some(name) == selected,
        })
        .collect()
}
