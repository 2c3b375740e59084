//! Tray menu item identifiers.
//!
//! Every menu item is created with a string id produced by
//! [`MenuAction::id`], so a click can be decoded without holding on to the
//! `MenuId`s of a menu that is rebuilt whenever the selection changes.

const CLASS_PREFIX: &str = "class:";
const CHAPTER_PREFIX: &str = "chapter:";
const SUBTOPIC_PREFIX: &str = "subtopic:";

/// Something the operator picked from the tray menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    /// Pick a class.
    SelectClass(String),
    /// Pick a chapter of the selected class.
    SelectChapter(String),
    /// Pick a subtopic of the selected chapter.
    SelectSubtopic(String),
    /// Start recording.
    StartRecording,
    /// Stop recording.
    StopRecording,
    /// Upload the finished recording.
    Upload,
    /// Upload the newest file in the recordings folder.
    UploadNewest,
    /// Open the last uploaded file in the browser.
    OpenLastUpload,
    /// Open the local recordings folder.
    OpenRecordingsFolder,
    /// Open the catalog file in the default editor.
    EditCatalog,
    /// Re-read the catalog file.
    ReloadCatalog,
    /// Quit.
    Exit,
}

impl MenuAction {
    /// Menu id for this action.
    pub fn id(&self) -> String {
        match self {
            MenuAction::SelectClass(name) => format!("{CLASS_PREFIX}{name}"),
            MenuAction::SelectChapter(name) => format!("{CHAPTER_PREFIX}{name}"),
            MenuAction::SelectSubtopic(name) => format!("{SUBTOPIC_PREFIX}{name}"),
            MenuAction::StartRecording => "record:start".to_string(),
            MenuAction::StopRecording => "record:stop".to_string(),
            MenuAction::Upload => "upload".to_string(),
            MenuAction::UploadNewest => "upload:newest".to_string(),
            MenuAction::OpenLastUpload => "open:last-upload".to_string(),
            MenuAction::OpenRecordingsFolder => "open:recordings".to_string(),
            MenuAction::EditCatalog => "catalog:edit".to_string(),
            MenuAction::ReloadCatalog => "catalog:reload".to_string(),
            MenuAction::Exit => "exit".to_string(),
        }
    }

    /// Decode a menu id; `None` for ids this application did not create.
    pub fn parse(id: &str) -> Option<Self> {
        if let Some(name) = id.strip_prefix(CLASS_PREFIX) {
            return Some(MenuAction::SelectClass(name.to_string()));
        }
        if let Some(name) = id.strip_prefix(CHAPTER_PREFIX) {
            return Some(MenuAction::SelectChapter(name.to_string()));
        }
        if let Some(name) = id.strip_prefix(SUBTOPIC_PREFIX) {
            return Some(MenuAction::SelectSubtopic(name.to_string()));
        }

        match id {
            "record:start" => Some(MenuAction::StartRecording),
            "record:stop" => Some(MenuAction::StopRecording),
            "upload" => Some(MenuAction::Upload),
            "upload:newest" => Some(MenuAction::UploadNewest),
            "open:last-upload" => Some(MenuAction::OpenLastUpload),
            "open:recordings" => Some(MenuAction::OpenRecordingsFolder),
            "catalog:edit" => Some(MenuAction::EditCatalog),
            "catalog:reload" => Some(MenuAction::ReloadCatalog),
            "exit" => Some(MenuAction::Exit),
            _ => None,
        }
    }
}
