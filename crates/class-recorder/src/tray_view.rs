use crate::TrayIconState;

/// One entry of a class/chapter/subtopic submenu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuChoice {
    /// Display name.
    pub name: String,
    /// Whether it is the current selection.
    pub selected: bool,
}

/// Everything the tray menu shows, computed on the runtime thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuModel {
    /// Classes from the catalog.
    pub classes: Vec<MenuChoice>,
    /// Chapters of the selected class.
    pub chapters: Vec<MenuChoice>,
    /// Subtopics of the selected chapter.
    pub subtopics: Vec<MenuChoice>,
    /// Whether the selection may change right now.
    pub selection_enabled: bool,
    /// Start Recording enabled.
    pub can_start: bool,
    /// Stop Recording enabled.
    pub can_stop: bool,
    /// Upload Recording enabled.
    pub can_upload: bool,
    /// Upload Newest Recording enabled.
    pub can_upload_newest: bool,
    /// Open Last Upload enabled.
    pub has_last_upload: bool,
}

/// Icon, tooltip and menu to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayView {
    /// Icon to show.
    pub state: TrayIconState,
    /// Hover text.
    pub tooltip: String,
    /// Menu contents.
    pub menu: MenuModel,
}
