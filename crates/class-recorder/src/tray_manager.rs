//! System tray icon with state-based updates.
//!
//! The menu is rebuilt from a [`MenuModel`] whenever it changes: class,
//! chapter and subtopic submenus come from the catalog, and the action items
//! are enabled according to the shell rules.

use crate::{AppError, AppResult, MenuAction, MenuChoice, MenuModel, TrayIconState, TrayView};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::{debug, info, instrument};
use tray_icon::menu::{
    CheckMenuItem, IsMenuItem, Menu, MenuItem, PredefinedMenuItem, Submenu,
};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

/// System tray icon manager.
pub struct TrayManager {
    tray_icon: TrayIcon,
    current: TrayView,
}

impl TrayManager {
    /// Create the tray icon showing `view`.
    #[track_caller]
    #[instrument(skip(view))]
    pub fn new(view: TrayView) -> AppResult<Self> {
        let menu = Self::build_menu(&view.menu)?;
        let icon = Self::load_icon(view.state)?;

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip(&view.tooltip)
            .with_menu(Box::new(menu))
            .with_icon(icon)
            .build()
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to create tray icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("System tray icon initialized");

        Ok(Self {
            tray_icon,
            current: view,
        })
    }

    /// Apply `view`, touching only what changed.
    #[track_caller]
    #[instrument(skip(self, view), fields(state = ?view.state))]
    pub fn render(&mut self, view: TrayView) -> AppResult<()> {
        if view.state != self.current.state {
            let icon = Self::load_icon(view.state)?;
            self.tray_icon
                .set_icon(Some(icon))
                .map_err(|e| AppError::tray(format!("Failed to update icon: {}", e)))?;
        }

        if view.tooltip != self.current.tooltip {
            self.tray_icon
                .set_tooltip(Some(&view.tooltip))
                .map_err(|e| AppError::tray(format!("Failed to update tooltip: {}", e)))?;
        }

        if view.menu != self.current.menu {
            let menu = Self::build_menu(&view.menu)?;
            self.tray_icon.set_menu(Some(Box::new(menu)));
            debug!("Tray menu rebuilt");
        }

        self.current = view;

        Ok(())
    }

    #[track_caller]
    fn build_menu(model: &MenuModel) -> AppResult<Menu> {
        let class_menu = Self::choice_submenu(
            "Class",
            model.classes.iter().map(|c| (MenuAction::SelectClass(c.name.clone()), c)),
            model.selection_enabled,
        )?;
        let chapter_menu = Self::choice_submenu(
            "Chapter",
            model.chapters.iter().map(|c| (MenuAction::SelectChapter(c.name.clone()), c)),
            model.selection_enabled,
        )?;
        let subtopic_menu = Self::choice_submenu(
            "Subtopic",
            model.subtopics.iter().map(|c| (MenuAction::SelectSubtopic(c.name.clone()), c)),
            model.selection_enabled,
        )?;

        let item = |action: MenuAction, text: &str, enabled: bool| {
            MenuItem::with_id(action.id(), text, enabled, None)
        };

        let start = item(MenuAction::StartRecording, "Start Recording", model.can_start);
        let stop = item(MenuAction::StopRecording, "Stop Recording", model.can_stop);
        let upload = item(MenuAction::Upload, "Upload Recording", model.can_upload);
        let upload_newest = item(
            MenuAction::UploadNewest,
            "Upload Newest Recording",
            model.can_upload_newest,
        );
        let last_upload = item(MenuAction::OpenLastUpload, "Open Last Upload", model.has_last_upload);
        let recordings = item(MenuAction::OpenRecordingsFolder, "Open Recordings Folder", true);
        let edit_catalog = item(MenuAction::EditCatalog, "Edit Catalog", true);
        let reload_catalog = item(MenuAction::ReloadCatalog, "Reload Catalog", true);
        let exit = item(MenuAction::Exit, "Exit", true);

        let separator_a = PredefinedMenuItem::separator();
        let separator_b = PredefinedMenuItem::separator();
        let separator_c = PredefinedMenuItem::separator();

        let items: [&dyn IsMenuItem; 15] = [
            &class_menu,
            &chapter_menu,
            &subtopic_menu,
            &separator_a,
            &start,
            &stop,
            &upload,
            &upload_newest,
            &separator_b,
            &last_upload,
            &recordings,
            &edit_catalog,
            &reload_catalog,
            &separator_c,
            &exit,
        ];

        let menu = Menu::new();
        menu.append_items(&items)
            .map_err(|e| AppError::tray(format!("Failed to build tray menu: {}", e)))?;

        Ok(menu)
    }

    #[track_caller]
    fn choice_submenu<'a>(
        title: &str,
        entries: impl Iterator<Item = (MenuAction, &'a MenuChoice)>,
        enabled: bool,
    ) -> AppResult<Submenu> {
        let mut label = title.to_string();
        let entries: Vec<CheckMenuItem> = entries
            .map(|(action, choice)| {
                if choice.selected {
                    label = format!("{}: {}", title, choice.name);
                }
                CheckMenuItem::with_id(action.id(), &choice.name, enabled, choice.selected, None)
            })
            .collect();

        let submenu = Submenu::new(label, !entries.is_empty());
        for entry in &entries {
            submenu
                .append(entry)
                .map_err(|e| AppError::tray(format!("Failed to add {} entry: {}", title, e)))?;
        }

        Ok(submenu)
    }

    /// Load icon from compile-time embedded PNG bytes.
    #[track_caller]
    fn load_icon(state: TrayIconState) -> AppResult<Icon> {
        let png_bytes: &[u8] = match state {
            TrayIconState::Idle => include_bytes!("../resources/icons/idle.png"),
            TrayIconState::Recording => include_bytes!("../resources/icons/recording.png"),
            TrayIconState::Uploading => include_bytes!("../resources/icons/uploading.png"),
        };

        let img = image::load_from_memory(png_bytes)
            .map_err(|e| AppError::tray(format!("Failed to decode embedded icon: {}", e)))?;

        let rgba = img.into_rgba8();
        let (width, height) = (rgba.width(), rgba.height());

        Icon::from_rgba(rgba.into_raw(), width, height)
            .map_err(|e| AppError::tray(format!("Failed to create icon from RGBA: {}", e)))
    }
}
