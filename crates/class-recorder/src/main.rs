//! Class Recorder: tray app that records lectures with OBS and files them
//! on Google Drive under class, chapter and subtopic folders.

mod app;
mod app_command;
mod config;
mod error;
mod hotkey_handler;
mod menu_action;
mod notifier;
mod recording_state;
mod shell_state;
mod tray_command;
mod tray_icon_state;
mod tray_manager;
mod tray_view;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
    hotkey_handler::HotkeyHandler,
    menu_action::MenuAction,
    notifier::Notifier,
    recording_state::RecordingSession,
    shell_state::{ShellState, Toggle},
    tray_command::TrayCommand,
    tray_icon_state::TrayIconState,
    tray_manager::TrayManager,
    tray_view::{MenuChoice, MenuModel, TrayView},
};

use crate::config::{AppPaths, Catalog, Config};

use class_recorder_core::{HttpDrive, ObsController, ServiceAccountTokens, UploadOrchestrator};

use std::{path::Path, sync::Arc};

use global_hotkey::GlobalHotKeyManager;
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "class_recorder=debug,class_recorder_core=debug";
const LOG_FILE_PREFIX: &str = "class-recorder.log";

/// Everything built before the event loop starts that moves to the runtime
/// thread.
struct Startup {
    paths: AppPaths,
    config: Arc<Config>,
    shell: ShellState,
    obs: ObsController,
    uploader: UploadOrchestrator,
}

/// Application entry point.
fn main() {
    let paths = match AppPaths::discover().and_then(|paths| paths.ensure().map(|()| paths)) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Failed to prepare application directories: {}", e);
            std::process::exit(1);
        }
    };

    // Dropping the guard flushes buffered log lines.
    let mut log_guard = Some(init_tracing(&paths.log_dir()));

    let startup = match build_startup(paths) {
        Ok(startup) => startup,
        Err(e) => {
            error!("Startup failed: {:?}", e);
            std::process::exit(1);
        }
    };

    let event_loop = EventLoopBuilder::<TrayCommand>::with_user_event().build();
    let tray_proxy = event_loop.create_proxy();

    // TrayManager lives on the main thread - TrayIcon is !Send on all platforms.
    let mut tray_manager = match TrayManager::new(startup.shell.tray_view()) {
        Ok(tm) => tm,
        Err(e) => {
            error!("Failed to create TrayManager: {:?}", e);
            std::process::exit(1);
        }
    };

    let mut startup = Some(startup);

    // Persists across event loop iterations; dropping it unregisters the hotkey.
    let mut hotkey_manager: Option<GlobalHotKeyManager> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(cmd) => {
                match cmd {
                    TrayCommand::Render(view) => {
                        if let Err(e) = tray_manager.render(view) {
                            error!(error = ?e, "Failed to update tray");
                        }
                    }
                    TrayCommand::Shutdown => {
                        drop(log_guard.take());
                        *control_flow = ControlFlow::ExitWithCode(0);
                    }
                }
                return;
            }
            Event::NewEvents(tao::event::StartCause::Init) => {
                let Some(startup) = startup.take() else {
                    return;
                };

                #[cfg(target_os = "macos")]
                unsafe {
                    use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};
                    CFRunLoopWakeUp(CFRunLoopGetMain());
                }

                // Register hotkey on the main thread: tao's event loop pumps
                // the Windows messages needed for WM_HOTKEY delivery.
                let (manager, hotkey_id) = match HotkeyHandler::register_hotkey() {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Failed to register hotkey: {:?}", e);
                        std::process::exit(1);
                    }
                };
                hotkey_manager = Some(manager);

                let tray_proxy = tray_proxy.clone();

                // Spawn tokio runtime on separate thread.
                // TrayManager and hotkey_manager stay on the main thread.
                std::thread::spawn(move || {
                    let rt = match tokio::runtime::Runtime::new() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to create tokio runtime: {:?}", e);
                            std::process::exit(1);
                        }
                    };

                    rt.block_on(async {
                        let (command_tx, command_rx) = mpsc::channel(32);
                        let (shutdown_tx, shutdown_rx) = watch::channel(false);

                        let hotkey_handler = HotkeyHandler::new(hotkey_id, command_tx.clone());

                        let app = App {
                            shell: startup.shell,
                            config: startup.config,
                            paths: startup.paths,
                            obs: Arc::new(Mutex::new(startup.obs)),
                            uploader: Arc::new(startup.uploader),
                            notifier: Notifier,
                            tray_proxy,
                            command_tx,
                            command_rx,
                            shutdown_tx,
                        };

                        tokio::join!(
                            async {
                                if let Err(e) = hotkey_handler.run(shutdown_rx).await {
                                    error!(error = ?e, "Hotkey handler error");
                                }
                            },
                            async {
                                if let Err(e) = app.run().await {
                                    error!(error = ?e, "App error");
                                }
                            }
                        );
                    });
                });
            }
            _ => {}
        }

        // Keep hotkey_manager alive in the closure for the app's lifetime.
        let _ = &hotkey_manager;
    });
}

/// Console plus daily-rotated file logging. `RUST_LOG` overrides the filter.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    guard
}

/// Load configuration and catalog, and build the OBS and Drive clients.
fn build_startup(paths: AppPaths) -> AppResult<Startup> {
    let config = Config::load(&paths)?;
    let catalog = Catalog::load_or_create(&paths.catalog_file())?;

    let tokens = Arc::new(ServiceAccountTokens::from_file(
        &config.drive.service_account_file,
    )?);
    let drive = Arc::new(HttpDrive::new(tokens)?);
    let uploader =
        UploadOrchestrator::new(drive, config.upload.policy(), config.drive.folder_id.clone());

    let obs = ObsController::new(config.obs.endpoint())
        .with_record_directory(config.recording_path.clone());

    Ok(Startup {
        paths,
        config: Arc::new(config),
        shell: ShellState::new(catalog),
        obs,
        uploader,
    })
}
