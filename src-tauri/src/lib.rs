//! Mammouth Desktop Application
//!
//! Tauri shell around the Mammouth AI chat web app. Keeps the window size
//! across restarts and injects a resolution picker into the remote page,
//! whose only way back into the host is the single-command trust bridge.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod overlay;
pub mod preferences;
pub mod readiness;
pub mod resolution;

mod commands;
mod navigation;
mod window;

use std::sync::Arc;

use log::{info, LevelFilter};
use tauri::plugin::TauriPlugin;
use tauri::{AppHandle, Manager, RunEvent, Runtime};
use tauri_plugin_log::fern::colors::ColoredLevelConfig;
use tauri_plugin_log::{Target, TargetKind};

pub use controller::{AppContext, ShellWindow, WindowPhase};
pub use error::ShellError;
pub use preferences::{PreferenceStore, Preferences, WindowSize};

use config::MAIN_WINDOW_LABEL;
use window::LiveContext;

/// Initialize logging based on debug/release mode
fn init_logging<R: Runtime>() -> TauriPlugin<R> {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    tauri_plugin_log::Builder::new()
        .clear_targets()
        .targets([
            Target::new(TargetKind::Stdout),
            Target::new(TargetKind::LogDir {
                file_name: Some("mammouth-desktop".to_string()),
            }),
        ])
        .level(level)
        .level_for("tao", LevelFilter::Warn)
        .with_colors(ColoredLevelConfig::default())
        .build()
}

/// Lifecycle events after the event loop started
#[cfg_attr(not(target_os = "macos"), allow(unused_variables))]
fn handle_run_event(app: &AppHandle, event: RunEvent) {
    match event {
        // Last window closed. macOS apps stay in the dock; elsewhere quit.
        RunEvent::ExitRequested { code: None, api, .. } if cfg!(target_os = "macos") => {
            api.prevent_exit();
        }
        // Dock icon clicked with no window open
        #[cfg(target_os = "macos")]
        RunEvent::Reopen {
            has_visible_windows: false,
            ..
        } => {
            if app.get_webview_window(MAIN_WINDOW_LABEL).is_none() {
                info!("[app] Reopen with no window, recreating main window");
                let ctx = app.state::<Arc<LiveContext>>();
                if let Err(e) = window::create_main_window(app, &ctx) {
                    log::error!("[app] Failed to recreate main window: {}", e);
                }
            }
        }
        RunEvent::Exit => info!("[app] Exiting"),
        _ => {}
    }
}

/// Main entry point
pub fn main() {
    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, args, _cwd| {
            info!("[app] Second instance launched with {:?}, focusing window", args);
            if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
                let _ = window.unminimize();
                let _ = window.show();
                let _ = window.set_focus();
            }
        }))
        .plugin(init_logging())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            info!("Starting Mammouth Desktop v{}", env!("CARGO_PKG_VERSION"));

            let config_dir = app.path().app_config_dir()?;
            let ctx: Arc<LiveContext> =
                Arc::new(AppContext::new(PreferenceStore::in_dir(config_dir)));
            app.manage(Arc::clone(&ctx));

            window::create_main_window(app.handle(), &ctx)?;

            #[cfg(target_os = "macos")]
            window::set_dock_icon();

            info!("Application setup complete");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![commands::change_resolution])
        .build(tauri::generate_context!())
        .expect("Error while building Mammouth Desktop")
        .run(handle_run_event);
}
