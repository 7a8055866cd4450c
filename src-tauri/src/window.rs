//! Main window
//!
//! Builds the single webview window, wires its page-load and window events
//! to the `AppContext`, and implements `ShellWindow` on top of Tauri.

use std::sync::Arc;

use log::{debug, info, warn};
use tauri::image::Image;
use tauri::webview::PageLoadEvent;
use tauri::{
    AppHandle, LogicalSize, PhysicalSize, Url, WebviewUrl, WebviewWindow, WebviewWindowBuilder,
    WindowEvent,
};

use crate::bridge;
use crate::config::{APP_TITLE, APP_URL, MAIN_WINDOW_LABEL};
use crate::controller::{AppContext, ShellWindow};
use crate::error::ShellError;
use crate::navigation;
use crate::preferences::WindowSize;
use crate::readiness::{self, ContextProbe, PollTimings};

pub type LiveContext = AppContext<TauriWindow>;

/// `ShellWindow` over a Tauri webview window. Sizes are logical pixels.
#[derive(Clone)]
pub struct TauriWindow(WebviewWindow);

impl TauriWindow {
    fn to_logical(&self, size: PhysicalSize<u32>) -> Result<WindowSize, ShellError> {
        let scale = self.0.scale_factor()?;
        let logical: LogicalSize<u32> = size.to_logical(scale);
        Ok(WindowSize::new(logical.width, logical.height))
    }
}

impl ShellWindow for TauriWindow {
    fn inner_size(&self) -> Result<WindowSize, ShellError> {
        self.to_logical(self.0.inner_size()?)
    }

    fn set_size(&self, size: WindowSize) -> Result<(), ShellError> {
        self.0.set_size(tauri::Size::Logical(LogicalSize::new(
            size.width as f64,
            size.height as f64,
        )))?;
        Ok(())
    }

    fn center(&self) -> Result<(), ShellError> {
        self.0.center()?;
        Ok(())
    }

    fn eval(&self, script: &str) -> Result<(), ShellError> {
        self.0.eval(script)?;
        Ok(())
    }

    fn eval_with_callback(
        &self,
        script: &str,
        callback: impl Fn(String) + Send + 'static,
    ) -> Result<(), ShellError> {
        self.0.eval_with_callback(script, callback)?;
        Ok(())
    }
}

/// Platform icon: `.ico` on Windows, `.png` elsewhere
fn window_icon() -> Result<Image<'static>, ShellError> {
    #[cfg(target_os = "windows")]
    let bytes: &[u8] = include_bytes!("../icons/icon.ico");
    #[cfg(not(target_os = "windows"))]
    let bytes: &[u8] = include_bytes!("../icons/icon.png");

    Ok(Image::from_bytes(bytes)?)
}

/// Create the main window at the persisted size and hand it to `ctx`.
///
/// The bridge is attached as an initialization script here, once per
/// window, so it exists before the first page script runs.
pub fn create_main_window(app: &AppHandle, ctx: &Arc<LiveContext>) -> Result<(), ShellError> {
    let size = ctx.preferences().window;
    let url: Url = APP_URL.parse()?;

    info!("[window] Creating main window ({}) for {}", size, url);

    let nav_app = app.clone();
    let load_ctx = Arc::clone(ctx);

    let window = WebviewWindowBuilder::new(app, MAIN_WINDOW_LABEL, WebviewUrl::External(url))
        .title(APP_TITLE)
        .inner_size(size.width as f64, size.height as f64)
        .center()
        .icon(window_icon()?)?
        .initialization_script(&bridge::init_script())
        .on_navigation(move |url| navigation::route(&nav_app, url))
        .on_page_load(move |_window, payload| {
            handle_page_load(&load_ctx, payload.event(), payload.url())
        })
        .build()?;

    // No menu bar
    if let Err(e) = window.remove_menu() {
        debug!("[window] No menu to remove: {}", e);
    }

    ctx.attach(TauriWindow(window.clone()));

    let events_ctx = Arc::clone(ctx);
    window.on_window_event(move |event| handle_window_event(&events_ctx, event));

    Ok(())
}

fn handle_page_load(ctx: &Arc<LiveContext>, event: PageLoadEvent, url: &Url) {
    match event {
        PageLoadEvent::Started => {
            let generation = ctx.begin_load();
            debug!("[window] Load #{} started: {}", generation, url);
        }
        PageLoadEvent::Finished => {
            let Some(generation) = ctx.begin_readiness_cycle() else {
                debug!("[window] Load finished with no cycle to start: {}", url);
                return;
            };
            debug!("[window] Load #{} finished, polling readiness", generation);

            let timings = PollTimings::default();
            let probe = ContextProbe::new(Arc::clone(ctx), generation, timings.probe_timeout);
            tauri::async_runtime::spawn(async move {
                let outcome = readiness::run_cycle(&probe, &timings).await;
                debug!("[window] Readiness cycle #{} ended: {:?}", generation, outcome);
            });
        }
    }
}

fn handle_window_event(ctx: &LiveContext, event: &WindowEvent) {
    match event {
        WindowEvent::Resized(physical) => {
            let Ok(window) = ctx.window() else {
                return;
            };
            match window.to_logical(*physical) {
                Ok(size) => ctx.on_resized(size),
                Err(e) => warn!("[window] Could not convert resize event: {}", e),
            }
        }
        WindowEvent::CloseRequested { .. } => ctx.on_close(),
        WindowEvent::Destroyed => ctx.on_destroyed(),
        _ => {}
    }
}

/// macOS: dock icon from the bundled PNG. Must run on the main thread.
#[cfg(target_os = "macos")]
pub fn set_dock_icon() {
    use objc::runtime::Object;
    use objc::{class, msg_send, sel, sel_impl};

    let bytes: &[u8] = include_bytes!("../icons/icon.png");

    unsafe {
        let data: *mut Object = msg_send![class!(NSData),
            dataWithBytes: bytes.as_ptr() as *const std::ffi::c_void
            length: bytes.len()];
        if data.is_null() {
            warn!("[window] Could not wrap dock icon bytes");
            return;
        }

        let image: *mut Object = msg_send![class!(NSImage), alloc];
        let image: *mut Object = msg_send![image, initWithData: data];
        if image.is_null() {
            warn!("[window] Could not decode dock icon");
            return;
        }

        let app: *mut Object = msg_send![class!(NSApplication), sharedApplication];
        let _: () = msg_send![app, setApplicationIconImage: image];
    }

    info!("[window] Dock icon set");
}
