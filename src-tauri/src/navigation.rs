//! External link redirection
//!
//! The window only ever shows the chat application (and the sign-in pages it
//! relies on). Any other http(s) destination opens in the system browser.

use log::{debug, error, info};
use tauri::AppHandle;
use tauri_plugin_opener::OpenerExt;
use url::Url;

use crate::config::{APP_HOST, AUTH_HOSTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Navigate inside the window
    Stay,
    /// Cancel and hand to the system browser / mail client
    OpenExternally,
}

fn is_app_host(host: &str) -> bool {
    host == APP_HOST
        || host
            .strip_suffix(APP_HOST)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

pub fn classify(url: &Url) -> Route {
    match url.scheme() {
        "http" | "https" => match url.host_str() {
            Some(host) if is_app_host(host) || AUTH_HOSTS.contains(&host) => Route::Stay,
            _ => Route::OpenExternally,
        },
        "mailto" | "tel" => Route::OpenExternally,
        // about:blank, blob:, data: and the webview's own schemes
        _ => Route::Stay,
    }
}

/// Navigation hook for the main window. Returns whether the navigation
/// proceeds in the window.
pub fn route(app: &AppHandle, url: &Url) -> bool {
    match classify(url) {
        Route::Stay => {
            debug!("[navigation] Allowing {}", url);
            true
        }
        Route::OpenExternally => {
            info!("[navigation] Opening external link in browser: {}", url);
            if let Err(e) = app.opener().open_url(url.as_str(), None::<&str>) {
                error!("[navigation] Failed to open {}: {}", url, e);
            }
            false
        }
    }
}
