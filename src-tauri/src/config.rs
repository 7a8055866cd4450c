//! Build-time configuration
//!
//! Everything the shell needs to know about the wrapped site and its own
//! behaviour is fixed here. The only runtime configuration is the
//! persisted window size (see `preferences`).

use std::time::Duration;

use crate::preferences::WindowSize;

/// Label of the single application window
pub const MAIN_WINDOW_LABEL: &str = "main";

/// Window title
pub const APP_TITLE: &str = "Mammouth AI Chat";

/// Remote chat application loaded into the window
pub const APP_URL: &str = "https://mammouth.ai/app/a/default";

/// Host (and its subdomains) that stays inside the window
pub const APP_HOST: &str = "mammouth.ai";

/// Sign-in providers that must complete inside the window, otherwise the
/// session cookie ends up in the system browser.
pub const AUTH_HOSTS: &[&str] = &[
    "accounts.google.com",
    "appleid.apple.com",
    "login.microsoftonline.com",
];

/// File name of the preference record inside the per-user config dir
pub const PREFERENCES_FILE: &str = "config.json";

/// Window size used when no valid preference record exists
pub const DEFAULT_WINDOW_SIZE: WindowSize = WindowSize::new(1280, 720);

// ============================================================================
// Readiness polling
// ============================================================================

/// Delay between "page finished loading" and the first readiness probe
pub const INITIAL_PROBE_DELAY: Duration = Duration::from_millis(500);

/// Delay between two readiness probes
pub const PROBE_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Number of retries before the overlay is injected unconditionally
pub const MAX_PROBE_ATTEMPTS: u32 = 3;

/// A probe that gets no answer within this window counts as failed
pub const PROBE_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Resolution picker
// ============================================================================

/// Presets listed in the resolution dropdown, in display order
pub const RESOLUTION_PRESETS: [WindowSize; 7] = [
    WindowSize::new(800, 600),
    WindowSize::new(1024, 768),
    WindowSize::new(1280, 720),
    WindowSize::new(1366, 768),
    WindowSize::new(1600, 900),
    WindowSize::new(1920, 1080),
    WindowSize::new(2560, 1440),
];

pub const CUSTOM_MIN_WIDTH: u32 = 640;
pub const CUSTOM_MAX_WIDTH: u32 = 3840;
pub const CUSTOM_MIN_HEIGHT: u32 = 480;
pub const CUSTOM_MAX_HEIGHT: u32 = 2160;
