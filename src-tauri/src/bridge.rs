//! Trust bridge
//!
//! The remote page is third-party content. The only thing it may ask of the
//! host is a window resize: `window.mammouthDesktop.changeResolution(w, h)`.
//! The object is installed by an initialization script that runs before any
//! page script, keeps the IPC entry point in a closure, and is frozen and
//! non-configurable so the page cannot swap it out. The capability file
//! limits the remote origin to the matching command.

use log::{info, warn};

use crate::controller::{AppContext, ShellWindow};
use crate::error::ShellError;
use crate::preferences::WindowSize;
use crate::resolution::CustomBounds;

/// Global the bridge object is installed under
pub const BRIDGE_GLOBAL: &str = "mammouthDesktop";

/// The single method on the bridge object
pub const BRIDGE_METHOD: &str = "changeResolution";

/// Host command the bridge method sends
pub const CHANGE_RESOLUTION_COMMAND: &str = "change_resolution";

/// Initialization script declaring the bridge. Attached once per window,
/// before the first navigation.
pub fn init_script() -> String {
    format!(
        r#"(function () {{
    'use strict';
    var internals = window.__TAURI_INTERNALS__;
    if (!internals || typeof internals.invoke !== 'function') {{
        return;
    }}
    var invoke = internals.invoke.bind(internals);
    var bridge = Object.freeze({{
        {method}: function (width, height) {{
            var w = Number(width), h = Number(height);
            if (!Number.isInteger(w) || !Number.isInteger(h) || w <= 0 || h <= 0) {{
                return;
            }}
            console.log('[mammouth-desktop] resolution change requested:', w, h);
            invoke('{command}', {{ width: w, height: h }}).catch(function () {{}});
        }}
    }});
    Object.defineProperty(window, '{global}', {{
        value: bridge,
        writable: false,
        configurable: false,
        enumerable: false
    }});
}})();"#,
        method = BRIDGE_METHOD,
        command = CHANGE_RESOLUTION_COMMAND,
        global = BRIDGE_GLOBAL,
    )
}

/// Handle a resolution request coming from the page. The page is untrusted,
/// so the size is checked against the custom bounds before anything moves.
pub fn request_resolution<W: ShellWindow>(
    ctx: &AppContext<W>,
    width: u32,
    height: u32,
) -> Result<WindowSize, ShellError> {
    let size = match CustomBounds::default().validate(width, height) {
        Ok(size) => size,
        Err(e) => {
            warn!("[bridge] Rejected resolution request: {}", e);
            return Err(e);
        }
    };

    info!("[bridge] Resolution change requested: {}", size);
    ctx.resize(size)?;
    Ok(size)
}
