//! Tauri command handlers
//!
//! The remote page reaches the host through exactly one command, invoked by
//! the bridge object. The logic lives in `bridge`; this is a thin Tauri
//! wrapper.

use std::sync::Arc;

use log::debug;
use tauri::State;

use crate::bridge;
use crate::window::LiveContext;

/// Resize the window to `width`×`height` (logical pixels).
///
/// The page treats this as fire-and-forget; the result only shows up in
/// the page console.
#[tauri::command]
pub fn change_resolution(
    ctx: State<'_, Arc<LiveContext>>,
    width: u32,
    height: u32,
) -> Result<(), String> {
    debug!("[command:change_resolution] Invoked by page: {}x{}", width, height);
    let ctx: &LiveContext = &ctx;
    bridge::request_resolution(ctx, width, height)?;
    Ok(())
}
