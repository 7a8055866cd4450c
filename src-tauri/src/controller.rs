//! Host window controller
//!
//! `AppContext` owns the (nullable) handle to the single window and the
//! preference record. Every handler receives the context explicitly; there
//! is no process-wide window or config global.
//!
//! The window itself is reached through `ShellWindow`, the small capability
//! surface the shell needs from the windowing host. Window calls are never
//! made while the state lock is held: the handle is cloned out first, so
//! window events fired synchronously from inside a call can take the lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::error::ShellError;
use crate::overlay::{self, Overlay};
use crate::preferences::{PreferenceStore, Preferences, WindowSize};

/// What the shell needs from a live window
pub trait ShellWindow: Clone + Send + Sync + 'static {
    /// Current inner size in logical pixels
    fn inner_size(&self) -> Result<WindowSize, ShellError>;
    fn set_size(&self, size: WindowSize) -> Result<(), ShellError>;
    fn center(&self) -> Result<(), ShellError>;
    /// Submit a script to the page. Fire-and-forget: no result comes back.
    fn eval(&self, script: &str) -> Result<(), ShellError>;
    /// Submit an expression; `callback` receives its value serialized as
    /// JSON once the page has evaluated it. May never be called if the page
    /// goes away first.
    fn eval_with_callback(
        &self,
        script: &str,
        callback: impl Fn(String) + Send + 'static,
    ) -> Result<(), ShellError>;
}

/// `Uninitialized → Created → (Loading → Ready)* → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Uninitialized,
    Created,
    Loading,
    Ready,
    Closed,
}

struct WindowState<W> {
    window: Option<W>,
    phase: WindowPhase,
    prefs: Preferences,
    /// Bumped on every page load; readiness cycles of older loads are stale
    generation: u64,
    /// Generation whose readiness cycle has already been started
    cycle_generation: Option<u64>,
}

pub struct AppContext<W> {
    store: PreferenceStore,
    state: Mutex<WindowState<W>>,
}

impl<W: ShellWindow> AppContext<W> {
    /// Load preferences and start without a window.
    pub fn new(store: PreferenceStore) -> Self {
        let prefs = store.load();
        info!(
            "[controller] Preferences loaded from {} (window {})",
            store.path().display(),
            prefs.window
        );
        Self {
            store,
            state: Mutex::new(WindowState {
                window: None,
                phase: WindowPhase::Uninitialized,
                prefs,
                generation: 0,
                cycle_generation: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, WindowState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn preferences(&self) -> Preferences {
        self.state().prefs.clone()
    }

    pub fn phase(&self) -> WindowPhase {
        self.state().phase
    }

    pub fn is_live(&self) -> bool {
        self.state().window.is_some()
    }

    /// Clone of the live window handle
    pub fn window(&self) -> Result<W, ShellError> {
        self.state().window.clone().ok_or(ShellError::WindowGone)
    }

    /// Take ownership of a freshly created window.
    pub fn attach(&self, window: W) {
        let mut state = self.state();
        state.window = Some(window);
        state.phase = WindowPhase::Created;
        state.cycle_generation = None;
        debug!("[controller] Window attached");
    }

    /// A navigation started. Returns the new load generation.
    pub fn begin_load(&self) -> u64 {
        let mut state = self.state();
        state.generation += 1;
        if state.window.is_some() {
            state.phase = WindowPhase::Loading;
        }
        state.generation
    }

    /// Claim the readiness cycle for the current load. `None` when the
    /// window is gone or a cycle already runs for this load.
    pub fn begin_readiness_cycle(&self) -> Option<u64> {
        let mut state = self.state();
        if state.window.is_none() || state.cycle_generation == Some(state.generation) {
            return None;
        }
        state.cycle_generation = Some(state.generation);
        Some(state.generation)
    }

    /// The window is alive and no newer load has started since `generation`
    pub fn is_cycle_current(&self, generation: u64) -> bool {
        let state = self.state();
        state.window.is_some() && state.generation == generation
    }

    pub fn mark_ready(&self, generation: u64) {
        let mut state = self.state();
        if state.window.is_some() && state.generation == generation {
            state.phase = WindowPhase::Ready;
        }
    }

    /// Resize to `size`, recenter, and persist the new size.
    pub fn resize(&self, size: WindowSize) -> Result<(), ShellError> {
        let window = self.window()?;

        window.set_size(size)?;
        if let Err(e) = window.center() {
            warn!("[controller] Failed to center window: {}", e);
        }

        self.record_size(size);
        info!("[controller] Window resized to {}", size);
        Ok(())
    }

    /// Size change reported by the window (user drag, maximise, ...).
    pub fn on_resized(&self, size: WindowSize) {
        // Minimised windows report 0×0
        if !size.is_valid() || !self.is_live() {
            return;
        }
        if self.state().prefs.window == size {
            return;
        }
        debug!("[controller] Window resized by user to {}", size);
        self.record_size(size);
    }

    /// Persist the final bounds and drop the handle. No-op without a window.
    pub fn on_close(&self) {
        let Ok(window) = self.window() else {
            debug!("[controller] Close on a window that is already gone");
            return;
        };

        let measured = match window.inner_size() {
            Ok(size) if size.is_valid() => Some(size),
            Ok(size) => {
                debug!("[controller] Ignoring close-time size {}", size);
                None
            }
            Err(e) => {
                warn!("[controller] Could not read window size on close: {}", e);
                None
            }
        };

        let mut state = self.state();
        if let Some(size) = measured {
            state.prefs.window = size;
        }
        state.window = None;
        state.phase = WindowPhase::Closed;
        self.store.persist(&state.prefs);
        info!("[controller] Window closed at {}", state.prefs.window);
    }

    /// The window was destroyed (possibly without a close request).
    pub fn on_destroyed(&self) {
        let mut state = self.state();
        if state.window.take().is_some() {
            state.phase = WindowPhase::Closed;
            debug!("[controller] Window destroyed");
        }
    }

    /// Render the overlay for the current size and submit it to the page.
    pub fn inject_overlay(&self) -> Result<(), ShellError> {
        let window = self.window()?;
        let current = self.state().prefs.window;

        let script = overlay::render(&Overlay::resolution_picker(current));
        window.eval(&script)?;
        info!("[controller] Resolution overlay injected (current {})", current);
        Ok(())
    }

    fn record_size(&self, size: WindowSize) {
        let mut state = self.state();
        state.prefs.window = size;
        self.store.persist(&state.prefs);
    }
}


#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::testing::FakeWindow;
    use super::*;
    use crate::overlay::preset_option_id;

    fn context(dir: &TempDir) -> AppContext<FakeWindow> {
        AppContext::new(PreferenceStore::in_dir(dir.path()))
    }

    fn persisted(dir: &TempDir) -> Preferences {
        let raw = fs::read_to_string(dir.path().join("config.json")).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_starts_uninitialized_with_defaults() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        assert_eq!(ctx.phase(), WindowPhase::Uninitialized);
        assert!(!ctx.is_live());
        assert_eq!(ctx.preferences().window, WindowSize::new(1280, 720));
        assert_eq!(persisted(&dir).window, WindowSize::new(1280, 720));
    }

    #[test]
    fn test_resize_updates_window_and_preferences() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let window = FakeWindow::with_size(WindowSize::new(1280, 720));
        ctx.attach(window.clone());

        ctx.resize(WindowSize::new(1920, 1080)).unwrap();

        assert_eq!(window.state().size, Some(WindowSize::new(1920, 1080)));
        assert_eq!(window.state().centered, 1);
        assert_eq!(ctx.preferences().window, WindowSize::new(1920, 1080));
        assert_eq!(persisted(&dir).window, WindowSize::new(1920, 1080));
    }

    #[test]
    fn test_reinjected_overlay_marks_new_size_active() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.attach(FakeWindow::with_size(WindowSize::new(1280, 720)));

        ctx.resize(WindowSize::new(1920, 1080)).unwrap();
        let overlay = Overlay::resolution_picker(ctx.preferences().window);

        let active = preset_option_id(WindowSize::new(1920, 1080));
        let previous = preset_option_id(WindowSize::new(1280, 720));
        assert!(overlay.find(&active).unwrap().has_class("active"));
        assert!(!overlay.find(&previous).unwrap().has_class("active"));
    }

    #[test]
    fn test_resize_without_window_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        assert!(matches!(
            ctx.resize(WindowSize::new(1920, 1080)),
            Err(ShellError::WindowGone)
        ));
        assert_eq!(persisted(&dir).window, WindowSize::new(1280, 720));
    }

    #[test]
    fn test_user_resize_is_persisted_but_zero_size_ignored() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.attach(FakeWindow::with_size(WindowSize::new(1280, 720)));

        ctx.on_resized(WindowSize::new(1500, 800));
        assert_eq!(persisted(&dir).window, WindowSize::new(1500, 800));

        ctx.on_resized(WindowSize::new(0, 0));
        assert_eq!(ctx.preferences().window, WindowSize::new(1500, 800));
    }

    #[test]
    fn test_close_persists_bounds_and_drops_handle() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.attach(FakeWindow::with_size(WindowSize::new(1440, 900)));

        ctx.on_close();

        assert_eq!(ctx.phase(), WindowPhase::Closed);
        assert!(!ctx.is_live());
        assert_eq!(persisted(&dir).window, WindowSize::new(1440, 900));

        // Second close on a dead handle does nothing
        ctx.on_close();
        assert_eq!(ctx.phase(), WindowPhase::Closed);
    }

    #[test]
    fn test_close_keeps_last_known_size_when_unreadable() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let window = FakeWindow::with_size(WindowSize::new(1280, 720));
        ctx.attach(window.clone());
        ctx.resize(WindowSize::new(1600, 900)).unwrap();
        window.state().fail_size = true;

        ctx.on_close();

        assert_eq!(persisted(&dir).window, WindowSize::new(1600, 900));
    }

    #[test]
    fn test_one_readiness_cycle_per_load() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.attach(FakeWindow::default());

        let first = ctx.begin_load();
        assert_eq!(ctx.phase(), WindowPhase::Loading);
        assert_eq!(ctx.begin_readiness_cycle(), Some(first));
        assert_eq!(ctx.begin_readiness_cycle(), None);

        let second = ctx.begin_load();
        assert!(!ctx.is_cycle_current(first));
        assert!(ctx.is_cycle_current(second));
        assert_eq!(ctx.begin_readiness_cycle(), Some(second));

        ctx.mark_ready(first);
        assert_eq!(ctx.phase(), WindowPhase::Loading);
        ctx.mark_ready(second);
        assert_eq!(ctx.phase(), WindowPhase::Ready);
    }

    #[test]
    fn test_no_cycle_after_destroy() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        ctx.attach(FakeWindow::default());
        let generation = ctx.begin_load();

        ctx.on_destroyed();

        assert!(!ctx.is_cycle_current(generation));
        assert_eq!(ctx.begin_readiness_cycle(), None);
        assert!(matches!(ctx.inject_overlay(), Err(ShellError::WindowGone)));
    }

    #[test]
    fn test_inject_submits_one_script() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let window = FakeWindow::default();
        ctx.attach(window.clone());

        ctx.inject_overlay().unwrap();

        assert_eq!(window.state().scripts.len(), 1);
        assert!(window.state().scripts[0].contains("mammouth-res-button"));
    }

    #[test]
    fn test_inject_reports_submission_failure() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let window = FakeWindow::default();
        window.state().fail_eval = true;
        ctx.attach(window);

        assert!(matches!(ctx.inject_overlay(), Err(ShellError::Script(_))));
    }
}
