//! Readiness poller
//!
//! After a page finishes loading, the remote DOM is polled until it looks
//! usable (an input and an app root exist) before the overlay goes in. The
//! loop is a bounded-retry state machine (`ReadinessPoller`) driven by
//! `run_cycle` against a `PageProbe`, which supplies liveness, evaluation,
//! timers and the injection itself.
//!
//! The predicate result comes back through the webview's own evaluation
//! callback, never through an IPC command, so page code has no way to
//! answer on the host's behalf.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::oneshot;

use crate::config::{
    INITIAL_PROBE_DELAY, MAX_PROBE_ATTEMPTS, PROBE_REPLY_TIMEOUT, PROBE_RETRY_DELAY,
};
use crate::controller::{AppContext, ShellWindow};
use crate::error::ShellError;

/// True once the chat input and the application root are both in the DOM
pub const READY_PREDICATE: &str = "!!(document.querySelector('textarea, input:not([type=\"hidden\"]), [contenteditable=\"true\"]') && document.querySelector('#__nuxt, #__next, #app, #root'))";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimings {
    pub initial_delay: Duration,
    pub retry_delay: Duration,
    pub max_attempts: u32,
    pub probe_timeout: Duration,
}

impl Default for PollTimings {
    fn default() -> Self {
        Self {
            initial_delay: INITIAL_PROBE_DELAY,
            retry_delay: PROBE_RETRY_DELAY,
            max_attempts: MAX_PROBE_ATTEMPTS,
            probe_timeout: PROBE_REPLY_TIMEOUT,
        }
    }
}

/// Why the overlay was injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectReason {
    /// The predicate held
    Confirmed,
    /// Retries ran out; the page is assumed good enough
    AttemptsExhausted,
    /// The probe itself failed (navigation, teardown, no reply)
    ProbeFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Inject(InjectReason),
    Retry,
}

/// Bounded-retry state machine. Terminal once it has returned `Inject`.
#[derive(Debug)]
pub struct ReadinessPoller {
    attempts: u32,
    max_attempts: u32,
    done: bool,
}

impl ReadinessPoller {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            done: false,
        }
    }

    /// Retries consumed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one probe result.
    pub fn observe(&mut self, probe: Result<bool, ShellError>) -> PollStep {
        let step = match probe {
            Ok(true) => PollStep::Inject(InjectReason::Confirmed),
            Ok(false) if self.attempts < self.max_attempts => {
                self.attempts += 1;
                PollStep::Retry
            }
            Ok(false) => PollStep::Inject(InjectReason::AttemptsExhausted),
            Err(e) => {
                warn!("[readiness] Probe failed, injecting now: {}", e);
                PollStep::Inject(InjectReason::ProbeFailed)
            }
        };
        if matches!(step, PollStep::Inject(_)) {
            self.done = true;
        }
        step
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Injected(InjectReason),
    /// The window went away or a newer load took over
    Aborted,
}

/// The page side of one readiness cycle
pub trait PageProbe {
    /// Window still open and this cycle still the current one
    fn is_alive(&self) -> bool;
    fn evaluate(&self, predicate: &str) -> impl Future<Output = Result<bool, ShellError>> + Send;
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
    fn inject(&self) -> Result<(), ShellError>;
}

/// Run one cycle: initial delay, probe/retry, then a single injection.
pub async fn run_cycle<P: PageProbe>(page: &P, timings: &PollTimings) -> CycleOutcome {
    page.sleep(timings.initial_delay).await;

    let mut poller = ReadinessPoller::new(timings.max_attempts);
    loop {
        if !page.is_alive() {
            debug!("[readiness] Window gone before probe, aborting cycle");
            return CycleOutcome::Aborted;
        }

        let probe = page.evaluate(READY_PREDICATE).await;

        if !page.is_alive() {
            debug!("[readiness] Window gone after probe, aborting cycle");
            return CycleOutcome::Aborted;
        }

        match poller.observe(probe) {
            PollStep::Retry => {
                debug!(
                    "[readiness] Page not ready (attempt {}/{})",
                    poller.attempts(),
                    timings.max_attempts
                );
                page.sleep(timings.retry_delay).await;
            }
            PollStep::Inject(reason) => {
                info!("[readiness] Injecting overlay ({:?})", reason);
                if let Err(e) = page.inject() {
                    error!("[readiness] Overlay injection failed: {}", e);
                }
                return CycleOutcome::Injected(reason);
            }
        }
    }
}

/// Expression evaluating `predicate` in the page. Any exception counts as
/// not ready; some webviews drop the result of a throwing script entirely.
pub fn probe_expression(predicate: &str) -> String {
    format!("(function () {{ try {{ return !!({predicate}); }} catch (e) {{ return false; }} }})()")
}

/// The page hands the value back as JSON
fn parse_probe_result(json: &str) -> Result<bool, ShellError> {
    serde_json::from_str(json.trim())
        .map_err(|_| ShellError::Script(format!("unexpected probe result: {}", json)))
}

/// `PageProbe` backed by the application context
pub struct ContextProbe<W> {
    ctx: Arc<AppContext<W>>,
    generation: u64,
    probe_timeout: Duration,
}

impl<W: ShellWindow> ContextProbe<W> {
    pub fn new(ctx: Arc<AppContext<W>>, generation: u64, probe_timeout: Duration) -> Self {
        Self {
            ctx,
            generation,
            probe_timeout,
        }
    }
}

impl<W: ShellWindow> PageProbe for ContextProbe<W> {
    fn is_alive(&self) -> bool {
        self.ctx.is_cycle_current(self.generation)
    }

    async fn evaluate(&self, predicate: &str) -> Result<bool, ShellError> {
        let window = self.ctx.window()?;
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));

        window.eval_with_callback(&probe_expression(predicate), move |json| {
            if let Some(tx) = tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
                let _ = tx.send(json);
            }
        })?;

        match tokio::time::timeout(self.probe_timeout, rx).await {
            Ok(Ok(json)) => parse_probe_result(&json),
            Ok(Err(_)) => Err(ShellError::Script("probe result dropped".to_string())),
            Err(_) => Err(ShellError::ProbeTimeout(self.probe_timeout)),
        }
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn inject(&self) -> Result<(), ShellError> {
        self.ctx.inject_overlay()?;
        self.ctx.mark_ready(self.generation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use tempfile::TempDir;

    use super::*;
    use crate::controller::testing::FakeWindow;
    use crate::preferences::PreferenceStore;

    /// Scripted page with a simulated clock
    struct FakePage {
        answers: Mutex<Vec<Result<bool, ShellError>>>,
        alive: AtomicBool,
        /// Window disappears while this evaluation (1-based) is in flight
        dies_during_eval: Option<usize>,
        evaluations: Mutex<usize>,
        injections: Mutex<usize>,
        clock: Mutex<Duration>,
    }

    impl FakePage {
        fn new(answers: Vec<Result<bool, ShellError>>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().rev().collect()),
                alive: AtomicBool::new(true),
                dies_during_eval: None,
                evaluations: Mutex::new(0),
                injections: Mutex::new(0),
                clock: Mutex::new(Duration::ZERO),
            }
        }

        fn never_ready() -> Self {
            Self::new((0..10).map(|_| Ok(false)).collect())
        }

        fn evaluations(&self) -> usize {
            *self.evaluations.lock().unwrap()
        }

        fn injections(&self) -> usize {
            *self.injections.lock().unwrap()
        }

        fn elapsed(&self) -> Duration {
            *self.clock.lock().unwrap()
        }
    }

    impl PageProbe for FakePage {
        fn is_alive(&self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }

        async fn evaluate(&self, _predicate: &str) -> Result<bool, ShellError> {
            let n = {
                let mut evaluations = self.evaluations.lock().unwrap();
                *evaluations += 1;
                *evaluations
            };
            if self.dies_during_eval == Some(n) {
                self.alive.store(false, Ordering::SeqCst);
            }
            self.answers.lock().unwrap().pop().unwrap_or(Ok(false))
        }

        async fn sleep(&self, duration: Duration) {
            *self.clock.lock().unwrap() += duration;
        }

        fn inject(&self) -> Result<(), ShellError> {
            *self.injections.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_poller_confirms_immediately() {
        let mut poller = ReadinessPoller::new(3);
        assert_eq!(poller.observe(Ok(true)), PollStep::Inject(InjectReason::Confirmed));
        assert!(poller.is_done());
        assert_eq!(poller.attempts(), 0);
    }

    #[test]
    fn test_poller_forces_after_max_attempts() {
        let mut poller = ReadinessPoller::new(3);
        for attempt in 1..=3 {
            assert_eq!(poller.observe(Ok(false)), PollStep::Retry);
            assert_eq!(poller.attempts(), attempt);
        }
        assert_eq!(
            poller.observe(Ok(false)),
            PollStep::Inject(InjectReason::AttemptsExhausted)
        );
        assert!(poller.is_done());
    }

    #[test]
    fn test_poller_forces_on_probe_error() {
        let mut poller = ReadinessPoller::new(3);
        assert_eq!(poller.observe(Ok(false)), PollStep::Retry);
        assert_eq!(
            poller.observe(Err(ShellError::WindowGone)),
            PollStep::Inject(InjectReason::ProbeFailed)
        );
    }

    #[tokio::test]
    async fn test_cycle_confirmed_on_first_probe() {
        let page = FakePage::new(vec![Ok(true)]);

        let outcome = run_cycle(&page, &PollTimings::default()).await;

        assert_eq!(outcome, CycleOutcome::Injected(InjectReason::Confirmed));
        assert_eq!(page.injections(), 1);
        assert_eq!(page.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_cycle_bounded_when_never_ready() {
        let page = FakePage::never_ready();

        let outcome = run_cycle(&page, &PollTimings::default()).await;

        assert_eq!(outcome, CycleOutcome::Injected(InjectReason::AttemptsExhausted));
        assert_eq!(page.injections(), 1);
        assert_eq!(page.evaluations(), 4);
        assert_eq!(page.elapsed(), Duration::from_millis(1400));
    }

    #[tokio::test]
    async fn test_cycle_ready_after_retries() {
        let page = FakePage::new(vec![Ok(false), Ok(false), Ok(true)]);

        let outcome = run_cycle(&page, &PollTimings::default()).await;

        assert_eq!(outcome, CycleOutcome::Injected(InjectReason::Confirmed));
        assert_eq!(page.injections(), 1);
        assert_eq!(page.elapsed(), Duration::from_millis(1100));
    }

    #[tokio::test]
    async fn test_cycle_forces_on_probe_error() {
        let page = FakePage::new(vec![Ok(false), Err(ShellError::Script("navigated".into()))]);

        let outcome = run_cycle(&page, &PollTimings::default()).await;

        assert_eq!(outcome, CycleOutcome::Injected(InjectReason::ProbeFailed));
        assert_eq!(page.injections(), 1);
        assert_eq!(page.evaluations(), 2);
    }

    #[tokio::test]
    async fn test_cycle_aborts_when_window_dies_mid_probe() {
        let mut page = FakePage::never_ready();
        page.dies_during_eval = Some(2);

        let outcome = run_cycle(&page, &PollTimings::default()).await;

        assert_eq!(outcome, CycleOutcome::Aborted);
        assert_eq!(page.injections(), 0);
        assert_eq!(page.evaluations(), 2);
    }

    #[tokio::test]
    async fn test_cycle_aborts_when_window_gone_before_first_probe() {
        let page = FakePage::never_ready();
        page.alive.store(false, Ordering::SeqCst);

        assert_eq!(run_cycle(&page, &PollTimings::default()).await, CycleOutcome::Aborted);
        assert_eq!(page.evaluations(), 0);
        assert_eq!(page.injections(), 0);
    }

    #[test]
    fn test_readiness_expression_never_throws() {
        let script = probe_expression(READY_PREDICATE);
        assert!(script.contains("try { return !!("));
        assert!(script.contains("catch (e) { return false; }"));
        assert!(script.contains("#__nuxt"));
        assert!(!script.contains("invoke"));
    }

    #[test]
    fn test_readiness_result_parsing() {
        assert!(parse_probe_result("true").unwrap());
        assert!(!parse_probe_result("false\n").unwrap());
        for junk in ["null", "\"true\"", "", "{}"] {
            assert!(matches!(parse_probe_result(junk), Err(ShellError::Script(_))), "{junk}");
        }
    }

    fn live_context(dir: &TempDir) -> (Arc<AppContext<FakeWindow>>, FakeWindow, u64) {
        let ctx = Arc::new(AppContext::new(PreferenceStore::in_dir(dir.path())));
        let window = FakeWindow::default();
        ctx.attach(window.clone());
        let generation = ctx.begin_load();
        (ctx, window, generation)
    }

    #[tokio::test]
    async fn test_context_reads_evaluation_result() {
        let dir = TempDir::new().unwrap();
        let (ctx, window, generation) = live_context(&dir);
        window.state().eval_result = Some("true".to_string());
        let probe = ContextProbe::new(ctx.clone(), generation, Duration::from_secs(5));

        assert!(probe.evaluate(READY_PREDICATE).await.unwrap());

        window.state().eval_result = Some("false".to_string());
        assert!(!probe.evaluate(READY_PREDICATE).await.unwrap());
        assert_eq!(window.state().scripts.len(), 2);
    }

    #[tokio::test]
    async fn test_context_waits_for_late_result() {
        let dir = TempDir::new().unwrap();
        let (ctx, window, generation) = live_context(&dir);
        let probe = ContextProbe::new(ctx.clone(), generation, Duration::from_secs(5));

        let page = {
            let window = window.clone();
            tokio::spawn(async move {
                while window.answer("true") == 0 {
                    tokio::task::yield_now().await;
                }
            })
        };

        assert!(probe.evaluate(READY_PREDICATE).await.unwrap());
        page.await.unwrap();
    }

    #[tokio::test]
    async fn test_context_times_out_without_result() {
        let dir = TempDir::new().unwrap();
        let (ctx, window, generation) = live_context(&dir);
        let probe = ContextProbe::new(ctx.clone(), generation, Duration::from_millis(10));

        let result = probe.evaluate(READY_PREDICATE).await;

        assert!(matches!(result, Err(ShellError::ProbeTimeout(_))));
        // A result arriving after the timeout goes nowhere
        assert_eq!(window.answer("true"), 1);
    }

    #[tokio::test]
    async fn test_context_rejects_non_boolean_result() {
        let dir = TempDir::new().unwrap();
        let (ctx, window, generation) = live_context(&dir);
        window.state().eval_result = Some("{\"ready\":true}".to_string());
        let probe = ContextProbe::new(ctx.clone(), generation, Duration::from_secs(5));

        assert!(matches!(
            probe.evaluate(READY_PREDICATE).await,
            Err(ShellError::Script(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_cycle_never_submits_overlay() {
        let dir = TempDir::new().unwrap();
        let (ctx, window, generation) = live_context(&dir);
        let probe = ContextProbe::new(ctx.clone(), generation, Duration::from_millis(10));

        ctx.on_destroyed();
        let timings = PollTimings {
            initial_delay: Duration::from_millis(1),
            retry_delay: Duration::from_millis(1),
            ..PollTimings::default()
        };

        assert_eq!(run_cycle(&probe, &timings).await, CycleOutcome::Aborted);
        assert!(window.state().scripts.is_empty());
    }

    #[tokio::test]
    async fn test_failed_submission_still_ends_cycle() {
        let dir = TempDir::new().unwrap();
        let (ctx, window, generation) = live_context(&dir);
        window.state().fail_eval = true;
        let probe = ContextProbe::new(ctx.clone(), generation, Duration::from_millis(10));
        let timings = PollTimings {
            initial_delay: Duration::from_millis(1),
            ..PollTimings::default()
        };

        let outcome = run_cycle(&probe, &timings).await;

        assert_eq!(outcome, CycleOutcome::Injected(InjectReason::ProbeFailed));
        assert!(window.state().scripts.is_empty());
        assert!(ctx.is_live());
    }
}
