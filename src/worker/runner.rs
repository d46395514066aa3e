//! # Spawning and stopping active objects.
//!
//! [`spawn`] moves an [`ActiveObject`] into its own tokio task and returns an
//! [`ActiveHandle`]. The task drives `init → run → exit`, catching panics so `exit`
//! always runs and the exit notification always fires.
//!
//! ## Reporting
//! ```text
//! init/run Ok                     → debug log
//! Err(Stopped) or while stopping  → debug log (a stop is not a failure)
//! any other Err / panic           → error log + ThreadStatus::fatal(fault)
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::error::{Fault, RuntimeError, WorkError, panic_message};
use crate::status::ThreadStatus;
use crate::worker::{ActiveObject, Context, Phase, StopSignal};

/// Receives a notification when a stop takes longer than the grace period.
pub trait StopNotice: Send + Sync {
    /// The worker has not exited yet; called at most once per stop.
    fn waiting(&self, worker: &str);

    /// The worker exited after `waiting` was called.
    fn done(&self) {}
}

/// Handle to a spawned active object (cheap to clone).
#[derive(Clone)]
pub struct ActiveHandle {
    name: Arc<str>,
    signal: StopSignal,
    exited: CancellationToken,
}

impl ActiveHandle {
    /// Name of the active object.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once `exit` returned (or the task died).
    pub fn is_finished(&self) -> bool {
        self.exited.is_cancelled()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.signal.phase()
    }

    /// Requests a stop without waiting. Returns true if this call initiated it.
    pub fn signal_stop(&self) -> bool {
        self.signal.request()
    }

    /// Waits until the object fully exited.
    pub async fn join(&self) {
        self.exited.cancelled().await;
    }

    /// Requests a stop and waits until the object fully exited.
    ///
    /// Repeated or concurrent calls all return only after the exit.
    /// When `notice` is given and the exit takes longer than `grace`,
    /// `notice.waiting()` is called once, and `notice.done()` after the exit.
    pub async fn request_stop(&self, notice: Option<(&dyn StopNotice, Duration)>) {
        self.signal.request();
        match notice {
            None => self.join().await,
            Some((notice, grace)) => {
                if tokio::time::timeout(grace, self.join()).await.is_err() {
                    tracing::info!(worker = %self.name, ?grace, "waiting for worker to stop");
                    notice.waiting(&self.name);
                    self.join().await;
                    notice.done();
                }
            }
        }
    }
}

/// Spawns `object` on the current tokio runtime.
///
/// Must be called from within a tokio runtime. `span` is entered for everything the
/// object logs; `status` receives a fatal report if `init`/`run` fail.
pub fn spawn<T: ActiveObject>(
    object: T,
    status: Option<Arc<dyn ThreadStatus>>,
    span: Span,
) -> ActiveHandle {
    spawn_boxed(Box::new(object), status, span)
}

/// Like [`spawn`], for an already boxed object.
pub fn spawn_boxed(
    mut object: Box<dyn ActiveObject>,
    status: Option<Arc<dyn ThreadStatus>>,
    span: Span,
) -> ActiveHandle {
    let name: Arc<str> = Arc::from(object.name());
    let signal = StopSignal::new(object.stop_hook());
    let exited = CancellationToken::new();
    let ctx = Context::new(name.clone(), signal.clone(), status);

    let exit_guard = exited.clone().drop_guard();
    let fut = async move {
        let _exit_guard = exit_guard;
        lifecycle(object.as_mut(), &ctx).await;
    };
    tokio::spawn(fut.instrument(span));

    ActiveHandle {
        name,
        signal,
        exited,
    }
}

/// Drives one object through its lifecycle.
async fn lifecycle(object: &mut dyn ActiveObject, ctx: &Context) {
    ctx.signal().set_phase(Phase::Initializing);
    tracing::debug!(worker = ctx.name(), "init");

    match guarded(ctx.name(), object.init(ctx)).await {
        Ok(()) => {
            if ctx.signal().enter_running() {
                tracing::debug!(worker = ctx.name(), "run");
                let res = guarded(ctx.name(), object.run(ctx)).await;
                report(ctx, "run", res);
            } else {
                tracing::debug!(worker = ctx.name(), "stopped before run");
            }
        }
        Err(e) => report(ctx, "init", Err(e)),
    }

    ctx.signal().set_phase(Phase::Exiting);
    if let Err(panic_err) = AssertUnwindSafe(object.exit(ctx)).catch_unwind().await {
        tracing::error!(
            worker = ctx.name(),
            panic = %panic_message(panic_err.as_ref()),
            "exit panicked"
        );
    }
    ctx.signal().set_phase(Phase::Exited);
    tracing::debug!(worker = ctx.name(), "exited");
}

/// Awaits `fut`, converting a panic into a fault.
async fn guarded<F>(name: &str, fut: F) -> Result<(), WorkError>
where
    F: std::future::Future<Output = Result<(), WorkError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic_err) => {
            let err = RuntimeError::WorkerPanicked {
                name: name.to_string(),
                info: panic_message(panic_err.as_ref()),
            };
            Err(WorkError::Fault(Fault::from_error(err)))
        }
    }
}

fn report(ctx: &Context, stage: &'static str, res: Result<(), WorkError>) {
    match res {
        Ok(()) => tracing::debug!(worker = ctx.name(), stage, "finished"),
        Err(WorkError::Stopped) => tracing::debug!(worker = ctx.name(), stage, "stopped"),
        Err(e) if ctx.is_stopping() => {
            tracing::debug!(worker = ctx.name(), stage, error = %e, "failed while stopping");
        }
        Err(e) => {
            tracing::error!(
                worker = ctx.name(),
                stage,
                label = e.as_label(),
                error = %e,
                "worker failed"
            );
            if let Some(status) = ctx.status() {
                status.fatal(e.into_fault());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Trace(Mutex<Vec<&'static str>>);

    impl Trace {
        fn push(&self, s: &'static str) {
            self.0.lock().unwrap().push(s);
        }
        fn get(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Looper {
        trace: Arc<Trace>,
        fail_init: bool,
        fail_run: bool,
    }

    #[async_trait]
    impl ActiveObject for Looper {
        fn name(&self) -> &str {
            "looper"
        }

        async fn init(&mut self, _ctx: &Context) -> Result<(), WorkError> {
            self.trace.push("init");
            if self.fail_init {
                return Err(Fault::new("no resources").into());
            }
            Ok(())
        }

        async fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
            self.trace.push("run");
            if self.fail_run {
                return Err(Fault::new("broken").into());
            }
            while ctx.sleep(Duration::from_secs(1)).await {}
            Ok(())
        }

        async fn exit(&mut self, _ctx: &Context) {
            self.trace.push("exit");
        }
    }

    #[derive(Default)]
    struct FatalSink {
        fatal: Mutex<Vec<String>>,
    }

    impl ThreadStatus for FatalSink {
        fn paused_network(&self, _reason: &str) {}
        fn paused_wait(&self, _reason: &str) -> crate::PauseToken {
            crate::PauseToken::new(crate::State::Running, None)
        }
        fn unpaused(&self) {}
        fn unpaused_with(&self, _token: crate::PauseToken) {}
        fn error(&self, _fault: Fault) {}
        fn fatal(&self, fault: Fault) {
            self.fatal.lock().unwrap().push(fault.to_string());
        }
        fn success(&self, _category: &str) {}
    }

    fn looper(trace: &Arc<Trace>, fail_init: bool, fail_run: bool) -> Looper {
        Looper {
            trace: trace.clone(),
            fail_init,
            fail_run,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_runs_exit_once() {
        let trace = Arc::new(Trace::default());
        let handle = spawn(looper(&trace, false, false), None, Span::none());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(handle.phase(), Phase::Running);

        handle.request_stop(None).await;
        handle.request_stop(None).await;

        assert!(handle.is_finished());
        assert_eq!(handle.phase(), Phase::Exited);
        assert_eq!(trace.get(), vec!["init", "run", "exit"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stops_all_wait_for_exit() {
        let trace = Arc::new(Trace::default());
        let handle = spawn(looper(&trace, false, false), None, Span::none());
        tokio::time::sleep(Duration::from_millis(10)).await;

        let a = handle.clone();
        let b = handle.clone();
        let (_, _) = tokio::join!(a.request_stop(None), b.request_stop(None));
        assert!(a.is_finished());
        assert!(b.is_finished());
        assert_eq!(trace.get().iter().filter(|s| **s == "exit").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_failure_skips_run_and_reports_fatal() {
        let trace = Arc::new(Trace::default());
        let sink = Arc::new(FatalSink::default());
        let handle = spawn(
            looper(&trace, true, false),
            Some(sink.clone() as Arc<dyn ThreadStatus>),
            Span::none(),
        );
        handle.join().await;

        assert_eq!(trace.get(), vec!["init", "exit"]);
        assert_eq!(*sink.fatal.lock().unwrap(), vec!["no resources".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_failure_reports_fatal() {
        let trace = Arc::new(Trace::default());
        let sink = Arc::new(FatalSink::default());
        let handle = spawn(
            looper(&trace, false, true),
            Some(sink.clone() as Arc<dyn ThreadStatus>),
            Span::none(),
        );
        handle.join().await;

        assert_eq!(trace.get(), vec!["init", "run", "exit"]);
        assert_eq!(*sink.fatal.lock().unwrap(), vec!["broken".to_string()]);
    }

    struct Panicker;

    #[async_trait]
    impl ActiveObject for Panicker {
        fn name(&self) -> &str {
            "panicker"
        }

        async fn run(&mut self, _ctx: &Context) -> Result<(), WorkError> {
            panic!("kaboom");
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_fatal_and_exit_fires() {
        let sink = Arc::new(FatalSink::default());
        let handle = spawn(
            Panicker,
            Some(sink.clone() as Arc<dyn ThreadStatus>),
            Span::none(),
        );
        handle.join().await;

        let fatal = sink.fatal.lock().unwrap().clone();
        assert_eq!(fatal.len(), 1);
        assert!(fatal[0].contains("kaboom"), "{fatal:?}");
    }

    /// Blocks in a "foreign" call that only the stop hook can interrupt.
    struct Blocker {
        release: Arc<tokio::sync::Notify>,
        hooked: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ActiveObject for Blocker {
        fn name(&self) -> &str {
            "blocker"
        }

        async fn run(&mut self, _ctx: &Context) -> Result<(), WorkError> {
            self.release.notified().await;
            Err(Fault::new("interrupted").into())
        }

        fn stop_hook(&self) -> Option<crate::StopHook> {
            let release = self.release.clone();
            let hooked = self.hooked.clone();
            Some(Arc::new(move || {
                hooked.store(true, Ordering::SeqCst);
                release.notify_one();
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_hook_unblocks_run_without_fatal() {
        let sink = Arc::new(FatalSink::default());
        let hooked = Arc::new(AtomicBool::new(false));
        let handle = spawn(
            Blocker {
                release: Arc::new(tokio::sync::Notify::new()),
                hooked: hooked.clone(),
            },
            Some(sink.clone() as Arc<dyn ThreadStatus>),
            Span::none(),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;

        handle.request_stop(None).await;
        assert!(hooked.load(Ordering::SeqCst));
        // the error came from the interrupted call, not from a real failure
        assert!(sink.fatal.lock().unwrap().is_empty());
    }

    struct Slow;

    #[async_trait]
    impl ActiveObject for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn run(&mut self, _ctx: &Context) -> Result<(), WorkError> {
            // ignores the stop for a while
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountNotice {
        waiting: AtomicUsize,
        done: AtomicUsize,
    }

    impl StopNotice for CountNotice {
        fn waiting(&self, worker: &str) {
            assert_eq!(worker, "slow");
            self.waiting.fetch_add(1, Ordering::SeqCst);
        }
        fn done(&self) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_notice_after_grace() {
        let handle = spawn(Slow, None, Span::none());
        tokio::time::sleep(Duration::from_millis(10)).await;

        let notice = CountNotice::default();
        let as_dyn: &dyn StopNotice = &notice;
        handle
            .request_stop(Some((as_dyn, Duration::from_millis(500))))
            .await;
        assert_eq!(notice.waiting.load(Ordering::SeqCst), 1);
        assert_eq!(notice.done.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
    }
}
