//! Supervisor control operations, status ingestion and error policy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use workvisor::{
    ActiveObject, Context, Fault, State, Status, StatusListener, StopNotice, StopOutcome,
    Supervisor, SupervisorConfig, WorkError,
};

#[derive(Clone)]
enum Step {
    Error(Fault),
    Success(&'static str),
    PauseNetwork(&'static str),
    Unpause,
    NestedWait,
    Fail(Fault),
}

/// Plays its steps, then idles until stopped.
struct Scripted {
    steps: Vec<Step>,
    fatal_on_exit: bool,
}

#[async_trait]
impl ActiveObject for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
        for step in self.steps.clone() {
            let Some(status) = ctx.status() else { break };
            match step {
                Step::Error(fault) => status.error(fault),
                Step::Success(category) => status.success(category),
                Step::PauseNetwork(reason) => status.paused_network(reason),
                Step::Unpause => status.unpaused(),
                Step::NestedWait => {
                    let outer = status.paused_wait("quota");
                    let inner = status.paused_wait("backup window");
                    status.unpaused_with(inner);
                    status.unpaused_with(outer);
                }
                Step::Fail(fault) => return Err(fault.into()),
            }
        }
        while ctx.sleep(Duration::from_millis(100)).await {}
        Ok(())
    }

    async fn exit(&mut self, ctx: &Context) {
        if self.fatal_on_exit {
            if let Some(status) = ctx.status() {
                status.fatal(Fault::new("late failure"));
            }
        }
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<Status>>);

impl Recorder {
    fn states(&self) -> Vec<State> {
        self.0.lock().unwrap().iter().map(|s| s.state).collect()
    }

    fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    fn last(&self) -> Status {
        self.0.lock().unwrap().last().cloned().unwrap()
    }
}

impl StatusListener for Recorder {
    fn on_status(&self, status: &Status) {
        self.0.lock().unwrap().push(status.clone());
    }
}

#[derive(Clone, PartialEq)]
struct Cfg {
    steps: u8,
}

fn supervisor_with(
    created: Arc<AtomicUsize>,
    script: impl Fn(&Cfg) -> Vec<Step> + Send + Sync + 'static,
    fatal_on_exit: bool,
) -> Supervisor<Cfg> {
    Supervisor::builder(
        move |cfg: &Cfg| -> Result<Box<dyn ActiveObject>, Fault> {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Scripted {
                steps: script(cfg),
                fatal_on_exit,
            }))
        },
        Cfg { steps: 0 },
    )
    .with_settings(SupervisorConfig::named("test"))
    .build()
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn reinit_with_same_values_is_noop() {
    let created = Arc::new(AtomicUsize::new(0));
    let sup = supervisor_with(created.clone(), |_| Vec::new(), false);
    let rec = Arc::new(Recorder::default());
    sup.add_listener(rec.clone());

    sup.reinit(true, Cfg { steps: 1 }).await;
    sup.reinit(true, Cfg { steps: 1 }).await;

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(rec.states(), vec![State::Stopped, State::Running]);
    sup.stop(None).await;
}

#[tokio::test(start_paused = true)]
async fn reinit_with_new_config_restarts_running_worker() {
    let created = Arc::new(AtomicUsize::new(0));
    let sup = supervisor_with(created.clone(), |_| Vec::new(), false);
    let rec = Arc::new(Recorder::default());
    sup.add_listener(rec.clone());

    sup.reinit(true, Cfg { steps: 1 }).await;
    sup.reinit(true, Cfg { steps: 2 }).await;

    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert_eq!(sup.config().steps, 2);
    assert_eq!(
        rec.states(),
        vec![State::Stopped, State::Running, State::Stopped, State::Running]
    );

    sup.init(false).await;
    assert!(!sup.is_running());
    assert_eq!(sup.status().state, State::Stopped);
}

#[tokio::test(start_paused = true)]
async fn aborted_supervisor_is_not_restarted_by_reinit() {
    let created = Arc::new(AtomicUsize::new(0));
    let sup = supervisor_with(
        created.clone(),
        |_| vec![Step::Fail(Fault::new("disk full"))],
        false,
    );
    sup.init(true).await;
    wait_for(|| sup.status().state == State::Aborted).await;
    assert!(!sup.is_running());
    assert_eq!(sup.status().reason.as_deref(), Some("disk full"));

    sup.reinit(true, Cfg { steps: 7 }).await;
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(sup.status().state, State::Aborted);
    assert_eq!(sup.stop_outcome(None).await, StopOutcome::WasAborted);
    assert!(sup.stop(None).await);

    // toggling enabled restarts
    sup.init(false).await;
    sup.init(true).await;
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert_eq!(sup.status().state, State::Running);
    assert!(sup.errors().is_empty());
    sup.stop(None).await;
}

#[tokio::test(start_paused = true)]
async fn repeated_error_is_recorded_once() {
    let sup = supervisor_with(
        Arc::new(AtomicUsize::new(0)),
        |_| vec![Step::Error(Fault::new("proxy refused")); 3],
        false,
    );
    let rec = Arc::new(Recorder::default());
    sup.add_listener(rec.clone());
    sup.init(true).await;

    wait_for(|| rec.count() == 5).await;
    assert_eq!(sup.errors().len(), 1);
    assert_eq!(sup.errors()[0].message(), "proxy refused");
    assert!(sup.status().has_errors);
    sup.stop(None).await;
}

#[tokio::test(start_paused = true)]
async fn success_clears_only_its_category() {
    let sup = supervisor_with(
        Arc::new(AtomicUsize::new(0)),
        |_| {
            vec![
                Step::Error(Fault::new("upload failed").with_category("upload")),
                Step::Error(Fault::new("mail failed").with_category("mail")),
                Step::Success("upload"),
                Step::PauseNetwork("marker"),
            ]
        },
        false,
    );
    let rec = Arc::new(Recorder::default());
    sup.add_listener(rec.clone());
    sup.init(true).await;

    wait_for(|| rec.last().state == State::PausedNetwork).await;
    let errors: Vec<String> = sup.errors().iter().map(|f| f.to_string()).collect();
    assert_eq!(errors, vec!["mail failed".to_string()]);
    // snapshot, RUNNING, error, error, paused: success published nothing
    assert_eq!(rec.count(), 5);
    sup.stop(None).await;
}

#[tokio::test(start_paused = true)]
async fn success_emptying_the_set_republishes() {
    let sup = supervisor_with(
        Arc::new(AtomicUsize::new(0)),
        |_| {
            vec![
                Step::Error(Fault::new("upload failed").with_category("upload")),
                Step::Success("upload"),
                Step::Success("upload"),
            ]
        },
        false,
    );
    let rec = Arc::new(Recorder::default());
    sup.add_listener(rec.clone());
    sup.init(true).await;

    wait_for(|| rec.count() == 4).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(rec.count(), 4);
    let last = rec.last();
    assert_eq!(last.state, State::Running);
    assert!(!last.has_errors);
    sup.stop(None).await;
}

#[tokio::test(start_paused = true)]
async fn pause_tokens_restore_previous_state() {
    let sup = supervisor_with(
        Arc::new(AtomicUsize::new(0)),
        |_| {
            vec![
                Step::PauseNetwork("offline"),
                Step::NestedWait,
                Step::Unpause,
            ]
        },
        false,
    );
    let rec = Arc::new(Recorder::default());
    sup.add_listener(rec.clone());
    sup.init(true).await;

    wait_for(|| rec.count() == 8).await;
    let seen: Vec<(State, Option<String>)> = rec
        .0
        .lock()
        .unwrap()
        .iter()
        .map(|s| (s.state, s.reason.as_deref().map(str::to_string)))
        .collect();
    assert_eq!(
        seen,
        vec![
            (State::Stopped, None),
            (State::Running, None),
            (State::PausedNetwork, Some("offline".into())),
            (State::PausedWait, Some("quota".into())),
            (State::PausedWait, Some("backup window".into())),
            (State::PausedWait, Some("quota".into())),
            (State::PausedNetwork, Some("offline".into())),
            (State::Running, None),
        ]
    );
    sup.stop(None).await;
}

#[tokio::test(start_paused = true)]
async fn clear_errors_keeps_fatal_while_enabled() {
    let sup = supervisor_with(
        Arc::new(AtomicUsize::new(0)),
        |_| {
            vec![
                Step::Error(Fault::new("soft")),
                Step::Fail(Fault::new("hard")),
            ]
        },
        false,
    );
    sup.init(true).await;
    wait_for(|| sup.status().state == State::Aborted).await;
    assert_eq!(sup.errors().len(), 2);

    sup.clear_errors();
    let errors: Vec<String> = sup.errors().iter().map(|f| f.to_string()).collect();
    assert_eq!(errors, vec!["hard".to_string()]);
    assert_eq!(sup.status().state, State::Aborted);

    sup.init(false).await;
    sup.clear_errors();
    assert!(sup.errors().is_empty());
    assert_eq!(sup.status().state, State::Stopped);
}

#[tokio::test(start_paused = true)]
async fn factory_failure_aborts_with_fault() {
    let sup: Supervisor<u8> = Supervisor::builder(
        |_: &u8| -> Result<Box<dyn ActiveObject>, Fault> { Err(Fault::new("no credentials")) },
        0,
    )
    .build();
    let rec = Arc::new(Recorder::default());
    sup.add_listener(rec.clone());

    sup.init(true).await;
    assert_eq!(rec.states(), vec![State::Stopped, State::Aborted]);
    assert_eq!(sup.errors()[0].message(), "no credentials");
}

#[tokio::test(start_paused = true)]
async fn fatal_during_stop_ends_stopped() {
    let sup = supervisor_with(Arc::new(AtomicUsize::new(0)), |_| Vec::new(), true);
    sup.init(true).await;
    assert!(sup.stop(None).await);

    assert_eq!(sup.status().state, State::Stopped);
    assert_eq!(sup.errors()[0].message(), "late failure");
}

#[tokio::test(start_paused = true)]
async fn removed_listener_hears_nothing() {
    let sup = supervisor_with(Arc::new(AtomicUsize::new(0)), |_| Vec::new(), false);
    let rec = Arc::new(Recorder::default());
    let id = sup.add_listener(rec.clone());
    assert!(sup.remove_listener(id));
    assert!(!sup.remove_listener(id));

    sup.init(true).await;
    sup.stop(None).await;
    assert_eq!(rec.states(), vec![State::Stopped]);
}

struct SlowExit;

#[async_trait]
impl ActiveObject for SlowExit {
    fn name(&self) -> &str {
        "slow-exit"
    }

    async fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
        while ctx.sleep(Duration::from_secs(1)).await {}
        Ok(())
    }

    async fn exit(&mut self, _ctx: &Context) {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

#[derive(Default)]
struct Notices {
    waiting: AtomicUsize,
    done: AtomicUsize,
}

impl StopNotice for Notices {
    fn waiting(&self, worker: &str) {
        assert_eq!(worker, "slow-exit");
        self.waiting.fetch_add(1, Ordering::SeqCst);
    }

    fn done(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn slow_stop_notifies_waiter() {
    let sup: Supervisor<u8> = Supervisor::builder(
        |_: &u8| -> Result<Box<dyn ActiveObject>, Fault> { Ok(Box::new(SlowExit)) },
        0,
    )
    .build();
    sup.init(true).await;

    let notices = Notices::default();
    assert!(sup.stop(Some(&notices)).await);
    assert_eq!(notices.waiting.load(Ordering::SeqCst), 1);
    assert_eq!(notices.done.load(Ordering::SeqCst), 1);
    assert!(!sup.is_running());
}
