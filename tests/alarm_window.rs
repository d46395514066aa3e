//! Alarm debouncing over time, standalone and wired to a supervisor.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use workvisor::{
    ActiveObject, AlarmConfig, AlarmDebouncer, AlarmListener, AlarmStatus, Context, Fault, State,
    Status, Supervisor, WorkError,
};

const MIN: Duration = Duration::from_secs(60);

fn ninety_fifty() -> AlarmConfig {
    AlarmConfig {
        enabled: true,
        window: 90 * MIN,
        percent: 50,
    }
}

fn degraded() -> Status {
    Status::new(State::Running).with_errors(true)
}

#[test]
fn continuous_error_trips_at_threshold_and_ages_out() {
    let alarm = AlarmDebouncer::new(ninety_fifty());
    let t0 = Instant::now();

    alarm.on_status_at(&degraded(), t0);
    alarm.ping_at(t0 + 44 * MIN);
    let now = alarm.current().unwrap();
    assert!(!now.show);
    assert!(!now.tripped);

    alarm.ping_at(t0 + 45 * MIN);
    let now = alarm.current().unwrap();
    assert!(now.show);
    assert!(now.tripped);

    // healthy again right after tripping
    let healed = t0 + 45 * MIN + Duration::from_secs(1);
    alarm.on_status_at(&Status::new(State::Running), healed);
    let now = alarm.current().unwrap();
    assert!(now.show, "a healthy status is shown as is");
    assert!(now.tripped, "the window still holds 45 minutes of error");

    alarm.ping_at(t0 + 90 * MIN);
    assert!(alarm.current().unwrap().tripped);

    alarm.ping_at(t0 + 135 * MIN);
    assert!(!alarm.current().unwrap().tripped);
}

#[test]
fn flapping_errors_accumulate() {
    let alarm = AlarmDebouncer::new(ninety_fifty());
    let t0 = Instant::now();

    // 20 minutes of error, 5 healthy, 20 more, 5 healthy, 5 more
    let mut t = t0;
    for (error, len) in [(true, 20), (false, 5), (true, 20), (false, 5), (true, 5)] {
        let status = if error {
            degraded()
        } else {
            Status::new(State::Running)
        };
        alarm.on_status_at(&status, t);
        t += len * MIN;
    }
    alarm.ping_at(t);
    let now = alarm.current().unwrap();
    assert!(now.tripped);
    assert!(now.show);
}

#[test]
fn stopped_discards_history() {
    let alarm = AlarmDebouncer::new(ninety_fifty());
    let t0 = Instant::now();

    alarm.on_status_at(&Status::new(State::PausedNetwork), t0);
    alarm.ping_at(t0 + 60 * MIN);
    assert!(alarm.current().unwrap().tripped);

    alarm.on_status_at(&Status::new(State::Stopped), t0 + 60 * MIN);
    let now = alarm.current().unwrap();
    assert!(now.show);
    assert!(!now.tripped);

    alarm.on_status_at(&Status::new(State::Running), t0 + 61 * MIN);
    let now = alarm.current().unwrap();
    assert!(now.show);
    assert!(!now.tripped);

    alarm.on_status_at(&degraded(), t0 + 62 * MIN);
    let now = alarm.current().unwrap();
    assert!(!now.show, "a fresh window starts without error time");
    assert!(!now.tripped);
}

#[test]
fn paused_wait_is_not_an_error() {
    let alarm = AlarmDebouncer::new(ninety_fifty());
    let t0 = Instant::now();
    alarm.on_status_at(&Status::new(State::PausedWait), t0);
    alarm.ping_at(t0 + 80 * MIN);
    let now = alarm.current().unwrap();
    assert!(now.show);
    assert!(!now.tripped);
}

#[derive(Default)]
struct Shown(Mutex<Vec<(State, bool)>>);

impl AlarmListener for Shown {
    fn on_alarm(&self, alarm: &AlarmStatus) {
        self.0.lock().unwrap().push((alarm.status.state, alarm.show));
    }
}

/// Reports a network pause and stays paused.
struct Offline;

#[async_trait]
impl ActiveObject for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    async fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
        if let Some(status) = ctx.status() {
            status.paused_network("no route to host");
        }
        while ctx.sleep(Duration::from_secs(30)).await {}
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn debouncer_smooths_supervisor_status() {
    let alarm = Arc::new(AlarmDebouncer::new(AlarmConfig {
        enabled: true,
        window: 10 * MIN,
        percent: 50,
    }));
    let shown = Arc::new(Shown::default());
    alarm.add_listener(shown.clone());

    let sup: Supervisor<u8> = Supervisor::builder(
        |_: &u8| -> Result<Box<dyn ActiveObject>, Fault> { Ok(Box::new(Offline)) },
        0,
    )
    .build();
    let id = sup.add_listener(alarm.clone());
    sup.init(true).await;

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(alarm.current().unwrap().status.state, State::PausedNetwork);
    assert!(!alarm.current().unwrap().show);

    let token = tokio_util::sync::CancellationToken::new();
    let pinger = alarm.spawn_pinger(MIN, token.clone());
    tokio::time::sleep(6 * MIN).await;
    assert!(alarm.current().unwrap().show);

    token.cancel();
    pinger.await.unwrap();
    sup.stop(None).await;
    assert!(sup.remove_listener(id));

    assert_eq!(
        *shown.0.lock().unwrap(),
        vec![
            (State::Stopped, true),
            (State::Running, true),
            (State::PausedNetwork, false),
            (State::PausedNetwork, true),
            (State::Stopped, true),
        ]
    );
}
