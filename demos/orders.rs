//! # Example: orders
//!
//! An order-shipping subsystem supervised end to end.
//!
//! Demonstrates how to:
//! - Describe an entity kind with [`StatusEntity`] and a [`StatusManipulator`].
//! - Run an [`EntityProcessor`] under a [`Supervisor`] built from a worker factory.
//! - Observe the status stream through [`LogWriter`] and an [`AlarmDebouncer`].
//! - Reconfigure the subsystem and stop it.
//!
//! ## Flow
//! ```text
//! Supervisor::init(true)
//!     ├─► factory(Mode) ─► EntityProcessor
//!     ├─► publish RUNNING ─► LogWriter, AlarmDebouncer
//!     └─► processor: lock ─► ship ─► DONE | error ─► release
//!
//! reinit(true, Mode::Find) ─► stop ─► swap config ─► start
//! stop()                   ─► STOPPED
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example orders --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use workvisor::{
    ActiveObject, AlarmConfig, AlarmDebouncer, AlarmListener, AlarmStatus, Context, Entity,
    EntityProcessor, EntityWork, Fault, LogWriter, MemoryStore, PollMode, ProcessorConfig,
    StatusEntity, StatusListener, StatusManipulator, StatusTriple, Supervisor, SupervisorConfig,
    WorkError,
};

const PENDING: u8 = 0;
const PACKING: u8 = 1;
const SHIPPED: u8 = 2;

#[derive(Debug, Clone)]
struct Order {
    id: u32,
    status: u8,
    last_error: Option<String>,
    retries: u32,
    retry_at: Option<SystemTime>,
}

impl Entity for Order {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }

    fn label(&self) -> String {
        format!("order-{}", self.id)
    }
}

impl StatusEntity for Order {
    type Code = u8;

    fn status(&self) -> u8 {
        self.status
    }
    fn set_status(&mut self, code: u8) {
        self.status = code;
    }
    fn on_hold(&self) -> bool {
        false
    }
    fn set_on_hold(&mut self, _hold: bool) {}
    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
    fn set_last_error(&mut self, message: Option<String>) {
        self.last_error = message;
    }
    fn retries(&self) -> u32 {
        self.retries
    }
    fn set_retries(&mut self, retries: u32) {
        self.retries = retries;
    }
    fn retry_not_before(&self) -> Option<SystemTime> {
        self.retry_at
    }
    fn set_retry_not_before(&mut self, at: Option<SystemTime>) {
        self.retry_at = at;
    }
}

/// Ships an order; every third attempt hits a flaky carrier.
struct Ship {
    attempts: Arc<AtomicU32>,
}

#[async_trait]
impl EntityWork<Order> for Ship {
    async fn process(&self, order: &mut Order, ctx: &Context) -> Result<bool, WorkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        println!("[ship] order-{} attempt {attempt}", order.id);
        if !ctx.sleep(Duration::from_millis(150)).await {
            return Err(WorkError::Stopped);
        }
        if attempt % 3 == 2 {
            return Err(Fault::new("carrier API timed out")
                .with_category("carrier")
                .into());
        }
        Ok(true)
    }

    fn category(&self) -> &str {
        "carrier"
    }
}

struct PrintAlarm;

impl AlarmListener for PrintAlarm {
    fn on_alarm(&self, alarm: &AlarmStatus) {
        println!(
            "[alarm] state={} show={} tripped={}",
            alarm.status.state, alarm.show, alarm.tripped
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    workvisor::init_logging()?;

    let store = Arc::new(MemoryStore::new());
    for id in 1..=6 {
        store.insert(Order {
            id,
            status: PENDING,
            last_error: None,
            retries: 0,
            retry_at: None,
        });
    }

    let attempts = Arc::new(AtomicU32::new(0));
    let factory = {
        let store = store.clone();
        move |mode: &PollMode| -> Result<Box<dyn ActiveObject>, Fault> {
            let mut config = ProcessorConfig::new("orders", *mode);
            config.scan_interval = Duration::from_millis(500);
            config.idle_interval = Duration::from_millis(200);
            let manipulator = StatusManipulator::<Order>::new(StatusTriple {
                from: PENDING,
                active: PACKING,
                to: SHIPPED,
            });
            Ok(Box::new(EntityProcessor::new(
                config,
                store.clone(),
                Arc::new(manipulator),
                Ship {
                    attempts: attempts.clone(),
                },
            )))
        }
    };

    let log: Arc<dyn StatusListener> = Arc::new(LogWriter::new());
    let sup = Supervisor::builder(factory, PollMode::Scan)
        .with_settings(SupervisorConfig::named("orders"))
        .with_listeners(vec![log])
        .build();

    let alarm = Arc::new(AlarmDebouncer::new(AlarmConfig {
        enabled: true,
        window: Duration::from_secs(10),
        percent: 20,
    }));
    alarm.add_listener(Arc::new(PrintAlarm));
    let alarm_id = sup.add_listener(alarm.clone());

    sup.init(true).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    println!("[main] switching to find mode");
    sup.reinit(true, PollMode::Find).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    for fault in sup.errors() {
        println!("[main] recorded error: {fault}");
    }
    sup.stop(None).await;
    sup.remove_listener(alarm_id);

    for order in store.entities() {
        println!("[main] order-{} status={} retries={}", order.id, order.status, order.retries);
    }
    Ok(())
}
