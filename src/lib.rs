//! # workvisor
//!
//! **Workvisor** supervises long-running workers that process persisted entities.
//!
//! It provides a cancelable worker abstraction, a supervisor that starts, stops and
//! reconfigures one worker while aggregating its errors, a generic entity-processing loop
//! built on optimistic per-entity locks, and a sliding-window alarm debouncer that turns a
//! noisy status stream into a steady "show as error" signal.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   reinit(enabled, config) / start / stop
//!            │
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor<C>                                                    │
//! │  - WorkerFactory<C> (config ─► Box<dyn ActiveObject>)             │
//! │  - state + reason + ErrorSet   (one mutex, one total order)       │
//! │  - ListenerSet<dyn StatusListener>                                │
//! └──────┬───────────────────────────────────────────────▲────────────┘
//!        │ spawn (tokio task, instrumented span)          │ ThreadStatus
//!        ▼                                                │ (paused / error / fatal / success)
//! ┌──────────────────────────────┐                        │
//! │ EntityProcessor (ActiveObject)├───────────────────────┘
//! │  Scan / Find polling          │
//! │  Manipulator + EntityWork     │
//! └──────┬────────────────────────┘
//!        │ view / lock_try / get / update / release
//!        ▼
//!   EntityStore (MemoryStore or your own)
//!
//! Supervisor ──Status──► AlarmDebouncer ──AlarmStatus{show, tripped}──► UI
//!            └─Status──► LogWriter (feature = "logging")
//! ```
//!
//! ### Lifecycle of one worker
//! ```text
//! start():  factory.create(config)
//!             ├─ Err ─► ABORTED (fault kept as fatal)
//!             └─ Ok  ─► clear errors ─► publish RUNNING ─► spawn
//!
//! worker task:
//!   init() ─► run() ─► exit()          (exit always, exactly once)
//!               ├─ Ok / Stopped         ─► quiet
//!               └─ Err / panic          ─► ThreadStatus::fatal ─► ABORTED
//!
//! stop():   request stop (hook + stop action) ─► wait for exit ─► publish STOPPED
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------------|---------------------------------------------|
//! | **Workers**       | Cancelable init/run/exit objects with race-free sleep.          | [`ActiveObject`], [`Context`], [`spawn`]    |
//! | **Supervision**   | Start/stop/reconfigure one worker, dedup errors, fan out status.| [`Supervisor`], [`ThreadStatus`]            |
//! | **Entities**      | Lock, process and release entities through a status machine.   | [`EntityProcessor`], [`Manipulator`]        |
//! | **Alarm**         | Time-windowed hysteresis over the status stream.                | [`AlarmDebouncer`], [`AlarmWindow`]         |
//! | **Errors**        | Typed errors and annotated domain faults.                       | [`Fault`], [`WorkError`], [`StoreError`]    |
//! | **Configuration** | Runtime, processor and alarm settings.                          | [`SupervisorConfig`], [`ProcessorConfig`]   |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`] and `init_logging()` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use workvisor::{
//!     ActiveObject, Context, EntityProcessor, EntityWork, Fault, MemoryStore, PollMode,
//!     ProcessorConfig, State, StatusManipulator, StatusTriple, Supervisor, WorkError,
//! };
//! # use std::time::SystemTime;
//! # use workvisor::{Entity, StatusEntity};
//! # #[derive(Clone)] struct Order { id: u32, status: u8 }
//! # impl Entity for Order { type Key = u32; fn key(&self) -> u32 { self.id } }
//! # impl StatusEntity for Order {
//! #     type Code = u8;
//! #     fn status(&self) -> u8 { self.status } fn set_status(&mut self, s: u8) { self.status = s }
//! #     fn on_hold(&self) -> bool { false } fn set_on_hold(&mut self, _: bool) {}
//! #     fn last_error(&self) -> Option<&str> { None } fn set_last_error(&mut self, _: Option<String>) {}
//! #     fn retries(&self) -> u32 { 0 } fn set_retries(&mut self, _: u32) {}
//! #     fn retry_not_before(&self) -> Option<SystemTime> { None }
//! #     fn set_retry_not_before(&mut self, _: Option<SystemTime>) {}
//! # }
//!
//! struct Ship;
//!
//! #[async_trait]
//! impl EntityWork<Order> for Ship {
//!     async fn process(&self, _order: &mut Order, _ctx: &Context) -> Result<bool, WorkError> {
//!         Ok(true)
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::<Order>::new());
//!     store.insert(Order { id: 1, status: 0 });
//!
//!     let factory = {
//!         let store = store.clone();
//!         move |mode: &PollMode| -> Result<Box<dyn ActiveObject>, Fault> {
//!             let orders = StatusManipulator::<Order>::new(StatusTriple { from: 0, active: 1, to: 2 });
//!             Ok(Box::new(EntityProcessor::new(
//!                 ProcessorConfig::new("orders", *mode),
//!                 store.clone(),
//!                 Arc::new(orders),
//!                 Ship,
//!             )))
//!         }
//!     };
//!
//!     let sup = Supervisor::builder(factory, PollMode::Find).build();
//!     sup.init(true).await;
//!     assert_eq!(sup.status().state, State::Running);
//!     sup.stop(None).await;
//! }
//! ```
mod alarm;
mod config;
mod core;
mod entity;
mod error;
mod listeners;
mod policies;
mod status;
mod worker;

// ---- Public re-exports ----

pub use alarm::{AlarmDebouncer, AlarmListener, AlarmStatus, AlarmWindow, Severity};
pub use config::{AlarmConfig, PollMode, ProcessorConfig, SupervisorConfig};
pub use core::{ErrorSet, StopOutcome, Supervisor, SupervisorBuilder, WorkerFactory};
pub use entity::{
    Entity, EntityProcessor, EntityStore, EntityWork, ErrorMode, LockToken, Manipulator,
    MemoryStore, Order, ScanFilter, Selector, StatusEntity, StatusManipulator, StatusTriple, View,
    retry_stamp,
};
pub use error::{Fault, RuntimeError, StoreError, WorkError};
pub use listeners::{ListenerId, ListenerSet, StatusListener};
pub use policies::JitterPolicy;
pub use status::{PauseToken, State, Status, ThreadStatus};
pub use worker::{
    ActiveHandle, ActiveObject, Context, Phase, StopActionGuard, StopHook, StopNotice, StopSignal,
    spawn, spawn_boxed,
};

// Optional: status logging and a subscriber bootstrap.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
mod logging;
#[cfg(feature = "logging")]
pub use listeners::LogWriter;
#[cfg(feature = "logging")]
pub use logging::init_logging;
