//! Active objects: cancelable units of execution with an init/run/exit lifecycle.
//!
//! ## Contents
//! - [`ActiveObject`] the trait a worker implements
//! - [`Context`] what the worker sees while it runs (stop signal, cooperative sleep, status sink)
//! - [`StopSignal`], [`StopActionGuard`] race-free stop flag with a single stop-action slot
//! - [`spawn`], [`ActiveHandle`], [`StopNotice`] start a worker and stop it again
//!
//! ## Lifecycle
//! ```text
//! spawn(object) ──► tokio task:
//!   ├─► init()            fails → run skipped, fault reported fatal
//!   ├─► run()             fault not caused by a stop → logged + reported fatal
//!   └─► exit()            always, exactly once
//!
//! ActiveHandle::request_stop() from any task:
//!   ├─► stopping = true, token cancelled      (under the signal mutex)
//!   ├─► stop hook (only while in run) and the registered stop action
//!   └─► wait until exit() returned            (optional "still waiting" notice)
//! ```

mod active;
mod context;
mod runner;
mod stop;

pub use active::{ActiveObject, StopHook};
pub use context::Context;
pub use runner::{ActiveHandle, StopNotice, spawn, spawn_boxed};
pub use stop::{Phase, StopActionGuard, StopSignal};
