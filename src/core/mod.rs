//! Supervision core: lifecycle owner of one worker.
//!
//! The public API from this module is [`Supervisor`] (built with [`SupervisorBuilder`]),
//! the [`WorkerFactory`] it builds workers with, the deduplicated [`ErrorSet`] and the
//! [`StopOutcome`] of a stop request.
//!
//! Internal modules:
//! - [`supervisor`]: control operations, listener fan-out, error clearing policy;
//! - [`reporter`]: the `ThreadStatus` implementation handed to the running worker;
//! - [`errors`]: deduplicated error records;
//! - [`builder`]: construction with settings, span and initial listeners.

mod builder;
mod errors;
mod factory;
mod reporter;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use errors::ErrorSet;
pub use factory::WorkerFactory;
pub use supervisor::{StopOutcome, Supervisor};
