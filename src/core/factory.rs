//! # Worker factory.
//!
//! The supervisor never knows the concrete worker type: every (re)start asks a
//! [`WorkerFactory`] for a fresh [`ActiveObject`] built from the current config.

use crate::error::Fault;
use crate::worker::ActiveObject;

/// Builds a worker from the supervisor's current configuration.
///
/// Closures `Fn(&C) -> Result<Box<dyn ActiveObject>, Fault>` implement this trait.
///
/// # Example
/// ```
/// use workvisor::{ActiveObject, Fault, WorkerFactory};
///
/// fn accepts<F: WorkerFactory<u32>>(_f: F) {}
///
/// accepts(|limit: &u32| -> Result<Box<dyn ActiveObject>, Fault> {
///     Err(Fault::new(format!("no worker for limit {limit}")))
/// });
/// ```
pub trait WorkerFactory<C>: Send + Sync + 'static {
    /// Creates a worker. An error leaves the supervisor ABORTED with the fault recorded.
    fn create(&self, config: &C) -> Result<Box<dyn ActiveObject>, Fault>;
}

impl<C, F> WorkerFactory<C> for F
where
    F: Fn(&C) -> Result<Box<dyn ActiveObject>, Fault> + Send + Sync + 'static,
{
    fn create(&self, config: &C) -> Result<Box<dyn ActiveObject>, Fault> {
        self(config)
    }
}
