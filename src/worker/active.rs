//! # Active object trait.
//!
//! An [`ActiveObject`] is owned by its worker task for its whole life; `init`, `run` and
//! `exit` get `&mut self`, so thread-local resources can live in plain fields.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use workvisor::{ActiveObject, Context, WorkError};
//!
//! struct Ticker { ticks: u64 }
//!
//! #[async_trait]
//! impl ActiveObject for Ticker {
//!     fn name(&self) -> &str { "ticker" }
//!
//!     async fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
//!         while ctx.sleep(Duration::from_millis(250)).await {
//!             self.ticks += 1;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WorkError;
use crate::worker::Context;

/// Callback that forces a blocking operation inside `run()` to return.
pub type StopHook = Arc<dyn Fn() + Send + Sync>;

/// Cancelable unit of execution.
#[async_trait]
pub trait ActiveObject: Send + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Builds resources needed by `run`.
    ///
    /// On error `run` is skipped, but `exit` still runs.
    async fn init(&mut self, _ctx: &Context) -> Result<(), WorkError> {
        Ok(())
    }

    /// Performs the work until done or until the context is stopping.
    async fn run(&mut self, ctx: &Context) -> Result<(), WorkError>;

    /// Releases resources. Runs exactly once, whatever happened before.
    async fn exit(&mut self, _ctx: &Context) {}

    /// Hook invoked by a stop request that arrives while `run` is executing.
    ///
    /// Collected once when the object is spawned.
    fn stop_hook(&self) -> Option<StopHook> {
        None
    }
}
