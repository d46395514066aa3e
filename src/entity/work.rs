use async_trait::async_trait;

use crate::error::WorkError;
use crate::worker::Context;

/// Verdict of [`EntityWork::filter`] during a scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanFilter {
    /// Try to lock and process the entity.
    #[default]
    Go,
    /// Leave it for a later pass.
    Skip,
    /// End the pass here.
    Stop,
}

/// Domain work done on one locked entity.
///
/// `process` returns `Ok(true)` when the entity is done, `Ok(false)` when it needs another
/// pass. A [`WorkError::Fault`] is recorded on the entity and absorbed;
/// [`WorkError::Store`] terminates the processor.
#[async_trait]
pub trait EntityWork<E>: Send + Sync + 'static {
    async fn process(&self, entity: &mut E, ctx: &Context) -> Result<bool, WorkError>;

    /// Cheap pre-lock check applied to each candidate of a scan pass.
    fn filter(&self, _entity: &E) -> ScanFilter {
        ScanFilter::Go
    }

    /// Housekeeping run by find mode when no entity qualified.
    ///
    /// Returning `Ok(true)` requests an immediate scan pass.
    async fn trigger(&self, _ctx: &Context) -> Result<bool, WorkError> {
        Ok(false)
    }

    /// Category escalated faults are tagged with; `success` clears it.
    fn category(&self) -> &str {
        "entities"
    }
}
