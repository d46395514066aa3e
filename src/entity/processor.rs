//! # EntityProcessor: the polling loop of one entity kind.
//!
//! ## Modes
//! ```text
//! Scan: loop {
//!         suspend view ─► for each candidate: filter ─► lock_try ─► process ─► release
//!         resume view  ─► sleep(scan_interval)
//!       }
//!
//! Find: loop {
//!         first lockable candidate? ── yes ─► process it, loop again at once
//!              │ no
//!         trigger() ── true ─► one scan pass
//!              │ false
//!         sleep(idle_interval)
//!       }
//! ```
//!
//! Entities locked elsewhere are skipped, never waited for. The processor holds at most one
//! lock at a time and releases it before looking at the next candidate.

use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::config::{PollMode, ProcessorConfig};
use crate::entity::manipulator::Manipulator;
use crate::entity::store::{Entity, EntityStore, LockToken, Order, Selector, View};
use crate::entity::work::{EntityWork, ScanFilter};
use crate::error::{Fault, WorkError};
use crate::worker::{ActiveObject, Context};

/// [`ActiveObject`] that claims, processes and releases entities.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use workvisor::{
///     Context, EntityProcessor, EntityWork, MemoryStore, PollMode, ProcessorConfig,
///     StatusManipulator, StatusTriple, WorkError,
/// };
/// # use std::time::SystemTime;
/// # use workvisor::{Entity, StatusEntity};
/// # #[derive(Clone)] struct Order { id: u32, status: u8 }
/// # impl Entity for Order { type Key = u32; fn key(&self) -> u32 { self.id } }
/// # impl StatusEntity for Order {
/// #     type Code = u8;
/// #     fn status(&self) -> u8 { self.status } fn set_status(&mut self, s: u8) { self.status = s }
/// #     fn on_hold(&self) -> bool { false } fn set_on_hold(&mut self, _: bool) {}
/// #     fn last_error(&self) -> Option<&str> { None } fn set_last_error(&mut self, _: Option<String>) {}
/// #     fn retries(&self) -> u32 { 0 } fn set_retries(&mut self, _: u32) {}
/// #     fn retry_not_before(&self) -> Option<SystemTime> { None }
/// #     fn set_retry_not_before(&mut self, _: Option<SystemTime>) {}
/// # }
///
/// struct Ship;
///
/// #[async_trait]
/// impl EntityWork<Order> for Ship {
///     async fn process(&self, _order: &mut Order, _ctx: &Context) -> Result<bool, WorkError> {
///         Ok(true)
///     }
/// }
///
/// let store = Arc::new(MemoryStore::<Order>::new());
/// let orders = StatusManipulator::<Order>::new(StatusTriple { from: 0, active: 1, to: 2 });
/// let processor = EntityProcessor::new(
///     ProcessorConfig::new("orders", PollMode::Find),
///     store,
///     Arc::new(orders),
///     Ship,
/// );
/// ```
pub struct EntityProcessor<E, S, M, W> {
    config: ProcessorConfig,
    store: Arc<S>,
    manipulator: Arc<M>,
    work: W,
    view: Option<Box<dyn View<E>>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, S, M, W> EntityProcessor<E, S, M, W>
where
    E: Entity,
    S: EntityStore<E>,
    M: Manipulator<E>,
    W: EntityWork<E>,
{
    pub fn new(config: ProcessorConfig, store: Arc<S>, manipulator: Arc<M>, work: W) -> Self {
        Self {
            config,
            store,
            manipulator,
            work,
            view: None,
            _entity: PhantomData,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    async fn open_view(&self) -> Result<Box<dyn View<E>>, WorkError> {
        let m = Arc::clone(&self.manipulator);
        let selector: Selector<E> = Arc::new(move |e: &E| m.select(e));
        let m = Arc::clone(&self.manipulator);
        let order: Order<E> = Arc::new(move |a: &E, b: &E| m.compare(a, b));
        Ok(self.store.view(selector, order).await?)
    }

    async fn take_view(&mut self) -> Result<Box<dyn View<E>>, WorkError> {
        match self.view.take() {
            Some(view) => Ok(view),
            None => self.open_view().await,
        }
    }

    /// Walks every candidate of a frozen view once.
    async fn scan_pass(&mut self, ctx: &Context) -> Result<(), WorkError> {
        let mut view = self.take_view().await?;
        view.suspend();
        let res = self.scan_view(view.as_ref(), ctx).await;
        view.resume();
        self.view = Some(view);
        res
    }

    async fn scan_view(&self, view: &dyn View<E>, ctx: &Context) -> Result<(), WorkError> {
        let total = view.len();
        tracing::trace!(candidates = total, "scan pass");
        for index in 0..total {
            ctx.check_stop()?;
            let Some(candidate) = view.get(index) else {
                break;
            };
            match self.work.filter(&candidate) {
                ScanFilter::Go => {}
                ScanFilter::Skip => continue,
                ScanFilter::Stop => break,
            }
            let key = candidate.key();
            match self.store.lock_try(&key).await? {
                Some(token) => self.process_locked(ctx, key, token).await?,
                None => tracing::trace!(entity = %candidate.label(), "locked elsewhere"),
            }
        }
        Ok(())
    }

    /// Locks the first lockable candidate in priority order and processes it.
    ///
    /// Returns false if nothing could be claimed.
    async fn find_one(&mut self, ctx: &Context) -> Result<bool, WorkError> {
        let mut view = self.take_view().await?;
        view.suspend();
        let claimed = self.claim_first(view.as_ref()).await;
        view.resume();
        self.view = Some(view);

        match claimed? {
            Some((key, token)) => {
                self.process_locked(ctx, key, token).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claim_first(
        &self,
        view: &dyn View<E>,
    ) -> Result<Option<(E::Key, LockToken)>, WorkError> {
        for index in 0..view.len() {
            let Some(candidate) = view.get(index) else {
                break;
            };
            let key = candidate.key();
            if let Some(token) = self.store.lock_try(&key).await? {
                return Ok(Some((key, token)));
            }
        }
        Ok(None)
    }

    /// Processes one locked entity and releases the lock on every path, panics included.
    async fn process_locked(
        &self,
        ctx: &Context,
        key: E::Key,
        token: LockToken,
    ) -> Result<(), WorkError> {
        let outcome = AssertUnwindSafe(self.process_entity(ctx, &key, &token))
            .catch_unwind()
            .await;
        self.store.release(&key, token).await;
        match outcome {
            Ok(res) => res,
            Err(panic) => resume_unwind(panic),
        }
    }

    async fn process_entity(
        &self,
        ctx: &Context,
        key: &E::Key,
        token: &LockToken,
    ) -> Result<(), WorkError> {
        let Some(mut entity) = self.store.get(key).await? else {
            tracing::debug!(entity = ?key, "entity vanished after lock");
            return Ok(());
        };
        if !self.manipulator.select(&entity) {
            tracing::debug!(entity = %entity.label(), "no longer eligible");
            tokio::task::yield_now().await;
            return Ok(());
        }

        if self.manipulator.mark_active(&mut entity) {
            self.store.update(&entity, token).await?;
        }

        let result = match self.work.process(&mut entity, ctx).await {
            // A blocking call unblocked by the stop action fails with its own error.
            Err(WorkError::Fault(fault)) if ctx.is_stopping() => {
                tracing::debug!(entity = %entity.label(), error = %fault, "interrupted by stop");
                Err(WorkError::Stopped)
            }
            other => other,
        };
        match result {
            Ok(true) => {
                if self.manipulator.mark_complete(&mut entity) {
                    self.store.update(&entity, token).await?;
                }
                tracing::debug!(entity = %entity.label(), "complete");
                if let Some(status) = ctx.status() {
                    status.success(self.work.category());
                }
                Ok(())
            }
            Ok(false) => {
                if self.manipulator.mark_incomplete(&mut entity) {
                    self.store.update(&entity, token).await?;
                }
                Ok(())
            }
            Err(WorkError::Stopped) => {
                if self.manipulator.mark_incomplete(&mut entity) {
                    self.store.update(&entity, token).await?;
                }
                Err(WorkError::Stopped)
            }
            Err(WorkError::Store(e)) => Err(WorkError::Store(e)),
            Err(WorkError::Fault(fault)) => self.absorb(ctx, entity, fault, token).await,
        }
    }

    /// Records a domain fault on the entity; only a failing store escapes.
    async fn absorb(
        &self,
        ctx: &Context,
        mut entity: E,
        fault: Fault,
        token: &LockToken,
    ) -> Result<(), WorkError> {
        let label = entity.label();
        if fault.is_expected() {
            tracing::debug!(entity = %label, error = %fault, "entity not processed");
        } else if self.manipulator.is_retrying(&entity) {
            tracing::warn!(entity = %label, error = %fault, told = fault.is_told(), "entity failed again");
        } else {
            tracing::error!(entity = %label, error = %fault, told = fault.is_told(), "entity failed");
        }

        if self
            .manipulator
            .mark_error(&mut entity, &fault, self.config.pause_cap())
        {
            self.store.update(&entity, token).await?;
        }

        if self.config.escalate_errors && !fault.is_expected() {
            if let Some(status) = ctx.status() {
                let fault = match fault.category() {
                    Some(_) => fault,
                    None => fault.with_category(self.work.category()),
                };
                status.error(fault);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<E, S, M, W> ActiveObject for EntityProcessor<E, S, M, W>
where
    E: Entity,
    S: EntityStore<E>,
    M: Manipulator<E>,
    W: EntityWork<E>,
{
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn init(&mut self, _ctx: &Context) -> Result<(), WorkError> {
        self.view = Some(self.open_view().await?);
        Ok(())
    }

    async fn run(&mut self, ctx: &Context) -> Result<(), WorkError> {
        loop {
            ctx.check_stop()?;
            match self.config.mode {
                PollMode::Scan => {
                    self.scan_pass(ctx).await?;
                    if !ctx.sleep(self.config.next_scan_sleep()).await {
                        return Ok(());
                    }
                }
                PollMode::Find => {
                    if self.find_one(ctx).await? {
                        continue;
                    }
                    if self.run_trigger(ctx).await? {
                        self.scan_pass(ctx).await?;
                        continue;
                    }
                    if !ctx.sleep(self.config.next_idle_sleep()).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn exit(&mut self, _ctx: &Context) {
        self.view = None;
    }
}

impl<E, S, M, W> EntityProcessor<E, S, M, W>
where
    E: Entity,
    S: EntityStore<E>,
    M: Manipulator<E>,
    W: EntityWork<E>,
{
    async fn run_trigger(&self, ctx: &Context) -> Result<bool, WorkError> {
        match self.work.trigger(ctx).await {
            Ok(scan) => Ok(scan),
            Err(WorkError::Fault(fault)) => {
                tracing::warn!(error = %fault, "trigger failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
