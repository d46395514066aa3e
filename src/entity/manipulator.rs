//! # Manipulators: selection and status transitions of one entity kind.
//!
//! A [`Manipulator`] is stateless. It decides which entities are eligible and how an entity's
//! status changes around one processing pass. [`StatusManipulator`] covers the common case of
//! a status triple `(from, active, to)` stored on the entity itself.

use std::cmp::Ordering;
use std::fmt;
use std::time::{Duration, SystemTime};

use crate::entity::store::{Entity, Order};
use crate::error::Fault;

/// Selection predicate and status transitions for one entity kind.
///
/// `select` must turn false once `mark_complete` or `mark_error` moved the entity out of the
/// eligible set; otherwise the processor would pick it up again immediately.
///
/// Each `mark_*` returns whether it changed the entity; the processor persists only then.
pub trait Manipulator<E>: Send + Sync + 'static {
    /// True if `entity` should be processed.
    fn select(&self, entity: &E) -> bool;

    /// The entity was claimed.
    fn mark_active(&self, entity: &mut E) -> bool;

    /// The work finished the entity.
    fn mark_complete(&self, entity: &mut E) -> bool;

    /// The work made progress but is not done, or was stopped.
    fn mark_incomplete(&self, entity: &mut E) -> bool;

    /// The work failed with `fault`.
    ///
    /// `pause_limit` caps a retry-not-before stamp carried by the fault, see [`retry_stamp`].
    fn mark_error(&self, entity: &mut E, fault: &Fault, pause_limit: Option<Duration>) -> bool;

    /// True if the entity already failed before (the current failure is a retry).
    fn is_retrying(&self, entity: &E) -> bool;

    /// Priority order; `Less` is processed first.
    fn compare(&self, _a: &E, _b: &E) -> Ordering {
        Ordering::Equal
    }
}

/// Returns the retry-not-before stamp of `fault`, capped at `now + pause_limit`.
///
/// A limit too large to add to `now` leaves the stamp uncapped.
///
/// ```
/// use std::time::{Duration, SystemTime};
/// use workvisor::{Fault, retry_stamp};
///
/// let now = SystemTime::now();
/// let fault = Fault::new("quota").pause_retry(now + Duration::from_secs(86_400));
/// let capped = retry_stamp(&fault, Some(Duration::from_secs(3600)), now);
/// assert_eq!(capped, Some(now + Duration::from_secs(3600)));
/// assert_eq!(retry_stamp(&Fault::new("x"), None, now), None);
/// ```
pub fn retry_stamp(
    fault: &Fault,
    pause_limit: Option<Duration>,
    now: SystemTime,
) -> Option<SystemTime> {
    let at = fault.retry_not_before()?;
    match pause_limit {
        Some(limit) => Some(now.checked_add(limit).map_or(at, |cap| at.min(cap))),
        None => Some(at),
    }
}

/// An entity with a persisted status code and retry bookkeeping.
pub trait StatusEntity: Entity {
    /// Status code type (usually a small enum or integer).
    type Code: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    fn status(&self) -> Self::Code;
    fn set_status(&mut self, code: Self::Code);

    /// Hold marker. Outside [`ErrorMode::Hold`] held entities are never selected.
    fn on_hold(&self) -> bool;
    fn set_on_hold(&mut self, hold: bool);

    fn last_error(&self) -> Option<&str>;
    fn set_last_error(&mut self, message: Option<String>);

    fn retries(&self) -> u32;
    fn set_retries(&mut self, retries: u32);

    fn retry_not_before(&self) -> Option<SystemTime>;
    fn set_retry_not_before(&mut self, at: Option<SystemTime>);
}

/// `(from, active, to)`: eligible, claimed (display only), done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTriple<C> {
    pub from: C,
    pub active: C,
    pub to: C,
}

/// What `mark_error` does with the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMode<C> {
    /// Back to `from`; the entity re-enters the pool once its retry stamp passed.
    Revert,
    /// Move to a distinct error status; an operator has to reset it.
    Status(C),
    /// Set the hold marker and go back to `from`.
    ///
    /// The marker flags the failure for display only: the entity is retried once its retry
    /// stamp passed, and completion clears the marker.
    Hold,
}

/// Manipulator over a [`StatusTriple`].
///
/// # Example
/// ```
/// use workvisor::{ErrorMode, StatusManipulator, StatusTriple};
/// # use std::time::SystemTime;
/// # use workvisor::{Entity, StatusEntity};
/// # #[derive(Clone)] struct Roll { id: u32 }
/// # impl Entity for Roll { type Key = u32; fn key(&self) -> u32 { self.id } }
/// # impl StatusEntity for Roll {
/// #     type Code = u8;
/// #     fn status(&self) -> u8 { 0 } fn set_status(&mut self, _: u8) {}
/// #     fn on_hold(&self) -> bool { false } fn set_on_hold(&mut self, _: bool) {}
/// #     fn last_error(&self) -> Option<&str> { None } fn set_last_error(&mut self, _: Option<String>) {}
/// #     fn retries(&self) -> u32 { 0 } fn set_retries(&mut self, _: u32) {}
/// #     fn retry_not_before(&self) -> Option<SystemTime> { None }
/// #     fn set_retry_not_before(&mut self, _: Option<SystemTime>) {}
/// # }
///
/// let rolls = StatusManipulator::<Roll>::new(StatusTriple { from: 0, active: 1, to: 2 })
///     .silent()
///     .on_error(ErrorMode::Status(9));
/// assert!(rolls.is_silent());
/// ```
pub struct StatusManipulator<E: StatusEntity> {
    triple: StatusTriple<E::Code>,
    silent: bool,
    on_error: ErrorMode<E::Code>,
    order: Option<Order<E>>,
}

impl<E: StatusEntity> StatusManipulator<E> {
    /// Reverting, non-silent manipulator in store order.
    pub fn new(triple: StatusTriple<E::Code>) -> Self {
        Self {
            triple,
            silent: false,
            on_error: ErrorMode::Revert,
            order: None,
        }
    }

    /// Skips the active/incomplete transitions.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn on_error(mut self, mode: ErrorMode<E::Code>) -> Self {
        self.on_error = mode;
        self
    }

    /// Sets the priority order.
    pub fn ordered_by(mut self, order: Order<E>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn triple(&self) -> StatusTriple<E::Code> {
        self.triple
    }

    fn set(entity: &mut E, code: E::Code) -> bool {
        if entity.status() == code {
            return false;
        }
        entity.set_status(code);
        true
    }
}

impl<E: StatusEntity> Manipulator<E> for StatusManipulator<E> {
    fn select(&self, entity: &E) -> bool {
        if entity.status() != self.triple.from {
            return false;
        }
        if entity.on_hold() && self.on_error != ErrorMode::Hold {
            return false;
        }
        match entity.retry_not_before() {
            Some(at) => at <= SystemTime::now(),
            None => true,
        }
    }

    fn mark_active(&self, entity: &mut E) -> bool {
        if self.silent {
            return false;
        }
        Self::set(entity, self.triple.active)
    }

    fn mark_complete(&self, entity: &mut E) -> bool {
        entity.set_last_error(None);
        entity.set_retries(0);
        entity.set_retry_not_before(None);
        if self.on_error == ErrorMode::Hold {
            entity.set_on_hold(false);
        }
        entity.set_status(self.triple.to);
        true
    }

    fn mark_incomplete(&self, entity: &mut E) -> bool {
        if self.silent {
            return false;
        }
        Self::set(entity, self.triple.from)
    }

    fn mark_error(&self, entity: &mut E, fault: &Fault, pause_limit: Option<Duration>) -> bool {
        entity.set_last_error(Some(fault.to_string()));
        entity.set_retries(entity.retries().saturating_add(1));
        entity.set_retry_not_before(retry_stamp(fault, pause_limit, SystemTime::now()));
        let code = match self.on_error {
            ErrorMode::Revert => self.triple.from,
            ErrorMode::Status(code) => code,
            ErrorMode::Hold => {
                entity.set_on_hold(true);
                self.triple.from
            }
        };
        entity.set_status(code);
        true
    }

    fn is_retrying(&self, entity: &E) -> bool {
        entity.retries() > 0
    }

    fn compare(&self, a: &E, b: &E) -> Ordering {
        match &self.order {
            Some(order) => order(a, b),
            None => Ordering::Equal,
        }
    }
}
