//! Error types used by workers, the entity processor and the supervisor.
//!
//! - [`Fault`]: a domain failure with reporting metadata (told / expected / retry-not-before).
//! - [`StoreError`]: the persistence layer failed; always fatal to the worker.
//! - [`WorkError`]: what a unit of work returns; separates stop requests, store failures
//!   and domain faults.
//! - [`RuntimeError`]: failures of the supervision runtime itself.
//!
//! All enums provide `as_label` (stable snake_case label for logs/metrics) and `as_message`.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

/// # A domain fault with reporting metadata.
///
/// Markers change *reporting policy*, not control flow:
/// - `told`: the user already saw this failure;
/// - `expected`: non-exceptional outcome (normal operation), swallowed after the entity is marked;
/// - `retry_not_before`: stamp the entity so it is not retried before this instant.
///
/// Two faults are considered duplicates when their formatted message is equal.
///
/// # Example
/// ```
/// use workvisor::Fault;
///
/// let f = Fault::new("upload rejected").with_category("upload").told();
/// assert_eq!(f.to_string(), "upload rejected");
/// assert_eq!(f.category(), Some("upload"));
/// assert!(f.is_told());
/// assert!(!f.is_expected());
/// ```
#[derive(Clone)]
pub struct Fault {
    message: Arc<str>,
    category: Option<Arc<str>>,
    told: bool,
    expected: bool,
    retry_not_before: Option<SystemTime>,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl Fault {
    /// Creates a fault with the given message and no markers.
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
            category: None,
            told: false,
            expected: false,
            retry_not_before: None,
            source: None,
        }
    }

    /// Creates a fault from an error, using its display text as message.
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut fault = Self::new(err.to_string());
        fault.source = Some(Arc::new(err));
        fault
    }

    /// Tags the fault with a category (used by `ThreadStatus::success`).
    #[inline]
    pub fn with_category(mut self, category: impl Into<Arc<str>>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Marks the fault as already shown to the user.
    #[inline]
    pub fn told(mut self) -> Self {
        self.told = true;
        self
    }

    /// Marks the fault as part of normal operation.
    #[inline]
    pub fn expected(mut self) -> Self {
        self.expected = true;
        self
    }

    /// Requests that the entity is not retried before `at`.
    #[inline]
    pub fn pause_retry(mut self, at: SystemTime) -> Self {
        self.retry_not_before = Some(at);
        self
    }

    /// Attaches an underlying error without changing the message.
    #[inline]
    pub fn with_source<E>(mut self, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(err));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn is_told(&self) -> bool {
        self.told
    }

    pub fn is_expected(&self) -> bool {
        self.expected
    }

    pub fn retry_not_before(&self) -> Option<SystemTime> {
        self.retry_not_before
    }

    /// Returns true if `other` would be shown as the same entry.
    pub fn same_report(&self, other: &Fault) -> bool {
        self.message == other.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("message", &self.message)
            .field("category", &self.category)
            .field("told", &self.told)
            .field("expected", &self.expected)
            .field("retry_not_before", &self.retry_not_before)
            .finish_non_exhaustive()
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// # Persistence layer failures.
///
/// Any of these terminates the entity processor; the supervisor then reports ABORTED.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The store cannot be reached or refused the operation.
    #[error("entity store unavailable: {reason}")]
    Unavailable {
        /// Human-readable cause.
        reason: String,
    },

    /// The write was rejected because the lock token no longer owns the entity.
    #[error("lock lost for entity {entity}")]
    LockLost {
        /// Entity label.
        entity: String,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Unavailable { .. } => "store_unavailable",
            StoreError::LockLost { .. } => "store_lock_lost",
        }
    }
}

/// # Outcome of a failed unit of work.
///
/// Only [`WorkError::Store`] and [`WorkError::Stopped`] escape the per-entity boundary;
/// domain faults are absorbed and recorded on the entity.
///
/// # Example
/// ```
/// use workvisor::{Fault, WorkError};
///
/// let err: WorkError = Fault::new("boom").into();
/// assert_eq!(err.as_label(), "work_fault");
/// assert!(!WorkError::Stopped.is_fatal());
/// ```
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum WorkError {
    /// Cooperative cancellation; never logged, never counted as an entity error.
    #[error("stop requested")]
    Stopped,

    /// The persistence layer failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Any other failure of the unit of work.
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl WorkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Stopped => "work_stopped",
            WorkError::Store(_) => "work_store",
            WorkError::Fault(_) => "work_fault",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkError::Stopped => "stop requested".to_string(),
            WorkError::Store(e) => format!("store: {e}"),
            WorkError::Fault(f) => format!("fault: {f}"),
        }
    }

    /// True for errors that terminate the whole worker.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkError::Store(_))
    }

    /// Converts the error into the fault reported to a supervisor.
    pub fn into_fault(self) -> Fault {
        match self {
            WorkError::Fault(f) => f,
            WorkError::Store(e) => Fault::from_error(e),
            WorkError::Stopped => Fault::new("stop requested").expected(),
        }
    }
}

/// # Errors produced by the supervision runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The worker factory could not build a worker from the current config.
    #[error("worker construction failed: {fault}")]
    WorkerConstruction {
        /// The construction failure.
        fault: Fault,
    },

    /// A worker panicked.
    #[error("worker '{name}' panicked: {info}")]
    WorkerPanicked {
        /// Worker name.
        name: String,
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use workvisor::RuntimeError;
    ///
    /// let err = RuntimeError::WorkerPanicked { name: "orders".into(), info: "oops".into() };
    /// assert_eq!(err.as_label(), "runtime_worker_panicked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::WorkerConstruction { .. } => "runtime_worker_construction",
            RuntimeError::WorkerPanicked { .. } => "runtime_worker_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::WorkerConstruction { fault } => format!("construction: {fault}"),
            RuntimeError::WorkerPanicked { name, info } => {
                format!("worker={name} panic={info}")
            }
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
