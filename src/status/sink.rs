//! # Worker-facing status surface.
//!
//! [`ThreadStatus`] is the only way a running worker talks back to its supervisor.
//! All methods are synchronous and cheap; they may be called from the worker task at
//! any point, including while the worker is being stopped.

use crate::error::Fault;
use crate::status::PauseToken;

/// Status reporting interface implemented by the supervisor for its worker.
///
/// ```text
/// worker ── paused_network / paused_wait / unpaused ──► state + reason
///        ── error / success(category)               ──► deduplicated error set
///        ── fatal                                   ──► ABORTED, worker dropped
/// ```
pub trait ThreadStatus: Send + Sync {
    /// The worker waits for the network; state becomes `PausedNetwork`.
    fn paused_network(&self, reason: &str);

    /// The worker waits for something else; state becomes `PausedWait`.
    ///
    /// The returned token restores the previous state and reason.
    fn paused_wait(&self, reason: &str) -> PauseToken;

    /// The worker resumed; state becomes `Running` with no reason.
    fn unpaused(&self);

    /// The worker left the pause scope that produced `token`.
    fn unpaused_with(&self, token: PauseToken);

    /// A non-fatal fault; added to the deduplicated error set.
    fn error(&self, fault: Fault);

    /// The worker is about to die; the supervisor drops it and reports `Aborted`.
    fn fatal(&self, fault: Fault);

    /// Work of `category` succeeded; errors tagged with it are removed.
    fn success(&self, category: &str);
}
