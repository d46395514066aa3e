//! Polling policies.
//!
//! ## Contents
//! - [`JitterPolicy`] randomization of polling sleeps, so several processors sharing one
//!   entity store do not poll it in lockstep
//!
//! ## Quick wiring
//! ```text
//! ProcessorConfig { scan_interval, idle_interval, jitter: JitterPolicy }
//!      └─► EntityProcessor sleeps jitter.apply(interval) between polls
//! ```

mod jitter;

pub use jitter::JitterPolicy;
