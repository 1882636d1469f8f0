//! Periodic price reporting.
//!
//! One [`PollingTask`] runs per active session. Tasks are spawned and stopped
//! only by the session registry.

mod runner;

pub use runner::PollingTask;
