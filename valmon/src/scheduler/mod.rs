//! Scheduler module for the poll-dedup-dispatch loop.
//!
//! The Scheduler is responsible for:
//! - Running every probe on a fixed interval
//! - Suppressing observations that were already alerted (see [`AlertCache`])
//! - Fanning novel observations out to every notifier
//! - Persisting a [`CycleSummary`] after each cycle

mod cache;
mod service;
mod summary;

pub use cache::AlertCache;
pub use service::{DEFAULT_ALERT_TTL, Scheduler, SchedulerConfig};
pub use summary::{CycleSummary, MONITOR_EXEC_KEY};
