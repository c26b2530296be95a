//! Cron trigger scheduling for switchyard.
//!
//! This crate provides:
//!
//! - **Cron Schedules**: parsed cron expressions (5 or 6 fields) with
//!   next-occurrence computation anchored on the last run
//! - **Schedule Records**: per-trigger state (enablement, run
//!   counters, next due time) persisted through a key-value store
//! - **Trigger Manager**: registration, replacement, due-schedule
//!   queries, fire claiming, and retention cleanup

pub mod error;
pub mod manager;
pub mod schedule;
pub mod store;

pub use error::{KvError, SchedulerError};
pub use manager::TriggerManager;
pub use schedule::{CronSchedule, Schedule};
pub use store::{InMemoryKeyValueStore, KeyValueStore};
