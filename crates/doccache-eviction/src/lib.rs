//! Eviction strategies and background cleanup for doccache
//!
//! The `EvictionController` is pure selection logic over entry metadata
//! snapshots: given a backend's entries and its `max_items` bound, it picks
//! the victims the configured strategy calls for. The `CleanupScheduler`
//! drives it periodically from a cancellable background task.

pub mod controller;
pub mod scheduler;

pub use controller::{CleanupReport, EvictionController};
pub use scheduler::{CleanupScheduler, SchedulerStatus};
