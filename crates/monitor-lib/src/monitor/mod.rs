//! Cycle execution and scheduling
//!
//! This module provides:
//! - The analysis cycle runner (fetch, score, aggregate, find)
//! - The monitoring scheduler state machine (single and continuous modes)
//! - A bounded history of recent cycles

mod cycle;
mod history;
mod scheduler;


pub use cycle::CycleRunner;
pub use history::{CycleHistory, DEFAULT_HISTORY_SIZE};
pub use scheduler::{
    MonitoringScheduler, RunMode, RunOutcome, SchedulerBuilder, SchedulerConfig, SchedulerState,
    SchedulerStats,
};
