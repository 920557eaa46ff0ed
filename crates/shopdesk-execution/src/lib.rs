//! Periodic execution of dispatch cycles.
//!
//! A timer enqueues ticks; one worker owns the cycle task and consumes the
//! ticks serially, so two cycles never touch the browser at the same time.

mod driver;

pub use driver::{CycleTask, DriverStats, PeriodicDriver};
