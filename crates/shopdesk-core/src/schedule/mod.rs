//! Reply-mode scheduling.
//!
//! - `model`: calendar configuration (`ScheduleConfig`, `TimeWindow`) and `ReplyMode`
//! - `policy`: the pure `select_mode` function

mod model;
mod policy;

pub use model::{ReplyMode, ScheduleConfig, TimeWindow};
pub use policy::select_mode;
