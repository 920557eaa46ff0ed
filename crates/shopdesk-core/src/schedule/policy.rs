use chrono::{Datelike, NaiveDateTime};

use super::model::{ReplyMode, ScheduleConfig};

/// Selects the reply mode for `now`.
///
/// Rest days and holidays are always after-hours. On working days the lunch
/// window is checked first, then the staffed stretches on either side of it,
/// and anything from the off-hours start onwards falls back to after-hours.
/// Every boundary is half-open.
pub fn select_mode(now: NaiveDateTime, config: &ScheduleConfig) -> ReplyMode {
    let weekday = now.weekday().num_days_from_monday() as usize;
    if config.holidays.contains(&now.date()) || !config.workday_flags[weekday] {
        return ReplyMode::AssistantAfterHours;
    }

    let time = now.time();
    let lunch = &config.lunch_window;
    if lunch.contains(time) {
        ReplyMode::AssistantDuringBreak
    } else if time < lunch.start
        || (time >= lunch.end && time < config.off_hours_window.start)
    {
        ReplyMode::HumanStaffed
    } else {
        ReplyMode::AssistantAfterHours
    }
}
