use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who answers customers at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReplyMode {
    /// Staff are on duty; no automated replies are sent.
    HumanStaffed,
    /// Working day, inside the lunch break.
    AssistantDuringBreak,
    /// Rest day, holiday, or after the off-hours start.
    AssistantAfterHours,
}

impl ReplyMode {
    /// Whether this mode sends automated replies.
    pub fn is_automated(&self) -> bool {
        !matches!(self, Self::HumanStaffed)
    }
}

/// A half-open `[start, end)` time-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Inclusive start, exclusive end.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }
}

/// Calendar configuration consulted once per dispatch cycle.
///
/// `workday_flags` is indexed Monday-first (`Weekday::num_days_from_monday`).
/// Only `off_hours_window.start` participates in mode selection; the end is
/// kept so operators can round-trip the value they configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub workday_flags: [bool; 7],
    #[serde(default)]
    pub holidays: BTreeSet<NaiveDate>,
    pub lunch_window: TimeWindow,
    pub off_hours_window: TimeWindow,
}

impl ScheduleConfig {
    /// Checks that the windows are ordered within the day.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.lunch_window.start > self.lunch_window.end {
            return Err(crate::error::ShopdeskError::config(format!(
                "lunch window starts after it ends ({} > {})",
                self.lunch_window.start, self.lunch_window.end
            )));
        }
        if self.lunch_window.end > self.off_hours_window.start {
            return Err(crate::error::ShopdeskError::config(format!(
                "off-hours start {} is before lunch end {}",
                self.off_hours_window.start, self.lunch_window.end
            )));
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        Self {
            workday_flags: [true, true, true, true, true, false, false],
            holidays: BTreeSet::new(),
            lunch_window: TimeWindow::new(at(12, 0), at(13, 0)),
            off_hours_window: TimeWindow::new(at(18, 0), at(23, 59)),
        }
    }
}

/// `HH:MM` serde format; seconds are accepted on input.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
