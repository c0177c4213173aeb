use std::collections::HashMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::Clock;

/// Weekday labels in Sunday-first order, matching the upstream schedule keys
pub const WEEKDAY_LABELS: [&str; 7] = [
    "星期日", "星期一", "星期二", "星期三", "星期四", "星期五", "星期六",
];

pub const DEFAULT_MAX_ITEMS: usize = 50;

pub fn weekday_label(weekday: Weekday) -> &'static str {
    WEEKDAY_LABELS[weekday.num_days_from_sunday() as usize]
}

/// A week of raw anime records keyed by weekday label.
///
/// Values stay raw: snapshots may carry `null` days or metadata keys next to
/// the weekday lists, and only [`WeeklySchedule::day`] looks inside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklySchedule(pub HashMap<String, Value>);

impl WeeklySchedule {
    /// All seven labels present, each with no entries
    pub fn empty() -> Self {
        Self(
            WEEKDAY_LABELS
                .iter()
                .map(|label| (label.to_string(), Value::Array(Vec::new())))
                .collect(),
        )
    }

    pub fn insert_day(&mut self, label: &str, records: Vec<Value>) {
        self.0.insert(label.to_string(), Value::Array(records));
    }

    /// Records listed under `label`; `None` when the key is absent or
    /// doesn't hold a list
    pub fn day(&self, label: &str) -> Option<&[Value]> {
        self.0
            .get(label)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DaySelector {
    #[default]
    Today,
    Label(String),
}

impl DaySelector {
    /// Blank and `"today"` both mean today; anything else is a literal label
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == "today" {
            DaySelector::Today
        } else {
            DaySelector::Label(value.to_string())
        }
    }
}

/// Pick one day's records out of the schedule, first `max_items` in order
pub fn select(
    schedule: &WeeklySchedule,
    day: &DaySelector,
    max_items: usize,
    clock: &dyn Clock,
) -> Vec<Value> {
    let list = match day {
        DaySelector::Today => {
            let weekday = clock.weekday();
            let label = weekday_label(weekday);
            debug!(label, ?weekday, "Resolved today");

            let list = schedule.day(label);
            if list.is_none() {
                warn!(label, "Schedule has no entry for today");
            }
            list
        }
        DaySelector::Label(label) => schedule.day(label),
    };

    let list = list.unwrap_or_default();
    debug!(day = ?day, count = list.len(), "Selected schedule day");

    list.iter().take(max_items).cloned().collect()
}
