pub mod edit;
pub mod hours;
pub mod orchestrator;
pub mod overlap;
pub mod parser;
pub mod period;
pub mod reconcile;
pub mod status;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

/// Shift expectations applied to every reconciled day. One policy per
/// deployment; per-employee shifts are resolved by the caller before
/// invoking the engine.
#[derive(Debug, Clone)]
pub struct ShiftPolicy {
    pub shift_start: NaiveTime,
    pub expected_hours: f64,
    pub grace_minutes: i64,
    pub rest_days: Vec<Weekday>,
}

impl ShiftPolicy {
    /// Clock-ins strictly after this are classified Late.
    pub fn late_threshold(&self) -> NaiveTime {
        self.shift_start + Duration::minutes(self.grace_minutes)
    }

    pub fn is_rest_day(&self, date: NaiveDate) -> bool {
        self.rest_days.contains(&date.weekday())
    }
}

impl Default for ShiftPolicy {
    fn default() -> Self {
        Self {
            shift_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            expected_hours: 8.0,
            grace_minutes: 15,
            rest_days: vec![Weekday::Sat, Weekday::Sun],
        }
    }
}
