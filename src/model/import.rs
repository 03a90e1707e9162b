use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Span-derived batch granularity: more than 14 days is a monthly import.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum ImportType {
    #[strum(serialize = "weekly")]
    #[serde(rename = "weekly")]
    Weekly,
    #[strum(serialize = "monthly")]
    #[serde(rename = "monthly")]
    Monthly,
}

impl ImportType {
    pub fn from_period(period_start: NaiveDate, period_end: NaiveDate) -> Self {
        let days = (period_end - period_start).num_days() + 1;
        if days > 14 {
            ImportType::Monthly
        } else {
            ImportType::Weekly
        }
    }
}

/// Audit row for one import invocation. Append-only; attendance records are
/// keyed by (employee, date) and deliberately not foreign-keyed to this, so
/// a later overlapping import silently supersedes earlier records.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceImport {
    pub id: u64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub period_end: NaiveDate,

    #[schema(example = "monthly")]
    pub import_type: String,

    #[schema(example = "punches-january.xlsx")]
    pub filename: String,

    #[schema(example = "hr.admin")]
    pub submitted_by: String,

    #[schema(example = 95)]
    pub success_count: u32,
    #[schema(example = 5)]
    pub failed_count: u32,
    #[schema(example = 0)]
    pub skipped_count: u32,
    #[schema(example = 3)]
    pub absent_marked_count: u32,
    #[schema(example = 5)]
    pub total_errors: u32,

    #[schema(example = "completed")]
    pub status: String,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn fourteen_day_span_is_weekly() {
        let t = ImportType::from_period(d(2024, 1, 1), d(2024, 1, 14));
        assert_eq!(t, ImportType::Weekly);
    }

    #[test]
    fn fifteen_day_span_is_monthly() {
        let t = ImportType::from_period(d(2024, 1, 1), d(2024, 1, 15));
        assert_eq!(t, ImportType::Monthly);
    }

    #[test]
    fn single_day_span_is_weekly() {
        let t = ImportType::from_period(d(2024, 1, 1), d(2024, 1, 1));
        assert_eq!(t, ImportType::Weekly);
    }
}
