use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Attendance dates before this are sentinel/garbage values from the
/// biometric device and are excluded from every query and aggregate.
pub const MIN_VALID_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(d) => d,
    None => unreachable!(),
};

/// Day-level classification. Stored as its display string; Late, Undertime,
/// Overtime and Holiday (Worked) also roll up into "present" for aggregate
/// statistics (see `Classification::counts_as_present`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum AttendanceStatus {
    #[strum(serialize = "Present")]
    Present,
    #[strum(serialize = "Late")]
    Late,
    #[strum(serialize = "Undertime")]
    Undertime,
    #[strum(serialize = "Overtime")]
    Overtime,
    #[strum(serialize = "On Leave")]
    OnLeave,
    #[strum(serialize = "Holiday (No Work)")]
    HolidayNoWork,
    #[strum(serialize = "Holiday (Worked)")]
    HolidayWorked,
    #[strum(serialize = "Absent")]
    Absent,
}

/// One employee-day. Unique on (employee_id, date); imports and edit
/// approvals upsert against that key, never insert duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,

    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "08:00:00", value_type = String, nullable = true)]
    pub clock_in: Option<NaiveTime>,
    #[schema(example = "17:00:00", value_type = String, nullable = true)]
    pub clock_out: Option<NaiveTime>,
    #[schema(example = "12:00:00", value_type = String, nullable = true)]
    pub break_out: Option<NaiveTime>,
    #[schema(example = "13:00:00", value_type = String, nullable = true)]
    pub break_in: Option<NaiveTime>,

    #[schema(example = 8.0)]
    pub total_hours: f64,
    #[schema(example = 0.0)]
    pub overtime_hours: f64,
    #[schema(example = 0.0)]
    pub undertime_hours: f64,

    #[schema(example = "Present")]
    pub status: String,

    pub remarks: Option<String>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub updated_at: Option<DateTime<Utc>>,
}
