use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum EditRequestStatus {
    #[strum(serialize = "pending")]
    #[serde(rename = "pending")]
    Pending,
    #[strum(serialize = "approved")]
    #[serde(rename = "approved")]
    Approved,
    #[strum(serialize = "rejected")]
    #[serde(rename = "rejected")]
    Rejected,
}

/// Employee-submitted correction proposal for one attendance day. At most
/// one pending request may exist per (employee, date); approval merges the
/// requested times into the attendance record, rejection touches only the
/// request itself.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceEditRequest {
    pub id: u64,
    pub employee_id: u64,

    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub date: NaiveDate,

    /// Snapshot of the record at submission time, for reviewer display.
    #[schema(example = "09:12:00", value_type = String, nullable = true)]
    pub current_time_in: Option<NaiveTime>,
    #[schema(example = "17:00:00", value_type = String, nullable = true)]
    pub current_time_out: Option<NaiveTime>,

    #[schema(example = "08:00:00", value_type = String, nullable = true)]
    pub requested_time_in: Option<NaiveTime>,
    #[schema(example = "17:00:00", value_type = String, nullable = true)]
    pub requested_time_out: Option<NaiveTime>,

    #[schema(example = "forgot to punch in, see gate log")]
    pub reason: String,

    /// JSON array of stored proof image paths.
    #[schema(example = r#"["uploads/proof/2024-01-15-gate.jpg"]"#, nullable = true)]
    pub proof_images: Option<String>,

    #[schema(example = "pending")]
    pub status: String,

    pub reviewer_id: Option<u64>,
    pub review_note: Option<String>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub reviewed_at: Option<DateTime<Utc>>,
}
