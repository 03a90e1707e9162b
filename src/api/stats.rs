use std::str::FromStr;

use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::engine::status::counts_as_present;
use crate::model::attendance::{AttendanceStatus, MIN_VALID_DATE};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct StatsQuery {
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(example = "2024-01-31", value_type = String, format = "date")]
    pub to: NaiveDate,
}

/// Per-bucket counts plus the present rollup. A record holds exactly one
/// status, but Late/Undertime/Overtime/Holiday (Worked) still count as
/// present for attendance-rate purposes.
#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct AttendanceStats {
    pub total_records: i64,
    /// Rollup: every status that counts toward presence.
    pub present: i64,
    /// Strictly the `Present` bucket.
    pub on_time: i64,
    pub late: i64,
    pub undertime: i64,
    pub overtime: i64,
    pub on_leave: i64,
    pub holiday_no_work: i64,
    pub holiday_worked: i64,
    pub absent: i64,
    #[schema(example = 92.31)]
    pub attendance_rate: f64,
}

fn build_stats(rows: &[(String, i64)]) -> AttendanceStats {
    let mut stats = AttendanceStats::default();

    for (status, count) in rows {
        let Ok(status) = AttendanceStatus::from_str(status) else {
            continue;
        };
        stats.total_records += count;
        if counts_as_present(status) {
            stats.present += count;
        }
        match status {
            AttendanceStatus::Present => stats.on_time += count,
            AttendanceStatus::Late => stats.late += count,
            AttendanceStatus::Undertime => stats.undertime += count,
            AttendanceStatus::Overtime => stats.overtime += count,
            AttendanceStatus::OnLeave => stats.on_leave += count,
            AttendanceStatus::HolidayNoWork => stats.holiday_no_work += count,
            AttendanceStatus::HolidayWorked => stats.holiday_worked += count,
            AttendanceStatus::Absent => stats.absent += count,
        }
    }

    let denominator = stats.present + stats.absent;
    if denominator > 0 {
        stats.attendance_rate =
            ((stats.present as f64 / denominator as f64) * 10_000.0).round() / 100.0;
    }
    stats
}

/// Aggregate attendance statistics over a date range.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Aggregated statistics", body = AttendanceStats),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn stats(
    pool: web::Data<MySqlPool>,
    query: web::Query<StatsQuery>,
) -> actix_web::Result<impl Responder> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT status, COUNT(*)
        FROM attendance_records
        WHERE date BETWEEN ? AND ? AND date >= ?
        GROUP BY status
        "#,
    )
    .bind(query.from)
    .bind(query.to)
    .bind(MIN_VALID_DATE)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "attendance stats query failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(build_stats(&rows)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_and_overtime_roll_up_into_present() {
        let rows = vec![
            ("Present".to_string(), 10),
            ("Late".to_string(), 3),
            ("Overtime".to_string(), 2),
            ("Holiday (Worked)".to_string(), 1),
            ("Absent".to_string(), 4),
        ];
        let stats = build_stats(&rows);
        assert_eq!(stats.present, 16);
        assert_eq!(stats.on_time, 10);
        assert_eq!(stats.late, 3);
        assert_eq!(stats.absent, 4);
        assert_eq!(stats.total_records, 20);
        assert_eq!(stats.attendance_rate, 80.0);
    }

    #[test]
    fn leave_and_holiday_do_not_count_present() {
        let rows = vec![
            ("On Leave".to_string(), 5),
            ("Holiday (No Work)".to_string(), 2),
        ];
        let stats = build_stats(&rows);
        assert_eq!(stats.present, 0);
        assert_eq!(stats.on_leave, 5);
        assert_eq!(stats.holiday_no_work, 2);
        assert_eq!(stats.attendance_rate, 0.0);
    }

    #[test]
    fn unknown_status_strings_are_ignored() {
        let rows = vec![("Mystery".to_string(), 9), ("Present".to_string(), 1)];
        let stats = build_stats(&rows);
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.present, 1);
        assert_eq!(stats.attendance_rate, 100.0);
    }
}
