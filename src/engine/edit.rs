use chrono::{NaiveDate, NaiveTime};
use sqlx::MySqlPool;
use tracing::info;

use crate::engine::hours;
use crate::engine::orchestrator::upsert_record;
use crate::engine::reconcile::DayRecord;
use crate::engine::status::{self, DayContext};
use crate::engine::ShiftPolicy;
use crate::error::EditRequestError;
use crate::model::attendance::{AttendanceRecord, MIN_VALID_DATE};
use crate::model::edit_request::AttendanceEditRequest;

/// Fields of an employee-submitted correction.
#[derive(Debug, Clone)]
pub struct NewEditRequest {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub requested_time_in: Option<NaiveTime>,
    pub requested_time_out: Option<NaiveTime>,
    pub reason: String,
    pub proof_images: Option<String>,
}

/// Dates before the sentinel floor never become attendance records, on
/// the correction path just like on the import path.
fn validate_date(date: NaiveDate) -> Result<(), EditRequestError> {
    if date < MIN_VALID_DATE {
        return Err(EditRequestError::InvalidDate(date));
    }
    Ok(())
}

/// Only the fields present in the request overwrite the record; anything
/// the employee did not ask to change is preserved.
pub fn merge_times(
    existing_in: Option<NaiveTime>,
    existing_out: Option<NaiveTime>,
    requested_in: Option<NaiveTime>,
    requested_out: Option<NaiveTime>,
) -> (Option<NaiveTime>, Option<NaiveTime>) {
    (requested_in.or(existing_in), requested_out.or(existing_out))
}

/// Re-derive hours and status for the merged day so stored figures never
/// drift from the punches.
#[allow(clippy::too_many_arguments)]
pub fn build_merged_day(
    employee_id: u64,
    date: NaiveDate,
    clock_in: Option<NaiveTime>,
    clock_out: Option<NaiveTime>,
    break_out: Option<NaiveTime>,
    break_in: Option<NaiveTime>,
    is_holiday: bool,
    is_working_holiday: bool,
    on_approved_leave: bool,
    remarks: Option<String>,
    policy: &ShiftPolicy,
) -> DayRecord {
    let day_hours = hours::compute(
        clock_in,
        clock_out,
        break_out,
        break_in,
        policy.expected_hours,
    );
    let ctx = DayContext {
        is_holiday,
        is_working_holiday,
        on_approved_leave,
        has_punches: clock_in.is_some()
            || clock_out.is_some()
            || break_out.is_some()
            || break_in.is_some(),
        late: clock_in.is_some_and(|t| t > policy.late_threshold()),
    };
    let classification = status::classify(&day_hours, &ctx);

    DayRecord {
        employee_id,
        date,
        clock_in,
        clock_out,
        break_out,
        break_in,
        hours: day_hours,
        status: classification.status,
        counts_as_present: classification.counts_as_present,
        remarks,
        source_rows: 0,
    }
}

/// Submit a correction. At most one pending request may exist per
/// (employee, date); the current record times are snapshotted for the
/// reviewer.
pub async fn submit(
    pool: &MySqlPool,
    new: NewEditRequest,
) -> Result<AttendanceEditRequest, EditRequestError> {
    validate_date(new.date)?;

    let pending: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM attendance_edit_requests
        WHERE employee_id = ? AND date = ? AND status = 'pending'
        "#,
    )
    .bind(new.employee_id)
    .bind(new.date)
    .fetch_one(pool)
    .await?;
    if pending > 0 {
        return Err(EditRequestError::PendingExists);
    }

    let current: Option<(Option<NaiveTime>, Option<NaiveTime>)> = sqlx::query_as(
        "SELECT clock_in, clock_out FROM attendance_records WHERE employee_id = ? AND date = ?",
    )
    .bind(new.employee_id)
    .bind(new.date)
    .fetch_optional(pool)
    .await?;
    let (current_in, current_out) = current.unwrap_or((None, None));

    let result = sqlx::query(
        r#"
        INSERT INTO attendance_edit_requests
            (employee_id, date, current_time_in, current_time_out,
             requested_time_in, requested_time_out, reason, proof_images, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(new.employee_id)
    .bind(new.date)
    .bind(current_in)
    .bind(current_out)
    .bind(new.requested_time_in)
    .bind(new.requested_time_out)
    .bind(&new.reason)
    .bind(&new.proof_images)
    .execute(pool)
    .await?;

    fetch_request(pool, result.last_insert_id())
        .await?
        .ok_or(EditRequestError::NotFound)
}

/// Approve a pending request: merge the requested times into the day
/// record (creating it if the day has none), re-derive hours and status,
/// upsert, and mark the request approved. Re-approving is rejected.
pub async fn approve(
    pool: &MySqlPool,
    policy: &ShiftPolicy,
    request_id: u64,
    reviewer_id: u64,
) -> Result<AttendanceRecord, EditRequestError> {
    let request = fetch_request(pool, request_id)
        .await?
        .ok_or(EditRequestError::NotFound)?;
    if request.status != "pending" {
        return Err(EditRequestError::AlreadyProcessed(request.status));
    }
    // A stray pre-floor row must never become an attendance record.
    validate_date(request.date)?;

    let existing = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, employee_id, date, clock_in, clock_out, break_out, break_in,
               total_hours, overtime_hours, undertime_hours, status, remarks,
               created_at, updated_at
        FROM attendance_records
        WHERE employee_id = ? AND date = ?
        "#,
    )
    .bind(request.employee_id)
    .bind(request.date)
    .fetch_optional(pool)
    .await?;

    let (clock_in, clock_out) = merge_times(
        existing.as_ref().and_then(|r| r.clock_in),
        existing.as_ref().and_then(|r| r.clock_out),
        request.requested_time_in,
        request.requested_time_out,
    );
    let break_out = existing.as_ref().and_then(|r| r.break_out);
    let break_in = existing.as_ref().and_then(|r| r.break_in);
    let remarks = existing.as_ref().and_then(|r| r.remarks.clone());

    let holiday: Option<(bool,)> =
        sqlx::query_as("SELECT is_working FROM holidays WHERE date = ?")
            .bind(request.date)
            .fetch_optional(pool)
            .await?;
    let on_leave: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM leave_requests
        WHERE employee_id = ? AND status = 'approved'
          AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(request.employee_id)
    .bind(request.date)
    .bind(request.date)
    .fetch_one(pool)
    .await?;

    let merged = build_merged_day(
        request.employee_id,
        request.date,
        clock_in,
        clock_out,
        break_out,
        break_in,
        holiday.is_some(),
        holiday.map(|(w,)| w).unwrap_or(false),
        on_leave > 0,
        remarks,
        policy,
    );
    upsert_record(pool, &merged).await?;

    // Guard against a concurrent reviewer: the status predicate makes the
    // transition itself idempotent.
    let updated = sqlx::query(
        r#"
        UPDATE attendance_edit_requests
        SET status = 'approved', reviewer_id = ?, reviewed_at = NOW()
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(reviewer_id)
    .bind(request_id)
    .execute(pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(EditRequestError::AlreadyProcessed("approved".to_string()));
    }

    info!(request_id, reviewer_id, "attendance edit request approved");

    let record = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, employee_id, date, clock_in, clock_out, break_out, break_in,
               total_hours, overtime_hours, undertime_hours, status, remarks,
               created_at, updated_at
        FROM attendance_records
        WHERE employee_id = ? AND date = ?
        "#,
    )
    .bind(request.employee_id)
    .bind(request.date)
    .fetch_one(pool)
    .await?;
    Ok(record)
}

/// Reject a pending request. The attendance record is left untouched.
pub async fn reject(
    pool: &MySqlPool,
    request_id: u64,
    reviewer_id: u64,
    reason: Option<String>,
) -> Result<(), EditRequestError> {
    let updated = sqlx::query(
        r#"
        UPDATE attendance_edit_requests
        SET status = 'rejected', reviewer_id = ?, review_note = ?, reviewed_at = NOW()
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(reviewer_id)
    .bind(&reason)
    .bind(request_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        let request = fetch_request(pool, request_id)
            .await?
            .ok_or(EditRequestError::NotFound)?;
        return Err(EditRequestError::AlreadyProcessed(request.status));
    }

    info!(request_id, reviewer_id, "attendance edit request rejected");
    Ok(())
}

pub async fn fetch_request(
    pool: &MySqlPool,
    request_id: u64,
) -> Result<Option<AttendanceEditRequest>, EditRequestError> {
    let request = sqlx::query_as::<_, AttendanceEditRequest>(
        r#"
        SELECT id, employee_id, date, current_time_in, current_time_out,
               requested_time_in, requested_time_out, reason, proof_images,
               status, reviewer_id, review_note, created_at, reviewed_at
        FROM attendance_edit_requests
        WHERE id = ?
        "#,
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;

    fn t(h: u32, m: u32) -> Option<NaiveTime> {
        Some(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn pre_2000_date_is_rejected() {
        let sentinel = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert!(matches!(
            validate_date(sentinel),
            Err(EditRequestError::InvalidDate(d)) if d == sentinel
        ));
        assert!(validate_date(d(15)).is_ok());
    }

    #[test]
    fn merge_overwrites_only_requested_fields() {
        assert_eq!(
            merge_times(t(9, 12), t(17, 0), t(8, 0), None),
            (t(8, 0), t(17, 0))
        );
        assert_eq!(merge_times(None, None, t(8, 0), t(17, 0)), (t(8, 0), t(17, 0)));
        assert_eq!(merge_times(t(9, 12), t(17, 0), None, None), (t(9, 12), t(17, 0)));
    }

    #[test]
    fn merged_day_recomputes_hours_and_status() {
        let policy = ShiftPolicy::default();
        // Correcting a 09:12 clock-in back to 08:00 turns Late into Present.
        let day = build_merged_day(
            1,
            d(15),
            t(8, 0),
            t(17, 0),
            t(12, 0),
            t(13, 0),
            false,
            false,
            false,
            None,
            &policy,
        );
        assert_eq!(day.status, AttendanceStatus::Present);
        assert_eq!(day.hours.total, 8.0);
        assert_eq!(day.hours.undertime, 0.0);
    }

    #[test]
    fn merged_day_without_any_punch_is_absent() {
        let policy = ShiftPolicy::default();
        let day = build_merged_day(
            1, d(15), None, None, None, None, false, false, false, None, &policy,
        );
        assert_eq!(day.status, AttendanceStatus::Absent);
    }

    #[test]
    fn merged_day_respects_leave_over_times() {
        let policy = ShiftPolicy::default();
        let day = build_merged_day(
            1,
            d(15),
            t(8, 0),
            t(17, 0),
            None,
            None,
            false,
            false,
            true,
            None,
            &policy,
        );
        assert_eq!(day.status, AttendanceStatus::OnLeave);
        assert!(!day.counts_as_present);
    }
}
