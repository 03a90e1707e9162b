use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::config::Config;
use crate::engine::overlap::{self, ImportRef};
use crate::engine::parser::{self, FileFormat};
use crate::engine::period::{self, DetectedPeriod};
use crate::engine::reconcile::{self, DayRecord, ReconcileContext, ReconcileOutcome};
use crate::error::{FatalImportError, RowError};
use crate::model::attendance::MIN_VALID_DATE;
use crate::model::import::{AttendanceImport, ImportType};

/// Final tally of one import run. A non-zero `failed` does not make the
/// run unsuccessful; callers must read the counts independently.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportSummary {
    #[schema(example = 95)]
    pub success: u32,
    #[schema(example = 5)]
    pub failed: u32,
    #[schema(example = 0)]
    pub skipped: u32,
    #[schema(example = 3)]
    pub absent_marked: u32,
    /// Full error count; `errors` below is capped for display.
    #[schema(example = 5)]
    pub total_errors: u32,
    pub errors: Vec<RowError>,
}

impl ImportSummary {
    fn from_outcome(outcome: ReconcileOutcome, success: u32, cap: usize) -> Self {
        let total_errors = outcome.errors.len() as u32;
        let mut errors = outcome.errors;
        errors.truncate(cap);
        Self {
            success,
            failed: outcome.failed,
            skipped: outcome.skipped,
            absent_marked: outcome.absent_marked,
            total_errors,
            errors,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub filename: String,
    pub submitted_by: String,
    pub format: FileFormat,
}

/// Advisory period inference for the caller's import dialog.
pub fn detect_period(bytes: &[u8], format: FileFormat) -> Result<DetectedPeriod, FatalImportError> {
    let events = parser::parse(bytes, format)?;
    period::detect(&events)
}

pub async fn check_overlap(
    pool: &MySqlPool,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<(bool, Vec<ImportRef>), FatalImportError> {
    let conflicts = overlap::find_conflicts(pool, period_start, period_end).await?;
    Ok((!conflicts.is_empty(), conflicts))
}

fn validate_period(start: NaiveDate, end: NaiveDate) -> Result<(), FatalImportError> {
    if start > end {
        return Err(FatalImportError::InvalidPeriod(format!(
            "period start {start} is after period end {end}"
        )));
    }
    if start < MIN_VALID_DATE {
        return Err(FatalImportError::InvalidPeriod(format!(
            "period start {start} is before {MIN_VALID_DATE}"
        )));
    }
    Ok(())
}

/// Run one import end to end: parse, reconcile, upsert day records, write
/// the audit row. Row failures land in the summary; only structural
/// failures abort (and still leave a failed audit row behind). An advisory
/// lock keyed by the period serializes concurrent imports of the same
/// range.
pub async fn run_import(
    pool: &MySqlPool,
    config: &Config,
    bytes: &[u8],
    req: ImportRequest,
) -> Result<(ImportSummary, AttendanceImport), FatalImportError> {
    validate_period(req.period_start, req.period_end)?;

    let lock_name = format!(
        "attendance_import:{}:{}",
        req.period_start, req.period_end
    );
    let mut lock_conn = pool.acquire().await?;
    let locked: Option<i64> = sqlx::query_scalar("SELECT GET_LOCK(?, 0)")
        .bind(&lock_name)
        .fetch_one(lock_conn.as_mut())
        .await?;
    if locked != Some(1) {
        return Err(FatalImportError::ImportLocked);
    }

    let result = import_locked(pool, config, bytes, &req).await;

    // Advisory locks are session scoped and the connection goes back to
    // the pool, so release explicitly on every path.
    if let Err(e) = sqlx::query("SELECT RELEASE_LOCK(?)")
        .bind(&lock_name)
        .execute(lock_conn.as_mut())
        .await
    {
        warn!(error = %e, lock_name, "failed to release import lock");
    }

    result
}

async fn import_locked(
    pool: &MySqlPool,
    config: &Config,
    bytes: &[u8],
    req: &ImportRequest,
) -> Result<(ImportSummary, AttendanceImport), FatalImportError> {
    let events = match parser::parse(bytes, req.format) {
        Ok(events) => events,
        Err(fatal) => {
            // Keep an audit trail of the failed invocation.
            if let Err(e) = insert_import_row(pool, req, None, "failed").await {
                warn!(error = %e, "could not record failed import for audit");
            }
            return Err(fatal);
        }
    };

    let roster = load_roster(pool).await?;
    let holidays = load_holidays(pool, req.period_start, req.period_end).await?;
    let leave_days = load_leave_days(pool, req.period_start, req.period_end).await?;
    let policy = config.shift_policy();

    let ctx = ReconcileContext {
        period_start: req.period_start,
        period_end: req.period_end,
        roster: &roster,
        holidays: &holidays,
        leave_days: &leave_days,
        policy: &policy,
    };
    let outcome = reconcile::reconcile(&events, &ctx);

    let mut success: u32 = 0;
    for record in &outcome.records {
        upsert_record(pool, record).await?;
        success += record.source_rows;
    }

    let summary = ImportSummary::from_outcome(outcome, success, config.max_surfaced_errors);
    let import = insert_import_row(pool, req, Some(&summary), "completed").await?;

    info!(
        import_id = import.id,
        success = summary.success,
        failed = summary.failed,
        skipped = summary.skipped,
        absent_marked = summary.absent_marked,
        "attendance import committed"
    );

    Ok((summary, import))
}

async fn load_roster(pool: &MySqlPool) -> Result<HashMap<String, u64>, FatalImportError> {
    let rows: Vec<(String, u64)> = sqlx::query_as(
        "SELECT biometric_id, id FROM employees WHERE status = 'active'",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

async fn load_holidays(
    pool: &MySqlPool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HashMap<NaiveDate, bool>, FatalImportError> {
    let rows: Vec<(NaiveDate, bool)> = sqlx::query_as(
        "SELECT date, is_working FROM holidays WHERE date BETWEEN ? AND ?",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

async fn load_leave_days(
    pool: &MySqlPool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HashSet<(u64, NaiveDate)>, FatalImportError> {
    let rows: Vec<(u64, NaiveDate, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT employee_id, start_date, end_date
        FROM leave_requests
        WHERE status = 'approved' AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(end)
    .bind(start)
    .fetch_all(pool)
    .await?;

    let mut days = HashSet::new();
    for (employee_id, leave_start, leave_end) in rows {
        let mut date = leave_start.max(start);
        let clipped_end = leave_end.min(end);
        while date <= clipped_end {
            days.insert((employee_id, date));
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
    }
    Ok(days)
}

/// Atomic insert-or-update on the (employee_id, date) unique key. This is
/// what makes re-imports and overlapping imports safe: the last writer
/// wins, no duplicates appear.
pub(crate) async fn upsert_record(
    pool: &MySqlPool,
    record: &DayRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO attendance_records
            (employee_id, date, clock_in, clock_out, break_out, break_in,
             total_hours, overtime_hours, undertime_hours, status, remarks)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            clock_in = VALUES(clock_in),
            clock_out = VALUES(clock_out),
            break_out = VALUES(break_out),
            break_in = VALUES(break_in),
            total_hours = VALUES(total_hours),
            overtime_hours = VALUES(overtime_hours),
            undertime_hours = VALUES(undertime_hours),
            status = VALUES(status),
            remarks = VALUES(remarks)
        "#,
    )
    .bind(record.employee_id)
    .bind(record.date)
    .bind(record.clock_in)
    .bind(record.clock_out)
    .bind(record.break_out)
    .bind(record.break_in)
    .bind(record.hours.total)
    .bind(record.hours.overtime)
    .bind(record.hours.undertime)
    .bind(record.status.to_string())
    .bind(&record.remarks)
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_import_row(
    pool: &MySqlPool,
    req: &ImportRequest,
    summary: Option<&ImportSummary>,
    status: &str,
) -> Result<AttendanceImport, FatalImportError> {
    let import_type = ImportType::from_period(req.period_start, req.period_end);
    let (success, failed, skipped, absent_marked, total_errors) = match summary {
        Some(s) => (s.success, s.failed, s.skipped, s.absent_marked, s.total_errors),
        None => (0, 0, 0, 0, 0),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO attendance_imports
            (period_start, period_end, import_type, filename, submitted_by,
             success_count, failed_count, skipped_count, absent_marked_count,
             total_errors, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(req.period_start)
    .bind(req.period_end)
    .bind(import_type.to_string())
    .bind(&req.filename)
    .bind(&req.submitted_by)
    .bind(success)
    .bind(failed)
    .bind(skipped)
    .bind(absent_marked)
    .bind(total_errors)
    .bind(status)
    .execute(pool)
    .await?;

    let id = result.last_insert_id();
    let import = get_import(pool, id)
        .await?
        .ok_or_else(|| FatalImportError::Database(sqlx::Error::RowNotFound))?;
    Ok(import)
}

pub async fn get_import(
    pool: &MySqlPool,
    import_id: u64,
) -> Result<Option<AttendanceImport>, FatalImportError> {
    let import = sqlx::query_as::<_, AttendanceImport>(
        r#"
        SELECT id, period_start, period_end, import_type, filename, submitted_by,
               success_count, failed_count, skipped_count, absent_marked_count,
               total_errors, status, created_at
        FROM attendance_imports
        WHERE id = ?
        "#,
    )
    .bind(import_id)
    .fetch_optional(pool)
    .await?;
    Ok(import)
}

fn list_offset(page: u32, per_page: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(per_page)
}

pub async fn list_imports(
    pool: &MySqlPool,
    page: u32,
    per_page: u32,
) -> Result<(Vec<AttendanceImport>, i64), FatalImportError> {
    let offset = list_offset(page, per_page);
    let imports = sqlx::query_as::<_, AttendanceImport>(
        r#"
        SELECT id, period_start, period_end, import_type, filename, submitted_by,
               success_count, failed_count, skipped_count, absent_marked_count,
               total_errors, status, created_at
        FROM attendance_imports
        ORDER BY id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance_imports")
        .fetch_one(pool)
        .await?;

    Ok((imports, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RowErrorKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn period_validation() {
        assert!(validate_period(d(2024, 1, 1), d(2024, 1, 15)).is_ok());
        assert!(matches!(
            validate_period(d(2024, 1, 15), d(2024, 1, 1)),
            Err(FatalImportError::InvalidPeriod(_))
        ));
        assert!(matches!(
            validate_period(d(1999, 1, 1), d(2024, 1, 1)),
            Err(FatalImportError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn summary_caps_surfaced_errors_but_counts_all() {
        let outcome = ReconcileOutcome {
            records: Vec::new(),
            errors: (0..25)
                .map(|i| {
                    RowError::new(
                        Some(i + 2),
                        "1042",
                        RowErrorKind::InvalidTime,
                        "unparseable punch time",
                    )
                })
                .collect(),
            failed: 25,
            skipped: 0,
            absent_marked: 0,
        };
        let summary = ImportSummary::from_outcome(outcome, 75, 10);
        assert_eq!(summary.errors.len(), 10);
        assert_eq!(summary.total_errors, 25);
        assert_eq!(summary.failed, 25);
        assert_eq!(summary.success, 75);
    }

    #[test]
    fn list_offset_survives_huge_page_numbers() {
        assert_eq!(list_offset(1, 10), 0);
        assert_eq!(list_offset(3, 10), 20);
        assert_eq!(list_offset(50_000_000, 100), 4_999_999_900);
        assert_eq!(list_offset(0, 100), 0);
    }

    #[test]
    fn detect_period_over_csv_bytes() {
        let csv = "\
Employee ID,Punch Date,Punch Time
1042,2024-01-09,08:00
1042,2024-01-03,08:00
1042,2024-01-15,08:00
";
        let p = detect_period(csv.as_bytes(), FileFormat::Csv).unwrap();
        assert_eq!(p.period_start, d(2024, 1, 3));
        assert_eq!(p.period_end, d(2024, 1, 15));
        assert_eq!(p.total_distinct_dates, 3);
    }

    #[test]
    fn detect_period_rejects_dateless_file() {
        let csv = "Employee ID,Punch Date,Punch Time\n1042,notadate,08:00\n";
        assert!(matches!(
            detect_period(csv.as_bytes(), FileFormat::Csv),
            Err(FatalImportError::NoUsableDates)
        ));
    }
}
