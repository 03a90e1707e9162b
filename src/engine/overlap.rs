use chrono::NaiveDate;
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::error::FatalImportError;
use crate::model::attendance::MIN_VALID_DATE;

/// Reference to a committed import whose period intersects a candidate.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ImportRef {
    pub id: u64,
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub period_end: NaiveDate,
    #[schema(example = "punches-january.xlsx")]
    pub filename: String,
}

/// Inclusive range intersection; a shared boundary date counts.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Committed imports whose period intersects the candidate. Overlap is a
/// warning for the caller, never a block: proceeding overwrites the
/// overlapping day records via upsert.
pub async fn find_conflicts(
    pool: &MySqlPool,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<Vec<ImportRef>, FatalImportError> {
    let conflicts = sqlx::query_as::<_, ImportRef>(
        r#"
        SELECT id, period_start, period_end, filename
        FROM attendance_imports
        WHERE status = 'completed'
          AND period_start <= ?
          AND period_end >= ?
          AND period_start >= ?
        ORDER BY id DESC
        "#,
    )
    .bind(period_end)
    .bind(period_start)
    .bind(MIN_VALID_DATE)
    .fetch_all(pool)
    .await?;

    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn shared_boundary_date_overlaps() {
        assert!(ranges_overlap(
            d(2024, 1, 1),
            d(2024, 1, 15),
            d(2024, 1, 15),
            d(2024, 1, 20)
        ));
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        assert!(!ranges_overlap(
            d(2024, 1, 1),
            d(2024, 1, 14),
            d(2024, 1, 15),
            d(2024, 1, 20)
        ));
    }

    #[test]
    fn containment_overlaps() {
        assert!(ranges_overlap(
            d(2024, 1, 5),
            d(2024, 1, 10),
            d(2024, 1, 1),
            d(2024, 1, 31)
        ));
    }
}
