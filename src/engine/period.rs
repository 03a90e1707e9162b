use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::engine::parser::PunchEvent;
use crate::error::FatalImportError;
use crate::model::attendance::MIN_VALID_DATE;

/// Period inferred from the punch dates in a file. Advisory: it seeds the
/// caller's declared import window, the committed period is whatever the
/// caller supplies at import time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DetectedPeriod {
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub period_end: NaiveDate,
    #[schema(example = 11)]
    pub total_distinct_dates: usize,
}

/// Min/max over the valid punch dates. Dates before 2000-01-01 are device
/// sentinels and are ignored; a file with none left fails.
pub fn detect(events: &[PunchEvent]) -> Result<DetectedPeriod, FatalImportError> {
    let dates: HashSet<NaiveDate> = events
        .iter()
        .filter_map(|e| e.date)
        .filter(|d| *d >= MIN_VALID_DATE)
        .collect();

    let period_start = *dates.iter().min().ok_or(FatalImportError::NoUsableDates)?;
    let period_end = *dates.iter().max().expect("non-empty set has a max");

    Ok(DetectedPeriod {
        period_start,
        period_end,
        total_distinct_dates: dates.len(),
    })
}
