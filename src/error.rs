use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors that abort an entire import run. Nothing is persisted except,
/// when a period was declared, a `failed` AttendanceImport row for audit.
#[derive(Debug, Error)]
pub enum FatalImportError {
    #[error("file could not be read: {0}")]
    UnreadableFile(String),

    #[error("unsupported file format '{0}', expected xlsx, xls or csv")]
    UnsupportedFormat(String),

    #[error("required column '{0}' not found in header row")]
    MissingColumn(&'static str),

    #[error("no usable punch dates found in file")]
    NoUsableDates,

    #[error("invalid import period: {0}")]
    InvalidPeriod(String),

    #[error("another import covering this period is already running")]
    ImportLocked,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl FatalImportError {
    /// True for caller mistakes (bad file, bad period), false for
    /// infrastructure failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, FatalImportError::Database(_))
    }
}

/// Per-row failure classification. `DuplicatePunch` and `OutOfPeriod` are
/// counted as skipped; the rest as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    UnknownEmployee,
    InvalidDate,
    InvalidTime,
    DuplicatePunch,
    OutOfPeriod,
}

impl RowErrorKind {
    pub fn is_skip(&self) -> bool {
        matches!(self, RowErrorKind::DuplicatePunch | RowErrorKind::OutOfPeriod)
    }
}

/// A single failed or skipped row. Collected into the import summary,
/// never raised as an error.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RowError {
    /// 1-based row number in the source file, when known.
    #[schema(example = 17)]
    pub row: Option<usize>,
    #[schema(example = "BIO-0042")]
    pub biometric_id: String,
    pub kind: RowErrorKind,
    #[schema(example = "no active employee with this biometric id")]
    pub message: String,
}

impl RowError {
    pub fn new(
        row: Option<usize>,
        biometric_id: impl Into<String>,
        kind: RowErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row,
            biometric_id: biometric_id.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Failures of the manual-correction workflow.
#[derive(Debug, Error)]
pub enum EditRequestError {
    #[error("edit request not found")]
    NotFound,

    #[error("attendance date {0} is before the minimum valid date")]
    InvalidDate(chrono::NaiveDate),

    #[error("edit request already processed (status: {0})")]
    AlreadyProcessed(String),

    #[error("a pending edit request already exists for this employee and date")]
    PendingExists,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
