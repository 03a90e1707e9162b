use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Calendar holiday. A working holiday still expects punches; a
/// non-working one suppresses absence synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    pub id: u64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "New Year's Day")]
    pub name: String,

    #[schema(example = false)]
    pub is_working: bool,
}
