use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;
use crate::engine::orchestrator::{self, ImportRequest, ImportSummary};
use crate::engine::overlap::ImportRef;
use crate::engine::parser::{self, FileFormat};
use crate::error::FatalImportError;
use crate::model::import::AttendanceImport;

fn fatal_to_response(e: FatalImportError) -> actix_web::Result<HttpResponse> {
    match e {
        FatalImportError::ImportLocked => Ok(HttpResponse::Conflict().json(serde_json::json!({
            "message": e.to_string()
        }))),
        e if e.is_client_error() => Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": e.to_string()
        }))),
        e => {
            tracing::error!(error = %e, "attendance import failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

fn parse_format(raw: &str) -> Result<FileFormat, HttpResponse> {
    raw.parse::<FileFormat>().map_err(|e| {
        HttpResponse::BadRequest().json(serde_json::json!({ "message": e.to_string() }))
    })
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DetectPeriodQuery {
    /// File format: xlsx, xls or csv
    #[schema(example = "csv")]
    pub format: String,
}

/// Infer the pay period covered by an uploaded punch file. Advisory: the
/// period actually committed is the one declared on the import call.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/import/detect-period",
    params(DetectPeriodQuery),
    request_body(content = String, description = "Raw file bytes", content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Detected period", body = Object, example = json!({
            "period_start": "2024-01-01",
            "period_end": "2024-01-15",
            "total_distinct_dates": 11
        })),
        (status = 400, description = "Unreadable file or no usable dates"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance Import"
)]
pub async fn detect_period(
    query: web::Query<DetectPeriodQuery>,
    body: web::Bytes,
) -> actix_web::Result<impl Responder> {
    let format = match parse_format(&query.format) {
        Ok(f) => f,
        Err(resp) => return Ok(resp),
    };

    match orchestrator::detect_period(&body, format) {
        Ok(period) => Ok(HttpResponse::Ok().json(period)),
        Err(e) => fatal_to_response(e),
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct OverlapQuery {
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub period_end: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct OverlapResponse {
    pub has_overlap: bool,
    pub conflicts: Vec<ImportRef>,
}

/// Warn about committed imports whose period intersects the candidate.
/// Overlap never blocks; proceeding overwrites the overlapping days.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/import/check-overlap",
    params(OverlapQuery),
    responses(
        (status = 200, description = "Overlap check result", body = OverlapResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance Import"
)]
pub async fn check_overlap(
    pool: web::Data<MySqlPool>,
    query: web::Query<OverlapQuery>,
) -> actix_web::Result<impl Responder> {
    match orchestrator::check_overlap(pool.get_ref(), query.period_start, query.period_end).await {
        Ok((has_overlap, conflicts)) => Ok(HttpResponse::Ok().json(OverlapResponse {
            has_overlap,
            conflicts,
        })),
        Err(e) => fatal_to_response(e),
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ImportQuery {
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub period_end: NaiveDate,
    #[schema(example = "csv")]
    pub format: String,
    #[schema(example = "punches-january.csv")]
    pub filename: Option<String>,
    #[schema(example = "hr.admin")]
    pub submitted_by: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ImportResponse {
    pub summary: ImportSummary,
    pub import: AttendanceImport,
}

/// Run a full import of the uploaded punch file against the declared
/// period. Row failures are reported in the summary without aborting the
/// batch; the response is the audit row plus the tally.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/import",
    params(ImportQuery),
    request_body(content = String, description = "Raw file bytes", content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Import committed", body = ImportResponse),
        (status = 400, description = "Fatal import error (unreadable file, bad period)"),
        (status = 409, description = "Another import for this period is running"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance Import"
)]
pub async fn import(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ImportQuery>,
    body: web::Bytes,
) -> actix_web::Result<impl Responder> {
    let format = match parse_format(&query.format) {
        Ok(f) => f,
        Err(resp) => return Ok(resp),
    };

    let request = ImportRequest {
        period_start: query.period_start,
        period_end: query.period_end,
        filename: query
            .filename
            .clone()
            .unwrap_or_else(|| "upload".to_string()),
        submitted_by: query
            .submitted_by
            .clone()
            .unwrap_or_else(|| "system".to_string()),
        format,
    };

    match orchestrator::run_import(pool.get_ref(), config.get_ref(), &body, request).await {
        Ok((summary, import)) => Ok(HttpResponse::Ok().json(ImportResponse { summary, import })),
        Err(e) => fatal_to_response(e),
    }
}

/// Column template for caller-side validation UI.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/import/template",
    responses(
        (status = 200, description = "Expected column headers", body = Object, example = json!({
            "schema_version": 1,
            "headers": ["Employee ID", "Punch Date", "Punch Time", "Punch Type"]
        }))
    ),
    tag = "Attendance Import"
)]
pub async fn template() -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "schema_version": parser::SCHEMA_VERSION,
        "headers": parser::expected_headers(),
    })))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ImportListQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ImportListResponse {
    pub data: Vec<AttendanceImport>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance/imports",
    params(ImportListQuery),
    responses(
        (status = 200, description = "Import audit trail", body = ImportListResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance Import"
)]
pub async fn list_imports(
    pool: web::Data<MySqlPool>,
    query: web::Query<ImportListQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);

    match orchestrator::list_imports(pool.get_ref(), page, per_page).await {
        Ok((data, total)) => Ok(HttpResponse::Ok().json(ImportListResponse {
            data,
            page,
            per_page,
            total,
        })),
        Err(e) => fatal_to_response(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance/imports/{import_id}",
    params(
        ("import_id" = u64, Path, description = "Import batch ID")
    ),
    responses(
        (status = 200, description = "Import batch", body = AttendanceImport),
        (status = 404, description = "Import not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance Import"
)]
pub async fn get_import(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let import_id = path.into_inner();
    match orchestrator::get_import(pool.get_ref(), import_id).await {
        Ok(Some(import)) => Ok(HttpResponse::Ok().json(import)),
        Ok(None) => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Import not found"
        }))),
        Err(e) => fatal_to_response(e),
    }
}
