use actix_web::{web, HttpResponse, Responder};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::config::Config;
use crate::engine::edit::{self, NewEditRequest};
use crate::error::EditRequestError;

fn edit_error_to_response(e: EditRequestError) -> actix_web::Result<HttpResponse> {
    match e {
        EditRequestError::NotFound => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": e.to_string()
        }))),
        EditRequestError::AlreadyProcessed(_)
        | EditRequestError::PendingExists
        | EditRequestError::InvalidDate(_) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string()
            })))
        }
        EditRequestError::Database(e) => {
            tracing::error!(error = %e, "edit request operation failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateEditRequest {
    #[schema(example = 1)]
    pub employee_id: u64,

    #[schema(example = "2024-01-15", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "08:00:00", value_type = String, nullable = true)]
    pub requested_time_in: Option<NaiveTime>,
    #[schema(example = "17:00:00", value_type = String, nullable = true)]
    pub requested_time_out: Option<NaiveTime>,

    #[schema(example = "forgot to punch in, see gate log")]
    pub reason: String,

    #[schema(example = json!(["uploads/proof/2024-01-15-gate.jpg"]))]
    pub proof_images: Option<Vec<String>>,
}

/// Submit a correction proposal for one attendance day.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/edit-requests",
    request_body = CreateEditRequest,
    responses(
        (status = 201, description = "Edit request created"),
        (status = 400, description = "A pending request already exists for this day, or the date is invalid"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance Edit"
)]
pub async fn create(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEditRequest>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let proof_images = match &payload.proof_images {
        Some(paths) => Some(
            serde_json::to_string(paths)
                .map_err(actix_web::error::ErrorInternalServerError)?,
        ),
        None => None,
    };

    let new = NewEditRequest {
        employee_id: payload.employee_id,
        date: payload.date,
        requested_time_in: payload.requested_time_in,
        requested_time_out: payload.requested_time_out,
        reason: payload.reason,
        proof_images,
    };

    match edit::submit(pool.get_ref(), new).await {
        Ok(request) => Ok(HttpResponse::Created().json(request)),
        Err(e) => edit_error_to_response(e),
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ReviewerQuery {
    #[schema(example = 7)]
    pub reviewer_id: u64,
}

/// Approve a pending edit request. Merges the requested times into the
/// attendance record and re-derives hours and status. Approving an
/// already-processed request is rejected.
#[utoipa::path(
    put,
    path = "/api/v1/attendance/edit-requests/{request_id}/approve",
    params(
        ("request_id" = u64, Path, description = "Edit request ID"),
        ReviewerQuery
    ),
    responses(
        (status = 200, description = "Request approved, merged record returned"),
        (status = 400, description = "Request already processed"),
        (status = 404, description = "Request not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance Edit"
)]
pub async fn approve(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<ReviewerQuery>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();
    let policy = config.shift_policy();

    match edit::approve(pool.get_ref(), &policy, request_id, query.reviewer_id).await {
        Ok(record) => Ok(HttpResponse::Ok().json(record)),
        Err(e) => edit_error_to_response(e),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RejectBody {
    #[schema(example = "proof image does not match the gate log")]
    pub reason: Option<String>,
}

/// Reject a pending edit request. The attendance record is untouched.
#[utoipa::path(
    put,
    path = "/api/v1/attendance/edit-requests/{request_id}/reject",
    params(
        ("request_id" = u64, Path, description = "Edit request ID"),
        ReviewerQuery
    ),
    request_body = RejectBody,
    responses(
        (status = 200, description = "Request rejected"),
        (status = 400, description = "Request already processed"),
        (status = 404, description = "Request not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance Edit"
)]
pub async fn reject(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<ReviewerQuery>,
    payload: web::Json<RejectBody>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();

    match edit::reject(
        pool.get_ref(),
        request_id,
        query.reviewer_id,
        payload.reason.clone(),
    )
    .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Edit request rejected"
        }))),
        Err(e) => edit_error_to_response(e),
    }
}
