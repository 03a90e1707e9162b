use crate::api::attendance_import::{
    DetectPeriodQuery, ImportListQuery, ImportListResponse, ImportQuery, ImportResponse,
    OverlapQuery, OverlapResponse,
};
use crate::api::edit_request::{CreateEditRequest, RejectBody, ReviewerQuery};
use crate::api::stats::{AttendanceStats, StatsQuery};
use crate::engine::orchestrator::ImportSummary;
use crate::engine::overlap::ImportRef;
use crate::error::{RowError, RowErrorKind};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::edit_request::{AttendanceEditRequest, EditRequestStatus};
use crate::model::employee::Employee;
use crate::model::holiday::Holiday;
use crate::model::import::{AttendanceImport, ImportType};
use crate::model::leave_request::LeaveRequest;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Reconciliation Engine API",
        version = "1.0.0",
        description = r#"
## Attendance Reconciliation & Import Engine

Turns raw biometric punch exports (xlsx/xls/csv) into canonical per-employee,
per-day attendance records with derived worked/overtime/undertime hours and a
classified status.

### Key Features
- **Punch Import**
  - Period detection, overlap warnings, idempotent re-imports
  - Partial-row failure handling: the batch completes, failures are reported
- **Attendance Corrections**
  - Employee edit requests with approval/rejection workflow
- **Statistics**
  - Status buckets with present-rollup accounting

### Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance_import::detect_period,
        crate::api::attendance_import::check_overlap,
        crate::api::attendance_import::import,
        crate::api::attendance_import::template,
        crate::api::attendance_import::list_imports,
        crate::api::attendance_import::get_import,

        crate::api::edit_request::create,
        crate::api::edit_request::approve,
        crate::api::edit_request::reject,

        crate::api::stats::stats
    ),
    components(
        schemas(
            DetectPeriodQuery,
            OverlapQuery,
            OverlapResponse,
            ImportQuery,
            ImportResponse,
            ImportListQuery,
            ImportListResponse,
            ImportSummary,
            ImportRef,
            RowError,
            RowErrorKind,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceImport,
            ImportType,
            AttendanceEditRequest,
            EditRequestStatus,
            Employee,
            Holiday,
            LeaveRequest,
            CreateEditRequest,
            RejectBody,
            ReviewerQuery,
            AttendanceStats,
            StatsQuery
        )
    ),
    tags(
        (name = "Attendance Import", description = "Punch file import and reconciliation APIs"),
        (name = "Attendance Edit", description = "Manual correction workflow APIs"),
        (name = "Attendance", description = "Attendance statistics APIs"),
    )
)]
pub struct ApiDoc;
