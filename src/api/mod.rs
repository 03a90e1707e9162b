pub mod attendance_import;
pub mod edit_request;
pub mod stats;
