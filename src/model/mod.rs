pub mod attendance;
pub mod edit_request;
pub mod employee;
pub mod holiday;
pub mod import;
pub mod leave_request;
