// SQLite storage layer with sqlx
//
// This crate provides database implementations for core traits:
// - DbActivityLog: implements ActivityLogStore for activity log persistence

pub mod activity_log;
pub mod models;
pub mod repositories;

pub use activity_log::{open_db_activity_log, DbActivityLog};
pub use models::*;
pub use repositories::*;
