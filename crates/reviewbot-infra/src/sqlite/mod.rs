//! SQLite storage layer.
//!
//! Store implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod pool;
pub mod review;
pub mod session;

pub use pool::{DatabasePool, default_database_url};
pub use review::SqliteReviewStore;
pub use session::SqliteSessionStore;

use chrono::{DateTime, Utc};
use reviewbot_types::error::RepositoryError;

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Map a sqlx failure: pool and I/O problems are connection errors,
/// everything else is a query error.
pub(crate) fn db_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        other => RepositoryError::Query(other.to_string()),
    }
}
