//! Generic SQLite repository layer.
//! Gives any record type CRUD, field queries, paging, sorting and raw SQL
//! behind one `Outcome`-returning surface.

pub mod db;
pub mod logging;
pub mod outcome;
pub mod repo;

pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use outcome::Outcome;
pub use repo::{
    Query, Record, RepoError, RepoResult, Repository, RepositoryConfig, RowAccess, SortOrder,
    SqliteRecord, SqliteRowAccess,
};

/// Minimal health-check API for linkage checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
