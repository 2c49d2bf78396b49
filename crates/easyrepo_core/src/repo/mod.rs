//! Generic repository layer and its persistence contracts.
//!
//! # Responsibility
//! - Expose one typed CRUD/query surface for any `Record`.
//! - Keep SQL composition inside the repository boundary and delegate
//!   execution to a `RowAccess` implementation.
//!
//! # Invariants
//! - Repository operations return `Outcome`, never a raw fault.
//! - Table and field names travel as SQL text; values travel as bind
//!   parameters.

pub mod query;
pub mod repository;
pub mod row_access;
pub mod sqlite_access;

pub use query::{is_valid_identifier, Query, SortOrder};
pub use repository::{Repository, RepositoryConfig};
pub use row_access::{Record, RepoError, RepoResult, RowAccess};
pub use sqlite_access::{SqliteRecord, SqliteRowAccess};
