//! Record and row-access contracts consumed by the generic repository.
//!
//! # Responsibility
//! - Define the single fault type surfaced by repository operations.
//! - Define the capability that performs the actual persistence work.
//!
//! # Invariants
//! - Implementations own every storage side effect; the repository owns none.
//! - `raw_*` methods bind `Query::args` positionally, in order.

use crate::db::DbError;
use crate::repo::query::Query;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Fault captured by a repository operation.
#[derive(Debug)]
pub enum RepoError {
    /// Anything SQLite raised: constraint, malformed SQL, bind mismatch, I/O.
    Db(DbError),
    /// A composed table/field/column name failed identifier validation.
    InvalidIdentifier(String),
    /// A stored row could not be decoded into the record type.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid SQL identifier `{name}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted row data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidIdentifier(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// A caller-defined type stored as one row of one table.
pub trait Record: Sized {
    /// Declared type identifier; the default table name is derived from it.
    const TYPE_NAME: &'static str;
}

/// Persistence capability the repository delegates to.
///
/// Key-matched operations (`update_one`, `delete_one`) decide their match
/// column; [`SqliteRowAccess`](crate::repo::sqlite_access::SqliteRowAccess)
/// uses the record's declared primary key.
pub trait RowAccess<T: Record> {
    fn insert_one(&self, record: &T) -> RepoResult<()>;
    fn insert_many(&self, records: &[T]) -> RepoResult<()>;
    fn update_one(&self, record: &T) -> RepoResult<()>;
    fn delete_one(&self, record: &T) -> RepoResult<()>;
    fn raw_query(&self, query: &Query) -> RepoResult<Vec<T>>;
    fn raw_update(&self, query: &Query) -> RepoResult<usize>;
    fn raw_delete(&self, query: &Query) -> RepoResult<usize>;
    fn raw_count(&self, query: &Query) -> RepoResult<i64>;
}

impl<T: Record, A: RowAccess<T> + ?Sized> RowAccess<T> for &A {
    fn insert_one(&self, record: &T) -> RepoResult<()> {
        (**self).insert_one(record)
    }

    fn insert_many(&self, records: &[T]) -> RepoResult<()> {
        (**self).insert_many(records)
    }

    fn update_one(&self, record: &T) -> RepoResult<()> {
        (**self).update_one(record)
    }

    fn delete_one(&self, record: &T) -> RepoResult<()> {
        (**self).delete_one(record)
    }

    fn raw_query(&self, query: &Query) -> RepoResult<Vec<T>> {
        (**self).raw_query(query)
    }

    fn raw_update(&self, query: &Query) -> RepoResult<usize> {
        (**self).raw_update(query)
    }

    fn raw_delete(&self, query: &Query) -> RepoResult<usize> {
        (**self).raw_delete(query)
    }

    fn raw_count(&self, query: &Query) -> RepoResult<i64> {
        (**self).raw_count(query)
    }
}
