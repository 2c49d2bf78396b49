//! SQLite-backed `RowAccess` driven by a declarative record mapping.
//!
//! # Responsibility
//! - Generate insert/update/delete statements from `SqliteRecord` metadata.
//! - Execute raw repository queries and decode rows into records.
//!
//! # Invariants
//! - `to_values()` yields exactly one value per entry of `COLUMNS`, in order.
//! - `update_one`/`delete_one` match on `PRIMARY_KEY` only; a key with no
//!   row is a successful no-op.
//! - `insert_many` is all-or-nothing, inside or outside a caller transaction.

use crate::repo::query::Query;
use crate::repo::row_access::{Record, RepoError, RepoResult, RowAccess};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::marker::PhantomData;

const INSERT_MANY_SAVEPOINT: &str = "easyrepo_insert_many";

/// Column mapping between a record type and its SQLite table.
pub trait SqliteRecord: Record {
    /// Table written by insert/update/delete. Defaults to `TYPE_NAME`;
    /// SQLite resolves table names case-insensitively.
    const TABLE: &'static str = Self::TYPE_NAME;
    /// Column matched by `update_one` and `delete_one`.
    const PRIMARY_KEY: &'static str;
    /// Persisted columns, including `PRIMARY_KEY`.
    const COLUMNS: &'static [&'static str];

    /// Column values in `COLUMNS` order.
    fn to_values(&self) -> Vec<Value>;

    /// Decodes one row selected with `SELECT *`.
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// Row access over a borrowed SQLite connection.
pub struct SqliteRowAccess<'conn, T> {
    conn: &'conn Connection,
    _record: PhantomData<fn() -> T>,
}

impl<'conn, T: SqliteRecord> SqliteRowAccess<'conn, T> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _record: PhantomData,
        }
    }

    fn mapped_values(&self, record: &T) -> RepoResult<Vec<Value>> {
        let values = record.to_values();
        if values.len() != T::COLUMNS.len() {
            return Err(RepoError::InvalidData(format!(
                "{} produced {} values for {} columns",
                T::TYPE_NAME,
                values.len(),
                T::COLUMNS.len()
            )));
        }
        Ok(values)
    }

    fn key_index() -> RepoResult<usize> {
        T::COLUMNS
            .iter()
            .position(|column| *column == T::PRIMARY_KEY)
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "primary key `{}` is not listed in {} columns",
                    T::PRIMARY_KEY,
                    T::TYPE_NAME
                ))
            })
    }

    fn insert_each(&self, sql: &str, records: &[T]) -> RepoResult<()> {
        let mut stmt = self.conn.prepare(sql)?;
        for record in records {
            stmt.execute(params_from_iter(self.mapped_values(record)?))?;
        }
        Ok(())
    }

    fn log_key_miss(op: &str, key: &Value) {
        debug!(
            "event=sql_exec module=repo status=ok op={} table={} key_miss={}={}",
            op,
            T::TABLE,
            T::PRIMARY_KEY,
            describe_value(key)
        );
    }
}

impl<T: SqliteRecord> RowAccess<T> for SqliteRowAccess<'_, T> {
    fn insert_one(&self, record: &T) -> RepoResult<()> {
        let values = self.mapped_values(record)?;
        self.conn.execute(&insert_sql::<T>(), params_from_iter(values))?;
        Ok(())
    }

    fn insert_many(&self, records: &[T]) -> RepoResult<()> {
        let sql = insert_sql::<T>();

        // A savepoint nests inside a caller-opened transaction and behaves as
        // BEGIN/COMMIT in autocommit mode.
        self.conn
            .execute_batch(&format!("SAVEPOINT {INSERT_MANY_SAVEPOINT};"))?;
        if let Err(err) = self.insert_each(&sql, records) {
            let rollback = format!(
                "ROLLBACK TO {INSERT_MANY_SAVEPOINT}; RELEASE {INSERT_MANY_SAVEPOINT};"
            );
            if let Err(rollback_err) = self.conn.execute_batch(&rollback) {
                warn!(
                    "event=sql_exec module=repo status=error op=insert_many_rollback table={} error={}",
                    T::TABLE,
                    rollback_err
                );
            }
            return Err(err);
        }
        self.conn
            .execute_batch(&format!("RELEASE {INSERT_MANY_SAVEPOINT};"))?;

        debug!(
            "event=sql_exec module=repo status=ok op=insert_many table={} rows={}",
            T::TABLE,
            records.len()
        );
        Ok(())
    }

    fn update_one(&self, record: &T) -> RepoResult<()> {
        let key_index = Self::key_index()?;
        let mut values = self.mapped_values(record)?;
        let key = values.remove(key_index);
        if values.is_empty() {
            // Key-only records have nothing to set.
            return Ok(());
        }

        let assignments = T::COLUMNS
            .iter()
            .filter(|column| **column != T::PRIMARY_KEY)
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            T::TABLE,
            assignments,
            T::PRIMARY_KEY
        );

        values.push(key.clone());
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            Self::log_key_miss("update_one", &key);
        }

        Ok(())
    }

    fn delete_one(&self, record: &T) -> RepoResult<()> {
        let key_index = Self::key_index()?;
        let key = self.mapped_values(record)?.swap_remove(key_index);

        let sql = format!("DELETE FROM {} WHERE {} = ?", T::TABLE, T::PRIMARY_KEY);
        let changed = self.conn.execute(&sql, [&key])?;
        if changed == 0 {
            Self::log_key_miss("delete_one", &key);
        }

        Ok(())
    }

    fn raw_query(&self, query: &Query) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(query.sql())?;
        let mut rows = stmt.query(params_from_iter(query.args()))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(T::from_row(row)?);
        }

        debug!(
            "event=sql_exec module=repo status=ok op=raw_query rows={}",
            records.len()
        );
        Ok(records)
    }

    fn raw_update(&self, query: &Query) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute(query.sql(), params_from_iter(query.args()))?;
        Ok(changed)
    }

    fn raw_delete(&self, query: &Query) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute(query.sql(), params_from_iter(query.args()))?;
        Ok(changed)
    }

    fn raw_count(&self, query: &Query) -> RepoResult<i64> {
        let count = self.conn.query_row(
            query.sql(),
            params_from_iter(query.args()),
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count)
    }
}

fn insert_sql<T: SqliteRecord>() -> String {
    let placeholders = (1..=T::COLUMNS.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::TABLE,
        T::COLUMNS.join(", "),
        placeholders
    )
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => format!("'{text}'"),
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}
