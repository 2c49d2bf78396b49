//! Generic repository: CRUD, field queries, paging, sorting and raw SQL
//! over any `Record`, delegated to an injected `RowAccess`.
//!
//! # Responsibility
//! - Derive a fixed table name from the record type once per instance.
//! - Translate each operation into one `Query` or one row-access call.
//! - Convert every fault into `Outcome::Error` at the operation boundary.
//!
//! # Invariants
//! - No operation returns `Err` or panics on a storage fault.
//! - Identifiers are composed into SQL text; values are bound, never the
//!   reverse.
//! - With `validate_identifiers` on, a composed identifier that is not a
//!   plain SQL name fails before anything reaches storage.

use crate::outcome::Outcome;
use crate::repo::query::{Query, SortOrder, Statement};
use crate::repo::row_access::{Record, RepoResult, RowAccess};
use log::{debug, warn};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::time::Instant;

/// Construction options for [`Repository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Lowercase `Record::TYPE_NAME` when deriving the table name.
    pub lowercase_table_names: bool,
    /// Reject composed identifiers that are not plain SQL names.
    ///
    /// Raw SQL passed to `custom_*` is never checked.
    pub validate_identifiers: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            lowercase_table_names: false,
            validate_identifiers: true,
        }
    }
}

/// Reusable data-access surface for one record type.
pub struct Repository<T: Record, A: RowAccess<T>> {
    access: A,
    table: String,
    config: RepositoryConfig,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record, A: RowAccess<T>> Repository<T, A> {
    /// Creates a repository with default configuration.
    pub fn new(access: A) -> Self {
        Self::with_config(access, RepositoryConfig::default())
    }

    pub fn with_config(access: A, config: RepositoryConfig) -> Self {
        let table = if config.lowercase_table_names {
            T::TYPE_NAME.to_lowercase()
        } else {
            T::TYPE_NAME.to_string()
        };

        Self {
            access,
            table,
            config,
            _record: PhantomData,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    // CRUD

    pub fn insert(&self, record: &T) -> Outcome<()> {
        self.run("insert", &self.table, || self.access.insert_one(record))
    }

    pub fn insert_all(&self, records: &[T]) -> Outcome<()> {
        self.run("insert_all", &self.table, || self.access.insert_many(records))
    }

    pub fn update(&self, record: &T) -> Outcome<()> {
        self.run("update", &self.table, || self.access.update_one(record))
    }

    pub fn delete(&self, record: &T) -> Outcome<()> {
        self.run("delete", &self.table, || self.access.delete_one(record))
    }

    /// Deletes every row in the table and returns how many went.
    pub fn delete_all(&self) -> Outcome<usize> {
        self.run("delete_all", &self.table, || {
            let query = self.generated(
                Statement::DeleteAll { table: &self.table },
                Vec::new(),
            )?;
            self.access.raw_delete(&query)
        })
    }

    // Basic queries

    pub fn find_all(&self) -> Outcome<Vec<T>> {
        self.run("find_all", &self.table, || {
            let query = self.generated(
                Statement::SelectAll { table: &self.table },
                Vec::new(),
            )?;
            self.access.raw_query(&query)
        })
    }

    pub fn count(&self) -> Outcome<i64> {
        self.run("count", &self.table, || {
            let query = self.generated(
                Statement::CountAll { table: &self.table },
                Vec::new(),
            )?;
            self.access.raw_count(&query)
        })
    }

    // Field queries

    pub fn find_by_field(&self, field: &str, value: impl Into<Value>) -> Outcome<Vec<T>> {
        self.find_by_field_in(&self.table, field, value)
    }

    /// Same as [`find_by_field`](Self::find_by_field) against `table`.
    pub fn find_by_field_in(
        &self,
        table: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Outcome<Vec<T>> {
        let value = value.into();
        self.run("find_by_field", table, || {
            let query = self.generated(Statement::SelectWhere { table, field }, vec![value])?;
            self.access.raw_query(&query)
        })
    }

    pub fn delete_by_field(&self, field: &str, value: impl Into<Value>) -> Outcome<usize> {
        self.delete_by_field_in(&self.table, field, value)
    }

    pub fn delete_by_field_in(
        &self,
        table: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Outcome<usize> {
        let value = value.into();
        self.run("delete_by_field", table, || {
            let query = self.generated(Statement::DeleteWhere { table, field }, vec![value])?;
            self.access.raw_delete(&query)
        })
    }

    /// Sets `field = new_value` on rows where `where_field = where_value`.
    pub fn update_field(
        &self,
        field: &str,
        new_value: impl Into<Value>,
        where_field: &str,
        where_value: impl Into<Value>,
    ) -> Outcome<usize> {
        self.update_field_in(&self.table, field, new_value, where_field, where_value)
    }

    pub fn update_field_in(
        &self,
        table: &str,
        field: &str,
        new_value: impl Into<Value>,
        where_field: &str,
        where_value: impl Into<Value>,
    ) -> Outcome<usize> {
        // Bind order follows placeholder order: SET value, then WHERE value.
        let args = vec![new_value.into(), where_value.into()];
        self.run("update_field", table, || {
            let statement = Statement::UpdateWhere {
                table,
                set: field,
                filter: where_field,
            };
            let query = self.generated(statement, args)?;
            self.access.raw_update(&query)
        })
    }

    // Pagination & sorting

    pub fn find_with_limit(&self, limit: u32) -> Outcome<Vec<T>> {
        self.run("find_with_limit", &self.table, || {
            let query = self.generated(
                Statement::SelectLimit { table: &self.table },
                vec![Value::Integer(i64::from(limit))],
            )?;
            self.access.raw_query(&query)
        })
    }

    pub fn find_with_limit_offset(&self, limit: u32, offset: u32) -> Outcome<Vec<T>> {
        self.run("find_with_limit_offset", &self.table, || {
            let query = self.generated(
                Statement::SelectLimitOffset { table: &self.table },
                vec![
                    Value::Integer(i64::from(limit)),
                    Value::Integer(i64::from(offset)),
                ],
            )?;
            self.access.raw_query(&query)
        })
    }

    pub fn find_all_sorted(&self, order_by: &str, order: SortOrder) -> Outcome<Vec<T>> {
        self.run("find_all_sorted", &self.table, || {
            let statement = Statement::SelectSorted {
                table: &self.table,
                column: order_by,
                order,
            };
            let query = self.generated(statement, Vec::new())?;
            self.access.raw_query(&query)
        })
    }

    // Raw SQL

    pub fn custom_query_list(&self, sql: &str, args: &[Value]) -> Outcome<Vec<T>> {
        self.run("custom_query_list", &self.table, || {
            self.access.raw_query(&Query::new(sql, args.to_vec()))
        })
    }

    /// Returns the first matching row, or `Success(None)` when none match.
    pub fn custom_query_single(&self, sql: &str, args: &[Value]) -> Outcome<Option<T>> {
        self.run("custom_query_single", &self.table, || {
            let rows = self.access.raw_query(&Query::new(sql, args.to_vec()))?;
            Ok(rows.into_iter().next())
        })
    }

    pub fn custom_update(&self, sql: &str, args: &[Value]) -> Outcome<usize> {
        self.run("custom_update", &self.table, || {
            self.access.raw_update(&Query::new(sql, args.to_vec()))
        })
    }

    pub fn custom_delete(&self, sql: &str, args: &[Value]) -> Outcome<usize> {
        self.run("custom_delete", &self.table, || {
            self.access.raw_delete(&Query::new(sql, args.to_vec()))
        })
    }

    fn generated(&self, statement: Statement<'_>, args: Vec<Value>) -> RepoResult<Query> {
        if self.config.validate_identifiers {
            statement.validate()?;
        }
        Ok(Query::new(statement.sql(), args))
    }

    fn run<R>(
        &self,
        op: &'static str,
        table: &str,
        action: impl FnOnce() -> RepoResult<R>,
    ) -> Outcome<R> {
        let started_at = Instant::now();
        match action() {
            Ok(payload) => {
                debug!(
                    "event=repo_op module=repo status=ok op={} table={} duration_ms={}",
                    op,
                    table,
                    started_at.elapsed().as_millis()
                );
                Outcome::success(payload)
            }
            Err(err) => {
                warn!(
                    "event=repo_op module=repo status=error op={} table={} duration_ms={} error={}",
                    op,
                    table,
                    started_at.elapsed().as_millis(),
                    err
                );
                Outcome::error(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Repository, RepositoryConfig};
    use crate::db::DbError;
    use crate::repo::query::{Query, SortOrder};
    use crate::repo::row_access::{Record, RepoError, RepoResult, RowAccess};
    use rusqlite::types::Value;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget(i64);

    impl Record for Widget {
        const TYPE_NAME: &'static str = "WidgetItem";
    }

    /// Records every raw query and answers from a canned row set.
    #[derive(Default)]
    struct RecordingAccess {
        rows: Vec<Widget>,
        failing: bool,
        seen: RefCell<Vec<Query>>,
    }

    impl RecordingAccess {
        fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        fn last(&self) -> Query {
            self.seen.borrow().last().cloned().unwrap()
        }

        fn fault(&self) -> RepoResult<()> {
            if self.failing {
                return Err(RepoError::Db(DbError::Sqlite(rusqlite::Error::InvalidQuery)));
            }
            Ok(())
        }

        fn record(&self, query: &Query) -> RepoResult<()> {
            self.seen.borrow_mut().push(query.clone());
            self.fault()
        }
    }

    impl RowAccess<Widget> for RecordingAccess {
        fn insert_one(&self, _record: &Widget) -> RepoResult<()> {
            self.fault()
        }

        fn insert_many(&self, _records: &[Widget]) -> RepoResult<()> {
            self.fault()
        }

        fn update_one(&self, _record: &Widget) -> RepoResult<()> {
            self.fault()
        }

        fn delete_one(&self, _record: &Widget) -> RepoResult<()> {
            self.fault()
        }

        fn raw_query(&self, query: &Query) -> RepoResult<Vec<Widget>> {
            self.record(query)?;
            Ok(self.rows.clone())
        }

        fn raw_update(&self, query: &Query) -> RepoResult<usize> {
            self.record(query)?;
            Ok(3)
        }

        fn raw_delete(&self, query: &Query) -> RepoResult<usize> {
            self.record(query)?;
            Ok(2)
        }

        fn raw_count(&self, query: &Query) -> RepoResult<i64> {
            self.record(query)?;
            Ok(self.rows.len() as i64)
        }
    }

    fn widget_repo(
        access: &RecordingAccess,
        config: RepositoryConfig,
    ) -> Repository<Widget, &RecordingAccess> {
        Repository::with_config(access, config)
    }

    fn lowercase() -> RepositoryConfig {
        RepositoryConfig {
            lowercase_table_names: true,
            ..RepositoryConfig::default()
        }
    }

    #[test]
    fn table_name_follows_lowercase_flag() {
        let access = RecordingAccess::default();
        assert_eq!(
            widget_repo(&access, RepositoryConfig::default()).table_name(),
            "WidgetItem"
        );
        assert_eq!(widget_repo(&access, lowercase()).table_name(), "widgetitem");
    }

    #[test]
    fn count_and_delete_all_target_derived_table() {
        let access = RecordingAccess {
            rows: vec![Widget(1), Widget(2)],
            ..RecordingAccess::default()
        };
        let repo = widget_repo(&access, lowercase());

        assert_eq!(repo.count().into_data(), Some(2));
        assert_eq!(access.last().sql(), "SELECT COUNT(*) FROM widgetitem");

        assert_eq!(repo.delete_all().into_data(), Some(2));
        let query = access.last();
        assert_eq!(query.sql(), "DELETE FROM widgetitem");
        assert!(query.args().is_empty());
    }

    #[test]
    fn update_field_binds_new_value_before_where_value() {
        let access = RecordingAccess::default();
        let repo = widget_repo(&access, RepositoryConfig::default());

        let updated = repo.update_field("name", "Jack".to_string(), "id", 9_i64);
        assert_eq!(updated.into_data(), Some(3));

        let query = access.last();
        assert_eq!(query.sql(), "UPDATE WidgetItem SET name = ? WHERE id = ?");
        assert_eq!(
            query.args(),
            &[Value::Text("Jack".to_string()), Value::Integer(9)]
        );
    }

    #[test]
    fn table_override_replaces_derived_table() {
        let access = RecordingAccess::default();
        let repo = widget_repo(&access, RepositoryConfig::default());

        let _ = repo.find_by_field_in("archive", "email", "a@b.c".to_string());
        assert_eq!(access.last().sql(), "SELECT * FROM archive WHERE email = ?");

        let _ = repo.delete_by_field_in("archive", "email", "a@b.c".to_string());
        assert_eq!(access.last().sql(), "DELETE FROM archive WHERE email = ?");
    }

    #[test]
    fn paging_binds_limit_then_offset() {
        let access = RecordingAccess::default();
        let repo = widget_repo(&access, RepositoryConfig::default());

        let _ = repo.find_with_limit_offset(5, 10);
        let query = access.last();
        assert_eq!(query.sql(), "SELECT * FROM WidgetItem LIMIT ? OFFSET ?");
        assert_eq!(query.args(), &[Value::Integer(5), Value::Integer(10)]);

        let _ = repo.find_with_limit(1);
        assert_eq!(access.last().args(), &[Value::Integer(1)]);
    }

    #[test]
    fn sorted_select_never_binds_column_name() {
        let access = RecordingAccess::default();
        let repo = widget_repo(&access, RepositoryConfig::default());

        let _ = repo.find_all_sorted("name", SortOrder::Desc);
        let query = access.last();
        assert_eq!(query.sql(), "SELECT * FROM WidgetItem ORDER BY name DESC");
        assert!(query.args().is_empty());
    }

    #[test]
    fn invalid_identifier_fails_before_reaching_storage() {
        let access = RecordingAccess::default();
        let repo = widget_repo(&access, RepositoryConfig::default());

        let outcome = repo.find_by_field("email = email OR 1", 1_i64);
        assert!(matches!(
            outcome.fault(),
            Some(RepoError::InvalidIdentifier(_))
        ));
        assert!(access.seen.borrow().is_empty());
    }

    #[test]
    fn disabled_validation_concatenates_identifiers_verbatim() {
        let access = RecordingAccess::default();
        let config = RepositoryConfig {
            validate_identifiers: false,
            ..RepositoryConfig::default()
        };
        let repo = widget_repo(&access, config);

        let outcome = repo.find_by_field("1 = 1 OR email", "x".to_string());
        assert!(outcome.is_success());
        assert_eq!(
            access.last().sql(),
            "SELECT * FROM WidgetItem WHERE 1 = 1 OR email = ?"
        );
    }

    #[test]
    fn every_operation_wraps_row_access_faults() {
        let access = RecordingAccess::failing();
        let repo = widget_repo(&access, RepositoryConfig::default());
        let widget = Widget(1);

        assert!(repo.insert(&widget).fault().is_some());
        assert!(repo.insert_all(&[widget.clone()]).fault().is_some());
        assert!(repo.update(&widget).fault().is_some());
        assert!(repo.delete(&widget).fault().is_some());
        assert!(repo.delete_all().fault().is_some());
        assert!(repo.find_all().fault().is_some());
        assert!(repo.count().fault().is_some());
        assert!(repo.find_by_field("id", 1_i64).fault().is_some());
        assert!(repo.delete_by_field("id", 1_i64).fault().is_some());
        assert!(repo.update_field("id", 2_i64, "id", 1_i64).fault().is_some());
        assert!(repo.find_with_limit(1).fault().is_some());
        assert!(repo.find_with_limit_offset(1, 1).fault().is_some());
        assert!(repo.find_all_sorted("id", SortOrder::Asc).fault().is_some());
        assert!(repo.custom_query_list("SELECT 1", &[]).fault().is_some());
        assert!(repo.custom_query_single("SELECT 1", &[]).fault().is_some());
        assert!(repo.custom_update("UPDATE x SET a = 1", &[]).fault().is_some());
        assert!(repo.custom_delete("DELETE FROM x", &[]).fault().is_some());
    }

    #[test]
    fn custom_query_single_returns_first_row_or_none() {
        let access = RecordingAccess {
            rows: vec![Widget(4), Widget(5)],
            ..RecordingAccess::default()
        };
        let repo = widget_repo(&access, RepositoryConfig::default());
        let first = repo.custom_query_single(
            "SELECT * FROM WidgetItem WHERE id > ?",
            &[Value::Integer(3)],
        );
        assert_eq!(first.into_data(), Some(Some(Widget(4))));
        assert_eq!(access.last().args(), &[Value::Integer(3)]);

        let empty = RecordingAccess::default();
        let repo = widget_repo(&empty, RepositoryConfig::default());
        let none = repo.custom_query_single("SELECT * FROM WidgetItem", &[]);
        assert!(none.is_success());
        assert_eq!(none.into_data(), Some(None));
    }
}
