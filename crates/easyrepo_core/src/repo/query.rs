//! Parameterized SQL values and the statement shapes the repository emits.
//!
//! # Responsibility
//! - Carry one SQL template plus its ordered bind values.
//! - Compose identifier-only SQL text for generated statements.
//!
//! # Invariants
//! - Identifiers (table, field, column) only ever reach SQL through
//!   [`Statement`] text composition.
//! - Values only ever reach SQL through `Query::args`.
//! - Every generated placeholder is a bare positional `?`.

use crate::repo::row_access::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Immutable SQL template with positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    sql: String,
    args: Vec<Value>,
}

impl Query {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Builds a query with no bind values.
    pub fn bare(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// Direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl From<bool> for SortOrder {
    /// `true` means ascending.
    fn from(ascending: bool) -> Self {
        if ascending {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

/// Statement shapes generated from identifiers alone.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Statement<'a> {
    SelectAll { table: &'a str },
    CountAll { table: &'a str },
    DeleteAll { table: &'a str },
    SelectWhere { table: &'a str, field: &'a str },
    DeleteWhere { table: &'a str, field: &'a str },
    UpdateWhere { table: &'a str, set: &'a str, filter: &'a str },
    SelectLimit { table: &'a str },
    SelectLimitOffset { table: &'a str },
    SelectSorted { table: &'a str, column: &'a str, order: SortOrder },
}

impl Statement<'_> {
    /// Checks every identifier this statement interpolates.
    pub(crate) fn validate(&self) -> RepoResult<()> {
        for name in self.identifiers() {
            check_identifier(name)?;
        }
        Ok(())
    }

    /// Renders SQL text. The caller supplies values separately, in
    /// placeholder order.
    pub(crate) fn sql(&self) -> String {
        match *self {
            Self::SelectAll { table } => format!("SELECT * FROM {table}"),
            Self::CountAll { table } => format!("SELECT COUNT(*) FROM {table}"),
            Self::DeleteAll { table } => format!("DELETE FROM {table}"),
            Self::SelectWhere { table, field } => {
                format!("SELECT * FROM {table} WHERE {field} = ?")
            }
            Self::DeleteWhere { table, field } => format!("DELETE FROM {table} WHERE {field} = ?"),
            Self::UpdateWhere { table, set, filter } => {
                format!("UPDATE {table} SET {set} = ? WHERE {filter} = ?")
            }
            Self::SelectLimit { table } => format!("SELECT * FROM {table} LIMIT ?"),
            Self::SelectLimitOffset { table } => {
                format!("SELECT * FROM {table} LIMIT ? OFFSET ?")
            }
            Self::SelectSorted {
                table,
                column,
                order,
            } => format!("SELECT * FROM {table} ORDER BY {column} {}", order.keyword()),
        }
    }

    fn identifiers(&self) -> Vec<&str> {
        match *self {
            Self::SelectAll { table }
            | Self::CountAll { table }
            | Self::DeleteAll { table }
            | Self::SelectLimit { table }
            | Self::SelectLimitOffset { table } => vec![table],
            Self::SelectWhere { table, field } | Self::DeleteWhere { table, field } => {
                vec![table, field]
            }
            Self::UpdateWhere { table, set, filter } => vec![table, set, filter],
            Self::SelectSorted { table, column, .. } => vec![table, column],
        }
    }
}

/// Accepts plain SQL identifiers: ASCII letters, digits and `_`, not
/// starting with a digit.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

fn check_identifier(name: &str) -> RepoResult<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(RepoError::InvalidIdentifier(name.to_string()))
    }
}
