use easyrepo_core::db::{latest_version, open_db, open_db_in_memory, DbError, Migration};
use rusqlite::Connection;

const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "CREATE TABLE note (id INTEGER PRIMARY KEY, body TEXT NOT NULL);",
    ),
    Migration::new(2, "ALTER TABLE note ADD COLUMN pinned INTEGER NOT NULL DEFAULT 0;"),
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory(MIGRATIONS).unwrap();

    assert_eq!(schema_version(&conn), latest_version(MIGRATIONS));
    assert_table_exists(&conn, "note");
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn open_without_migrations_leaves_schema_untouched() {
    let conn = open_db_in_memory(&[]).unwrap();
    assert_eq!(schema_version(&conn), 0);
}

#[test]
fn reopening_same_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("easyrepo.db");

    let conn_first = open_db(&path, &MIGRATIONS[..1]).unwrap();
    assert_eq!(schema_version(&conn_first), 1);
    drop(conn_first);

    let conn_second = open_db(&path, MIGRATIONS).unwrap();
    assert_eq!(schema_version(&conn_second), 2);
    conn_second
        .execute("INSERT INTO note (id, body, pinned) VALUES (1, 'x', 1);", [])
        .unwrap();
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, MIGRATIONS).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version(MIGRATIONS));
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
