use rusqlite::Connection;
use usermgr_core::db::migrations::latest_version;
use usermgr_core::{ConnectionFactory, DbError, DbTarget};

#[test]
fn in_memory_factory_applies_all_migrations() {
    let factory = ConnectionFactory::open_in_memory().unwrap();
    let conn = factory.open_session().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "users");
}

#[test]
fn in_memory_sessions_share_one_database() {
    let factory = ConnectionFactory::open_in_memory().unwrap();

    let first = factory.open_session().unwrap();
    first
        .execute(
            "INSERT INTO users (username, email, age) VALUES ('Iba', 'iba@mail.com', 35);",
            [],
        )
        .unwrap();
    drop(first);

    let second = factory.open_session().unwrap();
    let count: i64 = second
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn in_memory_factories_are_isolated() {
    let first = ConnectionFactory::open_in_memory().unwrap();
    let second = ConnectionFactory::open_in_memory().unwrap();

    first
        .open_session()
        .unwrap()
        .execute(
            "INSERT INTO users (username, email, age) VALUES ('Iba', 'iba@mail.com', 35);",
            [],
        )
        .unwrap();

    let count: i64 = second
        .open_session()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let target = DbTarget::File(dir.path().join("usermgr.db"));

    let first = ConnectionFactory::open(&target).unwrap();
    assert_eq!(schema_version(&first.open_session().unwrap()), latest_version());
    first.close().unwrap();

    let second = ConnectionFactory::open(&target).unwrap();
    let conn = second.open_session().unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "users");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = ConnectionFactory::open(&DbTarget::File(path)).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn sessions_enable_foreign_keys() {
    let factory = ConnectionFactory::open_in_memory().unwrap();
    let conn = factory.open_session().unwrap();

    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn close_releases_in_memory_store() {
    let factory = ConnectionFactory::open_in_memory().unwrap();
    factory.close().unwrap();
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
