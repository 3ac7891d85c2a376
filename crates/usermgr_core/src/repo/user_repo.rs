//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `users` table.
//! - Keep SQL and row mapping inside the persistence boundary.
//! - Run every mutation in its own transaction on its own session.
//!
//! # Invariants
//! - Each call opens one session from the factory and drops it on return.
//! - A failed mutation is rolled back before the error is returned.
//! - Store failures always carry the name of the failed operation.

use crate::db::migrations::latest_version;
use crate::db::{ConnectionFactory, DbError, DbResult};
use crate::model::user::{User, UserId};
use log::{debug, error, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    age,
    created_at
FROM users";

const USERS_TABLE: &str = "users";
const USERS_COLUMNS: [&str; 5] = ["id", "username", "email", "age", "created_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository operation name, carried by store errors and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOperation {
    FindAll,
    FindById,
    Create,
    Update,
    Delete,
    SchemaCheck,
}

impl RepoOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FindAll => "find_all",
            Self::FindById => "find_by_id",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::SchemaCheck => "schema_check",
        }
    }
}

impl Display for RepoOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for user persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// The store failed while running `operation`.
    Store {
        operation: RepoOperation,
        source: DbError,
    },
    /// `update` was called with a user that has no store identity.
    MissingId,
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be mapped to a valid `User`.
    InvalidData(String),
}

impl RepoError {
    fn store(operation: RepoOperation, source: DbError) -> Self {
        match source {
            DbError::Sqlite(
                err @ (rusqlite::Error::IntegralValueOutOfRange(..)
                | rusqlite::Error::FromSqlConversionFailure(..)
                | rusqlite::Error::InvalidColumnType(..)),
            ) => Self::InvalidData(format!("{operation}: {err}")),
            source => Self::Store { operation, source },
        }
    }

    /// Returns whether the store rejected the write on a schema constraint,
    /// e.g. a duplicate email or an over-long name.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_constraint_violation())
    }

    /// Returns the failed operation for store errors.
    pub fn operation(&self) -> Option<RepoOperation> {
        match self {
            Self::Store { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store { operation, source } => write!(f, "user {operation} failed: {source}"),
            Self::MissingId => write!(f, "user update requires a store-assigned id"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "user repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "user repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "user repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Data-access contract for users.
pub trait UserRepository {
    /// Returns every user, ordered by id. Empty when the table is empty.
    fn find_all(&self) -> RepoResult<Vec<User>>;
    /// Returns `None` when no row has `id`.
    fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Inserts `user` and writes the assigned `id` and `created_at` back.
    fn create(&self, user: &mut User) -> RepoResult<bool>;
    /// Writes name/email/age into the row identified by `user.id`.
    ///
    /// Returns `false` when no row has that id.
    fn update(&self, user: &User) -> RepoResult<bool>;
    /// Returns `true` when a row was removed.
    fn delete(&self, id: UserId) -> RepoResult<bool>;
}

impl<T: UserRepository + ?Sized> UserRepository for &T {
    fn find_all(&self) -> RepoResult<Vec<User>> {
        (**self).find_all()
    }

    fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        (**self).find_by_id(id)
    }

    fn create(&self, user: &mut User) -> RepoResult<bool> {
        (**self).create(user)
    }

    fn update(&self, user: &User) -> RepoResult<bool> {
        (**self).update(user)
    }

    fn delete(&self, id: UserId) -> RepoResult<bool> {
        (**self).delete(id)
    }
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'f> {
    factory: &'f ConnectionFactory,
}

impl<'f> SqliteUserRepository<'f> {
    /// Constructs a repository over a migrated store.
    ///
    /// # Errors
    /// - Schema version differs from the one this binary ships.
    /// - `users` table or one of its columns is missing.
    pub fn try_new(factory: &'f ConnectionFactory) -> RepoResult<Self> {
        let conn = factory
            .open_session()
            .map_err(|err| RepoError::store(RepoOperation::SchemaCheck, err))?;
        ensure_user_connection_ready(&conn)?;
        Ok(Self { factory })
    }

    fn read<T>(
        &self,
        operation: RepoOperation,
        f: impl FnOnce(&Connection) -> DbResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = self
            .factory
            .open_session()
            .and_then(|conn| f(&conn))
            .map_err(|err| RepoError::store(operation, err));
        log_outcome(operation, started_at, &result);
        result
    }

    fn write<T>(
        &self,
        operation: RepoOperation,
        f: impl FnOnce(&Transaction<'_>) -> DbResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = self
            .factory
            .open_session()
            .and_then(|mut conn| run_in_transaction(operation, &mut conn, f))
            .map_err(|err| RepoError::store(operation, err));
        log_outcome(operation, started_at, &result);
        result
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn find_all(&self) -> RepoResult<Vec<User>> {
        self.read(RepoOperation::FindAll, |conn| {
            let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} ORDER BY id ASC;"))?;
            let users = stmt
                .query_map([], parse_user_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        self.read(RepoOperation::FindById, |conn| {
            let user = conn
                .query_row(
                    &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                    [id],
                    parse_user_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    fn create(&self, user: &mut User) -> RepoResult<bool> {
        let (id, created_at) = self.write(RepoOperation::Create, |tx| {
            let assigned = tx.query_row(
                "INSERT INTO users (username, email, age)
                 VALUES (?1, ?2, ?3)
                 RETURNING id, created_at;",
                params![user.name.as_str(), user.email.as_str(), user.age],
                |row| Ok((row.get::<_, UserId>(0)?, row.get::<_, i64>(1)?)),
            )?;
            Ok(assigned)
        })?;

        user.id = Some(id);
        user.created_at = Some(created_at);
        Ok(true)
    }

    fn update(&self, user: &User) -> RepoResult<bool> {
        let id = user.id.ok_or(RepoError::MissingId)?;
        let changed = self.write(RepoOperation::Update, |tx| {
            let changed = tx.execute(
                "UPDATE users
                 SET
                    username = ?1,
                    email = ?2,
                    age = ?3
                 WHERE id = ?4;",
                params![user.name.as_str(), user.email.as_str(), user.age, id],
            )?;
            Ok(changed)
        })?;

        Ok(changed > 0)
    }

    fn delete(&self, id: UserId) -> RepoResult<bool> {
        let changed = self.write(RepoOperation::Delete, |tx| {
            Ok(tx.execute("DELETE FROM users WHERE id = ?1;", [id])?)
        })?;

        Ok(changed > 0)
    }
}

fn run_in_transaction<T>(
    operation: RepoOperation,
    conn: &mut Connection,
    f: impl FnOnce(&Transaction<'_>) -> DbResult<T>,
) -> DbResult<T> {
    let tx = conn.transaction()?;
    match f(&tx) {
        // A failed commit rolls back when `tx` drops.
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                error!(
                    "event=user_{operation} module=repo status=error error_code=rollback_failed error={}",
                    rollback_err
                );
            }
            Err(err)
        }
    }
}

fn log_outcome<T>(operation: RepoOperation, started_at: Instant, result: &RepoResult<T>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => debug!("event=user_{operation} module=repo status=ok duration_ms={duration_ms}"),
        Err(err) if err.is_constraint_violation() => warn!(
            "event=user_{operation} module=repo status=error duration_ms={duration_ms} error_code=constraint_violation error={err}"
        ),
        Err(err) => error!(
            "event=user_{operation} module=repo status=error duration_ms={duration_ms} error={err}"
        ),
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: Some(row.get("id")?),
        name: row.get("username")?,
        email: row.get("email")?,
        age: row.get("age")?,
        created_at: Some(row.get("created_at")?),
    })
}

fn ensure_user_connection_ready(conn: &Connection) -> RepoResult<()> {
    let schema_err = |err: rusqlite::Error| RepoError::store(RepoOperation::SchemaCheck, err.into());

    let expected_version = latest_version();
    let actual_version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .map_err(schema_err)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, USERS_TABLE).map_err(schema_err)? {
        return Err(RepoError::MissingRequiredTable(USERS_TABLE));
    }

    for column in USERS_COLUMNS {
        if !table_has_column(conn, USERS_TABLE, column).map_err(schema_err)? {
            return Err(RepoError::MissingRequiredColumn {
                table: USERS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
