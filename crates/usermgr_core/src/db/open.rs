//! Store handle and per-operation session bootstrap for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite stores and migrate them once.
//! - Hand out freshly configured connections ("sessions") on demand.
//! - Tear the store handle down explicitly at shutdown.
//!
//! # Invariants
//! - Returned sessions have `foreign_keys=ON` and a busy timeout.
//! - Sessions are only handed out after migrations fully applied.
//! - In-memory stores stay alive until `close` (or drop) of the factory.

use super::migrations::apply_migrations;
use super::{DbError, DbResult, DbTarget};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Location {
    Path(PathBuf),
    SharedMemory(String),
}

/// Owned handle to the relational store.
///
/// Constructed once at process start and passed by reference to the
/// repositories that need it. Each repository call opens its own session via
/// [`ConnectionFactory::open_session`] and drops it when the call returns.
#[derive(Debug)]
pub struct ConnectionFactory {
    target: DbTarget,
    location: Location,
    // Keeps a shared-cache in-memory database alive between sessions.
    anchor: Option<Connection>,
}

impl ConnectionFactory {
    /// Opens the store at `target` and applies all pending migrations.
    ///
    /// # Side effects
    /// - Creates the database file when it does not exist.
    /// - Emits `db_open` logging events with duration and status.
    pub fn open(target: &DbTarget) -> DbResult<Self> {
        let started_at = Instant::now();
        let mode = mode_label(target);
        info!("event=db_open module=db status=start mode={mode}");

        let location = match target {
            DbTarget::File(path) => Location::Path(path.clone()),
            DbTarget::Memory => Location::SharedMemory(format!(
                "file:usermgr-{}?mode=memory&cache=shared",
                Uuid::new_v4().simple()
            )),
        };

        let mut conn = match connect(&location) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        if let Err(err) = bootstrap_connection(&mut conn) {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }

        info!(
            "event=db_open module=db status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        );

        let anchor = match location {
            Location::SharedMemory(_) => Some(conn),
            Location::Path(_) => None,
        };

        Ok(Self {
            target: target.clone(),
            location,
            anchor,
        })
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&DbTarget::Memory)
    }

    /// Opens one session for a single unit of work.
    ///
    /// The caller owns the connection; dropping it releases the session.
    pub fn open_session(&self) -> DbResult<Connection> {
        let conn = connect(&self.location)?;
        configure_session(&conn)?;
        Ok(conn)
    }

    /// Closes the store handle.
    ///
    /// In-memory stores lose their data here.
    pub fn close(mut self) -> DbResult<()> {
        let mode = mode_label(&self.target);
        if let Some(anchor) = self.anchor.take() {
            if let Err((_, err)) = anchor.close() {
                error!(
                    "event=db_close module=db status=error mode={mode} error_code=db_close_failed error={}",
                    err
                );
                return Err(DbError::from(err));
            }
        }

        info!("event=db_close module=db status=ok mode={mode}");
        Ok(())
    }
}

fn connect(location: &Location) -> rusqlite::Result<Connection> {
    match location {
        Location::Path(path) => Connection::open(path),
        Location::SharedMemory(uri) => Connection::open_with_flags(
            uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
    }
}

fn configure_session(conn: &Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    configure_session(conn)?;
    apply_migrations(conn)?;
    Ok(())
}

fn mode_label(target: &DbTarget) -> &'static str {
    match target {
        DbTarget::File(_) => "file",
        DbTarget::Memory => "memory",
    }
}
