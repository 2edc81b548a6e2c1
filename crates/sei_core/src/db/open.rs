//! Connection setup shared by the server, the CLI and tests.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Backing store of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    File,
    Memory,
}

impl OpenMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens (or creates) the database file at `path` and migrates it.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    let started = Instant::now();
    let conn = Connection::open(path).map_err(|source| {
        error!(
            "event=db_open module=db status=error mode=file error_code=open_failed error={source}"
        );
        DbError::Open {
            target: path.display().to_string(),
            source,
        }
    })?;
    prepare(conn, OpenMode::File, started)
}

/// Opens a private in-memory database with the full schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started = Instant::now();
    let conn = Connection::open_in_memory().map_err(|source| DbError::Open {
        target: "in-memory database".to_string(),
        source,
    })?;
    prepare(conn, OpenMode::Memory, started)
}

fn prepare(mut conn: Connection, mode: OpenMode, started: Instant) -> DbResult<Connection> {
    let result = configure(&conn, mode).and_then(|()| apply_migrations(&mut conn).map(|_| ()));
    let elapsed_ms = started.elapsed().as_millis();
    match result {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={elapsed_ms}",
                mode.as_str()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={elapsed_ms} error={err}",
                mode.as_str()
            );
            Err(err)
        }
    }
}

fn configure(conn: &Connection, mode: OpenMode) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if mode == OpenMode::File {
        // journal_mode answers with a row, so it cannot go through execute.
        let journal: String =
            conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        info!("event=db_pragma module=db status=ok journal_mode={journal}");
    }
    Ok(())
}
