//! Ordered schema scripts and the runner that applies them.
//!
//! # Invariants
//! - Versions start at 1 and increase by one per script.
//! - All pending scripts commit together or not at all.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "directory",
        sql: include_str!("0001_directory.sql"),
    },
    Migration {
        version: 2,
        name: "social",
        sql: include_str!("0002_social.sql"),
    },
    Migration {
        version: 3,
        name: "accounts",
        sql: include_str!("0003_accounts.sql"),
    },
    Migration {
        version: 4,
        name: "search",
        sql: include_str!("0004_search.sql"),
    },
];

/// Highest schema version this build can produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Runs every script newer than the database's `user_version`.
///
/// Returns the number of scripts applied.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from = current_user_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        let stamp = format!("PRAGMA user_version = {};", migration.version);
        tx.execute_batch(migration.sql)
            .and_then(|()| tx.execute_batch(&stamp))
            .map_err(|source| DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            })?;
        info!(
            "event=db_migration module=db status=applied version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(pending.len())
}

/// Schema version stored in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}
