//! Database schema migrations for tracklab.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: projects, variables, ghosts and cycle buffers.
///
/// Variables are keyed by `(project, name_key)` where `name_key` is the
/// lowercased name, so case-insensitive uniqueness holds at the storage level.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS projects (
            title_key         TEXT PRIMARY KEY,
            title             TEXT NOT NULL,
            action            TEXT,
            groups_json       TEXT NOT NULL,
            reporting_started INTEGER NOT NULL DEFAULT 0,
            created_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS variables (
            project     TEXT NOT NULL REFERENCES projects(title_key) ON DELETE CASCADE,
            name_key    TEXT NOT NULL,
            position    INTEGER NOT NULL,
            record_json TEXT NOT NULL,
            PRIMARY KEY (project, name_key)
        );

        CREATE TABLE IF NOT EXISTS ghosts (
            project     TEXT NOT NULL REFERENCES projects(title_key) ON DELETE CASCADE,
            parent_key  TEXT NOT NULL,
            name_key    TEXT NOT NULL,
            record_json TEXT NOT NULL,
            PRIMARY KEY (project, parent_key, name_key)
        );

        CREATE TABLE IF NOT EXISTS cycle_buffers (
            project     TEXT PRIMARY KEY REFERENCES projects(title_key) ON DELETE CASCADE,
            buffer_json TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: audit log of project and cycle events.
///
/// `event_type` keeps finalized and discarded cycles apart.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS audit_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            project     TEXT NOT NULL,
            event_type  TEXT NOT NULL,
            event_json  TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audit_project ON audit_log(project, id);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
