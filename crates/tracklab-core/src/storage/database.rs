//! SQLite connection shared by the project store.
//!
//! Provides persistent storage for:
//! - Projects with their variables, ghosts and in-flight cycle buffer
//! - The audit log of project and cycle events

use rusqlite::Connection;
use std::path::Path;

use super::migrations;
use crate::error::{DatabaseError, Result};

pub const DATABASE_FILE: &str = "tracklab.db";
pub const QUEUE_FILE: &str = "queue.db";

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `path`, creating file and schema if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)?;
        Ok(Self { conn })
    }
}
