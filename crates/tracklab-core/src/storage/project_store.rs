//! Persistence of projects and their audit trail.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use std::path::Path;

use super::database::Database;
use crate::cycle::CycleBuffer;
use crate::error::{DatabaseError, ProjectError, Result};
use crate::events::Event;
use crate::ghosts::GhostRecord;
use crate::project::{Project, ProjectSnapshot};
use crate::variables::VariableRecord;

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub title: String,
    pub variables: usize,
    pub locked: bool,
    pub awaiting_outcomes: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub project: String,
    pub event: Event,
    pub recorded_at: String,
}

pub struct ProjectStore {
    db: Database,
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")).into())
}

impl ProjectStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_memory() -> Result<Self> {
        Ok(Self::new(Database::open_memory()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn exists(&self, title: &str) -> Result<bool> {
        let n: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM projects WHERE title_key = ?1",
            params![title.trim().to_lowercase()],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    /// Store a new project. A project with the same title (ignoring case)
    /// must not exist yet.
    pub fn create(&self, project: &Project) -> Result<()> {
        if self.exists(project.title())? {
            return Err(DatabaseError::Duplicate(project.title().to_string()).into());
        }
        self.save(project)
    }

    /// Write the whole project in one transaction.
    pub fn save(&self, project: &Project) -> Result<()> {
        let snap = project.snapshot();
        let key = snap.title.to_lowercase();
        let tx = self.db.conn().unchecked_transaction()?;

        tx.execute(
            "INSERT INTO projects (title_key, title, action, groups_json, reporting_started, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(title_key) DO UPDATE SET
                title = excluded.title,
                action = excluded.action,
                groups_json = excluded.groups_json,
                reporting_started = excluded.reporting_started",
            params![
                key,
                snap.title,
                snap.action,
                serde_json::to_string(&snap.groups)?,
                snap.reporting_started,
                snap.created_at.to_rfc3339(),
            ],
        )?;

        tx.execute("DELETE FROM variables WHERE project = ?1", params![key])?;
        for (position, record) in snap.variables.iter().enumerate() {
            tx.execute(
                "INSERT INTO variables (project, name_key, position, record_json) VALUES (?1, ?2, ?3, ?4)",
                params![
                    key,
                    record.name.to_lowercase(),
                    position as i64,
                    serde_json::to_string(record)?
                ],
            )?;
        }

        tx.execute("DELETE FROM ghosts WHERE project = ?1", params![key])?;
        for ghost in &snap.ghosts {
            tx.execute(
                "INSERT INTO ghosts (project, parent_key, name_key, record_json) VALUES (?1, ?2, ?3, ?4)",
                params![
                    key,
                    ghost.parent.to_lowercase(),
                    ghost.name.to_lowercase(),
                    serde_json::to_string(ghost)?
                ],
            )?;
        }

        match &snap.buffer {
            Some(buffer) => {
                tx.execute(
                    "INSERT OR REPLACE INTO cycle_buffers (project, buffer_json) VALUES (?1, ?2)",
                    params![key, serde_json::to_string(buffer)?],
                )?;
            }
            None => {
                tx.execute("DELETE FROM cycle_buffers WHERE project = ?1", params![key])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn load(&self, title: &str) -> Result<Project> {
        let key = title.trim().to_lowercase();
        let conn = self.db.conn();

        let row = conn
            .query_row(
                "SELECT title, action, groups_json, reporting_started, created_at
                 FROM projects WHERE title_key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((title, action, groups_json, reporting_started, created_at)) = row else {
            return Err(ProjectError::NotFound(title.to_string()).into());
        };

        let mut variables = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT record_json FROM variables WHERE project = ?1 ORDER BY position ASC",
            )?;
            let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
            for row in rows {
                variables.push(serde_json::from_str::<VariableRecord>(&row?)?);
            }
        }

        let mut ghosts = Vec::new();
        {
            let mut stmt = conn.prepare("SELECT record_json FROM ghosts WHERE project = ?1")?;
            let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
            for row in rows {
                ghosts.push(serde_json::from_str::<GhostRecord>(&row?)?);
            }
        }

        let buffer = conn
            .query_row(
                "SELECT buffer_json FROM cycle_buffers WHERE project = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(|json| serde_json::from_str::<CycleBuffer>(&json))
            .transpose()?;

        Project::restore(ProjectSnapshot {
            title,
            action,
            groups: serde_json::from_str(&groups_json)?,
            variables,
            ghosts,
            buffer,
            reporting_started,
            created_at: parse_time(&created_at)?,
        })
    }

    pub fn list(&self) -> Result<Vec<ProjectSummary>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT p.title, p.reporting_started, p.created_at,
                    (SELECT COUNT(*) FROM variables v WHERE v.project = p.title_key),
                    EXISTS (SELECT 1 FROM cycle_buffers b WHERE b.project = p.title_key)
             FROM projects p ORDER BY p.created_at ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProjectSummary {
                title: row.get(0)?,
                locked: row.get(1)?,
                created_at: row.get(2)?,
                variables: row.get::<_, i64>(3)? as usize,
                awaiting_outcomes: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Delete a project with its variables, ghosts and buffer. The audit log
    /// is kept.
    pub fn delete(&self, title: &str) -> Result<bool> {
        let n = self.db.conn().execute(
            "DELETE FROM projects WHERE title_key = ?1",
            params![title.trim().to_lowercase()],
        )?;
        Ok(n > 0)
    }

    pub fn record_event(&self, project: &str, event: &Event) -> Result<i64> {
        self.db.conn().execute(
            "INSERT INTO audit_log (project, event_type, event_json, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                project.trim().to_lowercase(),
                event.name(),
                serde_json::to_string(event)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(self.db.conn().last_insert_rowid())
    }

    pub fn record_events(&self, project: &str, events: &[Event]) -> Result<()> {
        for event in events {
            self.record_event(project, event)?;
        }
        Ok(())
    }

    /// Audit entries for `project`, oldest first.
    pub fn audit_log(&self, project: &str) -> Result<Vec<AuditEntry>> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, project, event_json, recorded_at FROM audit_log
             WHERE project = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![project.trim().to_lowercase()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, project, json, recorded_at) = row?;
            out.push(AuditEntry {
                id,
                project,
                event: serde_json::from_str(&json)?,
                recorded_at,
            });
        }
        Ok(out)
    }

    /// How many audit entries of `event_type` exist for `project`.
    pub fn count_events(&self, project: &str, event_type: &str) -> Result<usize> {
        let n: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM audit_log WHERE project = ?1 AND event_type = ?2",
            params![project.trim().to_lowercase(), event_type],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}
