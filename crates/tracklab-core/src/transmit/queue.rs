//! Persistent FIFO of finalized records awaiting delivery.
//!
//! Records are written to SQLite before [`TransmissionQueue::enqueue`]
//! returns. The autoincrement row id is the entry's handle and defines FIFO
//! order. [`TransmissionQueue::drain`] is fail-stop: it sends entries one at
//! a time, deletes each only after the sink accepted it, and stops at the
//! first failure, leaving that entry and everything after it in place.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::payload::WirePayload;
use super::sink::RecordSink;
use crate::cycle::FinalizedRecord;
use crate::error::{CoreError, DatabaseError, DeliveryError, RecordError, Result};
use crate::events::Event;

/// A queued record and its local persistence handle.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub handle: i64,
    pub record: FinalizedRecord,
    pub enqueued_at: DateTime<Utc>,
}

/// Listing view of an entry; does not decode the stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingEntry {
    pub handle: i64,
    pub record_id: String,
    pub project: String,
    pub enqueued_at: String,
}

/// Cooperative stop signal, checked between sends.
#[derive(Debug, Clone, Default)]
pub struct DrainStop(Arc<AtomicBool>);

impl DrainStop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    Delivery(DeliveryError),
    /// The stored entry could not be decoded.
    CorruptEntry(String),
}

impl HaltReason {
    pub fn is_retryable(&self) -> bool {
        match self {
            HaltReason::Delivery(e) => e.is_retryable(),
            HaltReason::CorruptEntry(_) => false,
        }
    }
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::Delivery(e) => write!(f, "{e}"),
            HaltReason::CorruptEntry(msg) => write!(f, "corrupt entry: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrainOutcome {
    /// Queue is empty.
    Completed,
    /// The stop signal was raised; nothing failed.
    Stopped,
    /// Delivery of `handle` failed; it and all later entries remain queued.
    Halted { handle: i64, reason: HaltReason },
    /// Another drain was already running. Nothing was sent.
    AlreadyDraining,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport {
    pub delivered: Vec<i64>,
    pub outcome: DrainOutcome,
    pub events: Vec<Event>,
}

impl DrainReport {
    fn new(outcome: DrainOutcome) -> Self {
        Self {
            delivered: Vec::new(),
            outcome,
            events: Vec::new(),
        }
    }
}

/// Resets the draining flag when dropped.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct TransmissionQueue {
    conn: Mutex<Connection>,
    draining: AtomicBool,
}

impl TransmissionQueue {
    /// Open (and create if needed) the queue database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS queue (
                handle      INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id   TEXT NOT NULL,
                project     TEXT NOT NULL,
                record      TEXT NOT NULL,
                enqueued_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            draining: AtomicBool::new(false),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Database(DatabaseError::Locked))
    }

    /// Persist `record` at the tail of the queue.
    pub fn enqueue(&self, record: FinalizedRecord, now: DateTime<Utc>) -> Result<QueueEntry> {
        let json = serde_json::to_string(&record)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO queue (record_id, project, record, enqueued_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id().to_string(),
                record.project_title(),
                json,
                now.to_rfc3339()
            ],
        )?;
        let handle = conn.last_insert_rowid();
        tracing::info!(handle, record = %record.id(), "record queued");
        Ok(QueueEntry {
            handle,
            record,
            enqueued_at: now,
        })
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM queue", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Entries in delivery order.
    pub fn pending(&self) -> Result<Vec<PendingEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT handle, record_id, project, enqueued_at FROM queue ORDER BY handle ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PendingEntry {
                handle: row.get(0)?,
                record_id: row.get(1)?,
                project: row.get(2)?,
                enqueued_at: row.get(3)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Decode the head of the queue.
    pub fn peek(&self) -> Result<Option<QueueEntry>> {
        match self.head()? {
            None => Ok(None),
            Some((handle, json, enqueued_at)) => Ok(Some(decode(handle, &json, &enqueued_at)?)),
        }
    }

    fn head(&self) -> Result<Option<(i64, String, String)>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT handle, record, enqueued_at FROM queue ORDER BY handle ASC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(row)
    }

    fn delete(&self, handle: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM queue WHERE handle = ?1", params![handle])?;
        Ok(())
    }

    /// Deliver queued records in order until the queue is empty, `stop` is
    /// raised, or a delivery fails.
    pub async fn drain(
        &self,
        sink: &dyn RecordSink,
        account: &str,
        stop: &DrainStop,
    ) -> Result<DrainReport> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("drain requested while another drain is running");
            return Ok(DrainReport::new(DrainOutcome::AlreadyDraining));
        }
        let _guard = DrainGuard(&self.draining);

        let mut report = DrainReport::new(DrainOutcome::Completed);
        loop {
            if stop.is_stopped() {
                tracing::info!(delivered = report.delivered.len(), "drain stopped");
                report.outcome = DrainOutcome::Stopped;
                return Ok(report);
            }

            let Some((handle, json, enqueued_at)) = self.head()? else {
                tracing::info!(delivered = report.delivered.len(), "queue drained");
                return Ok(report);
            };

            let entry = match decode(handle, &json, &enqueued_at) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::error!(handle, error = %e, "queued record cannot be decoded");
                    return Ok(halt(report, handle, HaltReason::CorruptEntry(e.to_string())));
                }
            };

            let payload = WirePayload::from_record(&entry.record, account);
            match sink.deliver(&payload).await {
                Ok(()) => {
                    self.delete(handle)?;
                    tracing::info!(handle, record = %entry.record.id(), "record delivered");
                    report.delivered.push(handle);
                    report.events.push(Event::RecordDelivered {
                        handle,
                        record_id: entry.record.id(),
                        at: Utc::now(),
                    });
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::warn!(handle, error = %e, "delivery failed, will retry on next drain");
                    } else {
                        tracing::error!(handle, error = %e, "record rejected by endpoint");
                    }
                    return Ok(halt(report, handle, HaltReason::Delivery(e)));
                }
            }
        }
    }
}

fn halt(mut report: DrainReport, handle: i64, reason: HaltReason) -> DrainReport {
    report.events.push(Event::DrainHalted {
        handle,
        retryable: reason.is_retryable(),
        reason: reason.to_string(),
        at: Utc::now(),
    });
    report.outcome = DrainOutcome::Halted { handle, reason };
    report
}

fn decode(handle: i64, json: &str, enqueued_at: &str) -> std::result::Result<QueueEntry, RecordError> {
    let corrupt = |message: String| RecordError::CorruptQueueEntry { handle, message };
    let record: FinalizedRecord =
        serde_json::from_str(json).map_err(|e| corrupt(e.to_string()))?;
    let enqueued_at = DateTime::parse_from_rfc3339(enqueued_at)
        .map_err(|e| corrupt(e.to_string()))?
        .with_timezone(&Utc);
    Ok(QueueEntry {
        handle,
        record,
        enqueued_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::{Phase, PhaseValue};
    use crate::error::Rejection;
    use crate::variables::CapturedValue;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, VecDeque};

    fn record(title: &str) -> FinalizedRecord {
        let mut values = BTreeMap::new();
        values.insert(
            "Weight".to_string(),
            PhaseValue { phase: Phase::Input, value: CapturedValue::Number(180.0) },
        );
        let now = Utc::now();
        FinalizedRecord::new(title.into(), None, now, now, values, BTreeMap::new())
    }

    /// Sink that answers from a script and records what it was sent.
    #[derive(Default)]
    struct ScriptedSink {
        replies: Mutex<VecDeque<std::result::Result<(), DeliveryError>>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedSink {
        fn replying(replies: Vec<std::result::Result<(), DeliveryError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordSink for ScriptedSink {
        async fn deliver(&self, payload: &WirePayload) -> std::result::Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(payload.project.clone());
            self.replies.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    #[tokio::test]
    async fn drains_in_fifo_order() {
        let queue = TransmissionQueue::open_in_memory().unwrap();
        for title in ["r1", "r2", "r3"] {
            queue.enqueue(record(title), Utc::now()).unwrap();
        }
        let sink = ScriptedSink::default();
        let report = queue.drain(&sink, "acct", &DrainStop::new()).await.unwrap();
        assert_eq!(report.outcome, DrainOutcome::Completed);
        assert_eq!(sink.sent(), vec!["r1", "r2", "r3"]);
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn failure_halts_and_keeps_remaining_entries() {
        let queue = TransmissionQueue::open_in_memory().unwrap();
        let mut handles = Vec::new();
        for title in ["r1", "r2", "r3"] {
            handles.push(queue.enqueue(record(title), Utc::now()).unwrap().handle);
        }
        let sink = ScriptedSink::replying(vec![
            Ok(()),
            Err(DeliveryError::Connectivity("offline".into())),
        ]);
        let report = queue.drain(&sink, "acct", &DrainStop::new()).await.unwrap();

        assert_eq!(report.delivered, vec![handles[0]]);
        assert!(matches!(
            report.outcome,
            DrainOutcome::Halted { handle, ref reason } if handle == handles[1] && reason.is_retryable()
        ));
        assert_eq!(sink.sent(), vec!["r1", "r2"]);
        let remaining: Vec<i64> = queue.pending().unwrap().iter().map(|e| e.handle).collect();
        assert_eq!(remaining, vec![handles[1], handles[2]]);
    }

    #[tokio::test]
    async fn rejection_also_halts() {
        let queue = TransmissionQueue::open_in_memory().unwrap();
        queue.enqueue(record("r1"), Utc::now()).unwrap();
        queue.enqueue(record("r2"), Utc::now()).unwrap();
        let sink = ScriptedSink::replying(vec![Err(DeliveryError::Rejected(
            Rejection::MalformedPayload,
        ))]);
        let report = queue.drain(&sink, "acct", &DrainStop::new()).await.unwrap();
        assert!(report.delivered.is_empty());
        assert!(matches!(
            report.events.last(),
            Some(Event::DrainHalted { retryable: false, .. })
        ));
        assert_eq!(queue.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn corrupt_entry_halts_without_dropping() {
        let queue = TransmissionQueue::open_in_memory().unwrap();
        {
            let conn = queue.conn().unwrap();
            conn.execute(
                "INSERT INTO queue (record_id, project, record, enqueued_at) VALUES ('x', 'p', '{not json', ?1)",
                params![Utc::now().to_rfc3339()],
            )
            .unwrap();
        }
        queue.enqueue(record("r2"), Utc::now()).unwrap();

        let sink = ScriptedSink::default();
        let report = queue.drain(&sink, "acct", &DrainStop::new()).await.unwrap();
        assert!(matches!(
            report.outcome,
            DrainOutcome::Halted { reason: HaltReason::CorruptEntry(_), .. }
        ));
        assert!(sink.sent().is_empty());
        assert_eq!(queue.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn stop_signal_is_honoured() {
        let queue = TransmissionQueue::open_in_memory().unwrap();
        queue.enqueue(record("r1"), Utc::now()).unwrap();
        let stop = DrainStop::new();
        stop.stop();
        let report = queue.drain(&ScriptedSink::default(), "acct", &stop).await.unwrap();
        assert_eq!(report.outcome, DrainOutcome::Stopped);
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn enqueue_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let entry = {
            let queue = TransmissionQueue::open(&path).unwrap();
            queue.enqueue(record("r1"), Utc::now()).unwrap()
        };
        let queue = TransmissionQueue::open(&path).unwrap();
        let head = queue.peek().unwrap().unwrap();
        assert_eq!(head.handle, entry.handle);
        assert_eq!(head.record, entry.record);
    }
}
