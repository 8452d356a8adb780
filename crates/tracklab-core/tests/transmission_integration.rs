//! Queue delivery against a scripted remote.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Mutex;
use tracklab_core::cycle::{FinalizedRecord, InputSubmission, OutcomeSubmission};
use tracklab_core::error::{DeliveryError, Rejection};
use tracklab_core::transmit::{
    DrainOutcome, DrainStop, HaltReason, RecordSink, TransmissionQueue, WirePayload,
};
use tracklab_core::variables::{CustomKind, FieldValues, Role, VariableKind};
use tracklab_core::Project;
use uuid::Uuid;

/// Accepts everything except the record ids listed in `failing`.
struct ScriptedSink {
    failing: Mutex<Vec<(Uuid, DeliveryError)>>,
    received: Mutex<Vec<Uuid>>,
}

impl ScriptedSink {
    fn new() -> Self {
        Self {
            failing: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
        }
    }

    fn fail(&self, id: Uuid, error: DeliveryError) {
        self.failing.lock().unwrap().push((id, error));
    }

    fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn received(&self) -> Vec<Uuid> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for ScriptedSink {
    async fn deliver(&self, payload: &WirePayload) -> Result<(), DeliveryError> {
        self.received.lock().unwrap().push(payload.record_id);
        let failing = self.failing.lock().unwrap();
        match failing.iter().find(|(id, _)| *id == payload.record_id) {
            Some((_, e)) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

fn records(n: usize) -> Vec<FinalizedRecord> {
    let start = Utc::now();
    let mut project = Project::new("Focus", None, &["Only"], start).unwrap();
    project
        .add_variable(
            "Energy",
            VariableKind::Custom(CustomKind::Scale),
            Role::Input,
            &FieldValues::new(),
            start,
        )
        .unwrap();

    (0..n)
        .map(|i| {
            let at = start + Duration::minutes(i as i64 * 10);
            project
                .submit_inputs(
                    &InputSubmission::new().value("Energy", (i % 10) as f64),
                    &Default::default(),
                    at,
                )
                .unwrap();
            project
                .submit_outcomes(&OutcomeSubmission::new(), &Default::default(), at)
                .unwrap()
        })
        .collect()
}

#[tokio::test]
async fn failure_on_second_record_preserves_order() {
    let queue = TransmissionQueue::open_in_memory().unwrap();
    let records = records(3);
    let ids: Vec<Uuid> = records.iter().map(|r| r.id()).collect();
    for r in records {
        queue.enqueue(r, Utc::now()).unwrap();
    }

    let sink = ScriptedSink::new();
    sink.fail(ids[1], DeliveryError::Connectivity("offline".into()));

    let report = queue.drain(&sink, "acct", &DrainStop::new()).await.unwrap();
    assert_eq!(report.delivered.len(), 1);
    assert!(matches!(
        report.outcome,
        DrainOutcome::Halted { reason: HaltReason::Delivery(DeliveryError::Connectivity(_)), .. }
    ));
    assert_eq!(sink.received(), vec![ids[0], ids[1]]);
    assert_eq!(queue.len().unwrap(), 2);

    sink.heal();
    let report = queue.drain(&sink, "acct", &DrainStop::new()).await.unwrap();
    assert_eq!(report.outcome, DrainOutcome::Completed);
    assert_eq!(report.delivered.len(), 2);
    assert_eq!(sink.received(), vec![ids[0], ids[1], ids[1], ids[2]]);
    assert!(queue.is_empty().unwrap());
}

#[tokio::test]
async fn rejection_keeps_entry_queued() {
    let queue = TransmissionQueue::open_in_memory().unwrap();
    let record = records(1).remove(0);
    let id = record.id();
    let entry = queue.enqueue(record, Utc::now()).unwrap();

    let sink = ScriptedSink::new();
    sink.fail(id, DeliveryError::Rejected(Rejection::StorageFailure));

    let report = queue.drain(&sink, "acct", &DrainStop::new()).await.unwrap();
    match report.outcome {
        DrainOutcome::Halted { handle, reason } => {
            assert_eq!(handle, entry.handle);
            assert!(!reason.is_retryable());
        }
        other => panic!("expected halt, got {other:?}"),
    }
    assert_eq!(queue.peek().unwrap().map(|e| e.record.id()), Some(id));
}

#[tokio::test]
async fn queue_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db");
    let ids: Vec<Uuid> = {
        let queue = TransmissionQueue::open(&path).unwrap();
        records(2)
            .into_iter()
            .map(|r| queue.enqueue(r, Utc::now()).unwrap().record.id())
            .collect()
    };

    let queue = TransmissionQueue::open(&path).unwrap();
    assert_eq!(queue.len().unwrap(), 2);
    let sink = ScriptedSink::new();
    let report = queue.drain(&sink, "acct", &DrainStop::new()).await.unwrap();
    assert_eq!(report.outcome, DrainOutcome::Completed);
    assert_eq!(sink.received(), ids);
}
