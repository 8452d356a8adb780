use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::variables::Role;

/// Every state change in a project or the queue produces an Event.
///
/// Events are returned from the call that caused them; callers decide
/// whether to log them, show them, or append them to the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    VariableAdded {
        project: String,
        name: String,
        kind: String,
        role: Role,
        at: DateTime<Utc>,
    },
    VariableRemoved {
        project: String,
        name: String,
        kind: String,
        role: Role,
        at: DateTime<Utc>,
    },
    VariableReconfigured {
        project: String,
        name: String,
        at: DateTime<Utc>,
    },
    GhostSpawned {
        project: String,
        parent: String,
        name: String,
        at: DateTime<Utc>,
    },
    GhostRetired {
        project: String,
        parent: String,
        name: String,
        at: DateTime<Utc>,
    },
    /// Input phase captured; the project now awaits outcomes.
    InputsCaptured {
        project: String,
        group: Option<String>,
        values: usize,
        at: DateTime<Utc>,
    },
    /// Outcome phase captured and the cycle turned into a record.
    CycleFinalized {
        project: String,
        record_id: Uuid,
        at: DateTime<Utc>,
    },
    /// User threw away a half-finished cycle. Buffered inputs are lost.
    CycleDiscarded {
        project: String,
        discarded_values: usize,
        at: DateTime<Utc>,
    },
    RecordQueued {
        handle: i64,
        record_id: Uuid,
        at: DateTime<Utc>,
    },
    RecordDelivered {
        handle: i64,
        record_id: Uuid,
        at: DateTime<Utc>,
    },
    DrainHalted {
        handle: i64,
        retryable: bool,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short machine name, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::VariableAdded { .. } => "variable_added",
            Event::VariableRemoved { .. } => "variable_removed",
            Event::VariableReconfigured { .. } => "variable_reconfigured",
            Event::GhostSpawned { .. } => "ghost_spawned",
            Event::GhostRetired { .. } => "ghost_retired",
            Event::InputsCaptured { .. } => "inputs_captured",
            Event::CycleFinalized { .. } => "cycle_finalized",
            Event::CycleDiscarded { .. } => "cycle_discarded",
            Event::RecordQueued { .. } => "record_queued",
            Event::RecordDelivered { .. } => "record_delivered",
            Event::DrainHalted { .. } => "drain_halted",
        }
    }
}
