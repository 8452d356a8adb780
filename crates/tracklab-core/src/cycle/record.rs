//! Finalized cycle records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::variables::CapturedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Input,
    Outcome,
}

/// A supplied or auto-captured value and the phase it was captured in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseValue {
    pub phase: Phase,
    pub value: CapturedValue,
}

/// A value computed by the core rather than captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedValue {
    pub phase: Phase,
    pub value: f64,
    pub unit: String,
}

/// One complete measurement cycle. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedRecord {
    id: Uuid,
    project_title: String,
    group_label: Option<String>,
    input_timestamp: DateTime<Utc>,
    output_timestamp: DateTime<Utc>,
    values: BTreeMap<String, PhaseValue>,
    derived_values: BTreeMap<String, DerivedValue>,
}

impl FinalizedRecord {
    pub(crate) fn new(
        project_title: String,
        group_label: Option<String>,
        input_timestamp: DateTime<Utc>,
        output_timestamp: DateTime<Utc>,
        values: BTreeMap<String, PhaseValue>,
        derived_values: BTreeMap<String, DerivedValue>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_title,
            group_label,
            input_timestamp,
            output_timestamp,
            values,
            derived_values,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn project_title(&self) -> &str {
        &self.project_title
    }

    pub fn group_label(&self) -> Option<&str> {
        self.group_label.as_deref()
    }

    pub fn input_timestamp(&self) -> DateTime<Utc> {
        self.input_timestamp
    }

    pub fn output_timestamp(&self) -> DateTime<Utc> {
        self.output_timestamp
    }

    pub fn values(&self) -> &BTreeMap<String, PhaseValue> {
        &self.values
    }

    pub fn derived_values(&self) -> &BTreeMap<String, DerivedValue> {
        &self.derived_values
    }

    pub fn value(&self, name: &str) -> Option<&CapturedValue> {
        self.values.get(name).map(|v| &v.value)
    }

    pub fn derived(&self, name: &str) -> Option<f64> {
        self.derived_values.get(name).map(|d| d.value)
    }

    pub fn timestamp_for(&self, phase: Phase) -> DateTime<Utc> {
        match phase {
            Phase::Input => self.input_timestamp,
            Phase::Outcome => self.output_timestamp,
        }
    }
}
