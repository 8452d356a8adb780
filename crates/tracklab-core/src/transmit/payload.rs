//! JSON body posted for each queued record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::cycle::{FinalizedRecord, Phase};

/// Per-variable value dictionary. A variable carries the value of the phase
/// it was captured in, so usually only one side is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl WireValue {
    fn set(&mut self, phase: Phase, value: serde_json::Value, timestamp: String) {
        match phase {
            Phase::Input => {
                self.input = Some(value);
                self.input_timestamp = Some(timestamp);
            }
            Phase::Outcome => {
                self.output = Some(value);
                self.output_timestamp = Some(timestamp);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePayload {
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub account: String,
    pub record_id: Uuid,
    pub values: BTreeMap<String, WireValue>,
}

impl WirePayload {
    pub fn from_record(record: &FinalizedRecord, account: &str) -> Self {
        let stamp = |phase: Phase| record.timestamp_for(phase).to_rfc3339();
        let mut values: BTreeMap<String, WireValue> = BTreeMap::new();

        for (name, v) in record.values() {
            values
                .entry(name.clone())
                .or_default()
                .set(v.phase, v.value.to_json(), stamp(v.phase));
        }
        for (name, d) in record.derived_values() {
            let json = serde_json::Number::from_f64(d.value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null);
            let entry = values.entry(name.clone()).or_default();
            entry.set(d.phase, json, stamp(d.phase));
            entry.unit = Some(d.unit.clone());
        }

        Self {
            project: record.project_title().to_string(),
            group: record.group_label().map(String::from),
            account: account.to_string(),
            record_id: record.id(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::{DerivedValue, PhaseValue};
    use crate::variables::CapturedValue;
    use chrono::{Duration, Utc};

    #[test]
    fn payload_carries_phase_and_timestamp() {
        let t0 = Utc::now();
        let mut values = BTreeMap::new();
        values.insert(
            "Weight".to_string(),
            PhaseValue { phase: Phase::Input, value: CapturedValue::Number(180.0) },
        );
        values.insert(
            "Mood".to_string(),
            PhaseValue { phase: Phase::Outcome, value: CapturedValue::Text("Good".into()) },
        );
        let mut derived = BTreeMap::new();
        derived.insert(
            "Elapsed".to_string(),
            DerivedValue { phase: Phase::Outcome, value: 30.0, unit: "minutes".into() },
        );
        let record = FinalizedRecord::new(
            "Diet".into(),
            None,
            t0,
            t0 + Duration::minutes(30),
            values,
            derived,
        );

        let payload = WirePayload::from_record(&record, "tracklab-abc");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["project"], "Diet");
        assert!(json.get("group").is_none());
        assert_eq!(json["account"], "tracklab-abc");
        assert_eq!(json["values"]["Weight"]["input"], 180.0);
        assert_eq!(json["values"]["Weight"]["input_timestamp"], t0.to_rfc3339());
        assert!(json["values"]["Weight"].get("output").is_none());
        assert_eq!(json["values"]["Mood"]["output"], "Good");
        assert_eq!(json["values"]["Elapsed"]["output"], 30.0);
        assert_eq!(json["values"]["Elapsed"]["unit"], "minutes");
    }
}
