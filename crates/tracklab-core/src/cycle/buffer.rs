//! Values held between the input and outcome phases of a cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::record::DerivedValue;
use crate::variables::CapturedValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleBuffer {
    pub input_timestamp: DateTime<Utc>,
    pub inputs: BTreeMap<String, CapturedValue>,
    /// Computations evaluated during the input phase.
    #[serde(default)]
    pub derived: BTreeMap<String, DerivedValue>,
    /// Selected group; `None` for single-group projects.
    #[serde(default)]
    pub group: Option<String>,
}

impl CycleBuffer {
    pub fn len(&self) -> usize {
        self.inputs.len() + self.derived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
