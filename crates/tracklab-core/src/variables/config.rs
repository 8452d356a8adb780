//! Typed configuration for each kind.
//!
//! A configuration form hands over a loose [`FieldValues`] map.
//! [`VariableConfig::from_fields`] checks it against the kind's field
//! descriptors plus the kind's cross-field rules and produces one typed
//! struct per configuration screen. [`VariableConfig::to_fields`] is the
//! inverse and is what gets persisted.

use serde::{Deserialize, Serialize};

use super::field::{FieldValue, FieldValues};
use super::kind::{BiometricKind, CustomKind, VariableKind};
use crate::capture::Unit;
use crate::error::{ConfigurationError, FieldIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
        }
    }

    fn parse(s: &str) -> Option<TimeUnit> {
        match s {
            "seconds" => Some(TimeUnit::Seconds),
            "minutes" => Some(TimeUnit::Minutes),
            "hours" => Some(TimeUnit::Hours),
            _ => None,
        }
    }

    /// Express a span of milliseconds in this unit.
    pub fn from_millis(&self, ms: i64) -> f64 {
        let secs = ms as f64 / 1000.0;
        match self {
            TimeUnit::Seconds => secs,
            TimeUnit::Minutes => secs / 60.0,
            TimeUnit::Hours => secs / 3600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleConfig {
    pub min: i64,
    pub max: i64,
    pub increment: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    pub step: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsConfig {
    pub options: Vec<String>,
    pub allow_multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDifferenceConfig {
    pub unit: TimeUnit,
}

/// Shared by every kind that reads or writes a platform quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    pub unit: Unit,
    pub auto_capture: bool,
    pub write_to_store: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiConfig {
    /// Whether the weight/height ghosts are read from the data service.
    pub auto_capture: bool,
    pub write_to_store: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum VariableConfig {
    Scale(ScaleConfig),
    Binary,
    Counter(CounterConfig),
    Options(OptionsConfig),
    TimeDifference(TimeDifferenceConfig),
    Measurement(MeasurementConfig),
    BodyMassIndex(BmiConfig),
}

impl VariableConfig {
    /// Validate `values` for `kind` and build the typed configuration.
    ///
    /// Fields missing from `values` take the descriptor default. All
    /// offending fields are reported together.
    pub fn from_fields(kind: VariableKind, values: &FieldValues) -> Result<Self, ConfigurationError> {
        let spec = kind.spec();
        let mut issues = Vec::new();
        let mut resolved = FieldValues::new();

        for id in values.keys() {
            if spec.field(id).is_none() {
                issues.push(FieldIssue::new(id.clone(), "unknown field"));
            }
        }

        for descriptor in spec.fields {
            let value = values
                .get(descriptor.id)
                .cloned()
                .or_else(|| descriptor.default.to_value());
            match value {
                Some(v) => match descriptor.check(&v) {
                    Ok(v) => {
                        resolved.insert(descriptor.id.to_string(), v);
                    }
                    Err(issue) => issues.push(issue),
                },
                None if descriptor.required => {
                    issues.push(FieldIssue::new(descriptor.id, "required"));
                }
                None => {}
            }
        }

        if !issues.is_empty() {
            return Err(ConfigurationError { issues });
        }

        let config = Self::build(kind, &resolved);
        config.check_rules()?;
        Ok(config)
    }

    /// Build from already-checked values.
    fn build(kind: VariableKind, v: &FieldValues) -> Self {
        let int = |id: &str, default: i64| v.get(id).and_then(FieldValue::as_i64).unwrap_or(default);
        let flag = |id: &str| v.get(id).and_then(FieldValue::as_bool).unwrap_or(false);
        let unit = || {
            v.get("unit")
                .and_then(FieldValue::as_text)
                .and_then(Unit::from_symbol)
                .unwrap_or_else(|| kind.fixed_unit())
        };

        match kind {
            VariableKind::Custom(k) => match k {
                CustomKind::Scale => VariableConfig::Scale(ScaleConfig {
                    min: int("min", 0),
                    max: int("max", 10),
                    increment: int("increment", 1),
                }),
                CustomKind::Binary => VariableConfig::Binary,
                CustomKind::Counter => VariableConfig::Counter(CounterConfig { step: int("step", 1) }),
                CustomKind::Options => VariableConfig::Options(OptionsConfig {
                    options: v
                        .get("options")
                        .and_then(FieldValue::as_list)
                        .map(<[String]>::to_vec)
                        .unwrap_or_default(),
                    allow_multiple: flag("allow_multiple"),
                }),
                CustomKind::TimeDifference => VariableConfig::TimeDifference(TimeDifferenceConfig {
                    unit: v
                        .get("unit")
                        .and_then(FieldValue::as_text)
                        .and_then(TimeUnit::parse)
                        .unwrap_or(TimeUnit::Minutes),
                }),
            },
            VariableKind::Biometric(BiometricKind::BodyMassIndex) => {
                VariableConfig::BodyMassIndex(BmiConfig {
                    auto_capture: flag("auto_capture"),
                    write_to_store: flag("write_to_store"),
                })
            }
            VariableKind::Biometric(_)
            | VariableKind::Exercise(_)
            | VariableKind::Food(_)
            | VariableKind::Environment(_) => VariableConfig::Measurement(MeasurementConfig {
                unit: unit(),
                auto_capture: flag("auto_capture"),
                write_to_store: flag("write_to_store"),
            }),
        }
    }

    fn check_rules(&self) -> Result<(), ConfigurationError> {
        let mut issues = Vec::new();
        match self {
            VariableConfig::Scale(s) => {
                if s.max <= s.min {
                    issues.push(FieldIssue::new("max", "must be greater than min"));
                } else if (s.max - s.min) % s.increment != 0 {
                    issues.push(FieldIssue::new(
                        "increment",
                        format!("must evenly divide the range {}", s.max - s.min),
                    ));
                }
            }
            VariableConfig::Options(o) => {
                let mut seen: Vec<String> = Vec::new();
                for option in &o.options {
                    let key = option.to_lowercase();
                    if seen.contains(&key) {
                        issues.push(FieldIssue::new(
                            "options",
                            format!("'{option}' appears more than once"),
                        ));
                        break;
                    }
                    seen.push(key);
                }
            }
            _ => {}
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError { issues })
        }
    }

    /// Field map for `kind`, containing exactly the fields the kind declares.
    pub fn to_fields(&self, kind: VariableKind) -> FieldValues {
        let mut out = FieldValues::new();
        for descriptor in kind.spec().fields {
            let value = match (self, descriptor.id) {
                (VariableConfig::Scale(s), "min") => FieldValue::Integer(s.min),
                (VariableConfig::Scale(s), "max") => FieldValue::Integer(s.max),
                (VariableConfig::Scale(s), "increment") => FieldValue::Integer(s.increment),
                (VariableConfig::Counter(c), "step") => FieldValue::Integer(c.step),
                (VariableConfig::Options(o), "options") => FieldValue::TextList(o.options.clone()),
                (VariableConfig::Options(o), "allow_multiple") => FieldValue::Boolean(o.allow_multiple),
                (VariableConfig::TimeDifference(t), "unit") => FieldValue::Text(t.unit.as_str().into()),
                (VariableConfig::Measurement(m), "unit") => FieldValue::Text(m.unit.symbol().into()),
                (VariableConfig::Measurement(m), "auto_capture") => FieldValue::Boolean(m.auto_capture),
                (VariableConfig::Measurement(m), "write_to_store") => {
                    FieldValue::Boolean(m.write_to_store)
                }
                (VariableConfig::BodyMassIndex(b), "auto_capture") => FieldValue::Boolean(b.auto_capture),
                (VariableConfig::BodyMassIndex(b), "write_to_store") => {
                    FieldValue::Boolean(b.write_to_store)
                }
                _ => continue,
            };
            out.insert(descriptor.id.to_string(), value);
        }
        out
    }

    pub fn write_to_store(&self) -> bool {
        match self {
            VariableConfig::Measurement(m) => m.write_to_store,
            VariableConfig::BodyMassIndex(b) => b.write_to_store,
            _ => false,
        }
    }

    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self {
            VariableConfig::TimeDifference(t) => Some(t.unit),
            _ => None,
        }
    }

    pub fn auto_capture_flag(&self) -> bool {
        match self {
            VariableConfig::Measurement(m) => m.auto_capture,
            VariableConfig::BodyMassIndex(b) => b.auto_capture,
            _ => false,
        }
    }
}
