//! Values captured during a measurement cycle.

use serde::{Deserialize, Serialize};

use super::config::VariableConfig;
use super::kind::{EnvironmentKind, VariableKind};
use crate::error::ValueProblem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapturedValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Choices(Vec<String>),
}

impl CapturedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CapturedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CapturedValue::Flag(b) => serde_json::Value::Bool(*b),
            CapturedValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CapturedValue::Text(s) => serde_json::Value::String(s.clone()),
            CapturedValue::Choices(c) => {
                serde_json::Value::Array(c.iter().cloned().map(serde_json::Value::String).collect())
            }
        }
    }
}

impl From<f64> for CapturedValue {
    fn from(n: f64) -> Self {
        CapturedValue::Number(n)
    }
}

impl From<i64> for CapturedValue {
    fn from(n: i64) -> Self {
        CapturedValue::Number(n as f64)
    }
}

impl From<bool> for CapturedValue {
    fn from(b: bool) -> Self {
        CapturedValue::Flag(b)
    }
}

impl From<&str> for CapturedValue {
    fn from(s: &str) -> Self {
        CapturedValue::Text(s.to_string())
    }
}

/// Parse text input for a variable with `config`.
///
/// Returns `None` when the text cannot represent a value of that kind; the
/// result still has to pass [`check_value`].
pub fn parse_value(config: &VariableConfig, raw: &str) -> Option<CapturedValue> {
    let raw = raw.trim();
    match config {
        VariableConfig::Binary => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(CapturedValue::Flag(true)),
            "false" | "no" | "n" | "0" => Some(CapturedValue::Flag(false)),
            _ => None,
        },
        VariableConfig::Options(o) if o.allow_multiple => Some(CapturedValue::Choices(
            raw.split(',').map(|s| s.trim().to_string()).collect(),
        )),
        VariableConfig::Options(_) => Some(CapturedValue::Text(raw.to_string())),
        _ => raw.parse::<f64>().ok().map(CapturedValue::Number),
    }
}

/// Check a supplied value against the variable's configuration, returning
/// it normalized (option spelling follows the configuration).
pub fn check_value(
    kind: VariableKind,
    config: &VariableConfig,
    value: &CapturedValue,
) -> Result<CapturedValue, ValueProblem> {
    match config {
        VariableConfig::Binary => match value {
            CapturedValue::Flag(_) => Ok(value.clone()),
            _ => Err(ValueProblem::WrongType { expected: "yes/no" }),
        },
        VariableConfig::Scale(s) => {
            let n = whole_number(value)?;
            if n < s.min as f64 || n > s.max as f64 {
                return Err(ValueProblem::OutOfRange { min: s.min as f64, max: s.max as f64 });
            }
            if (n as i64 - s.min) % s.increment != 0 {
                return Err(ValueProblem::NotOnIncrement { increment: s.increment });
            }
            Ok(CapturedValue::Number(n))
        }
        VariableConfig::Counter(_) => {
            let n = whole_number(value)?;
            if n < 0.0 {
                return Err(ValueProblem::OutOfRange { min: 0.0, max: f64::MAX });
            }
            Ok(CapturedValue::Number(n))
        }
        VariableConfig::Options(o) => {
            let pick = |s: &str| {
                o.options
                    .iter()
                    .find(|opt| opt.eq_ignore_ascii_case(s.trim()))
                    .cloned()
                    .ok_or(ValueProblem::NotAnOption)
            };
            match value {
                CapturedValue::Text(s) => Ok(CapturedValue::Text(pick(s)?)),
                CapturedValue::Choices(items) if o.allow_multiple && !items.is_empty() => {
                    let picked = items.iter().map(|s| pick(s)).collect::<Result<Vec<_>, _>>()?;
                    Ok(CapturedValue::Choices(picked))
                }
                _ => Err(ValueProblem::WrongType { expected: "an option" }),
            }
        }
        VariableConfig::TimeDifference(_) | VariableConfig::BodyMassIndex(_) => {
            Err(ValueProblem::Computed)
        }
        VariableConfig::Measurement(_) => {
            let n = match value {
                CapturedValue::Number(n) if n.is_finite() => *n,
                _ => return Err(ValueProblem::WrongType { expected: "a number" }),
            };
            let signed = matches!(kind, VariableKind::Environment(EnvironmentKind::Temperature));
            if !signed && n < 0.0 {
                return Err(ValueProblem::OutOfRange { min: 0.0, max: f64::MAX });
            }
            Ok(CapturedValue::Number(n))
        }
    }
}

fn whole_number(value: &CapturedValue) -> Result<f64, ValueProblem> {
    match value {
        CapturedValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Ok(*n),
        _ => Err(ValueProblem::WrongType { expected: "a whole number" }),
    }
}
