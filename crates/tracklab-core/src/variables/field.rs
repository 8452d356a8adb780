//! Configuration field descriptors and values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::FieldIssue;

/// Type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    Integer,
    Decimal,
    Boolean,
    Text,
    /// Text restricted to one of the listed values.
    Choice(&'static [&'static str]),
    TextList,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Text => "text",
            FieldType::Choice(_) => "choice",
            FieldType::TextList => "text list",
        }
    }
}

/// Default for a field. `None` means the caller must supply it (when
/// required) or the field stays unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    None,
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Text(&'static str),
}

impl DefaultValue {
    pub fn to_value(&self) -> Option<FieldValue> {
        match *self {
            DefaultValue::None => None,
            DefaultValue::Integer(i) => Some(FieldValue::Integer(i)),
            DefaultValue::Decimal(d) => Some(FieldValue::Decimal(d)),
            DefaultValue::Boolean(b) => Some(FieldValue::Boolean(b)),
            DefaultValue::Text(t) => Some(FieldValue::Text(t.to_string())),
        }
    }
}

/// A single configuration field of a kind.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub field_type: FieldType,
    pub default: DefaultValue,
    /// Inclusive numeric bounds.
    pub bounds: Option<(f64, f64)>,
    pub required: bool,
}

/// A configured field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Text(String),
    TextList(Vec<String>),
}

/// Loose field map as produced by a configuration form.
pub type FieldValues = BTreeMap<String, FieldValue>;

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::TextList(l) => Some(l),
            _ => None,
        }
    }
}

impl FieldDescriptor {
    /// Parse text input into a value of this field's type.
    ///
    /// Text lists are comma separated.
    pub fn parse(&self, raw: &str) -> Result<FieldValue, FieldIssue> {
        let raw = raw.trim();
        let bad = |what: &str| FieldIssue::new(self.id, format!("'{raw}' is not a valid {what}"));
        match self.field_type {
            FieldType::Integer => raw
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| bad("integer")),
            FieldType::Decimal => raw
                .parse::<f64>()
                .map(FieldValue::Decimal)
                .map_err(|_| bad("number")),
            FieldType::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(FieldValue::Boolean(true)),
                "false" | "no" | "off" | "0" => Ok(FieldValue::Boolean(false)),
                _ => Err(bad("boolean")),
            },
            FieldType::Text | FieldType::Choice(_) => Ok(FieldValue::Text(raw.to_string())),
            FieldType::TextList => Ok(FieldValue::TextList(
                raw.split(',').map(|s| s.trim().to_string()).collect(),
            )),
        }
    }

    /// Check a value against type, bounds and non-emptiness, returning the
    /// value normalized to the field's type (integers widen to decimals).
    pub fn check(&self, value: &FieldValue) -> Result<FieldValue, FieldIssue> {
        let issue = |message: String| FieldIssue::new(self.id, message);
        let normalized = match (self.field_type, value) {
            (FieldType::Integer, FieldValue::Integer(_)) => value.clone(),
            (FieldType::Decimal, FieldValue::Decimal(d)) if d.is_finite() => value.clone(),
            (FieldType::Decimal, FieldValue::Integer(i)) => FieldValue::Decimal(*i as f64),
            (FieldType::Boolean, FieldValue::Boolean(_)) => value.clone(),
            (FieldType::Text, FieldValue::Text(s)) => {
                if s.trim().is_empty() {
                    return Err(issue("must not be empty".into()));
                }
                FieldValue::Text(s.trim().to_string())
            }
            (FieldType::Choice(choices), FieldValue::Text(s)) => {
                let found = choices.iter().find(|c| c.eq_ignore_ascii_case(s.trim()));
                match found {
                    Some(c) => FieldValue::Text((*c).to_string()),
                    None => {
                        return Err(issue(format!("must be one of {}", choices.join(", "))));
                    }
                }
            }
            (FieldType::TextList, FieldValue::TextList(items)) => {
                if items.is_empty() {
                    return Err(issue("must contain at least one entry".into()));
                }
                if items.iter().any(|s| s.trim().is_empty()) {
                    return Err(issue("entries must not be empty".into()));
                }
                FieldValue::TextList(items.iter().map(|s| s.trim().to_string()).collect())
            }
            _ => return Err(issue(format!("expected {}", self.field_type.name()))),
        };

        if let (Some((min, max)), Some(n)) = (self.bounds, normalized.as_f64()) {
            if n < min || n > max {
                return Err(issue(format!("must be between {min} and {max}")));
            }
        }
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: FieldDescriptor = FieldDescriptor {
        id: "step",
        label: "Step",
        field_type: FieldType::Integer,
        default: DefaultValue::Integer(1),
        bounds: Some((1.0, 100.0)),
        required: false,
    };

    const UNIT: FieldDescriptor = FieldDescriptor {
        id: "unit",
        label: "Unit",
        field_type: FieldType::Choice(&["lb", "kg"]),
        default: DefaultValue::Text("lb"),
        bounds: None,
        required: false,
    };

    #[test]
    fn bounds_are_inclusive() {
        assert!(STEP.check(&FieldValue::Integer(1)).is_ok());
        assert!(STEP.check(&FieldValue::Integer(100)).is_ok());
        let err = STEP.check(&FieldValue::Integer(101)).unwrap_err();
        assert_eq!(err.field, "step");
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(STEP.check(&FieldValue::Text("3".into())).is_err());
    }

    #[test]
    fn choice_is_normalized_to_declared_spelling() {
        assert_eq!(
            UNIT.check(&FieldValue::Text("KG".into())).unwrap(),
            FieldValue::Text("kg".into())
        );
        assert!(UNIT.check(&FieldValue::Text("stone".into())).is_err());
    }

    #[test]
    fn parse_text_input() {
        assert_eq!(STEP.parse(" 5 ").unwrap(), FieldValue::Integer(5));
        assert!(STEP.parse("five").is_err());
    }

    #[test]
    fn text_list_rejects_blank_entries() {
        let options = FieldDescriptor {
            id: "options",
            label: "Options",
            field_type: FieldType::TextList,
            default: DefaultValue::None,
            bounds: None,
            required: true,
        };
        let parsed = options.parse("Good, Bad").unwrap();
        assert_eq!(
            parsed,
            FieldValue::TextList(vec!["Good".into(), "Bad".into()])
        );
        assert!(options.check(&options.parse("Good,,Bad").unwrap()).is_err());
    }
}
