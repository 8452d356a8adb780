pub mod catalog;
pub mod config;
pub mod cycle;
pub mod project;
pub mod queue;

use std::error::Error;
use std::path::PathBuf;

use tracklab_core::storage::{data_dir, ProjectStore, DATABASE_FILE, QUEUE_FILE};
use tracklab_core::transmit::TransmissionQueue;
use tracklab_core::variables::{FieldValue, FieldValues, VariableKind};
use tracklab_core::ConfigurationError;

pub type CliResult = Result<(), Box<dyn Error>>;

pub fn open_store() -> Result<ProjectStore, Box<dyn Error>> {
    Ok(ProjectStore::open(&data_dir()?.join(DATABASE_FILE))?)
}

pub fn open_queue() -> Result<TransmissionQueue, Box<dyn Error>> {
    Ok(TransmissionQueue::open(&data_dir()?.join(QUEUE_FILE))?)
}

pub fn home() -> Result<PathBuf, Box<dyn Error>> {
    Ok(data_dir()?)
}

/// Split `key=value`.
pub fn split_pair(raw: &str) -> Result<(&str, &str), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

/// Parse `--field id=value` pairs against the kind's descriptors.
pub fn parse_fields(kind: VariableKind, pairs: &[String]) -> Result<FieldValues, Box<dyn Error>> {
    let mut fields = FieldValues::new();
    let mut issues = Vec::new();
    for pair in pairs {
        let (id, raw) = split_pair(pair)?;
        let Some(descriptor) = kind.spec().field(id) else {
            issues.push(tracklab_core::error::FieldIssue::new(id, "unknown field"));
            continue;
        };
        match descriptor.parse(raw) {
            Ok(value) => {
                fields.insert(id.to_string(), value);
            }
            Err(issue) => issues.push(issue),
        }
    }
    if !issues.is_empty() {
        return Err(Box::new(ConfigurationError { issues }));
    }
    Ok(fields)
}

pub fn field_value_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Integer(i) => serde_json::json!(i),
        FieldValue::Decimal(d) => serde_json::json!(d),
        FieldValue::Boolean(b) => serde_json::json!(b),
        FieldValue::Text(s) => serde_json::json!(s),
        FieldValue::TextList(l) => serde_json::json!(l),
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
