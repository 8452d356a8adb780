//! Core error types for tracklab-core.
//!
//! Every fallible public operation returns [`CoreError`]. The individual
//! error enums below map onto the categories callers need to tell apart:
//! locally recoverable configuration problems, programming errors
//! (constraint violations, out-of-sequence cycle calls), and delivery
//! failures that either can or cannot be retried later.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::variables::Role;

/// Core error type for tracklab-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A variable could not be configured as requested
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A kind was used that the constraint engine disallows
    #[error("Constraint violation: {0}")]
    Constraint(#[from] ConstraintViolation),

    /// The constraint tally no longer matches the project
    #[error("Constraint state error: {0}")]
    ConstraintState(#[from] ConstraintError),

    /// A cycle operation was called out of sequence
    #[error("Cycle state error: {0}")]
    CycleState(#[from] CycleStateError),

    /// Captured values failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A queued record could not be delivered
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// A stored record could not be decoded
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Project-level rule broken (locked, unknown variable, bad groups)
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Application configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One offending configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Configuration was rejected. Carries every offending field so a caller
/// can highlight all of them at once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    pub issues: Vec<FieldIssue>,
}

impl ConfigurationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new(field, message)],
        }
    }

    /// Ids of the offending fields, in the order they were found.
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|i| format!("{}: {}", i.field, i.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// A disallowed kind reached project assembly. Callers are expected to
/// consult the constraint engine first, so this indicates a caller bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("kind '{kind}' is not allowed as {role} here")]
pub struct ConstraintViolation {
    pub kind: String,
    pub role: Role,
}

/// The running constraint tally was asked to do something impossible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("removing '{kind}' from {role} would make its count negative")]
    Underflow { kind: String, role: Role },
}

/// Cycle operations called in the wrong state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStateError {
    #[error("inputs were already submitted for this cycle")]
    AlreadyAwaitingOutcomes,

    #[error("no inputs have been submitted for this cycle")]
    NotAwaitingOutcomes,
}

/// Why a single captured value was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueProblem {
    Missing,
    /// Auto-capture returned nothing or timed out.
    Unavailable,
    WrongType { expected: &'static str },
    OutOfRange { min: f64, max: f64 },
    NotOnIncrement { increment: i64 },
    NotAnOption,
    UnknownVariable,
    /// The variable is computed by the core and must not be supplied.
    Computed,
    /// The variable is fetched from the data service and must not be supplied.
    AutoCaptured,
    /// Two supplied names refer to the same variable.
    Duplicate,
    /// Inputs were present but the computation has no finite result.
    NotComputable,
    GroupRequired,
    UnknownGroup,
}

impl fmt::Display for ValueProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueProblem::Missing => write!(f, "value missing"),
            ValueProblem::Unavailable => write!(f, "value unavailable"),
            ValueProblem::WrongType { expected } => write!(f, "expected {expected}"),
            ValueProblem::OutOfRange { min, max } => write!(f, "must be between {min} and {max}"),
            ValueProblem::NotOnIncrement { increment } => {
                write!(f, "must move in steps of {increment}")
            }
            ValueProblem::NotAnOption => write!(f, "not one of the configured options"),
            ValueProblem::UnknownVariable => write!(f, "no such variable in this phase"),
            ValueProblem::Computed => write!(f, "computed automatically"),
            ValueProblem::AutoCaptured => write!(f, "captured automatically"),
            ValueProblem::Duplicate => write!(f, "supplied more than once"),
            ValueProblem::NotComputable => write!(f, "cannot be computed from the captured values"),
            ValueProblem::GroupRequired => write!(f, "a group must be selected"),
            ValueProblem::UnknownGroup => write!(f, "no such group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueIssue {
    pub variable: String,
    pub problem: ValueProblem,
}

/// Submitted cycle values were rejected. Nothing was buffered or recorded.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub issues: Vec<ValueIssue>,
}

impl ValidationError {
    pub fn variables(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.variable.as_str()).collect()
    }

    pub fn problem_for(&self, variable: &str) -> Option<&ValueProblem> {
        self.issues
            .iter()
            .find(|i| i.variable == variable)
            .map(|i| &i.problem)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|i| format!("{}: {}", i.variable, i.problem))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// What the remote side said when it refused a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    StorageFailure,
    MalformedPayload,
    Unrecognized(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::StorageFailure => write!(f, "remote storage failed"),
            Rejection::MalformedPayload => write!(f, "payload malformed"),
            Rejection::Unrecognized(token) => write!(f, "unrecognized response '{token}'"),
        }
    }
}

/// Delivery failures. Only connectivity failures are worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("endpoint unreachable: {0}")]
    Connectivity(String),

    #[error("record rejected: {0}")]
    Rejected(Rejection),
}

impl DeliveryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Connectivity(_))
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Connectivity(err.to_string())
    }
}

/// A persisted record could not be turned back into a live value.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("unknown variable kind '{kind}' in family '{family}'")]
    UnknownKind { family: String, kind: String },

    #[error("stored configuration for '{name}' is invalid: {source}")]
    InvalidConfiguration {
        name: String,
        #[source]
        source: ConfigurationError,
    },

    #[error("queue entry {handle} is corrupt: {message}")]
    CorruptQueueEntry { handle: i64, message: String },
}

/// Project-level errors that are not about a single field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    #[error("project configuration is locked once reporting has started")]
    Locked,

    #[error("no variable named '{0}'")]
    UnknownVariable(String),

    #[error("project title must not be empty")]
    EmptyTitle,

    #[error("a project needs at least one group")]
    NoGroups,

    #[error("duplicate group '{0}'")]
    DuplicateGroup(String),

    #[error("no project titled '{0}'")]
    NotFound(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A uniqueness constraint in the schema was hit
    #[error("Duplicate key: {0}")]
    Duplicate(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg) => match code.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                rusqlite::ErrorCode::ConstraintViolation => {
                    DatabaseError::Duplicate(msg.clone().unwrap_or_else(|| code.to_string()))
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_lists_fields() {
        let err = ConfigurationError {
            issues: vec![
                FieldIssue::new("increment", "must divide the range"),
                FieldIssue::new("max", "must exceed min"),
            ],
        };
        assert_eq!(err.fields(), vec!["increment", "max"]);
        assert!(err.has_field("max"));
        assert!(err.to_string().contains("increment: must divide the range"));
    }

    #[test]
    fn only_connectivity_is_retryable() {
        assert!(DeliveryError::Connectivity("down".into()).is_retryable());
        assert!(!DeliveryError::Rejected(Rejection::StorageFailure).is_retryable());
        assert!(!DeliveryError::Rejected(Rejection::MalformedPayload).is_retryable());
    }

    #[test]
    fn validation_error_finds_problem() {
        let err = ValidationError {
            issues: vec![ValueIssue {
                variable: "Weight".into(),
                problem: ValueProblem::Missing,
            }],
        };
        assert_eq!(err.problem_for("Weight"), Some(&ValueProblem::Missing));
        assert!(err.problem_for("Mood").is_none());
    }
}
