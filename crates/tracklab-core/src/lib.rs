//! # Tracklab Core Library
//!
//! Core logic for self-tracking experiments. A project pairs input variables
//! (what you measure before acting) with outcome variables (what you measure
//! after), runs measurement cycles over them, and delivers each finished
//! cycle to a remote store. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Variables**: A catalog of variable kinds with typed configuration
//!   fields and per-kind value checks
//! - **Constraints**: Cross-variable rules (uniqueness, dependencies) checked
//!   while a project is assembled, with ghost variables standing in for
//!   missing dependencies
//! - **Cycle**: The two-phase input/outcome state machine producing
//!   finalized records
//! - **Transmit**: A persistent FIFO queue that delivers records in order
//!   and stops at the first failure
//! - **Storage**: SQLite persistence for projects and the queue, TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`Project`]: Variables, ghosts and the current measurement cycle
//! - [`ProjectSession`]: Async owner of a project that performs auto-capture
//! - [`TransmissionQueue`]: Offline-tolerant record delivery
//! - [`ProjectStore`]: Project persistence and audit log
//! - [`Config`]: Application configuration management

pub mod capture;
pub mod constraints;
pub mod cycle;
pub mod error;
pub mod events;
pub mod ghosts;
pub mod project;
pub mod session;
pub mod storage;
pub mod transmit;
pub mod variables;

pub use capture::{DataService, NoDataService, QuantityKind, StaticDataService, Unit};
pub use constraints::{ConstraintEngine, ConstraintState};
pub use cycle::{
    Clock, CycleState, FinalizedRecord, InputSubmission, ManualClock, OutcomeSubmission, Phase,
    SystemClock,
};
pub use error::{
    ConfigError, ConfigurationError, CoreError, DatabaseError, DeliveryError, ProjectError,
    RecordError, Rejection, ValidationError,
};
pub use events::Event;
pub use ghosts::{GhostRegistry, GhostVariable};
pub use project::{Group, Project, ProjectSnapshot};
pub use session::ProjectSession;
pub use storage::{Config, Database, ProjectStore};
pub use transmit::{DrainOutcome, DrainReport, DrainStop, HttpSink, RecordSink, TransmissionQueue};
pub use variables::{FieldValue, FieldValues, Role, VariableInstance, VariableKind};
