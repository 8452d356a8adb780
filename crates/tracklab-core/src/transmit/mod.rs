//! Delivery of finalized records to the remote store.

pub mod account;
pub mod http;
pub mod payload;
pub mod queue;
pub mod sink;

pub use account::{get_or_create_account_id_at, resolve_account_id, AccountIdError};
pub use http::{classify_response, HttpSink};
pub use payload::{WirePayload, WireValue};
pub use queue::{
    DrainOutcome, DrainReport, DrainStop, HaltReason, PendingEntry, QueueEntry, TransmissionQueue,
};
pub use sink::RecordSink;
