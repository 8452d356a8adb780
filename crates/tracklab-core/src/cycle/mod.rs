//! Measurement cycle: input phase, outcome phase, finalized record.

pub mod buffer;
pub mod clock;
pub mod coordinator;
pub mod record;

pub use buffer::CycleBuffer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{
    AutoValues, CaptureRequest, CycleContext, CycleState, InputSubmission, MeasurementCycle,
    OutcomeSubmission,
};
pub use record::{DerivedValue, FinalizedRecord, Phase, PhaseValue};
