//! Cross-variable constraints enforced while a project is assembled.

pub mod engine;
pub mod state;

pub use engine::{rules_for, ConstraintEngine, Rule};
pub use state::ConstraintState;
