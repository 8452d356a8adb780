//! Variable kinds, their configuration, and configured instances.

pub mod catalog;
pub mod config;
pub mod field;
pub mod instance;
pub mod kind;
pub mod value;

pub use catalog::{all_kinds, kind_by_label, kinds_for};
pub use config::{
    BmiConfig, CounterConfig, MeasurementConfig, OptionsConfig, ScaleConfig, TimeDifferenceConfig,
    TimeUnit, VariableConfig,
};
pub use field::{DefaultValue, FieldDescriptor, FieldType, FieldValue, FieldValues};
pub use instance::{VariableInstance, VariableRecord};
pub use kind::{
    AutoCapture, BiometricKind, CustomKind, EnvironmentKind, ExerciseKind, FoodKind, KindClass,
    KindSpec, ModuleFamily, Role, Uniqueness, VariableKind,
};
pub use value::CapturedValue;
