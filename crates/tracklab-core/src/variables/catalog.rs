//! Read-only registry of variable kinds.

use super::kind::{
    BiometricKind, CustomKind, EnvironmentKind, ExerciseKind, FoodKind, ModuleFamily, VariableKind,
};

/// Kinds of a family in presentation order. Never fails; a family with no
/// kinds yields an empty list.
pub fn kinds_for(family: ModuleFamily) -> Vec<VariableKind> {
    match family {
        ModuleFamily::Custom => [
            CustomKind::Scale,
            CustomKind::Binary,
            CustomKind::Counter,
            CustomKind::Options,
            CustomKind::TimeDifference,
        ]
        .into_iter()
        .map(VariableKind::Custom)
        .collect(),
        ModuleFamily::Biometric => [
            BiometricKind::Weight,
            BiometricKind::Height,
            BiometricKind::HeartRate,
            BiometricKind::BodyMassIndex,
        ]
        .into_iter()
        .map(VariableKind::Biometric)
        .collect(),
        ModuleFamily::Exercise => [
            ExerciseKind::Steps,
            ExerciseKind::ActiveEnergy,
            ExerciseKind::ExerciseMinutes,
        ]
        .into_iter()
        .map(VariableKind::Exercise)
        .collect(),
        ModuleFamily::Food => [FoodKind::Calories, FoodKind::Carbohydrates, FoodKind::Caffeine]
            .into_iter()
            .map(VariableKind::Food)
            .collect(),
        ModuleFamily::Environment => [EnvironmentKind::Temperature, EnvironmentKind::Humidity]
            .into_iter()
            .map(VariableKind::Environment)
            .collect(),
    }
}

/// Look a kind up by its label within a family (case-insensitive).
pub fn kind_by_label(family: ModuleFamily, label: &str) -> Option<VariableKind> {
    let label = label.trim();
    kinds_for(family)
        .into_iter()
        .find(|k| k.label().eq_ignore_ascii_case(label))
}

/// Every kind in every family.
pub fn all_kinds() -> Vec<VariableKind> {
    ModuleFamily::ALL.into_iter().flat_map(kinds_for).collect()
}
