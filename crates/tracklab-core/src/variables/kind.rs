//! Variable kinds grouped by module family.
//!
//! Each family is a closed enum so that every place that dispatches on a
//! kind is checked exhaustively by the compiler. Static metadata for a kind
//! lives in a [`KindSpec`] reachable through [`VariableKind::spec`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::field::{DefaultValue, FieldDescriptor, FieldType};
use crate::capture::{QuantityKind, Unit};

/// Where in a project a variable is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Input,
    Outcome,
    ActionQualifier,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Input, Role::Outcome, Role::ActionQualifier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Input => "input",
            Role::Outcome => "outcome",
            Role::ActionQualifier => "action_qualifier",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input" => Some(Role::Input),
            "outcome" => Some(Role::Outcome),
            "action" | "action_qualifier" | "action-qualifier" => Some(Role::ActionQualifier),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many instances of a kind a project may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Uniqueness {
    PerProject,
    PerRole,
    Unrestricted,
}

/// Whether values of a kind come from the data service instead of the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoCapture {
    Never,
    /// Decided per instance by its `auto_capture` field.
    Optional,
    Always,
}

/// User-reported behaviour or system-derived computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindClass {
    Behavior,
    Computation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleFamily {
    Custom,
    Biometric,
    Exercise,
    Food,
    Environment,
}

impl ModuleFamily {
    pub const ALL: [ModuleFamily; 5] = [
        ModuleFamily::Custom,
        ModuleFamily::Biometric,
        ModuleFamily::Exercise,
        ModuleFamily::Food,
        ModuleFamily::Environment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFamily::Custom => "custom",
            ModuleFamily::Biometric => "biometric",
            ModuleFamily::Exercise => "exercise",
            ModuleFamily::Food => "food",
            ModuleFamily::Environment => "environment",
        }
    }

    pub fn parse(s: &str) -> Option<ModuleFamily> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ModuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomKind {
    Scale,
    Binary,
    Counter,
    Options,
    TimeDifference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiometricKind {
    Weight,
    Height,
    HeartRate,
    BodyMassIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseKind {
    Steps,
    ActiveEnergy,
    ExerciseMinutes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodKind {
    Calories,
    Carbohydrates,
    Caffeine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentKind {
    Temperature,
    Humidity,
}

/// One behaviour or computation a variable can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", content = "kind", rename_all = "snake_case")]
pub enum VariableKind {
    Custom(CustomKind),
    Biometric(BiometricKind),
    Exercise(ExerciseKind),
    Food(FoodKind),
    Environment(EnvironmentKind),
}

/// Static description of a kind.
#[derive(Debug)]
pub struct KindSpec {
    pub label: &'static str,
    pub class: KindClass,
    pub roles: &'static [Role],
    pub uniqueness: Uniqueness,
    pub auto_capture: AutoCapture,
    pub fields: &'static [FieldDescriptor],
}

impl KindSpec {
    pub fn eligible_for(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn field(&self, id: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }
}

const ANY_ROLE: &[Role] = &[Role::Input, Role::Outcome, Role::ActionQualifier];
const MEASURED: &[Role] = &[Role::Input, Role::Outcome];
const OUTCOME_ONLY: &[Role] = &[Role::Outcome];
const ACTION_ONLY: &[Role] = &[Role::ActionQualifier];

const AUTO_CAPTURE_FIELD: FieldDescriptor = FieldDescriptor {
    id: "auto_capture",
    label: "Read from data service",
    field_type: FieldType::Boolean,
    default: DefaultValue::Boolean(false),
    bounds: None,
    required: false,
};

const WRITE_TO_STORE_FIELD: FieldDescriptor = FieldDescriptor {
    id: "write_to_store",
    label: "Save to data service",
    field_type: FieldType::Boolean,
    default: DefaultValue::Boolean(false),
    bounds: None,
    required: false,
};

const ENERGY_UNIT_FIELD: FieldDescriptor = FieldDescriptor {
    id: "unit",
    label: "Unit",
    field_type: FieldType::Choice(&["kcal", "kJ"]),
    default: DefaultValue::Text("kcal"),
    bounds: None,
    required: false,
};

static SCALE: KindSpec = KindSpec {
    label: "Scale",
    class: KindClass::Behavior,
    roles: ANY_ROLE,
    uniqueness: Uniqueness::Unrestricted,
    auto_capture: AutoCapture::Never,
    fields: &[
        FieldDescriptor {
            id: "min",
            label: "Minimum",
            field_type: FieldType::Integer,
            default: DefaultValue::Integer(0),
            bounds: Some((-1_000_000.0, 1_000_000.0)),
            required: false,
        },
        FieldDescriptor {
            id: "max",
            label: "Maximum",
            field_type: FieldType::Integer,
            default: DefaultValue::Integer(10),
            bounds: Some((-1_000_000.0, 1_000_000.0)),
            required: false,
        },
        FieldDescriptor {
            id: "increment",
            label: "Increment",
            field_type: FieldType::Integer,
            default: DefaultValue::Integer(1),
            bounds: Some((1.0, 1_000_000.0)),
            required: false,
        },
    ],
};

static BINARY: KindSpec = KindSpec {
    label: "Binary",
    class: KindClass::Behavior,
    roles: ANY_ROLE,
    uniqueness: Uniqueness::Unrestricted,
    auto_capture: AutoCapture::Never,
    fields: &[],
};

static COUNTER: KindSpec = KindSpec {
    label: "Counter",
    class: KindClass::Behavior,
    roles: ANY_ROLE,
    uniqueness: Uniqueness::Unrestricted,
    auto_capture: AutoCapture::Never,
    fields: &[FieldDescriptor {
        id: "step",
        label: "Step",
        field_type: FieldType::Integer,
        default: DefaultValue::Integer(1),
        bounds: Some((1.0, 100.0)),
        required: false,
    }],
};

static OPTIONS: KindSpec = KindSpec {
    label: "Options",
    class: KindClass::Behavior,
    roles: ANY_ROLE,
    uniqueness: Uniqueness::Unrestricted,
    auto_capture: AutoCapture::Never,
    fields: &[
        FieldDescriptor {
            id: "options",
            label: "Options",
            field_type: FieldType::TextList,
            default: DefaultValue::None,
            bounds: None,
            required: true,
        },
        FieldDescriptor {
            id: "allow_multiple",
            label: "Allow multiple selections",
            field_type: FieldType::Boolean,
            default: DefaultValue::Boolean(false),
            bounds: None,
            required: false,
        },
    ],
};

static TIME_DIFFERENCE: KindSpec = KindSpec {
    label: "Time Difference",
    class: KindClass::Computation,
    roles: OUTCOME_ONLY,
    uniqueness: Uniqueness::PerProject,
    auto_capture: AutoCapture::Never,
    fields: &[FieldDescriptor {
        id: "unit",
        label: "Unit",
        field_type: FieldType::Choice(&["seconds", "minutes", "hours"]),
        default: DefaultValue::Text("minutes"),
        bounds: None,
        required: false,
    }],
};

static WEIGHT: KindSpec = KindSpec {
    label: "Weight",
    class: KindClass::Behavior,
    roles: MEASURED,
    uniqueness: Uniqueness::PerRole,
    auto_capture: AutoCapture::Optional,
    fields: &[
        FieldDescriptor {
            id: "unit",
            label: "Unit",
            field_type: FieldType::Choice(&["lb", "kg"]),
            default: DefaultValue::Text("lb"),
            bounds: None,
            required: false,
        },
        AUTO_CAPTURE_FIELD,
    ],
};

static HEIGHT: KindSpec = KindSpec {
    label: "Height",
    class: KindClass::Behavior,
    roles: MEASURED,
    uniqueness: Uniqueness::PerRole,
    auto_capture: AutoCapture::Optional,
    fields: &[
        FieldDescriptor {
            id: "unit",
            label: "Unit",
            field_type: FieldType::Choice(&["in", "cm"]),
            default: DefaultValue::Text("in"),
            bounds: None,
            required: false,
        },
        AUTO_CAPTURE_FIELD,
    ],
};

static HEART_RATE: KindSpec = KindSpec {
    label: "Heart Rate",
    class: KindClass::Behavior,
    roles: MEASURED,
    uniqueness: Uniqueness::PerRole,
    auto_capture: AutoCapture::Optional,
    fields: &[AUTO_CAPTURE_FIELD],
};

static BODY_MASS_INDEX: KindSpec = KindSpec {
    label: "BMI",
    class: KindClass::Computation,
    roles: MEASURED,
    uniqueness: Uniqueness::PerRole,
    auto_capture: AutoCapture::Never,
    fields: &[AUTO_CAPTURE_FIELD, WRITE_TO_STORE_FIELD],
};

static STEPS: KindSpec = KindSpec {
    label: "Steps",
    class: KindClass::Behavior,
    roles: MEASURED,
    uniqueness: Uniqueness::PerRole,
    auto_capture: AutoCapture::Always,
    fields: &[],
};

static ACTIVE_ENERGY: KindSpec = KindSpec {
    label: "Active Energy",
    class: KindClass::Behavior,
    roles: MEASURED,
    uniqueness: Uniqueness::PerRole,
    auto_capture: AutoCapture::Always,
    fields: &[ENERGY_UNIT_FIELD],
};

static EXERCISE_MINUTES: KindSpec = KindSpec {
    label: "Exercise Minutes",
    class: KindClass::Behavior,
    roles: MEASURED,
    uniqueness: Uniqueness::PerRole,
    auto_capture: AutoCapture::Always,
    fields: &[],
};

static CALORIES: KindSpec = KindSpec {
    label: "Calories",
    class: KindClass::Behavior,
    roles: ACTION_ONLY,
    uniqueness: Uniqueness::PerProject,
    auto_capture: AutoCapture::Never,
    fields: &[ENERGY_UNIT_FIELD, WRITE_TO_STORE_FIELD],
};

static CARBOHYDRATES: KindSpec = KindSpec {
    label: "Carbohydrates",
    class: KindClass::Behavior,
    roles: ACTION_ONLY,
    uniqueness: Uniqueness::PerProject,
    auto_capture: AutoCapture::Never,
    fields: &[WRITE_TO_STORE_FIELD],
};

static CAFFEINE: KindSpec = KindSpec {
    label: "Caffeine",
    class: KindClass::Behavior,
    roles: ACTION_ONLY,
    uniqueness: Uniqueness::PerProject,
    auto_capture: AutoCapture::Never,
    fields: &[WRITE_TO_STORE_FIELD],
};

static TEMPERATURE: KindSpec = KindSpec {
    label: "Temperature",
    class: KindClass::Behavior,
    roles: MEASURED,
    uniqueness: Uniqueness::PerRole,
    auto_capture: AutoCapture::Always,
    fields: &[FieldDescriptor {
        id: "unit",
        label: "Unit",
        field_type: FieldType::Choice(&["degF", "degC"]),
        default: DefaultValue::Text("degF"),
        bounds: None,
        required: false,
    }],
};

static HUMIDITY: KindSpec = KindSpec {
    label: "Humidity",
    class: KindClass::Behavior,
    roles: MEASURED,
    uniqueness: Uniqueness::PerRole,
    auto_capture: AutoCapture::Always,
    fields: &[],
};

impl VariableKind {
    pub fn family(&self) -> ModuleFamily {
        match self {
            VariableKind::Custom(_) => ModuleFamily::Custom,
            VariableKind::Biometric(_) => ModuleFamily::Biometric,
            VariableKind::Exercise(_) => ModuleFamily::Exercise,
            VariableKind::Food(_) => ModuleFamily::Food,
            VariableKind::Environment(_) => ModuleFamily::Environment,
        }
    }

    pub fn spec(&self) -> &'static KindSpec {
        match self {
            VariableKind::Custom(k) => match k {
                CustomKind::Scale => &SCALE,
                CustomKind::Binary => &BINARY,
                CustomKind::Counter => &COUNTER,
                CustomKind::Options => &OPTIONS,
                CustomKind::TimeDifference => &TIME_DIFFERENCE,
            },
            VariableKind::Biometric(k) => match k {
                BiometricKind::Weight => &WEIGHT,
                BiometricKind::Height => &HEIGHT,
                BiometricKind::HeartRate => &HEART_RATE,
                BiometricKind::BodyMassIndex => &BODY_MASS_INDEX,
            },
            VariableKind::Exercise(k) => match k {
                ExerciseKind::Steps => &STEPS,
                ExerciseKind::ActiveEnergy => &ACTIVE_ENERGY,
                ExerciseKind::ExerciseMinutes => &EXERCISE_MINUTES,
            },
            VariableKind::Food(k) => match k {
                FoodKind::Calories => &CALORIES,
                FoodKind::Carbohydrates => &CARBOHYDRATES,
                FoodKind::Caffeine => &CAFFEINE,
            },
            VariableKind::Environment(k) => match k {
                EnvironmentKind::Temperature => &TEMPERATURE,
                EnvironmentKind::Humidity => &HUMIDITY,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        self.spec().label
    }

    pub fn is_computation(&self) -> bool {
        self.spec().class == KindClass::Computation
    }

    /// The data-service quantity this kind reads or writes, if any.
    pub fn quantity(&self) -> Option<QuantityKind> {
        match self {
            VariableKind::Custom(_) => None,
            VariableKind::Biometric(k) => Some(match k {
                BiometricKind::Weight => QuantityKind::BodyMass,
                BiometricKind::Height => QuantityKind::Height,
                BiometricKind::HeartRate => QuantityKind::HeartRate,
                BiometricKind::BodyMassIndex => QuantityKind::BodyMassIndex,
            }),
            VariableKind::Exercise(k) => Some(match k {
                ExerciseKind::Steps => QuantityKind::StepCount,
                ExerciseKind::ActiveEnergy => QuantityKind::ActiveEnergyBurned,
                ExerciseKind::ExerciseMinutes => QuantityKind::ExerciseTime,
            }),
            VariableKind::Food(k) => Some(match k {
                FoodKind::Calories => QuantityKind::DietaryEnergy,
                FoodKind::Carbohydrates => QuantityKind::DietaryCarbohydrates,
                FoodKind::Caffeine => QuantityKind::DietaryCaffeine,
            }),
            VariableKind::Environment(k) => Some(match k {
                EnvironmentKind::Temperature => QuantityKind::AmbientTemperature,
                EnvironmentKind::Humidity => QuantityKind::RelativeHumidity,
            }),
        }
    }

    /// Unit used when the kind has no configurable unit.
    pub fn fixed_unit(&self) -> Unit {
        match self {
            VariableKind::Custom(_) => Unit::Count,
            VariableKind::Biometric(k) => match k {
                BiometricKind::Weight => Unit::Pound,
                BiometricKind::Height => Unit::Inch,
                BiometricKind::HeartRate => Unit::BeatsPerMinute,
                BiometricKind::BodyMassIndex => Unit::Count,
            },
            VariableKind::Exercise(k) => match k {
                ExerciseKind::Steps => Unit::Count,
                ExerciseKind::ActiveEnergy => Unit::Kilocalorie,
                ExerciseKind::ExerciseMinutes => Unit::Minute,
            },
            VariableKind::Food(k) => match k {
                FoodKind::Calories => Unit::Kilocalorie,
                FoodKind::Carbohydrates => Unit::Gram,
                FoodKind::Caffeine => Unit::Milligram,
            },
            VariableKind::Environment(k) => match k {
                EnvironmentKind::Temperature => Unit::Fahrenheit,
                EnvironmentKind::Humidity => Unit::Percent,
            },
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_accepts_aliases() {
        assert_eq!(Role::parse("Input"), Some(Role::Input));
        assert_eq!(Role::parse("action"), Some(Role::ActionQualifier));
        assert_eq!(Role::parse("action-qualifier"), Some(Role::ActionQualifier));
        assert_eq!(Role::parse("sideways"), None);
    }

    #[test]
    fn time_difference_is_project_unique_outcome_computation() {
        let kind = VariableKind::Custom(CustomKind::TimeDifference);
        let spec = kind.spec();
        assert!(kind.is_computation());
        assert_eq!(spec.uniqueness, Uniqueness::PerProject);
        assert!(spec.eligible_for(Role::Outcome));
        assert!(!spec.eligible_for(Role::Input));
    }

    #[test]
    fn custom_kinds_have_no_quantity() {
        assert!(VariableKind::Custom(CustomKind::Scale).quantity().is_none());
        assert_eq!(
            VariableKind::Biometric(BiometricKind::Weight).quantity(),
            Some(QuantityKind::BodyMass)
        );
    }

    #[test]
    fn family_parse_is_case_insensitive() {
        assert_eq!(ModuleFamily::parse("Biometric"), Some(ModuleFamily::Biometric));
        assert_eq!(ModuleFamily::parse("nope"), None);
    }
}
