//! Persisted variables decode to exactly what was configured.

use proptest::prelude::*;
use tracklab_core::variables::{
    BiometricKind, CustomKind, EnvironmentKind, ExerciseKind, FieldValue, FieldValues, FoodKind,
    Role, VariableInstance, VariableKind,
};

fn fields(pairs: Vec<(&str, FieldValue)>) -> FieldValues {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn scale() -> impl Strategy<Value = (VariableKind, FieldValues)> {
    (-1000i64..1000, 1i64..50, 1i64..50).prop_map(|(min, increment, steps)| {
        (
            VariableKind::Custom(CustomKind::Scale),
            fields(vec![
                ("min", FieldValue::Integer(min)),
                ("max", FieldValue::Integer(min + increment * steps)),
                ("increment", FieldValue::Integer(increment)),
            ]),
        )
    })
}

fn counter() -> impl Strategy<Value = (VariableKind, FieldValues)> {
    (1i64..=100).prop_map(|step| {
        (
            VariableKind::Custom(CustomKind::Counter),
            fields(vec![("step", FieldValue::Integer(step))]),
        )
    })
}

fn options() -> impl Strategy<Value = (VariableKind, FieldValues)> {
    (prop::collection::btree_set("[a-z][a-z0-9]{0,8}", 1..6), any::<bool>()).prop_map(
        |(options, allow_multiple)| {
            (
                VariableKind::Custom(CustomKind::Options),
                fields(vec![
                    ("options", FieldValue::TextList(options.into_iter().collect())),
                    ("allow_multiple", FieldValue::Boolean(allow_multiple)),
                ]),
            )
        },
    )
}

fn time_difference() -> impl Strategy<Value = (VariableKind, FieldValues)> {
    prop::sample::select(vec!["seconds", "minutes", "hours"]).prop_map(|unit| {
        (
            VariableKind::Custom(CustomKind::TimeDifference),
            fields(vec![("unit", FieldValue::Text(unit.into()))]),
        )
    })
}

fn measured(
    kind: VariableKind,
    units: Vec<&'static str>,
) -> impl Strategy<Value = (VariableKind, FieldValues)> {
    (prop::sample::select(units), any::<bool>()).prop_map(move |(unit, auto_capture)| {
        (
            kind,
            fields(vec![
                ("unit", FieldValue::Text(unit.into())),
                ("auto_capture", FieldValue::Boolean(auto_capture)),
            ]),
        )
    })
}

fn bmi() -> impl Strategy<Value = (VariableKind, FieldValues)> {
    (any::<bool>(), any::<bool>()).prop_map(|(auto_capture, write_to_store)| {
        (
            VariableKind::Biometric(BiometricKind::BodyMassIndex),
            fields(vec![
                ("auto_capture", FieldValue::Boolean(auto_capture)),
                ("write_to_store", FieldValue::Boolean(write_to_store)),
            ]),
        )
    })
}

fn calories() -> impl Strategy<Value = (VariableKind, FieldValues)> {
    (prop::sample::select(vec!["kcal", "kJ"]), any::<bool>()).prop_map(|(unit, write_to_store)| {
        (
            VariableKind::Food(FoodKind::Calories),
            fields(vec![
                ("unit", FieldValue::Text(unit.into())),
                ("write_to_store", FieldValue::Boolean(write_to_store)),
            ]),
        )
    })
}

fn unconfigured() -> impl Strategy<Value = (VariableKind, FieldValues)> {
    prop::sample::select(vec![
        VariableKind::Custom(CustomKind::Binary),
        VariableKind::Exercise(ExerciseKind::Steps),
        VariableKind::Environment(EnvironmentKind::Humidity),
    ])
    .prop_map(|kind| (kind, FieldValues::new()))
}

fn configuration() -> impl Strategy<Value = (VariableKind, FieldValues)> {
    prop_oneof![
        scale(),
        counter(),
        options(),
        time_difference(),
        measured(VariableKind::Biometric(BiometricKind::Weight), vec!["lb", "kg"]),
        measured(VariableKind::Biometric(BiometricKind::Height), vec!["in", "cm"]),
        bmi(),
        calories(),
        unconfigured(),
    ]
}

proptest! {
    #[test]
    fn record_round_trip_keeps_configuration(
        (kind, fields) in configuration(),
        name in "[A-Z][a-z]{2,10}",
    ) {
        let role = *Role::ALL
            .iter()
            .find(|r| kind.spec().eligible_for(**r))
            .unwrap();
        let v = VariableInstance::create(&name, kind, role, &fields).unwrap();

        let json = serde_json::to_string(&v.serialize()).unwrap();
        let back = VariableInstance::deserialize(&serde_json::from_str(&json).unwrap()).unwrap();

        prop_assert_eq!(back.kind(), v.kind());
        prop_assert_eq!(back.name(), v.name());
        let decoded = back.configured_values();
        prop_assert_eq!(&decoded, &v.configured_values());
        for (id, value) in &fields {
            prop_assert_eq!(decoded.get(id), Some(value));
        }
        prop_assert_eq!(back, v);
    }
}
