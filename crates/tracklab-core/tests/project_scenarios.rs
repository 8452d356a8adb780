//! End-to-end project assembly and measurement cycle scenarios.

use chrono::{Duration, TimeZone, Utc};
use tracklab_core::cycle::{CycleState, InputSubmission, OutcomeSubmission};
use tracklab_core::error::{CoreError, ProjectError, ValueProblem};
use tracklab_core::transmit::WirePayload;
use tracklab_core::variables::{BiometricKind, CustomKind, FieldValue, FieldValues, Role, VariableKind};
use tracklab_core::Project;

const WEIGHT: VariableKind = VariableKind::Biometric(BiometricKind::Weight);
const SCALE: VariableKind = VariableKind::Custom(CustomKind::Scale);
const OPTIONS: VariableKind = VariableKind::Custom(CustomKind::Options);
const TIME_DIFF: VariableKind = VariableKind::Custom(CustomKind::TimeDifference);

fn fields(pairs: &[(&str, FieldValue)]) -> FieldValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn mood_fields() -> FieldValues {
    fields(&[(
        "options",
        FieldValue::TextList(vec!["Good".into(), "Bad".into()]),
    )])
}

#[test]
fn scale_with_uneven_increment_is_rejected() {
    let now = Utc::now();
    let mut project = Project::new("Sleep", None, &["Only"], now).unwrap();
    let config = fields(&[
        ("min", FieldValue::Integer(0)),
        ("max", FieldValue::Integer(10)),
        ("increment", FieldValue::Integer(3)),
    ]);

    let err = project
        .add_variable("Energy", SCALE, Role::Input, &config, now)
        .unwrap_err();

    match err {
        CoreError::Configuration(c) => assert_eq!(c.fields(), vec!["increment"]),
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert!(project.variables().is_empty());
    assert_eq!(project.constraint_state().total(), 0);
}

#[test]
fn duplicate_weight_names_are_rejected() {
    let now = Utc::now();
    let mut project = Project::new("Diet", None, &["Only"], now).unwrap();
    project
        .add_variable("Weight", WEIGHT, Role::Input, &FieldValues::new(), now)
        .unwrap();

    let err = project
        .add_variable("WEIGHT", SCALE, Role::Input, &FieldValues::new(), now)
        .unwrap_err();

    assert!(matches!(err, CoreError::Configuration(ref c) if c.has_field("name")));
    assert_eq!(project.variables().len(), 1);
}

#[test]
fn single_group_cycle_produces_two_values_and_no_group() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    let mut project = Project::new("Diet", None, &["Only"], now).unwrap();
    project
        .add_variable("Weight", WEIGHT, Role::Input, &FieldValues::new(), now)
        .unwrap();
    project
        .add_variable("Mood", OPTIONS, Role::Outcome, &mood_fields(), now)
        .unwrap();

    project
        .submit_inputs(&InputSubmission::new().value("Weight", 180.0), &Default::default(), now)
        .unwrap();
    assert_eq!(project.cycle_state(), CycleState::AwaitingOutcomes);

    let later = now + Duration::hours(2);
    let record = project
        .submit_outcomes(&OutcomeSubmission::new().value("Mood", "Good"), &Default::default(), later)
        .unwrap();

    assert_eq!(record.values().len(), 2);
    assert!(record.derived_values().is_empty());
    assert_eq!(record.group_label(), None);
    assert_eq!(record.value("Weight").and_then(|v| v.as_f64()), Some(180.0));
    assert_eq!(record.input_timestamp(), now);
    assert_eq!(record.output_timestamp(), later);
    assert_eq!(project.cycle_state(), CycleState::Idle);

    let json = serde_json::to_value(WirePayload::from_record(&record, "acct")).unwrap();
    assert!(json.get("group").is_none());
    assert_eq!(json["values"]["Mood"]["output"], "Good");
    assert_eq!(json["values"]["Weight"]["input"], 180.0);
}

#[test]
fn time_difference_measures_elapsed_cycle_time() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).unwrap();
    let mut project = Project::new("Coffee", Some("Drink coffee"), &["Only"], start).unwrap();
    project
        .add_variable("Alertness", SCALE, Role::Input, &FieldValues::new(), start)
        .unwrap();
    project
        .add_variable(
            "Wait",
            TIME_DIFF,
            Role::Outcome,
            &fields(&[("unit", FieldValue::Text("minutes".into()))]),
            start,
        )
        .unwrap();

    project
        .submit_inputs(&InputSubmission::new().value("Alertness", 4.0), &Default::default(), start)
        .unwrap();
    let record = project
        .submit_outcomes(&OutcomeSubmission::new(), &Default::default(), start + Duration::minutes(90))
        .unwrap();

    assert_eq!(record.derived("Wait"), Some(90.0));
}

#[test]
fn missing_group_choice_is_a_validation_error() {
    let now = Utc::now();
    let mut project = Project::new("Diet", None, &["Fasted", "Fed"], now).unwrap();
    project
        .add_variable("Weight", WEIGHT, Role::Input, &FieldValues::new(), now)
        .unwrap();

    let err = project
        .submit_inputs(&InputSubmission::new().value("Weight", 180.0), &Default::default(), now)
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(project.cycle_state(), CycleState::Idle);

    project
        .submit_inputs(
            &InputSubmission::new().value("Weight", 180.0).group("fed"),
            &Default::default(),
            now,
        )
        .unwrap();
    let record = project
        .submit_outcomes(&OutcomeSubmission::new(), &Default::default(), now)
        .unwrap();
    assert_eq!(record.group_label(), Some("Fed"));
}

#[test]
fn scale_value_off_increment_keeps_cycle_idle() {
    let now = Utc::now();
    let mut project = Project::new("Sleep", None, &["Only"], now).unwrap();
    let config = fields(&[
        ("min", FieldValue::Integer(0)),
        ("max", FieldValue::Integer(10)),
        ("increment", FieldValue::Integer(2)),
    ]);
    project
        .add_variable("Energy", SCALE, Role::Input, &config, now)
        .unwrap();

    let err = project
        .submit_inputs(&InputSubmission::new().value("Energy", 3.0), &Default::default(), now)
        .unwrap_err();
    match err {
        CoreError::Validation(v) => assert_eq!(
            v.problem_for("Energy"),
            Some(&ValueProblem::NotOnIncrement { increment: 2 })
        ),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(project.cycle_state(), CycleState::Idle);
    assert!(!project.is_locked());
}

#[test]
fn project_locks_once_reporting_starts() {
    let now = Utc::now();
    let mut project = Project::new("Diet", None, &["Only"], now).unwrap();
    project
        .add_variable("Weight", WEIGHT, Role::Input, &FieldValues::new(), now)
        .unwrap();
    project
        .submit_inputs(&InputSubmission::new().value("Weight", 180.0), &Default::default(), now)
        .unwrap();
    project.discard_cycle(now).unwrap();

    let err = project
        .add_variable("Mood", OPTIONS, Role::Outcome, &mood_fields(), now)
        .unwrap_err();
    assert!(matches!(err, CoreError::Project(ProjectError::Locked)));
    assert!(project.is_locked());
}
