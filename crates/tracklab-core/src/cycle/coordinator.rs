//! Two-phase measurement cycle.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --submit_inputs--> AwaitingOutcomes --submit_outcomes--> Idle
//!                              |
//!                              +--discard--> Idle   (buffered inputs lost)
//! ```
//!
//! The machine itself is synchronous and never talks to the data service.
//! Auto-captured values are fetched by the caller (see
//! [`ProjectSession`](crate::session::ProjectSession)) and handed in as
//! [`AutoValues`]; a value the caller could not fetch is simply absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::buffer::CycleBuffer;
use super::record::{DerivedValue, FinalizedRecord, Phase, PhaseValue};
use crate::capture::{QuantityKind, Unit};
use crate::error::{CoreError, CycleStateError, ValidationError, ValueIssue, ValueProblem};
use crate::events::Event;
use crate::ghosts::{GhostRegistry, GhostVariable};
use crate::project::Group;
use crate::variables::{
    BiometricKind, CapturedValue, MeasurementConfig, Role, TimeUnit, VariableConfig,
    VariableInstance, VariableKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    AwaitingOutcomes,
}

/// Values for the input phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSubmission {
    pub values: BTreeMap<String, CapturedValue>,
    /// Required when the project has more than one group.
    pub group: Option<String>,
}

impl InputSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, name: &str, value: impl Into<CapturedValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn group(mut self, label: &str) -> Self {
        self.group = Some(label.to_string());
        self
    }
}

/// Values for the outcome phase (outcomes and action qualifiers).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeSubmission {
    pub values: BTreeMap<String, CapturedValue>,
}

impl OutcomeSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, name: &str, value: impl Into<CapturedValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }
}

/// Auto-captured readings by variable (or ghost) name.
pub type AutoValues = BTreeMap<String, f64>;

/// A reading the caller must try to fetch before submitting a phase.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub name: String,
    pub quantity: QuantityKind,
    pub unit: Unit,
}

/// The parts of a project a cycle reads.
#[derive(Debug, Clone, Copy)]
pub struct CycleContext<'a> {
    pub title: &'a str,
    pub groups: &'a [Group],
    pub variables: &'a [VariableInstance],
    pub ghosts: &'a GhostRegistry,
}

fn roles_for(phase: Phase) -> &'static [Role] {
    match phase {
        Phase::Input => &[Role::Input],
        Phase::Outcome => &[Role::Outcome, Role::ActionQualifier],
    }
}

/// Something that takes a value during a phase.
#[derive(Debug, Clone, Copy)]
enum Slot<'a> {
    Variable(&'a VariableInstance),
    Ghost(&'a GhostVariable),
}

impl<'a> Slot<'a> {
    fn name(&self) -> &'a str {
        match self {
            Slot::Variable(v) => v.name(),
            Slot::Ghost(g) => g.name(),
        }
    }

    fn kind(&self) -> VariableKind {
        match self {
            Slot::Variable(v) => v.kind(),
            Slot::Ghost(g) => g.kind(),
        }
    }

    fn role(&self) -> Role {
        match self {
            Slot::Variable(v) => v.role(),
            Slot::Ghost(g) => g.role(),
        }
    }

    fn is_auto_captured(&self) -> bool {
        match self {
            Slot::Variable(v) => v.is_auto_captured(),
            Slot::Ghost(g) => g.is_auto_captured(),
        }
    }

    fn unit(&self) -> Unit {
        match self {
            Slot::Variable(v) => v.unit(),
            Slot::Ghost(g) => g.kind().fixed_unit(),
        }
    }

    fn is_computation(&self) -> bool {
        self.kind().is_computation()
    }

    fn check(&self, value: &CapturedValue) -> Result<CapturedValue, ValueProblem> {
        match self {
            Slot::Variable(v) => v.check_value(value),
            Slot::Ghost(g) => {
                let config = VariableConfig::Measurement(MeasurementConfig {
                    unit: g.kind().fixed_unit(),
                    auto_capture: false,
                    write_to_store: false,
                });
                crate::variables::value::check_value(g.kind(), &config, value)
            }
        }
    }

    /// Like [`Slot::check`], for a reading the data service returned.
    fn check_reading(&self, reading: f64) -> Result<CapturedValue, ValueProblem> {
        let value = CapturedValue::Number(reading);
        match self {
            Slot::Variable(v) => crate::variables::value::check_value(v.kind(), v.config(), &value),
            Slot::Ghost(_) => self.check(&value),
        }
    }
}

impl<'a> CycleContext<'a> {
    fn slots(&self, phase: Phase) -> Vec<Slot<'a>> {
        let roles = roles_for(phase);
        let variables = self
            .variables
            .iter()
            .filter(|v| roles.contains(&v.role()))
            .map(Slot::Variable);
        let ghosts = self
            .ghosts
            .iter()
            .filter(|g| roles.contains(&g.role()))
            .map(Slot::Ghost);
        variables.chain(ghosts).collect()
    }

    /// Readings the caller should fetch for `phase`.
    pub fn capture_requests(&self, phase: Phase) -> Vec<CaptureRequest> {
        self.slots(phase)
            .into_iter()
            .filter(|s| s.is_auto_captured() && !s.is_computation())
            .filter_map(|s| {
                s.kind().quantity().map(|quantity| CaptureRequest {
                    name: s.name().to_string(),
                    quantity,
                    unit: s.unit(),
                })
            })
            .collect()
    }

    fn time_difference(&self) -> Option<(&'a VariableInstance, TimeUnit)> {
        self.variables
            .iter()
            .find_map(|v| v.config().time_unit().map(|unit| (v, unit)))
    }

    /// Collect and validate every value of `phase`.
    fn capture(
        &self,
        phase: Phase,
        supplied: &BTreeMap<String, CapturedValue>,
        auto: &AutoValues,
        issues: &mut Vec<ValueIssue>,
    ) -> (BTreeMap<String, CapturedValue>, BTreeMap<String, DerivedValue>) {
        let slots = self.slots(phase);
        let lookup = |map_name: &str| {
            slots
                .iter()
                .find(|s| s.name().eq_ignore_ascii_case(map_name.trim()))
                .copied()
        };

        let mut supplied_by_slot: BTreeMap<&str, &CapturedValue> = BTreeMap::new();
        for (name, value) in supplied {
            match lookup(name) {
                Some(slot) => {
                    if supplied_by_slot.insert(slot.name(), value).is_some() {
                        issues.push(issue(slot.name(), ValueProblem::Duplicate));
                    }
                }
                None => issues.push(issue(name, ValueProblem::UnknownVariable)),
            }
        }

        let mut values = BTreeMap::new();
        for slot in &slots {
            let given = supplied_by_slot.get(slot.name());
            if slot.is_computation() {
                if given.is_some() {
                    issues.push(issue(slot.name(), ValueProblem::Computed));
                }
                continue;
            }
            if slot.is_auto_captured() {
                if given.is_some() {
                    issues.push(issue(slot.name(), ValueProblem::AutoCaptured));
                    continue;
                }
                match auto.get(slot.name()) {
                    Some(v) if v.is_finite() => match slot.check_reading(*v) {
                        Ok(v) => {
                            values.insert(slot.name().to_string(), v);
                        }
                        Err(problem) => issues.push(issue(slot.name(), problem)),
                    },
                    _ => issues.push(issue(slot.name(), ValueProblem::Unavailable)),
                }
                continue;
            }
            match given {
                Some(value) => match slot.check(value) {
                    Ok(v) => {
                        values.insert(slot.name().to_string(), v);
                    }
                    Err(problem) => issues.push(issue(slot.name(), problem)),
                },
                None => issues.push(issue(slot.name(), ValueProblem::Missing)),
            }
        }

        let mut derived = BTreeMap::new();
        for slot in &slots {
            if let Slot::Variable(v) = slot {
                if v.kind() == VariableKind::Biometric(BiometricKind::BodyMassIndex) {
                    match self.body_mass_index(v.role(), &slots, &values) {
                        Ok(Some(bmi)) => {
                            derived.insert(
                                v.name().to_string(),
                                DerivedValue {
                                    phase,
                                    value: bmi,
                                    unit: "kg/m2".into(),
                                },
                            );
                        }
                        // A missing weight or height is already reported on its own slot.
                        Ok(None) => {}
                        Err(problem) => issues.push(issue(v.name(), problem)),
                    }
                }
            }
        }
        (values, derived)
    }

    /// BMI from the weight and height captured for `role` in this phase.
    ///
    /// `Ok(None)` when either reading is absent.
    fn body_mass_index(
        &self,
        role: Role,
        slots: &[Slot<'a>],
        values: &BTreeMap<String, CapturedValue>,
    ) -> Result<Option<f64>, ValueProblem> {
        let reading = |kind: BiometricKind| {
            slots
                .iter()
                .find(|s| s.role() == role && s.kind() == VariableKind::Biometric(kind))
                .and_then(|s| {
                    let v = values.get(s.name())?.as_f64()?;
                    Some((v, s.unit()))
                })
        };
        let (Some((weight, weight_unit)), Some((height, height_unit))) =
            (reading(BiometricKind::Weight), reading(BiometricKind::Height))
        else {
            return Ok(None);
        };
        let kg = match weight_unit {
            Unit::Kilogram => weight,
            _ => weight * 0.453_592_37,
        };
        let meters = match height_unit {
            Unit::Centimeter => height / 100.0,
            _ => height * 0.0254,
        };
        let bmi = kg / (meters * meters);
        if meters <= 0.0 || !bmi.is_finite() {
            return Err(ValueProblem::NotComputable);
        }
        Ok(Some(bmi))
    }
}

fn issue(name: &str, problem: ValueProblem) -> ValueIssue {
    ValueIssue {
        variable: name.to_string(),
        problem,
    }
}

/// Per-project cycle state: `None` is Idle, `Some` is AwaitingOutcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementCycle {
    buffer: Option<CycleBuffer>,
}

impl MeasurementCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a cycle from a persisted buffer.
    pub fn from_buffer(buffer: Option<CycleBuffer>) -> Self {
        Self { buffer }
    }

    pub fn state(&self) -> CycleState {
        match self.buffer {
            Some(_) => CycleState::AwaitingOutcomes,
            None => CycleState::Idle,
        }
    }

    pub fn buffer(&self) -> Option<&CycleBuffer> {
        self.buffer.as_ref()
    }

    pub fn submit_inputs(
        &mut self,
        ctx: &CycleContext<'_>,
        submission: &InputSubmission,
        auto: &AutoValues,
        now: DateTime<Utc>,
    ) -> Result<Event, CoreError> {
        if self.buffer.is_some() {
            return Err(CycleStateError::AlreadyAwaitingOutcomes.into());
        }

        let mut issues = Vec::new();
        let group = resolve_group(ctx.groups, submission.group.as_deref(), &mut issues);
        let (inputs, derived) = ctx.capture(Phase::Input, &submission.values, auto, &mut issues);
        if !issues.is_empty() {
            return Err(ValidationError { issues }.into());
        }

        let buffer = CycleBuffer {
            input_timestamp: now,
            inputs,
            derived,
            group: group.clone(),
        };
        let count = buffer.len();
        self.buffer = Some(buffer);
        tracing::info!(project = ctx.title, values = count, "inputs captured");

        Ok(Event::InputsCaptured {
            project: ctx.title.to_string(),
            group,
            values: count,
            at: now,
        })
    }

    pub fn submit_outcomes(
        &mut self,
        ctx: &CycleContext<'_>,
        submission: &OutcomeSubmission,
        auto: &AutoValues,
        now: DateTime<Utc>,
    ) -> Result<FinalizedRecord, CoreError> {
        let Some(buffer) = self.buffer.as_ref() else {
            return Err(CycleStateError::NotAwaitingOutcomes.into());
        };

        let mut issues = Vec::new();
        let (outcomes, mut derived) =
            ctx.capture(Phase::Outcome, &submission.values, auto, &mut issues);
        if !issues.is_empty() {
            return Err(ValidationError { issues }.into());
        }

        if let Some((td, unit)) = ctx.time_difference() {
            let elapsed_ms = (now - buffer.input_timestamp).num_milliseconds();
            derived.insert(
                td.name().to_string(),
                DerivedValue {
                    phase: Phase::Outcome,
                    value: unit.from_millis(elapsed_ms),
                    unit: unit.as_str().to_string(),
                },
            );
        }

        let mut values: BTreeMap<String, PhaseValue> = buffer
            .inputs
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    PhaseValue {
                        phase: Phase::Input,
                        value: value.clone(),
                    },
                )
            })
            .collect();
        values.extend(outcomes.into_iter().map(|(name, value)| {
            (
                name,
                PhaseValue {
                    phase: Phase::Outcome,
                    value,
                },
            )
        }));
        let mut all_derived = buffer.derived.clone();
        all_derived.extend(derived);

        let record = FinalizedRecord::new(
            ctx.title.to_string(),
            buffer.group.clone(),
            buffer.input_timestamp,
            now,
            values,
            all_derived,
        );
        self.buffer = None;
        tracing::info!(project = ctx.title, record = %record.id(), "cycle finalized");
        Ok(record)
    }

    /// User-initiated reset. Drops buffered inputs without producing a record.
    pub fn discard(&mut self, project: &str, now: DateTime<Utc>) -> Result<Event, CoreError> {
        let buffer = self
            .buffer
            .take()
            .ok_or(CycleStateError::NotAwaitingOutcomes)?;
        tracing::warn!(project, values = buffer.len(), "cycle discarded by user");
        Ok(Event::CycleDiscarded {
            project: project.to_string(),
            discarded_values: buffer.len(),
            at: now,
        })
    }
}

fn resolve_group(
    groups: &[Group],
    selected: Option<&str>,
    issues: &mut Vec<ValueIssue>,
) -> Option<String> {
    if groups.len() <= 1 {
        return None;
    }
    match selected {
        None => {
            issues.push(issue("group", ValueProblem::GroupRequired));
            None
        }
        Some(label) => match groups.iter().find(|g| g.label.eq_ignore_ascii_case(label.trim())) {
            Some(g) => Some(g.label.clone()),
            None => {
                issues.push(issue("group", ValueProblem::UnknownGroup));
                None
            }
        },
    }
}
