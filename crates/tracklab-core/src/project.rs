//! Project aggregate: groups, variables, ghosts, constraint tally and cycle.
//!
//! All mutation goes through [`Project`] so the constraint tally and the
//! ghost registry always agree with the variable list. Once the first inputs
//! of a cycle are submitted the variable set is locked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constraints::{ConstraintEngine, ConstraintState};
use crate::cycle::{
    AutoValues, CaptureRequest, CycleBuffer, CycleContext, CycleState, FinalizedRecord,
    InputSubmission, MeasurementCycle, OutcomeSubmission, Phase,
};
use crate::error::{ConfigurationError, ConstraintViolation, ProjectError, Result};
use crate::events::Event;
use crate::ghosts::{GhostChanges, GhostRecord, GhostRegistry};
use crate::variables::{FieldValues, ModuleFamily, Role, VariableInstance, VariableKind, VariableRecord};

/// A named arm of a comparison-style project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Project {
    title: String,
    action: Option<String>,
    groups: Vec<Group>,
    variables: Vec<VariableInstance>,
    ghosts: GhostRegistry,
    constraints: ConstraintState,
    cycle: MeasurementCycle,
    reporting_started: bool,
    created_at: DateTime<Utc>,
}

/// Everything needed to rebuild a [`Project`]. The constraint tally is not
/// part of it; it is recomputed from the variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub title: String,
    pub action: Option<String>,
    pub groups: Vec<String>,
    pub variables: Vec<VariableRecord>,
    pub ghosts: Vec<GhostRecord>,
    pub buffer: Option<CycleBuffer>,
    pub reporting_started: bool,
    pub created_at: DateTime<Utc>,
}

fn check_groups(labels: &[&str]) -> Result<Vec<Group>> {
    if labels.is_empty() {
        return Err(ProjectError::NoGroups.into());
    }
    let mut seen = BTreeSet::new();
    let mut groups = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if label.is_empty() {
            return Err(ConfigurationError::single("groups", "group label must not be empty").into());
        }
        if !seen.insert(label.to_lowercase()) {
            return Err(ProjectError::DuplicateGroup(label.to_string()).into());
        }
        groups.push(Group {
            label: label.to_string(),
        });
    }
    Ok(groups)
}

// Takes the fields separately so the cycle can be borrowed mutably
// alongside the context.
fn cycle_context<'a>(
    title: &'a str,
    groups: &'a [Group],
    variables: &'a [VariableInstance],
    ghosts: &'a GhostRegistry,
) -> CycleContext<'a> {
    CycleContext {
        title,
        groups,
        variables,
        ghosts,
    }
}

impl Project {
    pub fn new(title: &str, action: Option<&str>, groups: &[&str], now: DateTime<Utc>) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ProjectError::EmptyTitle.into());
        }
        Ok(Self {
            title: title.to_string(),
            action: action.map(str::trim).filter(|a| !a.is_empty()).map(String::from),
            groups: check_groups(groups)?,
            variables: Vec::new(),
            ghosts: GhostRegistry::new(),
            constraints: ConstraintState::new(),
            cycle: MeasurementCycle::new(),
            reporting_started: false,
            created_at: now,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn variables(&self) -> &[VariableInstance] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&VariableInstance> {
        let key = name.trim().to_lowercase();
        self.variables.iter().find(|v| v.name_key() == key)
    }

    pub fn ghosts(&self) -> &GhostRegistry {
        &self.ghosts
    }

    pub fn constraint_state(&self) -> &ConstraintState {
        &self.constraints
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True once inputs have been submitted at least once.
    pub fn is_locked(&self) -> bool {
        self.reporting_started
    }

    pub fn cycle_state(&self) -> CycleState {
        self.cycle.state()
    }

    pub fn cycle_buffer(&self) -> Option<&CycleBuffer> {
        self.cycle.buffer()
    }

    /// Kinds of `family` a configuration screen must not offer for `role`.
    pub fn disallowed_kinds(&self, family: ModuleFamily, role: Role) -> BTreeSet<String> {
        ConstraintEngine::new(&self.constraints).disallowed_kinds(family, role)
    }

    /// A name is taken by a variable or by any ghost a computation can
    /// spawn, whether or not that ghost exists right now.
    fn name_taken(&self, name: &str) -> bool {
        let name = name.trim();
        self.variable(name).is_some()
            || self.ghosts.contains_name(name)
            || self
                .variables
                .iter()
                .flat_map(VariableInstance::produce_ghosts)
                .any(|g| g.name().eq_ignore_ascii_case(name))
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.reporting_started {
            return Err(ProjectError::Locked.into());
        }
        Ok(())
    }

    /// Configure and add a variable. Nothing changes on error.
    pub fn add_variable(
        &mut self,
        name: &str,
        kind: VariableKind,
        role: Role,
        fields: &FieldValues,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        self.ensure_unlocked()?;

        if !ConstraintEngine::new(&self.constraints).is_allowed(kind, role) {
            tracing::error!(
                project = %self.title,
                kind = kind.label(),
                role = role.as_str(),
                "disallowed kind reached project assembly"
            );
            return Err(ConstraintViolation {
                kind: kind.label().to_string(),
                role,
            }
            .into());
        }

        if self.name_taken(name) {
            return Err(ConfigurationError::single("name", "already used in this project").into());
        }

        let variable = VariableInstance::create(name, kind, role, fields)?;
        for ghost in variable.produce_ghosts() {
            if self.variable(ghost.name()).is_some() {
                return Err(ConfigurationError::single(
                    "name",
                    format!("derived input '{}' clashes with an existing variable", ghost.name()),
                )
                .into());
            }
        }

        let mut events = vec![Event::VariableAdded {
            project: self.title.clone(),
            name: variable.name().to_string(),
            kind: kind.label().to_string(),
            role,
            at: now,
        }];
        self.constraints.on_variable_added(role, kind.label());
        self.variables.push(variable);
        let changes = self.ghosts.reconcile_all(&self.variables);
        events.extend(self.ghost_events(changes, now));
        tracing::info!(project = %self.title, name = name.trim(), kind = kind.label(), "variable added");
        Ok(events)
    }

    /// Remove a variable and every ghost it owns.
    pub fn remove_variable(&mut self, name: &str, now: DateTime<Utc>) -> Result<Vec<Event>> {
        self.ensure_unlocked()?;
        let key = name.trim().to_lowercase();
        let index = self
            .variables
            .iter()
            .position(|v| v.name_key() == key)
            .ok_or_else(|| ProjectError::UnknownVariable(name.to_string()))?;

        let (role, label) = {
            let v = &self.variables[index];
            (v.role(), v.kind().label())
        };
        self.constraints.on_variable_removed(role, label)?;
        let removed = self.variables.remove(index);

        let mut events = vec![Event::VariableRemoved {
            project: self.title.clone(),
            name: removed.name().to_string(),
            kind: label.to_string(),
            role,
            at: now,
        }];
        let mut changes = GhostChanges {
            spawned: Vec::new(),
            retired: self.ghosts.remove_parent(removed.name()),
        };
        let respawned = self.ghosts.reconcile_all(&self.variables);
        changes.spawned.extend(respawned.spawned);
        changes.retired.extend(respawned.retired);
        events.extend(self.ghost_events(changes, now));
        tracing::info!(project = %self.title, name = removed.name(), "variable removed");
        Ok(events)
    }

    /// Replace a variable's configuration. Kind and name stay fixed.
    pub fn reconfigure_variable(
        &mut self,
        name: &str,
        fields: &FieldValues,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        self.ensure_unlocked()?;
        let key = name.trim().to_lowercase();
        let variable = self
            .variables
            .iter_mut()
            .find(|v| v.name_key() == key)
            .ok_or_else(|| ProjectError::UnknownVariable(name.to_string()))?;
        variable.configure(fields)?;
        let mut events = vec![Event::VariableReconfigured {
            project: self.title.clone(),
            name: variable.name().to_string(),
            at: now,
        }];
        let changes = self.ghosts.reconcile_all(&self.variables);
        events.extend(self.ghost_events(changes, now));
        Ok(events)
    }

    fn ghost_events(&self, changes: GhostChanges, now: DateTime<Utc>) -> Vec<Event> {
        let retired = changes.retired.into_iter().map(|g| Event::GhostRetired {
            project: self.title.clone(),
            parent: g.parent().to_string(),
            name: g.name().to_string(),
            at: now,
        });
        let spawned = changes.spawned.into_iter().map(|g| Event::GhostSpawned {
            project: self.title.clone(),
            parent: g.parent().to_string(),
            name: g.name().to_string(),
            at: now,
        });
        retired.chain(spawned).collect()
    }

    pub fn capture_requests(&self, phase: Phase) -> Vec<CaptureRequest> {
        self.context().capture_requests(phase)
    }

    fn context(&self) -> CycleContext<'_> {
        cycle_context(&self.title, &self.groups, &self.variables, &self.ghosts)
    }

    pub fn submit_inputs(
        &mut self,
        submission: &InputSubmission,
        auto: &AutoValues,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        let ctx = cycle_context(&self.title, &self.groups, &self.variables, &self.ghosts);
        let event = self.cycle.submit_inputs(&ctx, submission, auto, now)?;
        self.reporting_started = true;
        Ok(event)
    }

    pub fn submit_outcomes(
        &mut self,
        submission: &OutcomeSubmission,
        auto: &AutoValues,
        now: DateTime<Utc>,
    ) -> Result<FinalizedRecord> {
        let ctx = cycle_context(&self.title, &self.groups, &self.variables, &self.ghosts);
        self.cycle.submit_outcomes(&ctx, submission, auto, now)
    }

    pub fn discard_cycle(&mut self, now: DateTime<Utc>) -> Result<Event> {
        self.cycle.discard(&self.title, now)
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            title: self.title.clone(),
            action: self.action.clone(),
            groups: self.groups.iter().map(|g| g.label.clone()).collect(),
            variables: self.variables.iter().map(VariableInstance::serialize).collect(),
            ghosts: self.ghosts.to_records(),
            buffer: self.cycle.buffer().cloned(),
            reporting_started: self.reporting_started,
            created_at: self.created_at,
        }
    }

    /// Rebuild a project. Any variable that cannot be decoded fails the
    /// whole restore.
    pub fn restore(snapshot: ProjectSnapshot) -> Result<Self> {
        let labels: Vec<&str> = snapshot.groups.iter().map(String::as_str).collect();
        let groups = check_groups(&labels)?;
        let variables = snapshot
            .variables
            .iter()
            .map(VariableInstance::deserialize)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut constraints = ConstraintState::new();
        for v in &variables {
            constraints.on_variable_added(v.role(), v.kind().label());
        }
        let mut ghosts = GhostRegistry::from_records(&snapshot.ghosts)?;
        let healed = ghosts.reconcile_all(&variables);
        if !healed.is_empty() {
            tracing::warn!(
                project = %snapshot.title,
                spawned = healed.spawned.len(),
                retired = healed.retired.len(),
                "stored ghosts were out of date"
            );
        }

        Ok(Self {
            title: snapshot.title,
            action: snapshot.action,
            groups,
            variables,
            ghosts,
            constraints,
            cycle: MeasurementCycle::from_buffer(snapshot.buffer),
            reporting_started: snapshot.reporting_started,
            created_at: snapshot.created_at,
        })
    }
}
