//! Ghost variables: implicit inputs spawned by computation variables.
//!
//! A ghost belongs to exactly one parent computation and is keyed by
//! `(parent, ghost name)`. Ghosts only exist while the parent's role has no
//! real variable of the ghost's kind to draw from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RecordError;
use crate::variables::{kind_by_label, ModuleFamily, Role, VariableInstance, VariableKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhostVariable {
    parent: String,
    name: String,
    kind: VariableKind,
    role: Role,
    auto_capture: bool,
}

/// Persisted form of a [`GhostVariable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostRecord {
    pub parent: String,
    pub name: String,
    pub family: String,
    pub kind: String,
    pub role: Role,
    pub auto_capture: bool,
}

impl GhostVariable {
    pub fn new(parent: &str, kind: VariableKind, role: Role, auto_capture: bool) -> Self {
        Self {
            parent: parent.to_string(),
            name: format!("{parent} {}", kind.label()),
            kind,
            role,
            auto_capture,
        }
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_auto_captured(&self) -> bool {
        self.auto_capture
    }

    pub fn to_record(&self) -> GhostRecord {
        GhostRecord {
            parent: self.parent.clone(),
            name: self.name.clone(),
            family: self.kind.family().as_str().to_string(),
            kind: self.kind.label().to_string(),
            role: self.role,
            auto_capture: self.auto_capture,
        }
    }

    pub fn from_record(record: &GhostRecord) -> Result<Self, RecordError> {
        let kind = ModuleFamily::parse(&record.family)
            .and_then(|f| kind_by_label(f, &record.kind))
            .ok_or_else(|| RecordError::UnknownKind {
                family: record.family.clone(),
                kind: record.kind.clone(),
            })?;
        Ok(Self {
            parent: record.parent.clone(),
            name: record.name.clone(),
            kind,
            role: record.role,
            auto_capture: record.auto_capture,
        })
    }
}

type GhostKey = (String, String);

fn key(parent: &str, name: &str) -> GhostKey {
    (parent.to_lowercase(), name.to_lowercase())
}

/// Changes made by a reconcile pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GhostChanges {
    pub spawned: Vec<GhostVariable>,
    pub retired: Vec<GhostVariable>,
}

impl GhostChanges {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.retired.is_empty()
    }

    fn extend(&mut self, other: GhostChanges) {
        self.spawned.extend(other.spawned);
        self.retired.extend(other.retired);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GhostRegistry {
    ghosts: BTreeMap<GhostKey, GhostVariable>,
}

impl GhostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ghosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GhostVariable> {
        self.ghosts.values()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.ghosts.keys().any(|(_, n)| *n == name)
    }

    /// Bring `parent`'s ghosts in line with what it needs now.
    ///
    /// `covered(ghost)` says whether a real variable already supplies the
    /// ghost's kind in its role, or holds its name. Running this again
    /// without changes is a no-op.
    pub fn reconcile<F>(&mut self, parent: &VariableInstance, covered: F) -> GhostChanges
    where
        F: Fn(&GhostVariable) -> bool,
    {
        let wanted: Vec<GhostVariable> = parent
            .produce_ghosts()
            .into_iter()
            .filter(|g| !covered(g))
            .collect();

        let mut changes = GhostChanges::default();
        let stale: Vec<GhostKey> = self
            .ghosts
            .iter()
            .filter(|((p, _), g)| *p == parent.name_key() && !wanted.contains(g))
            .map(|(k, _)| k.clone())
            .collect();
        for k in stale {
            if let Some(g) = self.ghosts.remove(&k) {
                changes.retired.push(g);
            }
        }

        for ghost in wanted {
            let k = key(&ghost.parent, &ghost.name);
            if !self.ghosts.contains_key(&k) {
                self.ghosts.insert(k, ghost.clone());
                changes.spawned.push(ghost);
            }
        }
        changes
    }

    /// Reconcile every computation in `variables`.
    pub fn reconcile_all(&mut self, variables: &[VariableInstance]) -> GhostChanges {
        let mut changes = GhostChanges::default();
        for parent in variables.iter().filter(|v| v.kind().is_computation()) {
            let covered = |ghost: &GhostVariable| {
                variables.iter().any(|v| {
                    (v.kind() == ghost.kind && v.role() == ghost.role)
                        || v.name().eq_ignore_ascii_case(&ghost.name)
                })
            };
            changes.extend(self.reconcile(parent, covered));
        }
        changes
    }

    /// Drop all ghosts of `parent` at once.
    pub fn remove_parent(&mut self, parent: &str) -> Vec<GhostVariable> {
        let parent = parent.to_lowercase();
        let keys: Vec<GhostKey> = self
            .ghosts
            .keys()
            .filter(|(p, _)| *p == parent)
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|k| self.ghosts.remove(&k))
            .collect()
    }

    pub fn to_records(&self) -> Vec<GhostRecord> {
        self.ghosts.values().map(GhostVariable::to_record).collect()
    }

    pub fn from_records(records: &[GhostRecord]) -> Result<Self, RecordError> {
        let mut registry = Self::new();
        for record in records {
            let ghost = GhostVariable::from_record(record)?;
            registry.ghosts.insert(key(&ghost.parent, &ghost.name), ghost);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::{BiometricKind, CustomKind, FieldValues};

    fn bmi(role: Role) -> VariableInstance {
        VariableInstance::create(
            "BMI",
            VariableKind::Biometric(BiometricKind::BodyMassIndex),
            role,
            &FieldValues::new(),
        )
        .unwrap()
    }

    #[test]
    fn reconcile_is_idempotent() {
        let parent = bmi(Role::Input);
        let mut registry = GhostRegistry::new();
        let first = registry.reconcile(&parent, |_| false);
        assert_eq!(first.spawned.len(), 2);
        let second = registry.reconcile(&parent, |_| false);
        assert!(second.is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn covered_kinds_are_not_ghosted() {
        let parent = bmi(Role::Input);
        let mut registry = GhostRegistry::new();
        registry.reconcile(&parent, |_| false);

        let weight = VariableKind::Biometric(BiometricKind::Weight);
        let changes = registry.reconcile(&parent, |g| g.kind() == weight && g.role() == Role::Input);
        assert_eq!(changes.retired.len(), 1);
        assert_eq!(changes.retired[0].kind(), weight);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains_name("bmi height"));
    }

    #[test]
    fn ghost_is_not_spawned_under_a_variable_name() {
        let bmi = bmi(Role::Input);
        let taken = VariableInstance::create(
            "BMI Weight",
            VariableKind::Custom(CustomKind::Binary),
            Role::Outcome,
            &FieldValues::new(),
        )
        .unwrap();
        let variables = vec![bmi, taken];

        let mut registry = GhostRegistry::new();
        let changes = registry.reconcile_all(&variables);
        assert_eq!(changes.spawned.len(), 1);
        assert!(registry.contains_name("BMI Height"));
        assert!(!registry.contains_name("BMI Weight"));
    }

    #[test]
    fn remove_parent_takes_all_ghosts() {
        let parent = bmi(Role::Outcome);
        let mut registry = GhostRegistry::new();
        registry.reconcile(&parent, |_| false);
        let removed = registry.remove_parent("bmi");
        assert_eq!(removed.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn records_round_trip() {
        let parent = bmi(Role::Input);
        let mut registry = GhostRegistry::new();
        registry.reconcile(&parent, |_| false);
        let back = GhostRegistry::from_records(&registry.to_records()).unwrap();
        assert_eq!(back, registry);
    }
}
