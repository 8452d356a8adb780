//! Running tally of kinds placed in a project, by role.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConstraintError;
use crate::variables::Role;

/// `role -> kind label -> count`. Counts are always positive; a label whose
/// count would reach zero is removed.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintState {
    counts: BTreeMap<Role, BTreeMap<String, u32>>,
}

impl ConstraintState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_variable_added(&mut self, role: Role, kind: &str) {
        *self
            .counts
            .entry(role)
            .or_default()
            .entry(kind.to_string())
            .or_insert(0) += 1;
    }

    /// Fails instead of clamping when the kind is not present in `role`.
    pub fn on_variable_removed(&mut self, role: Role, kind: &str) -> Result<(), ConstraintError> {
        let underflow = || ConstraintError::Underflow {
            kind: kind.to_string(),
            role,
        };
        let by_kind = self.counts.get_mut(&role).ok_or_else(underflow)?;
        let count = by_kind.get_mut(kind).ok_or_else(underflow)?;
        *count -= 1;
        if *count == 0 {
            by_kind.remove(kind);
        }
        if by_kind.is_empty() {
            self.counts.remove(&role);
        }
        Ok(())
    }

    pub fn count(&self, role: Role, kind: &str) -> u32 {
        self.counts
            .get(&role)
            .and_then(|m| m.get(kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn present_in_role(&self, role: Role, kind: &str) -> bool {
        self.counts.get(&role).is_some_and(|m| m.contains_key(kind))
    }

    pub fn present_anywhere(&self, kind: &str) -> bool {
        self.counts.values().any(|m| m.contains_key(kind))
    }

    pub fn total(&self) -> u32 {
        self.counts.values().flat_map(|m| m.values()).sum()
    }

    pub fn roles(&self) -> impl Iterator<Item = (Role, &BTreeMap<String, u32>)> {
        self.counts.iter().map(|(r, m)| (*r, m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_counts_are_removed() {
        let mut state = ConstraintState::new();
        state.on_variable_added(Role::Input, "Weight");
        assert!(state.present_anywhere("Weight"));
        state.on_variable_removed(Role::Input, "Weight").unwrap();
        assert!(!state.present_anywhere("Weight"));
        assert_eq!(state, ConstraintState::new());
    }

    #[test]
    fn removing_absent_kind_fails() {
        let mut state = ConstraintState::new();
        state.on_variable_added(Role::Outcome, "Weight");
        let err = state.on_variable_removed(Role::Input, "Weight").unwrap_err();
        assert_eq!(
            err,
            ConstraintError::Underflow {
                kind: "Weight".into(),
                role: Role::Input
            }
        );
        assert_eq!(state.count(Role::Outcome, "Weight"), 1);
    }

    #[test]
    fn counts_accumulate() {
        let mut state = ConstraintState::new();
        state.on_variable_added(Role::Input, "Scale");
        state.on_variable_added(Role::Input, "Scale");
        state.on_variable_removed(Role::Input, "Scale").unwrap();
        assert_eq!(state.count(Role::Input, "Scale"), 1);
        assert_eq!(state.total(), 1);
    }
}
