//! Which kinds may still be added to a project.
//!
//! Rules are looked up per family and each one only adds labels to the
//! exclusion set, so evaluation order cannot change the answer. They run
//! in a fixed order anyway: role eligibility, project-wide uniqueness,
//! role-scoped uniqueness.

use std::collections::BTreeSet;

use super::state::ConstraintState;
use crate::variables::{kinds_for, ModuleFamily, Role, Uniqueness, VariableKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Kind metadata does not list the requested role.
    RoleEligibility,
    /// Kind is unique per project and already present in any role.
    UniquePerProject,
    /// Kind is unique per role and already present in the requested role.
    UniquePerRole,
}

impl Rule {
    pub fn excludes(&self, kind: VariableKind, role: Role, state: &ConstraintState) -> bool {
        let spec = kind.spec();
        match self {
            Rule::RoleEligibility => !spec.eligible_for(role),
            Rule::UniquePerProject => {
                spec.uniqueness == Uniqueness::PerProject && state.present_anywhere(spec.label)
            }
            Rule::UniquePerRole => {
                spec.uniqueness == Uniqueness::PerRole && state.present_in_role(role, spec.label)
            }
        }
    }
}

const STANDARD_RULES: &[Rule] = &[
    Rule::RoleEligibility,
    Rule::UniquePerProject,
    Rule::UniquePerRole,
];

/// Food kinds are all project-unique, so the role-scoped pass has nothing
/// to add for them.
const FOOD_RULES: &[Rule] = &[Rule::RoleEligibility, Rule::UniquePerProject];

/// Rule table keyed by family.
pub fn rules_for(family: ModuleFamily) -> &'static [Rule] {
    match family {
        ModuleFamily::Custom
        | ModuleFamily::Biometric
        | ModuleFamily::Exercise
        | ModuleFamily::Environment => STANDARD_RULES,
        ModuleFamily::Food => FOOD_RULES,
    }
}

/// Stateless view over a project's [`ConstraintState`].
#[derive(Debug, Clone, Copy)]
pub struct ConstraintEngine<'a> {
    state: &'a ConstraintState,
}

impl<'a> ConstraintEngine<'a> {
    pub fn new(state: &'a ConstraintState) -> Self {
        Self { state }
    }

    /// Labels of kinds in `family` that may not be added as `role` now.
    pub fn disallowed_kinds(&self, family: ModuleFamily, role: Role) -> BTreeSet<String> {
        let mut excluded = BTreeSet::new();
        let kinds = kinds_for(family);
        for rule in rules_for(family) {
            for kind in &kinds {
                if rule.excludes(*kind, role, self.state) {
                    excluded.insert(kind.label().to_string());
                }
            }
        }
        excluded
    }

    pub fn is_allowed(&self, kind: VariableKind, role: Role) -> bool {
        !rules_for(kind.family())
            .iter()
            .any(|rule| rule.excludes(kind, role, self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::{BiometricKind, CustomKind, FoodKind};

    #[test]
    fn ineligible_roles_are_excluded() {
        let state = ConstraintState::new();
        let engine = ConstraintEngine::new(&state);
        let input = engine.disallowed_kinds(ModuleFamily::Custom, Role::Input);
        assert!(input.contains("Time Difference"));
        assert!(!input.contains("Scale"));

        let outcome = engine.disallowed_kinds(ModuleFamily::Custom, Role::Outcome);
        assert!(!outcome.contains("Time Difference"));

        let food_input = engine.disallowed_kinds(ModuleFamily::Food, Role::Input);
        assert_eq!(food_input.len(), 3);
    }

    #[test]
    fn time_difference_is_single_per_project() {
        let mut state = ConstraintState::new();
        state.on_variable_added(Role::Outcome, "Time Difference");
        let engine = ConstraintEngine::new(&state);
        assert!(engine
            .disallowed_kinds(ModuleFamily::Custom, Role::Outcome)
            .contains("Time Difference"));
        assert!(!engine.is_allowed(VariableKind::Custom(CustomKind::TimeDifference), Role::Outcome));
    }

    #[test]
    fn per_role_uniqueness_only_blocks_same_role() {
        let mut state = ConstraintState::new();
        state.on_variable_added(Role::Input, "Weight");
        let engine = ConstraintEngine::new(&state);
        let weight = VariableKind::Biometric(BiometricKind::Weight);
        assert!(!engine.is_allowed(weight, Role::Input));
        assert!(engine.is_allowed(weight, Role::Outcome));
    }

    #[test]
    fn food_kinds_block_everywhere_once_used() {
        let mut state = ConstraintState::new();
        state.on_variable_added(Role::ActionQualifier, "Calories");
        let engine = ConstraintEngine::new(&state);
        assert!(!engine.is_allowed(VariableKind::Food(FoodKind::Calories), Role::ActionQualifier));
        assert!(engine.is_allowed(VariableKind::Food(FoodKind::Caffeine), Role::ActionQualifier));
    }

    #[test]
    fn unrestricted_kinds_never_blocked_by_presence() {
        let mut state = ConstraintState::new();
        state.on_variable_added(Role::Input, "Scale");
        state.on_variable_added(Role::Input, "Scale");
        let engine = ConstraintEngine::new(&state);
        assert!(!engine
            .disallowed_kinds(ModuleFamily::Custom, Role::Input)
            .contains("Scale"));
    }
}
