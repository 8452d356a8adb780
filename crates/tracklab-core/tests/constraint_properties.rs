//! Property tests for project assembly bookkeeping.

use chrono::Utc;
use proptest::prelude::*;
use tracklab_core::variables::{BiometricKind, CustomKind, FieldValues, Role, VariableKind};
use tracklab_core::Project;

const KINDS: [VariableKind; 6] = [
    VariableKind::Custom(CustomKind::Scale),
    VariableKind::Custom(CustomKind::Binary),
    VariableKind::Custom(CustomKind::TimeDifference),
    VariableKind::Biometric(BiometricKind::Weight),
    VariableKind::Biometric(BiometricKind::Height),
    VariableKind::Biometric(BiometricKind::BodyMassIndex),
];
// "Alpha Weight" and "Alpha Height" are the ghost names a BMI named Alpha spawns.
const NAMES: [&str; 6] = ["Alpha", "Beta", "Gamma", "Delta", "Alpha Weight", "Alpha Height"];

#[derive(Debug, Clone)]
enum Op {
    Add { name: usize, kind: usize, role: usize },
    Remove { name: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..NAMES.len(), 0..KINDS.len(), 0..Role::ALL.len())
            .prop_map(|(name, kind, role)| Op::Add { name, kind, role }),
        (0..NAMES.len()).prop_map(|name| Op::Remove { name }),
    ]
}

fn apply(project: &mut Project, ops: &[Op]) {
    for op in ops {
        let now = Utc::now();
        // Rejections are expected; only the bookkeeping is under test.
        let _ = match *op {
            Op::Add { name, kind, role } => {
                project.add_variable(NAMES[name], KINDS[kind], Role::ALL[role], &FieldValues::new(), now)
            }
            Op::Remove { name } => project.remove_variable(NAMES[name], now),
        };
    }
}

proptest! {
    #[test]
    fn constraint_counts_track_variables(ops in prop::collection::vec(op(), 0..40)) {
        let mut project = Project::new("Props", None, &["Only"], Utc::now()).unwrap();
        apply(&mut project, &ops);

        let state = project.constraint_state();
        prop_assert_eq!(state.total() as usize, project.variables().len());
        for v in project.variables() {
            let same = project
                .variables()
                .iter()
                .filter(|o| o.role() == v.role() && o.kind() == v.kind())
                .count();
            prop_assert_eq!(state.count(v.role(), v.kind().label()) as usize, same);
        }
        for ghost in project.ghosts().iter() {
            prop_assert!(project.variable(ghost.name()).is_none());
            prop_assert!(project.variable(ghost.parent()).is_some());
        }
    }

    #[test]
    fn snapshot_restore_is_lossless(ops in prop::collection::vec(op(), 0..20)) {
        let mut project = Project::new("Props", Some("Act"), &["A", "B"], Utc::now()).unwrap();
        apply(&mut project, &ops);

        let snapshot = project.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = Project::restore(serde_json::from_str(&json).unwrap()).unwrap();
        prop_assert_eq!(restored.snapshot(), snapshot);
        prop_assert_eq!(restored.constraint_state(), project.constraint_state());
    }
}
