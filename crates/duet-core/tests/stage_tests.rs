use duet_core::{allowed_transitions, validate_transition, PipelineState, Stage};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn any_stage() -> impl Strategy<Value = Stage> {
    prop_oneof![
        Just(Stage::Plan),
        Just(Stage::Instruct),
        Just(Stage::Generate),
        Just(Stage::Test),
        Just(Stage::Review),
        Just(Stage::Revise),
        Just(Stage::Summarize),
        Just(Stage::Done),
    ]
}

#[test]
fn test_linear_prefix() {
    assert!(validate_transition(Stage::Plan, Stage::Instruct).is_ok());
    assert!(validate_transition(Stage::Instruct, Stage::Generate).is_ok());

    // Invalid
    assert!(validate_transition(Stage::Plan, Stage::Generate).is_err());
    assert!(validate_transition(Stage::Instruct, Stage::Review).is_err());
}

#[test]
fn test_done_reachable_from_every_stage() {
    for start in Stage::ALL {
        let mut seen = BTreeSet::from([start.name()]);
        let mut frontier = vec![start];
        while let Some(stage) = frontier.pop() {
            for next in allowed_transitions(stage) {
                if seen.insert(next.name()) {
                    frontier.push(next);
                }
            }
        }
        assert!(seen.contains(Stage::Done.name()), "Done unreachable from {start}");
    }
}

proptest! {
    #[test]
    fn prop_all_transitions_are_subset_of_allowed(from in any_stage(), to in any_stage()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }

    #[test]
    fn prop_state_only_moves_on_legal_transitions(
        path in proptest::collection::vec(any_stage(), 0..24)
    ) {
        let mut state = PipelineState::new("task");
        for to in path {
            let before = state.stage();
            match state.advance(to) {
                Ok(()) => prop_assert_eq!(state.stage(), to),
                Err(_) => {
                    prop_assert_eq!(state.stage(), before);
                    prop_assert!(!allowed_transitions(before).contains(&to));
                }
            }
        }
    }
}
