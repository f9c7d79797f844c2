use super::*;
use crate::JobState;
use crate::JobState::*;

fn transitions(states: &[JobState]) -> Vec<Transition> {
    let mut tracker = TransitionTracker::new();
    states.iter().filter_map(|s| tracker.observe(*s)).collect()
}

#[test]
fn first_observation_should_be_a_transition_from_unknown() {
    let mut tracker = TransitionTracker::new();

    assert_eq!(tracker.last_state(), None);
    assert_eq!(tracker.observe(Pending), Some(Transition { from: None, to: Pending }));
    assert_eq!(tracker.last_state(), Some(Pending));
}

#[test]
fn repeated_states_should_not_produce_transitions() {
    let result = transitions(&[Pending, Pending, Running, Running, Running, Succeeded]);

    assert_eq!(
        result,
        vec![
            Transition { from: None, to: Pending },
            Transition { from: Some(Pending), to: Running },
            Transition { from: Some(Running), to: Succeeded },
        ]
    );
}

#[test]
fn transition_count_should_equal_number_of_state_changes() {
    let sequences: Vec<Vec<JobState>> = vec![
        vec![],
        vec![Running],
        vec![Pending, Running, Pending, Running],
        vec![Running, Running, Running],
        vec![Pending, Pending, Running, Succeeded],
    ];

    for states in sequences {
        let expected = states
            .iter()
            .enumerate()
            .filter(|(i, s)| *i == 0 || states[i - 1] != **s)
            .count();
        assert_eq!(transitions(&states).len(), expected, "{states:?}");
    }
}
