use crate::JobState;

/// A change between two consecutive observations of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// `None` when this is the first observation
    pub from: Option<JobState>,
    pub to: JobState,
}

/// Last observed state of a single job.
///
/// Each monitor owns exactly one tracker; trackers are never shared.
#[derive(Debug, Default, Clone)]
pub struct TransitionTracker {
    last: Option<JobState>,
}

impl TransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_state(&self) -> Option<JobState> {
        self.last
    }

    /// Records `state` and reports a transition iff it differs from the previous observation.
    pub fn observe(
        &mut self,
        state: JobState,
    ) -> Option<Transition> {
        if self.last == Some(state) {
            return None;
        }
        let from = self.last.replace(state);
        Some(Transition { from, to: state })
    }
}
