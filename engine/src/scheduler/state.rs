//! Engine phase tracking.

use crate::log_stage;

/// Where a scheduling run currently stands.
///
/// Phases only move forward, one step at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    BottleneckIdentified,
    DrumScheduled,
    FeedingAndDownstreamScheduled,
    Annotated,
    Done,
}

impl EnginePhase {
    /// The phase that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::BottleneckIdentified),
            Self::BottleneckIdentified => Some(Self::DrumScheduled),
            Self::DrumScheduled => Some(Self::FeedingAndDownstreamScheduled),
            Self::FeedingAndDownstreamScheduled => Some(Self::Annotated),
            Self::Annotated => Some(Self::Done),
            Self::Done => None,
        }
    }
}

/// Current phase plus the history of phases visited.
#[derive(Clone, Debug)]
pub struct EngineState {
    phase: EnginePhase,
    history: Vec<EnginePhase>,
    verbosity: u8,
}

impl EngineState {
    pub fn new(verbosity: u8) -> Self {
        Self {
            phase: EnginePhase::Idle,
            history: vec![EnginePhase::Idle],
            verbosity,
        }
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn history(&self) -> &[EnginePhase] {
        &self.history
    }

    /// Step to the next phase. Stepping past `Done` is a no-op.
    pub fn advance(&mut self) {
        if let Some(next) = self.phase.next() {
            log_stage!(self.verbosity, "phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
            self.history.push(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walks_every_phase_in_order() {
        let mut state = EngineState::new(0);
        assert_eq!(state.phase(), EnginePhase::Idle);

        for _ in 0..5 {
            state.advance();
        }
        assert_eq!(state.phase(), EnginePhase::Done);
        assert_eq!(
            state.history(),
            &[
                EnginePhase::Idle,
                EnginePhase::BottleneckIdentified,
                EnginePhase::DrumScheduled,
                EnginePhase::FeedingAndDownstreamScheduled,
                EnginePhase::Annotated,
                EnginePhase::Done,
            ]
        );
    }

    #[test]
    fn test_done_is_terminal() {
        let mut state = EngineState::new(0);
        for _ in 0..10 {
            state.advance();
        }
        assert_eq!(state.phase(), EnginePhase::Done);
        assert_eq!(state.history().len(), 6);
    }
}
