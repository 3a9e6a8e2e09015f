//! Session-owned dwell timer

use crate::state::{step, DwellInput, DwellPhase, DwellState, DwellTransition};
use crate::DwellConfig;
use std::time::Duration;

/// Dwell timer for one stream.
///
/// Frames must be fed in arrival order. Dropping the timer discards its
/// state without raising anything.
#[derive(Debug, Clone)]
pub struct DwellTimer {
    config: DwellConfig,
    state: DwellState,
}

impl DwellTimer {
    pub fn new(config: DwellConfig) -> Self {
        Self {
            config,
            state: DwellState::default(),
        }
    }

    pub fn config(&self) -> &DwellConfig {
        &self.config
    }

    pub fn state(&self) -> DwellState {
        self.state
    }

    pub fn phase(&self) -> DwellPhase {
        self.state.phase()
    }

    /// Feed one frame's condition
    pub fn update(&mut self, condition_active: bool, now_ns: u64) -> DwellTransition {
        let (next, transition) = step(
            self.state,
            DwellInput {
                condition_active,
                now_ns,
            },
            &self.config,
        );
        self.state = next;
        transition
    }

    /// Evaluate the watched condition from frame labels and feed it
    pub fn observe<'a, I>(&mut self, labels: I, now_ns: u64) -> DwellTransition
    where
        I: IntoIterator<Item = &'a str>,
    {
        let active = self.config.condition_active(labels);
        self.update(active, now_ns)
    }

    /// Time left before the alert fires; `None` unless counting
    pub fn remaining(&self) -> Option<Duration> {
        match self.state.phase() {
            DwellPhase::Counting => Some(self.config.threshold().saturating_sub(self.state.elapsed())),
            _ => None,
        }
    }

    /// Reset to idle (on scene change)
    pub fn reset(&mut self) {
        self.state = DwellState::default();
    }
}
