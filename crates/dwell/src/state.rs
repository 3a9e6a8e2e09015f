//! Dwell state and transition function

use crate::DwellConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Derived state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DwellPhase {
    #[default]
    Idle,
    Counting,
    Alerted,
}

/// Dwell state for one stream (owned by its session)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellState {
    /// Condition held on the most recent frame
    pub condition_active: bool,

    /// Frame timestamp when the current activation began (ns)
    pub start_time_ns: Option<u64>,

    /// Time the condition has held continuously (ns)
    pub elapsed_ns: u64,

    /// Alert already raised for this activation
    pub alert_fired: bool,
}

impl DwellState {
    pub fn phase(&self) -> DwellPhase {
        match (self.condition_active, self.alert_fired) {
            (false, _) => DwellPhase::Idle,
            (true, false) => DwellPhase::Counting,
            (true, true) => DwellPhase::Alerted,
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }
}

/// One frame's input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellInput {
    pub condition_active: bool,
    /// Frame arrival timestamp (ns)
    pub now_ns: u64,
}

/// What happened on a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwellTransition {
    /// No phase change
    Hold,
    /// Idle -> Counting
    Started,
    /// Counting -> Alerted; fire exactly one alert
    Alert { elapsed: Duration },
    /// Counting/Alerted -> Idle
    Reset,
}

/// Advance the dwell state by one frame.
///
/// Elapsed time never goes negative: a timestamp earlier than the start
/// counts as zero elapsed.
pub fn step(state: DwellState, input: DwellInput, config: &DwellConfig) -> (DwellState, DwellTransition) {
    match (state.phase(), input.condition_active) {
        (DwellPhase::Idle, false) => (DwellState::default(), DwellTransition::Hold),
        (DwellPhase::Idle, true) => {
            debug!("Dwell condition started at {} ns", input.now_ns);
            (
                DwellState {
                    condition_active: true,
                    start_time_ns: Some(input.now_ns),
                    elapsed_ns: 0,
                    alert_fired: false,
                },
                DwellTransition::Started,
            )
        }
        (DwellPhase::Counting | DwellPhase::Alerted, false) => {
            debug!(
                "Dwell condition cleared after {:.1}s",
                state.elapsed().as_secs_f64()
            );
            (DwellState::default(), DwellTransition::Reset)
        }
        (phase, true) => {
            let start = state.start_time_ns.unwrap_or(input.now_ns);
            if input.now_ns < start {
                warn!(
                    "Clock regression: frame at {} ns precedes dwell start {} ns",
                    input.now_ns, start
                );
            }
            let elapsed_ns = input.now_ns.saturating_sub(start);
            let mut next = DwellState {
                condition_active: true,
                start_time_ns: Some(start),
                elapsed_ns,
                alert_fired: state.alert_fired,
            };

            if phase == DwellPhase::Counting && elapsed_ns >= config.threshold_ns() {
                next.alert_fired = true;
                let elapsed = Duration::from_nanos(elapsed_ns);
                info!("Dwell threshold reached after {:.1}s", elapsed.as_secs_f64());
                return (next, DwellTransition::Alert { elapsed });
            }

            (next, DwellTransition::Hold)
        }
    }
}
