//! Dwell Timer
//!
//! Tracks how long a hazard condition (e.g. equipment visible with nobody
//! attending it) has held, and raises one edge-triggered alert once it has
//! persisted past a threshold:
//! - `DwellState` value object and pure `step` transition
//! - `DwellTimer` owning wrapper for a stream session
//! - Remaining time to alert while counting

pub mod config;
pub mod state;
pub mod timer;

pub use config::DwellConfig;
pub use state::{step, DwellInput, DwellPhase, DwellState, DwellTransition};
pub use timer::DwellTimer;
