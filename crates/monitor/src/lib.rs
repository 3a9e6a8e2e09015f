//! Safety Compliance Monitor
//!
//! Per-stream pipeline tying the engine together:
//! - Zone resolution (colour extraction, static polygon, or none)
//! - Zone and equipment compliance per worker
//! - Unattended-equipment dwell timer
//! - Evidence snapshots through the violation recorder
//! - One async task per stream

pub mod annotate;
pub mod config;
pub mod runtime;
pub mod session;

pub use config::{EquipmentSettings, MonitorConfig, ZoneSettings};
pub use runtime::{spawn_session, SessionHandle};
pub use session::{FrameInput, FrameReport, MonitorSession, SubDetections};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Snapshot store error: {0}")]
    Store(#[from] recorder::StoreError),

    #[error("Frame error: {0}")]
    Frame(#[from] frame_buffer::FrameError),

    #[error("Session closed")]
    SessionClosed,

    #[error("Session task failed: {0}")]
    Join(String),
}

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
