//! Violation Recorder
//!
//! Decides when a violation becomes an evidential event and persists the
//! annotated frame:
//! - Snapshot policies (every violating frame, or once per activation)
//! - Strictly increasing wall-clock keys `YYYYMMDD_HHMMSS[_ffffff]`
//! - Injected snapshot store (filesystem or in-memory)
//!
//! Store failures never stop monitoring; the event is returned unpersisted.

mod event;
mod key;
mod recorder;
mod store;

pub use event::{ViolationEvent, ViolationTrigger};
pub use key::{Clock, KeyGenerator, SystemClock};
pub use recorder::{RecorderConfig, SnapshotPolicy, ViolationRecorder};
pub use store::{FsSnapshotStore, MemorySnapshotStore, SnapshotStore};

use thiserror::Error;

/// Snapshot store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot already exists: {0}")]
    AlreadyExists(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
