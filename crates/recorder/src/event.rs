//! Violation events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What raised a violation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationTrigger {
    /// Entity outside the safe zone
    ZoneExit,
    /// Required equipment missing (or negative label present)
    MissingEquipment,
    /// Equipment left unattended past the dwell threshold
    UnattendedDwell,
}

impl ViolationTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationTrigger::ZoneExit => "zone_exit",
            ViolationTrigger::MissingEquipment => "missing_equipment",
            ViolationTrigger::UnattendedDwell => "unattended_dwell",
        }
    }
}

/// Immutable record of one violation with its evidence snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationEvent {
    /// Wall-clock time the event was recorded
    pub timestamp: DateTime<Utc>,
    /// Storage key derived from `timestamp`
    pub key: String,
    pub trigger: ViolationTrigger,
    /// Sequence number of the frame that produced the event
    pub frame_sequence: u32,
    /// JPEG-encoded annotated frame
    #[serde(skip)]
    pub snapshot: Vec<u8>,
    /// Whether the snapshot was durably written
    pub persisted: bool,
}
