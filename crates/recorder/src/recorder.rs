//! Recorder implementation

use crate::event::{ViolationEvent, ViolationTrigger};
use crate::key::{Clock, KeyGenerator, SystemClock};
use crate::store::SnapshotStore;
use crate::StoreError;
use frame_buffer::VideoFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Attempts at a fresh key when another writer already holds one
const MAX_KEY_RETRIES: u32 = 64;

/// When zone/equipment violations produce snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// Every violating frame is recorded
    #[default]
    EveryFrame,
    /// Only the first frame of a continuous violation is recorded
    OncePerActivation,
}

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory for snapshot files
    pub output_dir: PathBuf,
    /// File name prefix before the timestamp key
    pub file_prefix: String,
    /// Include microseconds in keys
    pub subsecond: bool,
    /// Policy for zone and equipment violations
    pub policy: SnapshotPolicy,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output/violations"),
            file_prefix: "flagged_".to_string(),
            subsecond: true,
            policy: SnapshotPolicy::EveryFrame,
        }
    }
}

/// Turns violation flags into persisted events
pub struct ViolationRecorder {
    policy: SnapshotPolicy,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    keys: KeyGenerator,
}

impl ViolationRecorder {
    pub fn new(config: &RecorderConfig, store: Arc<dyn SnapshotStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &RecorderConfig,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policy: config.policy,
            store,
            clock,
            keys: KeyGenerator::new(config.subsecond),
        }
    }

    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }

    /// Whether a flag should produce an event under the current policy.
    ///
    /// Dwell alerts are always debounced to their activation; callers only
    /// pass them on the alert edge.
    pub fn should_record(
        &self,
        trigger: ViolationTrigger,
        current_flag: bool,
        has_prior_snapshot_this_activation: bool,
    ) -> bool {
        if !current_flag {
            return false;
        }
        match (trigger, self.policy) {
            (ViolationTrigger::UnattendedDwell, _) | (_, SnapshotPolicy::OncePerActivation) => {
                !has_prior_snapshot_this_activation
            }
            (_, SnapshotPolicy::EveryFrame) => true,
        }
    }

    /// Record a violation for `frame` if the policy allows it.
    ///
    /// The returned event reports whether the snapshot reached the store.
    pub fn record(
        &mut self,
        trigger: ViolationTrigger,
        current_flag: bool,
        has_prior_snapshot_this_activation: bool,
        frame: &VideoFrame,
    ) -> Option<ViolationEvent> {
        if !self.should_record(trigger, current_flag, has_prior_snapshot_this_activation) {
            return None;
        }

        let (mut timestamp, mut key) = self.keys.next(self.clock.now());

        let (snapshot, persisted) = match frame.encode_jpeg() {
            Ok(bytes) => {
                let mut retries = 0;
                let persisted = loop {
                    match self.store.put(&key, &bytes) {
                        Ok(()) => break true,
                        // Another recorder shares the store; move past its key
                        Err(StoreError::AlreadyExists(_))
                            if self.keys.subsecond() && retries < MAX_KEY_RETRIES =>
                        {
                            retries += 1;
                            warn!("Snapshot key {} taken, retrying", key);
                            (timestamp, key) = self.keys.next(timestamp);
                        }
                        Err(e) => {
                            error!("Failed to persist snapshot {}: {}", key, e);
                            break false;
                        }
                    }
                };
                (bytes, persisted)
            }
            Err(e) => {
                error!("Failed to encode snapshot {}: {}", key, e);
                (Vec::new(), false)
            }
        };

        metrics::counter!("violation_events_total", "trigger" => trigger.as_str()).increment(1);
        if !persisted {
            metrics::counter!("snapshot_persist_failures_total").increment(1);
        }

        info!(
            "Violation recorded: {} (frame {}, key {}, persisted: {})",
            trigger.as_str(),
            frame.sequence,
            key,
            persisted
        );

        Some(ViolationEvent {
            timestamp,
            key,
            trigger,
            frame_sequence: frame.sequence,
            snapshot,
            persisted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FsSnapshotStore, MemorySnapshotStore};
    use chrono::{DateTime, TimeZone, Utc};
    use frame_buffer::ChannelOrder;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct BrokenStore;

    impl SnapshotStore for BrokenStore {
        fn put(&self, _key: &str, _bytes: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    fn frame(sequence: u32) -> VideoFrame {
        VideoFrame::new(vec![128; 8 * 8 * 3], 8, 8, ChannelOrder::Bgr, 0, sequence).unwrap()
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()))
    }

    #[test]
    fn test_no_flag_no_event() {
        let mut recorder = ViolationRecorder::new(&RecorderConfig::default(), Arc::new(MemorySnapshotStore::new()));
        assert!(recorder
            .record(ViolationTrigger::ZoneExit, false, false, &frame(1))
            .is_none());
    }

    #[test]
    fn test_every_frame_policy() {
        let store = Arc::new(MemorySnapshotStore::new());
        let mut recorder = ViolationRecorder::with_clock(&RecorderConfig::default(), store.clone(), fixed_clock());

        let a = recorder.record(ViolationTrigger::ZoneExit, true, false, &frame(1)).unwrap();
        let b = recorder.record(ViolationTrigger::ZoneExit, true, true, &frame(2)).unwrap();

        assert!(a.persisted && b.persisted);
        assert_ne!(a.key, b.key);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_once_per_activation_policy() {
        let config = RecorderConfig {
            policy: SnapshotPolicy::OncePerActivation,
            ..Default::default()
        };
        let mut recorder = ViolationRecorder::new(&config, Arc::new(MemorySnapshotStore::new()));

        assert!(recorder.record(ViolationTrigger::MissingEquipment, true, false, &frame(1)).is_some());
        assert!(recorder.record(ViolationTrigger::MissingEquipment, true, true, &frame(2)).is_none());
    }

    #[test]
    fn test_dwell_always_debounced() {
        let recorder = ViolationRecorder::new(&RecorderConfig::default(), Arc::new(MemorySnapshotStore::new()));
        assert!(recorder.should_record(ViolationTrigger::UnattendedDwell, true, false));
        assert!(!recorder.should_record(ViolationTrigger::UnattendedDwell, true, true));
    }

    #[test]
    fn test_same_second_files_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsSnapshotStore::new(dir.path(), "frame_").unwrap());
        let mut recorder = ViolationRecorder::with_clock(&RecorderConfig::default(), store, fixed_clock());

        for seq in 0..5 {
            let event = recorder.record(ViolationTrigger::ZoneExit, true, false, &frame(seq)).unwrap();
            assert!(event.persisted);
        }

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 5);
    }

    #[test]
    fn test_recorders_sharing_directory_keep_all_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecorderConfig::default();
        let mut first = ViolationRecorder::with_clock(
            &config,
            Arc::new(FsSnapshotStore::new(dir.path(), "flagged_").unwrap()),
            fixed_clock(),
        );
        let mut second = ViolationRecorder::with_clock(
            &config,
            Arc::new(FsSnapshotStore::new(dir.path(), "flagged_").unwrap()),
            fixed_clock(),
        );

        let a = first.record(ViolationTrigger::ZoneExit, true, false, &frame(1)).unwrap();
        let b = second.record(ViolationTrigger::ZoneExit, true, false, &frame(1)).unwrap();
        let c = first.record(ViolationTrigger::ZoneExit, true, false, &frame(2)).unwrap();

        assert!(a.persisted && b.persisted && c.persisted);
        assert_eq!(a.key, "20250314_120000_000000");
        assert_eq!(b.key, "20250314_120000_000001");
        assert_eq!(c.key, "20250314_120000_000002");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn test_persistence_failure_still_returns_event() {
        let mut recorder = ViolationRecorder::new(&RecorderConfig::default(), Arc::new(BrokenStore));
        let event = recorder
            .record(ViolationTrigger::UnattendedDwell, true, false, &frame(7))
            .unwrap();

        assert!(!event.persisted);
        assert_eq!(event.frame_sequence, 7);
        assert!(!event.snapshot.is_empty());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: RecorderConfig = serde_json::from_str(r#"{"policy":"once_per_activation"}"#).unwrap();
        assert_eq!(config.policy, SnapshotPolicy::OncePerActivation);
        assert!(config.subsecond);
        assert_eq!(config.file_prefix, "flagged_");
    }
}
