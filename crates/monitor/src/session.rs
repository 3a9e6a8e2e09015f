//! Per-stream monitoring session

use crate::annotate::annotate;
use crate::config::{MonitorConfig, ZoneSettings};
use crate::MonitorError;
use compliance::evaluator::default_advisories;
use compliance::{
    classify_zone, sub_detections_within, ComplianceResult, Detection,
    HierarchicalComplianceEvaluator, REASON_OUTSIDE_ZONE,
};
use dwell::{DwellState, DwellTimer, DwellTransition};
use frame_buffer::VideoFrame;
use recorder::{FsSnapshotStore, SnapshotStore, ViolationEvent, ViolationRecorder, ViolationTrigger};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;
use zone::{Polygon, ZoneExtractor};

/// Equipment detections for the primaries in a frame
#[derive(Debug, Clone, Default)]
pub enum SubDetections {
    /// Equipment labels come from the same whole-frame pass; each primary
    /// gets the detections centred inside its box
    #[default]
    FromFrame,
    /// Second-pass results per primary, aligned with the person-labelled
    /// detections in input order. `None` or a missing entry means the pass
    /// failed for that primary.
    PerPrimary(Vec<Option<Vec<Detection>>>),
}

/// One frame and its detections
#[derive(Debug, Clone)]
pub struct FrameInput {
    pub frame: VideoFrame,
    pub detections: Vec<Detection>,
    pub sub_detections: SubDetections,
}

impl FrameInput {
    pub fn new(frame: VideoFrame, detections: Vec<Detection>) -> Self {
        Self {
            frame,
            detections,
            sub_detections: SubDetections::FromFrame,
        }
    }

    pub fn with_sub_detections(mut self, sub_detections: Vec<Option<Vec<Detection>>>) -> Self {
        self.sub_detections = SubDetections::PerPrimary(sub_detections);
        self
    }
}

/// Everything a caller needs to render and alert on one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub sequence: u32,
    pub timestamp_ns: u64,
    pub zone: Option<Polygon>,
    pub results: Vec<ComplianceResult>,
    /// Dwell state after this frame, if the timer is enabled
    pub dwell: Option<DwellState>,
    /// Time left before the dwell alert while counting
    pub dwell_remaining: Option<Duration>,
    pub events: Vec<ViolationEvent>,
    /// Frame with zone, boxes and reference points drawn (RGB order)
    pub annotated: VideoFrame,
}

impl FrameReport {
    pub fn violating(&self) -> impl Iterator<Item = &ComplianceResult> {
        self.results.iter().filter(|r| r.is_violating())
    }

    pub fn has_violations(&self) -> bool {
        self.violating().next().is_some()
    }
}

enum ZoneSource {
    Disabled,
    Extract(ZoneExtractor),
    Static(Polygon),
}

/// Monitoring pipeline state for one video stream.
///
/// Frames must be processed in arrival order; the session is never shared
/// between streams.
pub struct MonitorSession {
    id: Uuid,
    person_label: String,
    min_confidence: f32,
    zone: ZoneSource,
    evaluator: HierarchicalComplianceEvaluator,
    check_equipment: bool,
    dwell: Option<DwellTimer>,
    recorder: ViolationRecorder,
    /// A snapshot was taken during the current continuous violation
    snapshot_this_activation: bool,
}

impl MonitorSession {
    /// Create a session writing snapshots to `store`
    pub fn new(config: MonitorConfig, store: Arc<dyn SnapshotStore>) -> Self {
        let recorder = ViolationRecorder::new(&config.recorder, store);
        Self::with_recorder(config, recorder)
    }

    /// Create a session with a filesystem store from the recorder config
    pub fn from_config(config: MonitorConfig) -> Result<Self, MonitorError> {
        let store = FsSnapshotStore::new(&config.recorder.output_dir, config.recorder.file_prefix.clone())?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn with_recorder(config: MonitorConfig, recorder: ViolationRecorder) -> Self {
        let zone = match config.zone {
            ZoneSettings::Disabled => ZoneSource::Disabled,
            ZoneSettings::Color { range, epsilon } => {
                ZoneSource::Extract(ZoneExtractor::new(range).with_epsilon(epsilon))
            }
            ZoneSettings::Static { polygon } => ZoneSource::Static(polygon),
        };

        let mut advisories = default_advisories();
        let (evaluator, check_equipment) = match config.equipment {
            Some(settings) => {
                advisories.extend(settings.advisories);
                (HierarchicalComplianceEvaluator::new(settings.policy), true)
            }
            None => (HierarchicalComplianceEvaluator::default(), false),
        };

        let person_label = config.person_label;
        let dwell = config.dwell.map(|mut dwell| {
            // Attendance is judged by the same label as the primaries
            if dwell.person_label != person_label {
                debug!(
                    "Dwell person label '{}' replaced by session label '{}'",
                    dwell.person_label, person_label
                );
                dwell.person_label = person_label.clone();
            }
            DwellTimer::new(dwell)
        });

        Self {
            id: Uuid::new_v4(),
            person_label,
            min_confidence: config.min_confidence,
            zone,
            evaluator: evaluator.with_advisories(advisories),
            check_equipment,
            dwell,
            recorder,
            snapshot_this_activation: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dwell_state(&self) -> Option<DwellState> {
        self.dwell.as_ref().map(|t| t.state())
    }

    /// Run the full pipeline for one frame
    pub fn process(&mut self, input: FrameInput) -> FrameReport {
        let FrameInput {
            frame,
            detections,
            sub_detections,
        } = input;
        metrics::counter!("frames_processed_total").increment(1);

        let (primaries, frame_detections) = self.partition(detections);
        let zone = self.resolve_zone(&frame);

        let mut results = Vec::with_capacity(primaries.len());
        for (index, primary) in &primaries {
            let mut result = classify_zone(primary, zone.as_ref());

            if self.check_equipment {
                let equipment = match &sub_detections {
                    SubDetections::FromFrame => {
                        let subs = sub_detections_within(primary, &frame_detections);
                        self.evaluator.evaluate(primary, &subs)
                    }
                    SubDetections::PerPrimary(per_primary) => match per_primary.get(*index) {
                        Some(Some(subs)) => self.evaluator.evaluate(primary, subs),
                        _ => Ok(self.evaluator.evaluate_unavailable(primary)),
                    },
                };
                match equipment {
                    Ok(r) => result = result.merge(r),
                    Err(e) => {
                        warn!("Skipping entity: {}", e);
                        continue;
                    }
                }
            }

            results.push(self.evaluator.annotate(result));
        }

        let others: Vec<Detection> = frame_detections
            .iter()
            .filter(|d| d.label != self.person_label)
            .cloned()
            .collect();
        let annotated = annotate(&frame, zone.as_ref(), &results, &others);

        let mut events = Vec::new();

        let transition = self.dwell.as_mut().map(|timer| {
            timer.observe(
                frame_detections.iter().map(|d| d.label.as_str()),
                frame.timestamp_ns,
            )
        });
        if let Some(DwellTransition::Alert { elapsed }) = transition {
            debug!("Unattended for {:.0}s", elapsed.as_secs_f64());
            events.extend(self.recorder.record(
                ViolationTrigger::UnattendedDwell,
                true,
                false,
                &annotated,
            ));
        }

        let violating = results.iter().any(|r| r.is_violating());
        let trigger = if results.iter().any(|r| r.has_reason(REASON_OUTSIDE_ZONE)) {
            ViolationTrigger::ZoneExit
        } else {
            ViolationTrigger::MissingEquipment
        };
        if let Some(event) =
            self.recorder
                .record(trigger, violating, self.snapshot_this_activation, &annotated)
        {
            self.snapshot_this_activation = true;
            events.push(event);
        }
        if !violating {
            self.snapshot_this_activation = false;
        }

        FrameReport {
            sequence: frame.sequence,
            timestamp_ns: frame.timestamp_ns,
            zone,
            results,
            dwell: self.dwell.as_ref().map(|t| t.state()),
            dwell_remaining: self.dwell.as_ref().and_then(|t| t.remaining()),
            events,
            annotated,
        }
    }

    /// Split valid, confident detections into indexed primaries and the
    /// full frame list
    fn partition(&self, detections: Vec<Detection>) -> (Vec<(usize, Detection)>, Vec<Detection>) {
        let mut primaries = Vec::new();
        let mut frame_detections = Vec::with_capacity(detections.len());
        let mut person_index = 0;

        for det in detections {
            let index = (det.label == self.person_label).then(|| {
                person_index += 1;
                person_index - 1
            });

            if let Err(e) = det.validate() {
                warn!("Skipping detection: {}", e);
                continue;
            }
            if det.confidence < self.min_confidence {
                continue;
            }

            if let Some(index) = index {
                primaries.push((index, det.clone()));
            }
            frame_detections.push(det);
        }

        (primaries, frame_detections)
    }

    fn resolve_zone(&self, frame: &VideoFrame) -> Option<Polygon> {
        match &self.zone {
            ZoneSource::Disabled => None,
            ZoneSource::Extract(extractor) => extractor.extract(frame),
            ZoneSource::Static(polygon) => Some(polygon.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EquipmentSettings;
    use compliance::{BBox, LabelPolicy, REASON_UNAVAILABLE};
    use dwell::{DwellConfig, DwellPhase};
    use frame_buffer::ChannelOrder;
    use recorder::{MemorySnapshotStore, RecorderConfig, SnapshotPolicy, StoreError};

    const SEC: u64 = 1_000_000_000;

    fn frame(sequence: u32, timestamp_ns: u64) -> VideoFrame {
        VideoFrame::new(vec![60; 64 * 48 * 3], 64, 48, ChannelOrder::Bgr, timestamp_ns, sequence).unwrap()
    }

    fn det(label: &str, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(label, 0.9, BBox::new(x1, y1, x2, y2))
    }

    fn pentagon() -> Polygon {
        Polygon::new(vec![(32, 2), (60, 20), (50, 46), (14, 46), (4, 20)]).unwrap()
    }

    fn session(config: MonitorConfig) -> (MonitorSession, Arc<MemorySnapshotStore>) {
        let store = Arc::new(MemorySnapshotStore::new());
        (MonitorSession::new(config, store.clone()), store)
    }

    fn static_zone_config() -> MonitorConfig {
        MonitorConfig {
            zone: ZoneSettings::Static { polygon: pentagon() },
            ..Default::default()
        }
    }

    #[test]
    fn test_person_outside_zone_every_frame() {
        let (mut session, store) = session(static_zone_config());
        // Feet at (4, 47): outside the pentagon
        let outside = vec![det("person", 0.0, 10.0, 8.0, 47.0)];

        let first = session.process(FrameInput::new(frame(1, 0), outside.clone()));
        assert_eq!(first.results.len(), 1);
        assert!(first.results[0].is_violating());
        assert_eq!(
            first.results[0].reasons.iter().collect::<Vec<_>>(),
            vec![REASON_OUTSIDE_ZONE]
        );
        assert_eq!(first.events.len(), 1);
        assert_eq!(first.events[0].trigger, ViolationTrigger::ZoneExit);

        let second = session.process(FrameInput::new(frame(2, SEC / 30), outside));
        assert_eq!(second.events.len(), 1);
        assert_ne!(first.events[0].key, second.events[0].key);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_person_inside_zone() {
        let (mut session, store) = session(static_zone_config());
        let report = session.process(FrameInput::new(
            frame(1, 0),
            vec![det("person", 24.0, 5.0, 40.0, 30.0)],
        ));
        assert!(!report.has_violations());
        assert!(report.events.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_no_visible_zone_means_no_constraint() {
        // Colour mode on a grey frame: nothing to extract
        let (mut session, _) = session(MonitorConfig::safety_region());
        let report = session.process(FrameInput::new(
            frame(1, 0),
            vec![det("person", 0.0, 0.0, 10.0, 47.0)],
        ));
        assert!(report.zone.is_none());
        assert!(!report.has_violations());
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_unattended_alert_on_frame_301() {
        let (mut session, store) = session(MonitorConfig::unattended(DwellConfig::default()));
        let mut alert_frames = Vec::new();

        for n in 1..=320u32 {
            let report = session.process(FrameInput::new(
                frame(n, (n as u64 - 1) * SEC),
                vec![det("kadhai", 10.0, 10.0, 30.0, 30.0)],
            ));
            if n == 300 {
                assert_eq!(report.dwell_remaining, Some(Duration::from_secs(1)));
            }
            if !report.events.is_empty() {
                assert_eq!(report.events[0].trigger, ViolationTrigger::UnattendedDwell);
                alert_frames.push(n);
            }
        }

        assert_eq!(alert_frames, vec![301]);
        assert_eq!(store.len(), 1);
        assert_eq!(session.dwell_state().map(|s| s.phase()), Some(DwellPhase::Alerted));
    }

    #[test]
    fn test_person_returning_resets_dwell() {
        let dwell = DwellConfig {
            threshold_secs: 10,
            ..Default::default()
        };
        let (mut session, _) = session(MonitorConfig::unattended(dwell));
        let kadhai = det("kadhai", 10.0, 10.0, 30.0, 30.0);

        for n in 0..9u64 {
            session.process(FrameInput::new(frame(n as u32, n * SEC), vec![kadhai.clone()]));
        }
        let report = session.process(FrameInput::new(
            frame(9, 9 * SEC),
            vec![kadhai.clone(), det("person", 30.0, 5.0, 50.0, 45.0)],
        ));
        assert_eq!(report.dwell.map(|s| s.phase()), Some(DwellPhase::Idle));
        assert_eq!(report.dwell_remaining, None);
    }

    #[test]
    fn test_custom_person_label_counts_as_attendance() {
        let config = MonitorConfig {
            person_label: "worker".to_string(),
            zone: ZoneSettings::Disabled,
            dwell: Some(DwellConfig {
                threshold_secs: 5,
                ..Default::default()
            }),
            ..Default::default()
        };
        let (mut session, store) = session(config);

        for n in 0..10u64 {
            let report = session.process(FrameInput::new(
                frame(n as u32, n * SEC),
                vec![
                    det("kadhai", 10.0, 10.0, 30.0, 30.0),
                    det("worker", 30.0, 5.0, 50.0, 45.0),
                ],
            ));
            assert!(report.events.is_empty());
            assert_eq!(report.results.len(), 1);
        }
        assert_eq!(session.dwell_state().map(|s| s.phase()), Some(DwellPhase::Idle));
        assert!(store.is_empty());

        // Worker leaves: the timer now runs against the same label
        for n in 10..20u64 {
            session.process(FrameInput::new(
                frame(n as u32, n * SEC),
                vec![det("kadhai", 10.0, 10.0, 30.0, 30.0)],
            ));
        }
        assert_eq!(session.dwell_state().map(|s| s.phase()), Some(DwellPhase::Alerted));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ppe_same_frame_detections() {
        let (mut session, _) = session(MonitorConfig::ppe(LabelPolicy::presence(["Helmet", "Vest"])));
        let report = session.process(FrameInput::new(
            frame(1, 0),
            vec![
                det("person", 10.0, 2.0, 40.0, 46.0),
                det("Helmet", 18.0, 2.0, 32.0, 10.0),
                det("Vest", 50.0, 10.0, 62.0, 30.0),
            ],
        ));

        let result = &report.results[0];
        assert!(result.has_reason("missing-Vest"));
        assert!(!result.has_reason("missing-Helmet"));
        assert_eq!(result.advisories, vec!["Wear a safety vest".to_string()]);
        assert_eq!(report.events[0].trigger, ViolationTrigger::MissingEquipment);
    }

    #[test]
    fn test_per_primary_alignment_and_fail_closed() {
        let (mut session, _) = session(MonitorConfig::ppe(LabelPolicy::harness()));
        let input = FrameInput::new(
            frame(1, 0),
            vec![
                // Degenerate; skipped but still occupies index 0
                det("person", 5.0, 5.0, 5.0, 20.0),
                det("person", 10.0, 2.0, 30.0, 46.0),
                det("person", 34.0, 2.0, 60.0, 46.0),
            ],
        )
        .with_sub_detections(vec![
            Some(vec![]),
            Some(vec![det("Harness", 2.0, 10.0, 18.0, 30.0)]),
            None,
        ]);

        let report = session.process(input);
        assert_eq!(report.results.len(), 2);
        assert!(!report.results[0].is_violating());
        assert!(report.results[1].has_reason(REASON_UNAVAILABLE));
    }

    #[test]
    fn test_negative_label_policy_with_custom_advisory() {
        let mut config = MonitorConfig::ppe(LabelPolicy::ppe_negative());
        config.equipment = Some(EquipmentSettings {
            policy: LabelPolicy::ppe_negative(),
            advisories: [("Without Mask".to_string(), "Mask required in clean room".to_string())]
                .into_iter()
                .collect(),
        });
        let (mut session, _) = session(config);

        let report = session.process(FrameInput::new(
            frame(1, 0),
            vec![
                det("person", 10.0, 2.0, 40.0, 46.0),
                det("Without Mask", 20.0, 4.0, 30.0, 12.0),
            ],
        ));
        assert!(report.results[0].has_reason("Without Mask"));
        assert_eq!(report.results[0].advisories, vec!["Mask required in clean room".to_string()]);
    }

    #[test]
    fn test_once_per_activation_debounce() {
        let mut config = static_zone_config();
        config.recorder = RecorderConfig {
            policy: SnapshotPolicy::OncePerActivation,
            ..Default::default()
        };
        let (mut session, store) = session(config);
        let outside = vec![det("person", 0.0, 10.0, 8.0, 47.0)];
        let inside = vec![det("person", 24.0, 5.0, 40.0, 30.0)];

        let counts: Vec<usize> = [&outside, &outside, &outside, &inside, &outside]
            .iter()
            .enumerate()
            .map(|(n, dets)| {
                session
                    .process(FrameInput::new(frame(n as u32, n as u64 * SEC), (*dets).clone()))
                    .events
                    .len()
            })
            .collect();

        assert_eq!(counts, vec![1, 0, 0, 0, 1]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_low_confidence_ignored() {
        let (mut session, _) = session(static_zone_config());
        let faint = Detection::new("person", 0.1, BBox::new(0.0, 10.0, 8.0, 47.0));
        let report = session.process(FrameInput::new(frame(1, 0), vec![faint]));
        assert!(report.results.is_empty());
    }

    struct FullDisk;

    impl SnapshotStore for FullDisk {
        fn put(&self, _key: &str, _bytes: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }
    }

    #[test]
    fn test_persistence_failure_keeps_monitoring() {
        let mut session = MonitorSession::new(static_zone_config(), Arc::new(FullDisk));
        let outside = vec![det("person", 0.0, 10.0, 8.0, 47.0)];

        for n in 0..3u32 {
            let report = session.process(FrameInput::new(frame(n, n as u64 * SEC), outside.clone()));
            assert_eq!(report.events.len(), 1);
            assert!(!report.events[0].persisted);
        }
    }
}
