//! Hierarchical equipment compliance
//!
//! A primary entity (usually a person) is checked against detections from a
//! second pass restricted to its crop. Cropping and the second pass belong
//! to the caller.

use crate::detection::Detection;
use crate::result::ComplianceResult;
use crate::{ComplianceError, MISSING_PREFIX, REASON_UNAVAILABLE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// How equipment labels map to violation reasons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Each required label must be present; absence adds `missing-<label>`
    Presence { required: BTreeSet<String> },
    /// The detector emits explicit negative labels ("Without Mask");
    /// each one present is itself the reason
    NegativeLabel { violation_labels: BTreeSet<String> },
}

impl LabelPolicy {
    pub fn presence<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LabelPolicy::Presence {
            required: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn negative<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LabelPolicy::NegativeLabel {
            violation_labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Full PPE kit, positive labels
    pub fn ppe_presence() -> Self {
        Self::presence(["Glasses", "Mask", "Vest", "Safety Shoes", "Helmet"])
    }

    /// Full PPE kit, negative labels
    pub fn ppe_negative() -> Self {
        Self::negative([
            "Without Glass",
            "Without Mask",
            "Without Vest",
            "Without Safety Shoes",
            "Without Helmet",
        ])
    }

    /// Fall-arrest harness for work at height
    pub fn harness() -> Self {
        Self::presence(["Harness"])
    }

    /// Reasons produced for a set of labels present in the crop
    fn reasons(&self, present: &BTreeSet<&str>) -> BTreeSet<String> {
        match self {
            LabelPolicy::Presence { required } => required
                .iter()
                .filter(|label| !present.contains(label.as_str()))
                .map(|label| format!("{MISSING_PREFIX}{label}"))
                .collect(),
            LabelPolicy::NegativeLabel { violation_labels } => violation_labels
                .iter()
                .filter(|label| present.contains(label.as_str()))
                .cloned()
                .collect(),
        }
    }
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self::ppe_presence()
    }
}

/// Default operator messages keyed by reason
pub fn default_advisories() -> BTreeMap<String, String> {
    [
        ("missing-Glasses", "Wear safety glasses"),
        ("missing-Mask", "Wear a mask"),
        ("missing-Vest", "Wear a safety vest"),
        ("missing-Safety Shoes", "Wear safety shoes"),
        ("missing-Helmet", "Wear a helmet"),
        ("missing-Harness", "No harness"),
        ("Without Glass", "No safety glasses"),
        ("Without Mask", "No mask"),
        ("Without Vest", "No safety vest"),
        ("Without Safety Shoes", "No safety shoes"),
        ("Without Helmet", "No helmet"),
        ("outside-zone", "Outside the safe zone"),
        (REASON_UNAVAILABLE, "Equipment check unavailable"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Evaluates equipment rules for a primary entity
#[derive(Debug, Clone)]
pub struct HierarchicalComplianceEvaluator {
    policy: LabelPolicy,
    advisories: BTreeMap<String, String>,
}

impl Default for HierarchicalComplianceEvaluator {
    fn default() -> Self {
        Self::new(LabelPolicy::default())
    }
}

impl HierarchicalComplianceEvaluator {
    pub fn new(policy: LabelPolicy) -> Self {
        Self {
            policy,
            advisories: default_advisories(),
        }
    }

    /// Replace the advisory table
    pub fn with_advisories(mut self, advisories: BTreeMap<String, String>) -> Self {
        self.advisories = advisories;
        self
    }

    pub fn policy(&self) -> &LabelPolicy {
        &self.policy
    }

    /// Evaluate a primary against sub-detections from its crop.
    ///
    /// Only label presence matters; confidence thresholds are the detector's
    /// concern. Invalid sub-detections are skipped.
    pub fn evaluate(
        &self,
        primary: &Detection,
        sub_detections: &[Detection],
    ) -> Result<ComplianceResult, ComplianceError> {
        primary.validate()?;

        let present: BTreeSet<&str> = sub_detections
            .iter()
            .filter(|d| match d.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Ignoring sub-detection: {}", e);
                    false
                }
            })
            .map(|d| d.label.as_str())
            .collect();

        let reasons = self.policy.reasons(&present);
        if !reasons.is_empty() {
            debug!("{} violating: {:?}", primary.label, reasons);
        }

        Ok(self.annotate(ComplianceResult::from_reasons(primary.clone(), reasons)))
    }

    /// Fail closed when the second pass could not run for this primary
    pub fn evaluate_unavailable(&self, primary: &Detection) -> ComplianceResult {
        warn!(
            "Equipment evaluation unavailable for {}; treating as violating",
            primary.label
        );
        self.annotate(ComplianceResult::from_reasons(
            primary.clone(),
            BTreeSet::from([REASON_UNAVAILABLE.to_string()]),
        ))
    }

    /// Attach advisory messages for every reason in the result
    pub fn annotate(&self, mut result: ComplianceResult) -> ComplianceResult {
        result.advisories = result
            .reasons
            .iter()
            .filter_map(|r| self.advisories.get(r).cloned())
            .collect();
        result
    }
}

/// Restrict whole-frame detections to those centred inside `primary`.
///
/// The primary itself and other detections carrying its label are excluded.
pub fn sub_detections_within(primary: &Detection, frame_detections: &[Detection]) -> Vec<Detection> {
    frame_detections
        .iter()
        .filter(|d| d.label != primary.label)
        .filter(|d| primary.bbox.contains_point(d.bbox.center()))
        .cloned()
        .collect()
}
