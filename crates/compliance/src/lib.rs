//! Compliance Rules
//!
//! Classifies detected entities as compliant or violating:
//! - Zone containment of the entity's ground reference point
//! - Hierarchical equipment checks over sub-detections within the entity
//! - Presence and negative-label policies behind one result type
//!
//! Detection itself is done upstream; this crate only consumes results.

pub mod containment;
pub mod detection;
pub mod evaluator;
pub mod result;

pub use containment::classify_zone;
pub use detection::{retain_valid, BBox, Detection};
pub use evaluator::{sub_detections_within, HierarchicalComplianceEvaluator, LabelPolicy};
pub use result::{ComplianceResult, ComplianceStatus};

use thiserror::Error;

/// Reason attached to entities whose reference point is outside the zone
pub const REASON_OUTSIDE_ZONE: &str = "outside-zone";

/// Reason attached when the equipment pass produced nothing to evaluate
pub const REASON_UNAVAILABLE: &str = "evaluation-unavailable";

/// Prefix of reasons produced by the presence policy
pub const MISSING_PREFIX: &str = "missing-";

/// Compliance error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComplianceError {
    #[error("Invalid detection '{label}': {reason}")]
    InvalidDetection { label: String, reason: String },
}
