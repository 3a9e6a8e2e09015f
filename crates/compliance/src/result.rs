//! Per-entity compliance results

use crate::detection::Detection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Compliance status of one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Compliant,
    Violating,
}

/// Outcome of evaluating one entity in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub entity: Detection,
    pub status: ComplianceStatus,
    pub reasons: BTreeSet<String>,
    /// Operator-facing message per reason, in reason order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<String>,
}

impl ComplianceResult {
    pub fn compliant(entity: Detection) -> Self {
        Self {
            entity,
            status: ComplianceStatus::Compliant,
            reasons: BTreeSet::new(),
            advisories: Vec::new(),
        }
    }

    /// Build a result from a reason set; status follows the reasons
    pub fn from_reasons(entity: Detection, reasons: BTreeSet<String>) -> Self {
        let status = if reasons.is_empty() {
            ComplianceStatus::Compliant
        } else {
            ComplianceStatus::Violating
        };
        Self {
            entity,
            status,
            reasons,
            advisories: Vec::new(),
        }
    }

    pub fn is_violating(&self) -> bool {
        self.status == ComplianceStatus::Violating
    }

    pub fn has_reason(&self, reason: &str) -> bool {
        self.reasons.contains(reason)
    }

    /// Fold another result for the same entity into this one
    pub fn merge(mut self, other: ComplianceResult) -> Self {
        self.reasons.extend(other.reasons);
        for advisory in other.advisories {
            if !self.advisories.contains(&advisory) {
                self.advisories.push(advisory);
            }
        }
        if !self.reasons.is_empty() {
            self.status = ComplianceStatus::Violating;
        }
        self
    }
}
