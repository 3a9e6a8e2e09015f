//! Dwell timer configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Dwell timer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellConfig {
    /// Continuous time before the alert fires (seconds)
    pub threshold_secs: u64,

    /// Labels of equipment that must not be left unattended
    pub watched_labels: BTreeSet<String>,

    /// Label whose presence means the equipment is attended
    pub person_label: String,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            threshold_secs: 300,
            watched_labels: BTreeSet::from(["kadhai".to_string()]),
            person_label: "person".to_string(),
        }
    }
}

impl DwellConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.threshold_secs)
    }

    pub(crate) fn threshold_ns(&self) -> u64 {
        self.threshold_secs.saturating_mul(1_000_000_000)
    }

    /// Watched condition for one frame: any watched equipment visible and
    /// no person visible
    pub fn condition_active<'a, I>(&self, labels: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut equipment = false;
        for label in labels {
            if label == self.person_label {
                return false;
            }
            if self.watched_labels.contains(label) {
                equipment = true;
            }
        }
        equipment
    }
}
