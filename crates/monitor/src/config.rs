//! Monitor configuration

use crate::MonitorError;
use compliance::LabelPolicy;
use dwell::DwellConfig;
use recorder::RecorderConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use zone::{HsvRange, Polygon, DEFAULT_APPROX_EPSILON};

/// Where the safe zone comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ZoneSettings {
    /// No containment checks
    Disabled,
    /// Extract from coloured floor markings every frame
    Color {
        #[serde(default)]
        range: HsvRange,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    /// Fixed polygon in frame coordinates
    Static { polygon: Polygon },
}

fn default_epsilon() -> f64 {
    DEFAULT_APPROX_EPSILON
}

impl Default for ZoneSettings {
    fn default() -> Self {
        ZoneSettings::Color {
            range: HsvRange::default(),
            epsilon: DEFAULT_APPROX_EPSILON,
        }
    }
}

/// Equipment check settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSettings {
    pub policy: LabelPolicy,
    /// Extra or replacement advisory messages keyed by reason
    #[serde(default)]
    pub advisories: BTreeMap<String, String>,
}

/// Monitor configuration for one stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Label of primary entities (workers)
    pub person_label: String,

    /// Frame-level detections below this confidence are ignored
    pub min_confidence: f32,

    pub zone: ZoneSettings,

    /// Equipment checks; disabled when absent
    pub equipment: Option<EquipmentSettings>,

    /// Unattended equipment timer; disabled when absent
    pub dwell: Option<DwellConfig>,

    pub recorder: RecorderConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            person_label: "person".to_string(),
            min_confidence: 0.25,
            zone: ZoneSettings::default(),
            equipment: None,
            dwell: None,
            recorder: RecorderConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Safe-zone monitoring of workers on a factory floor
    pub fn safety_region() -> Self {
        Self::default()
    }

    /// PPE kit checks on workers, no zone
    pub fn ppe(policy: LabelPolicy) -> Self {
        Self {
            zone: ZoneSettings::Disabled,
            equipment: Some(EquipmentSettings {
                policy,
                advisories: BTreeMap::new(),
            }),
            ..Default::default()
        }
    }

    /// Unattended cookware timer
    pub fn unattended(dwell: DwellConfig) -> Self {
        Self {
            person_label: dwell.person_label.clone(),
            min_confidence: 0.5,
            zone: ZoneSettings::Disabled,
            dwell: Some(dwell),
            ..Default::default()
        }
    }

    /// Load from an optional file, overridden by `SAFETY__*` environment
    /// variables (e.g. `SAFETY__RECORDER__OUTPUT_DIR`)
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Loading monitor config from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("SAFETY").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
