//! Detections produced by the upstream detector

use crate::ComplianceError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bounding box in pixel coordinates `(x1, y1)` top-left, `(x2, y2)` bottom-right
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 as f64 + self.x2 as f64) / 2.0,
            (self.y1 as f64 + self.y2 as f64) / 2.0,
        )
    }

    /// Bottom-centre of the box, approximating where the entity stands
    pub fn reference_point(&self) -> (f64, f64) {
        ((self.x1 as f64 + self.x2 as f64) / 2.0, self.y2 as f64)
    }

    /// Inclusive point test
    pub fn contains_point(&self, point: (f64, f64)) -> bool {
        let (x, y) = point;
        x >= self.x1 as f64 && x <= self.x2 as f64 && y >= self.y1 as f64 && y <= self.y2 as f64
    }

    fn is_normalized(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2].iter().all(|v| v.is_finite())
            && self.x1 < self.x2
            && self.y1 < self.y2
    }
}

/// One labelled, confidence-scored box from a detection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }

    /// Ground reference point used for zone containment
    pub fn reference_point(&self) -> (f64, f64) {
        self.bbox.reference_point()
    }

    /// Reject degenerate boxes and out-of-range confidences
    pub fn validate(&self) -> Result<(), ComplianceError> {
        if !self.bbox.is_normalized() {
            return Err(ComplianceError::InvalidDetection {
                label: self.label.clone(),
                reason: format!(
                    "degenerate bbox ({}, {}, {}, {})",
                    self.bbox.x1, self.bbox.y1, self.bbox.x2, self.bbox.y2
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ComplianceError::InvalidDetection {
                label: self.label.clone(),
                reason: format!("confidence {} outside [0, 1]", self.confidence),
            });
        }
        Ok(())
    }
}

/// Drop invalid detections, logging each rejection
pub fn retain_valid(detections: Vec<Detection>) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| match d.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping detection: {}", e);
                false
            }
        })
        .collect()
}
