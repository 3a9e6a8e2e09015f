//! Zone containment classification

use crate::detection::Detection;
use crate::result::ComplianceResult;
use crate::REASON_OUTSIDE_ZONE;
use std::collections::BTreeSet;
use tracing::debug;
use zone::Polygon;

/// Classify an entity against the safe zone.
///
/// With no zone the entity is compliant: absence of a detectable zone never
/// produces a violation on its own.
pub fn classify_zone(entity: &Detection, zone: Option<&Polygon>) -> ComplianceResult {
    let Some(polygon) = zone else {
        return ComplianceResult::compliant(entity.clone());
    };

    let point = entity.reference_point();
    if zone::contains(polygon, point) {
        return ComplianceResult::compliant(entity.clone());
    }

    debug!(
        "{} at ({:.0}, {:.0}) is outside the safe zone",
        entity.label, point.0, point.1
    );
    ComplianceResult::from_reasons(
        entity.clone(),
        BTreeSet::from([REASON_OUTSIDE_ZONE.to_string()]),
    )
}
