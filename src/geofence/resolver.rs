//! Zone resolution for a single reported location.
//!
//! Restricted zones are checked first and win outright, then allowed zones,
//! and only when nothing matched is the nearest allowed zone computed.

use serde::Serialize;
use utoipa::ToSchema;

use crate::geofence::geometry::Point;
use crate::model::zone::{Zone, ZoneId};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub is_in_restricted_zone: bool,
    #[schema(value_type = Option<u64>)]
    pub matched_zone_id: Option<ZoneId>,
    #[schema(value_type = Option<u64>)]
    pub nearest_zone_id: Option<ZoneId>,
    pub nearest_distance_meters: Option<f64>,
    pub violation_reason: Option<String>,
}

impl ValidationResult {
    fn restricted(zone: &Zone) -> Self {
        Self {
            is_valid: false,
            is_in_restricted_zone: true,
            matched_zone_id: None,
            nearest_zone_id: None,
            nearest_distance_meters: None,
            violation_reason: Some(format!(
                "Location is within restricted zone: {}",
                zone.id
            )),
        }
    }

    fn matched(zone: &Zone) -> Self {
        Self {
            is_valid: true,
            is_in_restricted_zone: false,
            matched_zone_id: Some(zone.id),
            nearest_zone_id: None,
            nearest_distance_meters: None,
            violation_reason: None,
        }
    }

    fn outside(nearest: Option<(ZoneId, f64)>) -> Self {
        let reason = match nearest {
            Some((_, d)) => format!(
                "Location is outside allowed work zones. Nearest zone: {:.0}m away",
                d
            ),
            None => "Location is outside allowed work zones. No work zones configured".to_string(),
        };

        Self {
            is_valid: false,
            is_in_restricted_zone: false,
            matched_zone_id: None,
            nearest_zone_id: nearest.map(|(id, _)| id),
            nearest_distance_meters: nearest.map(|(_, d)| d),
            violation_reason: Some(reason),
        }
    }

    /// Whether an event stamped with this result counts as a violation.
    pub fn is_violation(&self) -> bool {
        !self.is_valid || self.is_in_restricted_zone
    }
}

/// Resolves `p` against an active zone set. Department filtering has already
/// happened; the resolver never fails.
pub fn resolve(p: Point, zones: &[Zone]) -> ValidationResult {
    if let Some(zone) = zones.iter().find(|z| z.is_restricted && z.contains(p)) {
        return ValidationResult::restricted(zone);
    }

    let allowed = || zones.iter().filter(|z| !z.is_restricted);

    if let Some(zone) = allowed().find(|z| z.contains(p)) {
        return ValidationResult::matched(zone);
    }

    let nearest = allowed()
        .map(|z| (z.id, z.edge_distance(p)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    ValidationResult::outside(nearest)
}
