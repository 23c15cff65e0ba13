use formats::{Feature, Geometry, Position, Ring};
use tracing::{info, warn};

use crate::analysis::SpatialAnalysis;

/// Shoelace-style orientation test over consecutive vertex pairs. Positive
/// means clockwise with y pointing up (north).
pub fn is_clockwise(ring: &[Position]) -> bool {
    let sum: f64 = ring
        .windows(2)
        .map(|w| (w[1].x - w[0].x) * (w[1].y + w[0].y))
        .sum();
    sum > 0.0
}

fn wind(ring: &Ring, clockwise: bool) -> Ring {
    let mut out = ring.clone();
    if is_clockwise(ring) != clockwise {
        out.reverse();
    }
    out
}

fn rewind_polygon(rings: &[Ring]) -> Vec<Ring> {
    rings
        .iter()
        .enumerate()
        .map(|(i, ring)| wind(ring, i == 0))
        .collect()
}

/// Winds polygon rings the way d3 expects them: exterior rings clockwise,
/// holes counter-clockwise. Non-polygonal geometries are returned as-is.
pub fn rewind_geometry(geometry: &Geometry) -> Geometry {
    match geometry {
        Geometry::Polygon(rings) => Geometry::Polygon(rewind_polygon(rings)),
        Geometry::MultiPolygon(polys) => {
            Geometry::MultiPolygon(polys.iter().map(|p| rewind_polygon(p)).collect())
        }
        other => other.clone(),
    }
}

/// Drops features without geometry and rewinds the rest.
pub fn rewind_collection(features: &[Feature]) -> Vec<Feature> {
    let out: Vec<Feature> = features
        .iter()
        .filter_map(|f| {
            let geometry = f.geometry.as_ref()?;
            Some(Feature {
                id: f.id.clone(),
                properties: f.properties.clone(),
                geometry: Some(rewind_geometry(geometry)),
            })
        })
        .collect();
    info!(
        kept = out.len(),
        dropped = features.len() - out.len(),
        "rewound parcels"
    );
    out
}

/// One Point feature per input feature, placed at its vertex centroid and
/// carrying the same properties.
pub fn centroid_points(features: &[Feature]) -> Vec<Feature> {
    features
        .iter()
        .enumerate()
        .filter_map(|(index, f)| {
            let Some(c) = f.geometry.as_ref().and_then(SpatialAnalysis::vertex_centroid) else {
                warn!(index, "feature has no vertices, no centroid written");
                return None;
            };
            Some(Feature::new(Some(Geometry::Point(c)), f.properties.clone()))
        })
        .collect()
}
