use std::collections::BTreeMap;

use formats::{Feature, Geometry, Position, Ring};
use foundation::bounds::Aabb2;

use crate::property_key;

pub struct SpatialAnalysis;

impl SpatialAnalysis {
    /// Arithmetic mean of every vertex of every ring, closing vertices
    /// included. Not area-weighted. No vertices yields the origin.
    pub fn ring_centroid<'a, I>(rings: I) -> Position
    where
        I: IntoIterator<Item = &'a Ring>,
    {
        let mut x = 0.0;
        let mut y = 0.0;
        let mut total = 0usize;
        for ring in rings {
            for p in ring {
                x += p.x;
                y += p.y;
                total += 1;
            }
        }
        if total == 0 {
            return Position::new(0.0, 0.0);
        }
        let n = total as f64;
        Position::new(x / n, y / n)
    }

    /// Mean of the geometry's vertices, skipping the closing vertex of each
    /// polygon ring so a closed ring does not count its start twice.
    pub fn vertex_centroid(geometry: &Geometry) -> Option<Position> {
        let points: Vec<Position> = match geometry {
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => geometry
                .rings()
                .into_iter()
                .flat_map(|ring| ring.iter().take(ring.len().saturating_sub(1)))
                .copied()
                .collect(),
            Geometry::Other(_) => return None,
            _ => geometry.positions(),
        };
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Position::new(sx / n, sy / n))
    }

    pub fn bounds(geometry: &Geometry) -> Option<Aabb2> {
        Aabb2::from_points(geometry.positions().into_iter().map(Position::as_array))
    }

    /// Bounding box of every feature sharing a value of `key`. Features
    /// without geometry or without the key are ignored.
    pub fn entity_bounds(features: &[Feature], key: &str) -> BTreeMap<String, Aabb2> {
        let mut out: BTreeMap<String, Aabb2> = BTreeMap::new();
        for feature in features {
            let Some(value) = feature.property(key).filter(|v| !v.is_null()) else {
                continue;
            };
            let Some(bounds) = feature.geometry.as_ref().and_then(Self::bounds) else {
                continue;
            };
            out.entry(property_key(value))
                .and_modify(|b| *b = b.union(bounds))
                .or_insert(bounds);
        }
        out
    }
}
