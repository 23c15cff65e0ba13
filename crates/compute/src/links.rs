use std::collections::HashMap;

use formats::{Feature, Geometry, Position};
use foundation::math::{LonLat, great_circle_path};
use serde_json::Map;
use tracing::{info, warn};

use crate::analysis::SpatialAnalysis;
use crate::property_key;
use crate::rights::{RIGHTS_TYPE, rights_types, rights_value};

/// Which parcel property names the owning entity, and which entity property
/// carries the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub parcel_key: String,
    pub entity_key: String,
}

impl LinkSpec {
    pub fn new(parcel_key: impl Into<String>, entity_key: impl Into<String>) -> Self {
        Self {
            parcel_key: parcel_key.into(),
            entity_key: entity_key.into(),
        }
    }

    pub fn university() -> Self {
        Self::new("university", "name")
    }

    pub fn tribe() -> Self {
        Self::new("present_day_tribe", "present_day_tribe")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkOptions {
    pub max_segment_km: f64,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            max_segment_km: 100.0,
        }
    }
}

/// A link target: a university campus or a tribal nation's present-day
/// location.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub location: LonLat,
}

impl Entity {
    /// Reads `name_key` and a location from a feature. Point features use
    /// their coordinate; anything else uses its vertex centroid.
    pub fn from_feature(feature: &Feature, name_key: &str) -> Option<Self> {
        let name = feature.property(name_key).filter(|v| !v.is_null())?;
        let location = match feature.geometry.as_ref()? {
            Geometry::Point(p) => *p,
            other => SpatialAnalysis::vertex_centroid(other)?,
        };
        Some(Self {
            name: property_key(name),
            location: LonLat::new(location.x, location.y),
        })
    }

    pub fn from_features(features: &[Feature], name_key: &str) -> Vec<Self> {
        let entities: Vec<Self> = features
            .iter()
            .filter_map(|f| Self::from_feature(f, name_key))
            .collect();
        if entities.len() < features.len() {
            warn!(
                skipped = features.len() - entities.len(),
                name_key, "entities without a name or location were skipped"
            );
        }
        entities
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkReport {
    pub links: Vec<Feature>,
    pub missing_geometry: usize,
    pub unmatched: usize,
}

/// Builds one LineString per parcel, from the parcel's vertex centroid along
/// the great circle to its owning entity. Links carry only the parcel's
/// entity property and its rights types.
///
/// Parcels with no geometry or no matching entity are skipped and counted;
/// neither is an error. When several entities share a name the first one is
/// used.
pub fn generate_links(
    parcels: &[Feature],
    entities: &[Entity],
    spec: &LinkSpec,
    options: &LinkOptions,
) -> LinkReport {
    let mut by_name: HashMap<&str, LonLat> = HashMap::with_capacity(entities.len());
    for entity in entities {
        by_name.entry(entity.name.as_str()).or_insert(entity.location);
    }

    let max_segment_m = options.max_segment_km * 1000.0;
    let mut report = LinkReport::default();

    for (index, parcel) in parcels.iter().enumerate() {
        let Some(origin) = parcel
            .geometry
            .as_ref()
            .and_then(SpatialAnalysis::vertex_centroid)
        else {
            warn!(index, "parcel has no usable geometry, skipping link");
            report.missing_geometry += 1;
            continue;
        };

        let name = parcel
            .property(&spec.parcel_key)
            .filter(|v| !v.is_null())
            .map(property_key);
        let Some(target) = name.as_deref().and_then(|n| by_name.get(n)) else {
            warn!(index, entity = ?name, "no entity matches parcel, skipping link");
            report.unmatched += 1;
            continue;
        };

        let path = great_circle_path(LonLat::new(origin.x, origin.y), *target, max_segment_m);
        let line = path
            .into_iter()
            .map(|p| Position::new(p.lon_deg, p.lat_deg))
            .collect();

        let mut props = Map::new();
        if let Some(value) = parcel.property(&spec.parcel_key) {
            props.insert(spec.parcel_key.clone(), value.clone());
        }
        props.insert(
            RIGHTS_TYPE.to_string(),
            rights_value(&rights_types(parcel)),
        );
        report
            .links
            .push(Feature::new(Some(Geometry::LineString(line)), props));
    }

    info!(
        links = report.links.len(),
        missing_geometry = report.missing_geometry,
        unmatched = report.unmatched,
        "generated links"
    );
    report
}
