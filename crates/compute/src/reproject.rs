use formats::{Feature, FeatureCollection, Geometry, Position};
use foundation::math::AlbersProjection;
use serde_json::{Value, json};

use crate::analysis::SpatialAnalysis;

/// Projects every coordinate of `geometry`. Coordinates that do not project
/// to finite values land on the origin. Unmodelled geometry types are
/// returned unchanged.
pub fn project_geometry(geometry: &Geometry, projection: &AlbersProjection) -> Geometry {
    geometry.map_positions(|p| Position::from(projection.project_or_origin(p.x, p.y)).with_z(p.z))
}

/// Projects every feature's geometry. Ids, properties and foreign members
/// are kept.
pub fn project_collection(
    collection: &FeatureCollection,
    projection: &AlbersProjection,
) -> FeatureCollection {
    let features = collection
        .features
        .iter()
        .map(|feature| project_feature(feature, projection))
        .collect();
    collection.with_features(features)
}

fn project_feature(feature: &Feature, projection: &AlbersProjection) -> Feature {
    Feature {
        id: feature.id.clone(),
        properties: feature.properties.clone(),
        geometry: feature
            .geometry
            .as_ref()
            .map(|g| project_geometry(g, projection)),
    }
}

/// Projects a collection for the parcel animation: along with the geometry,
/// numeric `final_lon`/`final_lat` are replaced by their projected x/y, and
/// polygonal features get a `centroid` property holding the mean of their
/// projected ring vertices.
pub fn bake_animation_properties(
    collection: &FeatureCollection,
    projection: &AlbersProjection,
) -> FeatureCollection {
    let features = collection
        .features
        .iter()
        .map(|feature| {
            let mut out = project_feature(feature, projection);

            if let (Some(lon), Some(lat)) = (
                feature.property_f64("final_lon"),
                feature.property_f64("final_lat"),
            ) {
                let [x, y] = projection.project_or_origin(lon, lat);
                out.properties.insert("final_lon".to_string(), json!(x));
                out.properties.insert("final_lat".to_string(), json!(y));
            }

            if let Some(geometry) = out.geometry.as_ref().filter(|g| g.is_polygonal()) {
                let c = SpatialAnalysis::ring_centroid(geometry.rings());
                out.properties
                    .insert("centroid".to_string(), json!([c.x, c.y]));
            }
            out
        })
        .collect();
    collection.with_features(features)
}

/// Reads a `[x, y]` property, as written by [`bake_animation_properties`].
pub fn point_property(feature: &Feature, key: &str) -> Option<Position> {
    match feature.property(key)? {
        Value::Array(items) if items.len() >= 2 => {
            Some(Position::new(items[0].as_f64()?, items[1].as_f64()?))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{bake_animation_properties, point_property, project_collection, project_geometry};
    use formats::{Feature, FeatureCollection, Geometry, Position};
    use foundation::math::AlbersProjection;
    use serde_json::{Map, json};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    #[test]
    fn projects_the_d3_center_to_translate() {
        let p = AlbersProjection::usa();
        let g = project_geometry(&Geometry::Point(Position::new(-96.6, 38.7)), &p);
        let Geometry::Point(pt) = g else {
            panic!("expected a Point");
        };
        assert_close(pt.x, 480.0);
        assert_close(pt.y, 250.0);
    }

    #[test]
    fn unknown_geometry_passes_through() {
        let other = Geometry::Other(json!({"type": "GeometryCollection", "geometries": []}));
        assert_eq!(project_geometry(&other, &AlbersProjection::usa()), other);
    }

    #[test]
    fn collection_keeps_count_ids_and_properties() {
        let payload = json!({
            "type": "FeatureCollection",
            "name": "tx-viz-parcels",
            "features": [
                {"type": "Feature", "id": 7, "properties": {"a": 1},
                 "geometry": {"type": "LineString", "coordinates": [[-100.0, 30.0], [-99.0, 31.0]]}},
                {"type": "Feature", "properties": {"b": "x"}, "geometry": null}
            ]
        });
        let fc = FeatureCollection::from_geojson_value(&payload).unwrap();
        let out = project_collection(&fc, &AlbersProjection::usa());

        assert_eq!(out.len(), 2);
        assert_eq!(out.features[0].id, Some(json!(7)));
        assert_eq!(out.features[0].properties, fc.features[0].properties);
        assert_eq!(out.features[1].geometry, None);
        assert_eq!(out.foreign_members.get("name"), Some(&json!("tx-viz-parcels")));
    }

    #[test]
    fn bakes_final_position_and_centroid() {
        let mut props = Map::new();
        props.insert("final_lon".to_string(), json!(-96.6));
        props.insert("final_lat".to_string(), json!(38.7));
        props.insert("gis_acres".to_string(), json!(640));
        let ring = vec![
            Position::new(-97.0, 38.0),
            Position::new(-96.0, 38.0),
            Position::new(-96.0, 39.0),
            Position::new(-97.0, 38.0),
        ];
        let fc = FeatureCollection::new(vec![Feature::new(
            Some(Geometry::Polygon(vec![ring])),
            props,
        )]);

        let out = bake_animation_properties(&fc, &AlbersProjection::usa());
        let f = &out.features[0];
        assert_close(f.property_f64("final_lon").unwrap(), 480.0);
        assert_close(f.property_f64("final_lat").unwrap(), 250.0);
        assert_eq!(f.property("gis_acres"), Some(&json!(640)));

        let Some(Geometry::Polygon(rings)) = &f.geometry else {
            panic!("expected a Polygon");
        };
        let n = rings[0].len() as f64;
        let mean_x = rings[0].iter().map(|p| p.x).sum::<f64>() / n;
        let centroid = point_property(f, "centroid").unwrap();
        assert_close(centroid.x, mean_x);
    }

    #[test]
    fn non_numeric_final_position_is_left_alone() {
        let mut props = Map::new();
        props.insert("final_lon".to_string(), json!("n/a"));
        let fc = FeatureCollection::new(vec![Feature::new(
            Some(Geometry::Point(Position::new(-96.6, 38.7))),
            props,
        )]);
        let out = bake_animation_properties(&fc, &AlbersProjection::usa());
        assert_eq!(out.features[0].property("final_lon"), Some(&json!("n/a")));
        assert!(out.features[0].property("centroid").is_none());
    }
}
