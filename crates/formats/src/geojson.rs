use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// A coordinate: longitude/latitude for geographic data, x/y once
/// projected, with an optional third ordinate (elevation) carried through
/// untouched. Ordinates past the third are not retained.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_z(self, z: Option<f64>) -> Self {
        Self { z, ..self }
    }

    pub fn as_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<[f64; 2]> for Position {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

pub type Ring = Vec<Position>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
    /// Geometry types this crate does not model (e.g. GeometryCollection),
    /// kept verbatim.
    Other(Value),
}

impl Geometry {
    pub fn type_name(&self) -> &str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::Other(v) => v.get("type").and_then(|t| t.as_str()).unwrap_or("Unknown"),
        }
    }

    /// Every ring of a Polygon or MultiPolygon; empty for other types.
    pub fn rings(&self) -> Vec<&Ring> {
        match self {
            Geometry::Polygon(rings) => rings.iter().collect(),
            Geometry::MultiPolygon(polys) => polys.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_polygonal(&self) -> bool {
        matches!(self, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
    }

    /// All positions in document order. `Other` geometries contribute none.
    pub fn positions(&self) -> Vec<Position> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.clone(),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().copied().collect(),
            Geometry::Other(_) => Vec::new(),
        }
    }

    /// Applies `f` to every position, preserving nesting. `Other` geometries
    /// are returned unchanged.
    pub fn map_positions<F: FnMut(Position) -> Position>(&self, mut f: F) -> Geometry {
        fn line<F: FnMut(Position) -> Position>(ps: &[Position], f: &mut F) -> Vec<Position> {
            ps.iter().map(|p| f(*p)).collect()
        }

        match self {
            Geometry::Point(p) => Geometry::Point(f(*p)),
            Geometry::MultiPoint(ps) => Geometry::MultiPoint(line(ps, &mut f)),
            Geometry::LineString(ps) => Geometry::LineString(line(ps, &mut f)),
            Geometry::MultiLineString(lines) => {
                Geometry::MultiLineString(lines.iter().map(|l| line(l, &mut f)).collect())
            }
            Geometry::Polygon(rings) => {
                Geometry::Polygon(rings.iter().map(|r| line(r, &mut f)).collect())
            }
            Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| rings.iter().map(|r| line(r, &mut f)).collect())
                    .collect(),
            ),
            Geometry::Other(v) => Geometry::Other(v.clone()),
        }
    }

    /// The coordinate array rendered as a flat comma-separated list of
    /// numbers, e.g. `[[[0,0],[1,0]]]` becomes `"0,0,1,0"`. This is the
    /// string form JavaScript produces for a nested array.
    pub fn coordinate_key(&self) -> String {
        if let Geometry::Other(v) = self {
            let coords = v.get("coordinates").or_else(|| v.get("geometries"));
            return coords.map(|c| c.to_string()).unwrap_or_default();
        }

        let mut out = String::new();
        for (i, p) in self.positions().into_iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&js_number(p.x));
            out.push(',');
            out.push_str(&js_number(p.y));
            if let Some(z) = p.z {
                out.push(',');
                out.push_str(&js_number(z));
            }
        }
        out
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut obj = Map::new();
        let coords = match self {
            Geometry::Other(v) => return v.clone(),
            Geometry::Point(p) => point_coords(p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => line_coords(ps),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                Value::Array(lines.iter().map(|l| line_coords(l)).collect())
            }
            Geometry::MultiPolygon(polys) => Value::Array(
                polys
                    .iter()
                    .map(|rings| Value::Array(rings.iter().map(|r| line_coords(r)).collect()))
                    .collect(),
            ),
        };
        obj.insert("type".to_string(), Value::String(self.type_name().to_string()));
        obj.insert("coordinates".to_string(), coords);
        Value::Object(obj)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
    pub id: Option<Value>,
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            id: None,
            properties,
            geometry,
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }

    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(|v| v.as_f64())
    }

    pub fn from_geojson_value(value: &Value, index: usize) -> Result<Self, GeoJsonError> {
        let invalid = |reason: String| GeoJsonError::InvalidFeature { index, reason };

        let obj = value
            .as_object()
            .ok_or_else(|| invalid("feature must be an object".to_string()))?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("feature missing type".to_string()))?;
        if ty != "Feature" {
            return Err(invalid(format!("unexpected feature type: {ty}")));
        }

        let id = obj.get("id").filter(|v| !v.is_null()).cloned();
        let properties = obj
            .get("properties")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        let geometry = match obj.get("geometry") {
            None | Some(Value::Null) => None,
            Some(g) => Some(parse_geometry(g).map_err(invalid)?),
        };

        Ok(Self {
            id,
            properties,
            geometry,
        })
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String("Feature".to_string()));
        if let Some(id) = &self.id {
            obj.insert("id".to_string(), id.clone());
        }
        obj.insert(
            "geometry".to_string(),
            self.geometry
                .as_ref()
                .map(Geometry::to_geojson_value)
                .unwrap_or(Value::Null),
        );
        obj.insert("properties".to_string(), Value::Object(self.properties.clone()));
        Value::Object(obj)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    /// Top-level members other than `type` and `features` (`crs`, `name`,
    /// `bbox`, ...), written back unchanged.
    pub foreign_members: Map<String, Value>,
}

#[derive(Debug)]
pub enum GeoJsonError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoJsonError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            GeoJsonError::Json(err) => write!(f, "JSON parse error: {err}"),
            GeoJsonError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Io { source, .. } => Some(source),
            GeoJsonError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            foreign_members: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Same foreign members, different features.
    pub fn with_features(&self, features: Vec<Feature>) -> Self {
        Self {
            features,
            foreign_members: self.foreign_members.clone(),
        }
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload).map_err(GeoJsonError::Json)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value.as_object().ok_or(GeoJsonError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(GeoJsonError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(GeoJsonError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            features.push(Feature::from_geojson_value(feat_val, index)?);
        }

        let foreign_members = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "type" && k.as_str() != "features")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            features,
            foreign_members,
        })
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );
        for (k, v) in &self.foreign_members {
            root.insert(k.clone(), v.clone());
        }
        root.insert(
            "features".to_string(),
            Value::Array(self.features.iter().map(Feature::to_geojson_value).collect()),
        );
        Value::Object(root)
    }

    pub fn to_geojson_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_geojson_value())
    }

    pub fn to_geojson_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_geojson_value())
    }

    pub fn read_path(path: impl AsRef<Path>) -> Result<Self, GeoJsonError> {
        let path = path.as_ref();
        let payload = fs::read_to_string(path).map_err(|source| GeoJsonError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_geojson_str(&payload)
    }

    /// Writes pretty-printed GeoJSON, creating parent directories.
    pub fn write_path(&self, path: impl AsRef<Path>) -> Result<(), GeoJsonError> {
        let path = path.as_ref();
        let io_err = |source| GeoJsonError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let payload = self.to_geojson_string_pretty().map_err(GeoJsonError::Json)?;
        fs::write(path, payload).map_err(io_err)
    }
}

/// Shortest round-trip rendering, with `-0` printed as `0`.
fn js_number(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    format!("{v}")
}

/// Integral values are written without a fraction, as JavaScript would.
fn number(v: f64) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}

fn point_coords(p: &Position) -> Value {
    let mut ordinates = vec![number(p.x), number(p.y)];
    ordinates.extend(p.z.map(number));
    Value::Array(ordinates)
}

fn line_coords(ps: &[Position]) -> Value {
    Value::Array(ps.iter().map(point_coords).collect())
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    let known = matches!(
        ty,
        "Point" | "MultiPoint" | "LineString" | "MultiLineString" | "Polygon" | "MultiPolygon"
    );
    if !known {
        return Ok(Geometry::Other(value.clone()));
    }

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_position(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_positions(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_positions(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        _ => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            let mut out = Vec::with_capacity(polys.len());
            for poly in polys {
                out.push(parse_rings(poly)?);
            }
            Ok(Geometry::MultiPolygon(out))
        }
    }
}

fn parse_position(coords: &Value) -> Result<Position, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have at least two numbers".to_string());
    }
    let x = arr[0].as_f64().ok_or("x must be a number".to_string())?;
    let y = arr[1].as_f64().ok_or("y must be a number".to_string())?;
    let z = match arr.get(2) {
        Some(v) => Some(v.as_f64().ok_or("z must be a number".to_string())?),
        None => None,
    };
    Ok(Position::new(x, y).with_z(z))
}

fn parse_positions(coords: &Value) -> Result<Vec<Position>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_position).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<Position>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of rings".to_string())?;
    arr.iter().map(parse_positions).collect()
}

#[cfg(test)]
mod tests {
    use super::{Feature, FeatureCollection, GeoJsonError, Geometry, Position, parse_geometry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn square() -> Geometry {
        Geometry::Polygon(vec![vec![
            Position::new(0.0, 0.0),
            Position::new(2.0, 0.0),
            Position::new(2.0, 2.0),
            Position::new(0.0, 2.0),
            Position::new(0.0, 0.0),
        ]])
    }

    #[test]
    fn parses_null_geometry_and_foreign_members() {
        let value = json!({
            "type": "FeatureCollection",
            "name": "parcels",
            "features": [
                { "type": "Feature", "geometry": null, "properties": { "university": "A" } },
                { "type": "Feature", "id": 7, "geometry": { "type": "Point", "coordinates": [1.5, -2, 30] }, "properties": null }
            ]
        });
        let fc = FeatureCollection::from_geojson_value(&value).expect("parse");
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features[0].geometry, None);
        assert_eq!(fc.features[0].property_str("university"), Some("A"));
        assert_eq!(fc.features[1].id, Some(json!(7)));
        assert_eq!(
            fc.features[1].geometry,
            Some(Geometry::Point(Position::new(1.5, -2.0).with_z(Some(30.0))))
        );
        assert_eq!(fc.foreign_members.get("name"), Some(&json!("parcels")));

        let out = fc.to_geojson_value();
        assert_eq!(out["name"], json!("parcels"));
        assert_eq!(out["features"][0]["geometry"], json!(null));
    }

    #[test]
    fn unknown_geometry_types_pass_through() {
        let gc = json!({
            "type": "GeometryCollection",
            "geometries": [{ "type": "Point", "coordinates": [1, 2] }]
        });
        let value = json!({
            "type": "FeatureCollection",
            "features": [{ "type": "Feature", "geometry": gc.clone(), "properties": {} }]
        });
        let fc = FeatureCollection::from_geojson_value(&value).expect("parse");
        let geom = fc.features[0].geometry.as_ref().expect("geometry");
        assert_eq!(geom.type_name(), "GeometryCollection");
        assert_eq!(geom.to_geojson_value(), gc);
    }

    #[test]
    fn rejects_non_collections_and_bad_features() {
        let err = FeatureCollection::from_geojson_value(&json!({ "type": "Feature" }))
            .expect_err("not a collection");
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection));

        let err = FeatureCollection::from_geojson_value(&json!({
            "type": "FeatureCollection",
            "features": [{ "type": "Feature", "geometry": { "type": "Point", "coordinates": ["a", 1] } }]
        }))
        .expect_err("bad coordinates");
        assert!(matches!(err, GeoJsonError::InvalidFeature { index: 0, .. }));
    }

    #[test]
    fn coordinate_key_flattens_like_javascript() {
        assert_eq!(square().coordinate_key(), "0,0,2,0,2,2,0,2,0,0");
        let p = Geometry::Point(Position::new(-97.5, 30.25));
        assert_eq!(p.coordinate_key(), "-97.5,30.25");
        let neg_zero = Geometry::Point(Position::new(-0.0, 0.1));
        assert_eq!(neg_zero.coordinate_key(), "0,0.1");
    }

    #[test]
    fn elevation_and_integers_survive_a_round_trip() {
        let value = json!({ "type": "LineString", "coordinates": [[0, 0, 1], [1.5, 0, 5]] });
        let geom = parse_geometry(&value).expect("parse");
        assert_eq!(geom.coordinate_key(), "0,0,1,1.5,0,5");
        let out = geom.to_geojson_value();
        assert_eq!(out, value);
        assert_eq!(out["coordinates"].to_string(), "[[0,0,1],[1.5,0,5]]");
    }

    #[test]
    fn map_positions_preserves_structure() {
        let shifted = square().map_positions(|p| Position::new(p.x + 1.0, p.y));
        match shifted {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0][1], Position::new(3.0, 0.0));
            }
            other => panic!("unexpected geometry: {other:?}"),
        }
    }

    #[test]
    fn feature_round_trips_through_value() {
        let mut props = serde_json::Map::new();
        props.insert("rights_type".to_string(), json!(["surface"]));
        let feature = Feature::new(Some(square()), props);
        let value = feature.to_geojson_value();
        let back = Feature::from_geojson_value(&value, 0).expect("parse");
        assert_eq!(back, feature);
    }
}
