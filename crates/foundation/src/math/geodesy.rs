use super::Vec3;

/// Mean earth radius (meters), IUGG.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Upper bound on the pieces a single great-circle path is split into.
pub const MAX_PATH_SEGMENTS: usize = 10_000;

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LonLat {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl LonLat {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

/// Unit vector on the sphere for a geographic position.
pub fn lon_lat_to_unit(p: LonLat) -> Vec3 {
    let lat = p.lat_deg.to_radians();
    let lon = p.lon_deg.to_radians();
    Vec3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

pub fn unit_to_lon_lat(v: Vec3) -> LonLat {
    let lat = v.z.clamp(-1.0, 1.0).asin();
    let lon = v.y.atan2(v.x);
    LonLat::new(lon.to_degrees(), lat.to_degrees())
}

/// Central angle between two positions (radians), haversine form.
pub fn central_angle(a: LonLat, b: LonLat) -> f64 {
    let lat1 = a.lat_deg.to_radians();
    let lat2 = b.lat_deg.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon_deg - a.lon_deg).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Great-circle path from `a` to `b`, densified so no segment is longer than
/// `max_segment_m`, up to [`MAX_PATH_SEGMENTS`] pieces. Endpoints are
/// returned exactly as given.
///
/// Coincident and antipodal endpoints have no unique great circle; both
/// yield the two-point path `[a, b]`.
pub fn great_circle_path(a: LonLat, b: LonLat, max_segment_m: f64) -> Vec<LonLat> {
    let angle = central_angle(a, b);
    let sin_angle = angle.sin();
    if angle < 1e-12 || sin_angle.abs() < 1e-12 {
        return vec![a, b];
    }

    let distance = angle * EARTH_RADIUS_M;
    let segments = if max_segment_m > 0.0 && max_segment_m.is_finite() {
        (distance / max_segment_m)
            .ceil()
            .clamp(1.0, MAX_PATH_SEGMENTS as f64) as usize
    } else {
        1
    };

    let ua = lon_lat_to_unit(a);
    let ub = lon_lat_to_unit(b);

    let mut path = Vec::with_capacity(segments + 1);
    path.push(a);
    for i in 1..segments {
        let f = i as f64 / segments as f64;
        let wa = ((1.0 - f) * angle).sin() / sin_angle;
        let wb = (f * angle).sin() / sin_angle;
        path.push(unit_to_lon_lat(ua.scale(wa) + ub.scale(wb)));
    }
    path.push(b);
    path
}

#[cfg(test)]
mod tests {
    use super::{
        EARTH_RADIUS_M, LonLat, MAX_PATH_SEGMENTS, central_angle, great_circle_path,
        lon_lat_to_unit, unit_to_lon_lat,
    };

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn unit_vector_round_trip() {
        let p = LonLat::new(-97.74, 30.27);
        let rt = unit_to_lon_lat(lon_lat_to_unit(p));
        assert_close(rt.lon_deg, p.lon_deg, 1e-9);
        assert_close(rt.lat_deg, p.lat_deg, 1e-9);
    }

    #[test]
    fn quarter_meridian_distance() {
        let d = central_angle(LonLat::new(0.0, 0.0), LonLat::new(0.0, 90.0)) * EARTH_RADIUS_M;
        assert_close(d, EARTH_RADIUS_M * std::f64::consts::FRAC_PI_2, 1e-3);
    }

    #[test]
    fn path_along_equator_is_evenly_spaced() {
        let a = LonLat::new(0.0, 0.0);
        let b = LonLat::new(10.0, 0.0);
        // ~1112 km, so 100 km segments need 12 pieces.
        let path = great_circle_path(a, b, 100_000.0);
        assert_eq!(path.len(), 13);
        assert_eq!(path[0], a);
        assert_eq!(path[12], b);
        for p in &path {
            assert_close(p.lat_deg, 0.0, 1e-9);
        }
        assert_close(path[6].lon_deg, 5.0, 1e-9);
    }

    #[test]
    fn path_midpoint_bulges_toward_pole() {
        let a = LonLat::new(-100.0, 45.0);
        let b = LonLat::new(0.0, 45.0);
        let path = great_circle_path(a, b, 1_000_000.0);
        let mid = path[path.len() / 2];
        assert!(mid.lat_deg > 45.0, "great circle should arc north: {mid:?}");
        let total: f64 = path.windows(2).map(|w| central_angle(w[0], w[1])).sum();
        assert_close(total, central_angle(a, b), 1e-9);
    }

    #[test]
    fn tiny_segment_lengths_are_capped() {
        let a = LonLat::new(-97.7, 30.3);
        let b = LonLat::new(-71.1, 42.4);
        let path = great_circle_path(a, b, 1e-9);
        assert_eq!(path.len(), MAX_PATH_SEGMENTS + 1);
        assert_eq!(path[MAX_PATH_SEGMENTS], b);
    }

    #[test]
    fn degenerate_paths_have_two_points() {
        let a = LonLat::new(12.0, 34.0);
        assert_eq!(great_circle_path(a, a, 1000.0), vec![a, a]);

        let b = LonLat::new(-168.0, -34.0);
        assert_eq!(great_circle_path(a, b, 1000.0).len(), 2);
    }
}
