//! Spherical Albers (conic equal-area) projection.
//!
//! The forward transform matches d3-geo's `geoAlbers()`: the longitude is
//! rotated, the raw conic is evaluated in radians, then scaled and translated
//! so that `center` lands on `translate`. Output y grows downward (screen
//! convention), as in d3.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::geodesy::EARTH_RADIUS_M;

const EPSILON: f64 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AlbersProjection {
    /// Standard parallels (degrees).
    pub parallels: [f64; 2],
    /// Longitude rotation (degrees) applied before projecting.
    pub rotate_deg: f64,
    /// Projection center in the rotated frame (degrees).
    pub center: [f64; 2],
    pub scale: f64,
    pub translate: [f64; 2],
}

#[derive(Debug, Copy, Clone)]
struct ConicRaw {
    n: f64,
    c: f64,
    r0: f64,
    /// Cosine of the first parallel, used by the cylindrical fallback.
    cos_phi0: f64,
}

impl ConicRaw {
    fn new(phi0: f64, phi1: f64) -> Self {
        let sy0 = phi0.sin();
        let n = (sy0 + phi1.sin()) / 2.0;
        let c = 1.0 + sy0 * (2.0 * n - sy0);
        let r0 = c.sqrt() / n;
        Self {
            n,
            c,
            r0,
            cos_phi0: phi0.cos(),
        }
    }

    fn is_cylindrical(&self) -> bool {
        self.n.abs() < EPSILON
    }

    fn forward(&self, lambda: f64, phi: f64) -> [f64; 2] {
        if self.is_cylindrical() {
            return [lambda * self.cos_phi0, phi.sin() / self.cos_phi0];
        }
        let r = (self.c - 2.0 * self.n * phi.sin()).max(0.0).sqrt() / self.n;
        let x = lambda * self.n;
        [r * x.sin(), self.r0 - r * x.cos()]
    }

    fn invert(&self, x: f64, y: f64) -> [f64; 2] {
        if self.is_cylindrical() {
            return [x / self.cos_phi0, clamped_asin(y * self.cos_phi0)];
        }
        let r0y = self.r0 - y;
        let mut l = x.atan2(r0y.abs()) * sign(r0y);
        if r0y * self.n < 0.0 {
            l -= PI * sign(x) * sign(r0y);
        }
        let phi = clamped_asin(
            (self.c - (x * x + r0y * r0y) * self.n * self.n) / (2.0 * self.n),
        );
        [l / self.n, phi]
    }
}

impl AlbersProjection {
    /// d3's `geoAlbers()` defaults: a US-centric view sized for a 960x500
    /// canvas.
    pub fn usa() -> Self {
        Self {
            parallels: [29.5, 45.5],
            rotate_deg: 96.0,
            center: [-0.6, 38.7],
            scale: 1070.0,
            translate: [480.0, 250.0],
        }
    }

    /// Conterminous-US Albers (EPSG:5070 parameters) on the sphere, in meters.
    pub fn conus_meters() -> Self {
        Self {
            parallels: [29.5, 45.5],
            rotate_deg: 96.0,
            center: [0.0, 23.0],
            scale: EARTH_RADIUS_M,
            translate: [0.0, 0.0],
        }
    }

    fn raw(&self) -> ConicRaw {
        ConicRaw::new(self.parallels[0].to_radians(), self.parallels[1].to_radians())
    }

    fn center_offset(&self, raw: &ConicRaw) -> [f64; 2] {
        raw.forward(self.center[0].to_radians(), self.center[1].to_radians())
    }

    /// Projects a longitude/latitude pair. Returns `None` for non-finite
    /// output.
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> Option<[f64; 2]> {
        let raw = self.raw();
        let [cx, cy] = self.center_offset(&raw);
        let lambda = wrap_radians(lon_deg.to_radians() + self.rotate_deg.to_radians());
        let [x, y] = raw.forward(lambda, lat_deg.to_radians());

        let out = [
            self.translate[0] + self.scale * (x - cx),
            self.translate[1] - self.scale * (y - cy),
        ];
        (out[0].is_finite() && out[1].is_finite()).then_some(out)
    }

    /// Like [`project`](Self::project), falling back to the origin.
    pub fn project_or_origin(&self, lon_deg: f64, lat_deg: f64) -> [f64; 2] {
        self.project(lon_deg, lat_deg).unwrap_or([0.0, 0.0])
    }

    /// Inverse transform back to longitude/latitude degrees.
    pub fn invert(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        let raw = self.raw();
        let [cx, cy] = self.center_offset(&raw);
        let px = (x - self.translate[0]) / self.scale + cx;
        let py = (self.translate[1] - y) / self.scale + cy;
        let [lambda, phi] = raw.invert(px, py);

        let lon = wrap_radians(lambda - self.rotate_deg.to_radians()).to_degrees();
        let lat = phi.to_degrees();
        (lon.is_finite() && lat.is_finite()).then_some([lon, lat])
    }
}

impl Default for AlbersProjection {
    fn default() -> Self {
        Self::usa()
    }
}

fn wrap_radians(lambda: f64) -> f64 {
    if lambda.abs() > PI {
        lambda - (lambda / TAU).round() * TAU
    } else {
        lambda
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn clamped_asin(x: f64) -> f64 {
    if x > 1.0 {
        FRAC_PI_2
    } else if x < -1.0 {
        -FRAC_PI_2
    } else {
        x.asin()
    }
}

#[cfg(test)]
mod tests {
    use super::AlbersProjection;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn center_maps_to_translate() {
        let p = AlbersProjection::usa();
        let [x, y] = p.project(-96.6, 38.7).expect("finite");
        assert_close(x, 480.0, 1e-9);
        assert_close(y, 250.0, 1e-9);
    }

    #[test]
    fn south_is_down_and_east_is_right() {
        let p = AlbersProjection::usa();
        let [_, y_north] = p.project(-96.6, 45.0).expect("finite");
        let [_, y_south] = p.project(-96.6, 30.0).expect("finite");
        assert!(y_south > y_north);

        let [x_west, _] = p.project(-110.0, 38.7).expect("finite");
        let [x_east, _] = p.project(-80.0, 38.7).expect("finite");
        assert!(x_east > x_west);
    }

    #[test]
    fn invert_round_trips() {
        for proj in [AlbersProjection::usa(), AlbersProjection::conus_meters()] {
            for (lon, lat) in [(-97.74, 30.27), (-122.3, 47.6), (-70.0, 25.0), (-150.0, 61.2)] {
                let [x, y] = proj.project(lon, lat).expect("finite");
                let [lon_rt, lat_rt] = proj.invert(x, y).expect("finite");
                assert_close(lon_rt, lon, 1e-9);
                assert_close(lat_rt, lat, 1e-9);
            }
        }
    }

    #[test]
    fn conus_meters_origin_is_at_23n_96w() {
        let p = AlbersProjection::conus_meters();
        let [x, y] = p.project(-96.0, 23.0).expect("finite");
        assert_close(x, 0.0, 1e-6);
        assert_close(y, 0.0, 1e-6);

        // One degree of latitude along the central meridian is roughly 110 km.
        let [_, y1] = p.project(-96.0, 24.0).expect("finite");
        assert!((-y1 - 110_000.0).abs() < 5_000.0, "got {y1}");
    }

    #[test]
    fn non_finite_input_falls_back_to_origin() {
        let p = AlbersProjection::usa();
        assert_eq!(p.project(f64::NAN, 10.0), None);
        assert_eq!(p.project_or_origin(f64::NAN, 10.0), [0.0, 0.0]);
    }
}
