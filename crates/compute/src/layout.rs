//! End positions for the parcel cluster animation.
//!
//! Parcels are split into Texas and everywhere else. Each group is packed
//! into a circle whose area is proportional to its total acreage, one grid
//! point per parcel, and the grid is dropped at a fixed center on the map.
//! Two layouts are produced: side by side (`final_lon`/`final_lat`) and
//! stacked (`final_lonv`/`final_latv`).

use std::f64::consts::{PI, TAU};

use formats::Feature;
use foundation::math::AlbersProjection;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::json;
use tracing::{info, warn};

use crate::ComputeError;
use crate::analysis::Statistics;

pub const SQ_METERS_PER_ACRE: f64 = 4046.86;
pub const RADIUS_SCALE: f64 = 15.0;

/// Where one layout writes its coordinates and where its two clusters sit,
/// Texas first.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTarget {
    pub lon_key: &'static str,
    pub lat_key: &'static str,
    pub centers: [[f64; 2]; 2],
}

impl LayoutTarget {
    pub fn horizontal() -> Self {
        Self {
            lon_key: "final_lon",
            lat_key: "final_lat",
            centers: [[-82.5, 40.5], [-110.25, 40.5]],
        }
    }

    pub fn vertical() -> Self {
        Self {
            lon_key: "final_lonv",
            lat_key: "final_latv",
            centers: [[-96.375, 42.0], [-96.375, 21.5]],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub seed: u64,
    pub targets: Vec<LayoutTarget>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            targets: vec![LayoutTarget::horizontal(), LayoutTarget::vertical()],
        }
    }
}

pub fn circle_radius(area: f64) -> f64 {
    (area / PI).sqrt()
}

/// Lays `count` points on concentric rings inside a circle of `radius`,
/// center first, spacing them so each covers roughly equal area. Returns
/// fewer than `count` points when the rings run out.
pub fn uniform_grid_in_circle(radius: f64, count: usize) -> Vec<[f64; 2]> {
    if count == 0 {
        return Vec::new();
    }
    let spacing = (PI * radius * radius / count as f64).sqrt();
    if spacing <= 0.0 || !spacing.is_finite() {
        return vec![[0.0, 0.0]; count];
    }

    let mut points = Vec::with_capacity(count);
    let rings = (radius / spacing) as usize + 1;
    for i in 0..rings {
        let ring_radius = spacing * i as f64;
        let ideal = (TAU * ring_radius / spacing) as usize;
        let in_ring = if ring_radius + spacing > radius {
            (ideal as f64 * (radius - ring_radius) / spacing) as usize
        } else {
            ideal
        }
        .max(1);

        for j in 0..in_ring {
            let angle = TAU * j as f64 / in_ring as f64;
            points.push([ring_radius * angle.cos(), ring_radius * angle.sin()]);
            if points.len() >= count {
                return points;
            }
        }
    }
    points
}

fn is_texas(parcel: &Feature) -> bool {
    parcel.property_str("state") == Some("TX")
}

/// Writes layout coordinates onto every parcel. The assignment of parcels to
/// grid points is shuffled with a seeded RNG, so a given seed always yields
/// the same layout.
pub fn layout_parcels(
    mut parcels: Vec<Feature>,
    options: &LayoutOptions,
) -> Result<Vec<Feature>, ComputeError> {
    let projection = AlbersProjection::conus_meters();
    let mut rng = StdRng::seed_from_u64(options.seed);

    let (texas, rest): (Vec<usize>, Vec<usize>) =
        (0..parcels.len()).partition(|&i| is_texas(&parcels[i]));

    let grids: Vec<Vec<[f64; 2]>> = [&texas, &rest]
        .iter()
        .map(|group| {
            let acres = Statistics::sum(
                group
                    .iter()
                    .map(|&i| parcels[i].property_f64("gis_acres").unwrap_or(0.0)),
            );
            let radius = circle_radius(acres * SQ_METERS_PER_ACRE) * RADIUS_SCALE;
            uniform_grid_in_circle(radius, group.len())
        })
        .collect();

    for target in &options.targets {
        for (g, group) in [&texas, &rest].into_iter().enumerate() {
            let [lon, lat] = target.centers[g];
            let center = projection.project(lon, lat).ok_or_else(|| {
                ComputeError::InvalidInput(format!("layout center [{lon}, {lat}] does not project"))
            })?;

            let mut order = group.clone();
            order.shuffle(&mut rng);

            let grid = &grids[g];
            for (k, &index) in order.iter().enumerate() {
                let Some(&[x, y]) = grid.get(k).or_else(|| grid.last()) else {
                    continue;
                };
                let Some([plon, plat]) = projection.invert(x + center[0], y + center[1]) else {
                    warn!(index, "layout point does not invert, parcel left in place");
                    continue;
                };
                let props = &mut parcels[index].properties;
                props.insert(target.lon_key.to_string(), json!(plon));
                props.insert(target.lat_key.to_string(), json!(plat));
            }
        }
    }

    info!(
        texas = texas.len(),
        elsewhere = rest.len(),
        seed = options.seed,
        "laid out parcel clusters"
    );
    Ok(parcels)
}

#[cfg(test)]
mod tests {
    use super::{LayoutOptions, circle_radius, layout_parcels, uniform_grid_in_circle};
    use formats::Feature;
    use serde_json::{Map, json};

    fn parcel(state: &str, acres: f64) -> Feature {
        let mut props = Map::new();
        props.insert("state".to_string(), json!(state));
        props.insert("gis_acres".to_string(), json!(acres));
        Feature::new(None, props)
    }

    #[test]
    fn radius_inverts_circle_area() {
        let r = circle_radius(std::f64::consts::PI * 9.0);
        assert!((r - 3.0).abs() < 1e-12);
    }

    #[test]
    fn grid_starts_at_center_and_stays_inside() {
        let points = uniform_grid_in_circle(100.0, 50);
        assert_eq!(points[0], [0.0, 0.0]);
        assert!(points.len() <= 50);
        assert!(points.len() > 30, "got {}", points.len());
        for [x, y] in &points {
            assert!((x * x + y * y).sqrt() <= 100.0 + 1e-9);
        }
    }

    #[test]
    fn degenerate_grids() {
        assert!(uniform_grid_in_circle(10.0, 0).is_empty());
        assert_eq!(uniform_grid_in_circle(0.0, 3), vec![[0.0, 0.0]; 3]);
        assert_eq!(uniform_grid_in_circle(10.0, 1), vec![[0.0, 0.0]]);
    }

    #[test]
    fn every_parcel_gets_both_layouts_near_its_cluster() {
        let parcels = vec![
            parcel("TX", 640.0),
            parcel("TX", 320.0),
            parcel("WA", 640.0),
            parcel("NM", 40.0),
            parcel("WA", 80.0),
        ];
        let out = layout_parcels(parcels, &LayoutOptions::default()).unwrap();
        for p in &out {
            for key in ["final_lon", "final_lat", "final_lonv", "final_latv"] {
                assert!(p.property_f64(key).is_some(), "missing {key}");
            }
        }
        // Clusters are a few km across, so each parcel lands within a
        // degree of its center.
        assert!((out[0].property_f64("final_lon").unwrap() + 82.5).abs() < 1.0);
        assert!((out[2].property_f64("final_lon").unwrap() + 110.25).abs() < 1.0);
        assert!((out[3].property_f64("final_latv").unwrap() - 21.5).abs() < 1.0);
        assert!((out[1].property_f64("final_latv").unwrap() - 42.0).abs() < 1.0);
    }

    #[test]
    fn same_seed_same_layout() {
        let parcels: Vec<Feature> = (0..20).map(|i| parcel("TX", 10.0 + i as f64)).collect();
        let options = LayoutOptions::default();
        let a = layout_parcels(parcels.clone(), &options).unwrap();
        let b = layout_parcels(parcels, &options).unwrap();
        assert_eq!(a, b);
    }
}
