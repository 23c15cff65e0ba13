//! Frame math for the Texas parcels animation: parcels travel from their
//! real location to a packed cluster while growing, then travel back.
//!
//! Rendering is not handled here. [`AnimationState`] is advanced with
//! explicit timestamps and everything else is a pure function of `t`.

use formats::{Feature, Geometry, Position, Ring};
use foundation::math::{AlbersProjection, Vec2};
use serde::Serialize;

use crate::analysis::SpatialAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimationParams {
    pub duration_ms: f64,
    pub pause_ms: f64,
    pub growth_factor: f64,
    /// Parcels end up `1 + scaling_factor` times their original size.
    pub scaling_factor: f64,
    pub circle_max_radii: [f64; 2],
    pub circle_min_radius: f64,
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            duration_ms: 10_000.0,
            pause_ms: 3_000.0,
            growth_factor: 7.0,
            scaling_factor: 10.0,
            circle_max_radii: [260.0 * 1.05, 260.0],
            circle_min_radius: 1.0,
        }
    }
}

impl AnimationParams {
    /// `t` raised to the growth factor: slow start, sharp finish.
    pub fn ease(&self, t: f64) -> f64 {
        t.clamp(0.0, 1.0).powf(self.growth_factor)
    }

    pub fn scale_at(&self, t: f64) -> f64 {
        1.0 + self.scaling_factor * self.ease(t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Running { last_ms: i64 },
    Paused { since_ms: i64 },
}

/// Ping-pong progress in `[0, 1]`. On reaching either end the direction
/// flips and progress holds for the pause duration.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub params: AnimationParams,
    t: f64,
    direction: f64,
    phase: Phase,
}

impl AnimationState {
    pub fn new(params: AnimationParams, now_ms: i64) -> Self {
        Self {
            params,
            t: 0.0,
            direction: 1.0,
            phase: Phase::Running { last_ms: now_ms },
        }
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, Phase::Paused { .. })
    }

    pub fn direction(&self) -> f64 {
        self.direction
    }

    /// Advances to `now_ms`. Returns `true` when a new frame should be
    /// drawn; paused ticks return `false`.
    pub fn tick(&mut self, now_ms: i64) -> bool {
        match self.phase {
            Phase::Paused { since_ms } => {
                if (now_ms - since_ms) as f64 > self.params.pause_ms {
                    self.phase = Phase::Running { last_ms: now_ms };
                }
                false
            }
            Phase::Running { last_ms } => {
                let delta = (now_ms - last_ms) as f64;
                self.t += self.direction * delta / self.params.duration_ms;
                self.phase = Phase::Running { last_ms: now_ms };

                if !(0.0..=1.0).contains(&self.t) {
                    self.direction = -self.direction;
                    self.t = self.t.clamp(0.0, 1.0);
                    self.phase = Phase::Paused { since_ms: now_ms };
                }
                true
            }
        }
    }

    pub fn style(&self) -> FrameStyle {
        FrameStyle::at(self.t, &self.params)
    }
}

/// Per-frame styling derived from `t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameStyle {
    /// State outlines and parcel strokes fade out as parcels cluster.
    pub outline_opacity: f64,
    /// Cluster acreage labels fade in.
    pub label_opacity: f64,
    pub line_width: f64,
    pub circle_radii: [f64; 2],
}

impl FrameStyle {
    pub fn at(t: f64, params: &AnimationParams) -> Self {
        let e = params.ease(t);
        let min = params.circle_min_radius;
        let radius = |max: f64| min + (max - min) * e;
        Self {
            outline_opacity: 1.0 - e,
            label_opacity: e,
            line_width: 1.0 - e,
            circle_radii: [
                radius(params.circle_max_radii[0]),
                radius(params.circle_max_radii[1]),
            ],
        }
    }
}

/// Moves rings so their vertex mean sits at `centroid`, scaling them by
/// `scale` about that point.
pub fn translate_and_scale(rings: &[Ring], centroid: Position, scale: f64) -> Vec<Ring> {
    let old = SpatialAnalysis::ring_centroid(rings);
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .map(|p| {
                    Position::new(
                        (p.x - old.x) * scale + centroid.x,
                        (p.y - old.y) * scale + centroid.y,
                    )
                    .with_z(p.z)
                })
                .collect()
        })
        .collect()
}

/// Parcel geometries at progress `t`. Input geometries are already
/// projected; `final_lon`/`final_lat` are still geographic and are
/// projected here. Each polygon's centroid moves linearly toward its final
/// position while the polygon grows by [`AnimationParams::scale_at`].
/// Parcels without a final position grow in place; non-polygonal features
/// are returned unchanged.
pub fn interpolate_parcels(
    parcels: &[Feature],
    t: f64,
    params: &AnimationParams,
    projection: &AlbersProjection,
) -> Vec<Feature> {
    let scale = params.scale_at(t);
    parcels
        .iter()
        .map(|parcel| {
            let Some(geometry) = parcel.geometry.as_ref().filter(|g| g.is_polygonal()) else {
                return parcel.clone();
            };
            let start = SpatialAnalysis::ring_centroid(geometry.rings());
            let end = match (parcel.property_f64("final_lon"), parcel.property_f64("final_lat")) {
                (Some(lon), Some(lat)) => Position::from(projection.project_or_origin(lon, lat)),
                _ => start,
            };
            let centroid = Position::from(
                Vec2::new(start.x, start.y)
                    .lerp(Vec2::new(end.x, end.y), t)
                    .as_array(),
            );

            let geometry = match geometry {
                Geometry::Polygon(rings) => {
                    Geometry::Polygon(translate_and_scale(rings, centroid, scale))
                }
                Geometry::MultiPolygon(polys) => {
                    let rings: Vec<Ring> = polys.iter().flatten().cloned().collect();
                    let mut moved = translate_and_scale(&rings, centroid, scale).into_iter();
                    Geometry::MultiPolygon(
                        polys
                            .iter()
                            .map(|p| moved.by_ref().take(p.len()).collect())
                            .collect(),
                    )
                }
                other => other.clone(),
            };
            Feature {
                id: parcel.id.clone(),
                properties: parcel.properties.clone(),
                geometry: Some(geometry),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSample {
    pub time_ms: i64,
    pub t: f64,
    pub paused: bool,
    pub style: FrameStyle,
}

/// Drives an [`AnimationState`] with a fixed frame interval from time zero
/// and records every frame.
pub fn simulate_timeline(params: AnimationParams, frame_ms: i64, total_ms: i64) -> Vec<TimelineSample> {
    let frame_ms = frame_ms.max(1);
    let mut state = AnimationState::new(params, 0);
    let mut samples = Vec::new();
    let mut now = 0;
    while now <= total_ms {
        state.tick(now);
        samples.push(TimelineSample {
            time_ms: now,
            t: state.t(),
            paused: state.is_paused(),
            style: state.style(),
        });
        now += frame_ms;
    }
    samples
}
