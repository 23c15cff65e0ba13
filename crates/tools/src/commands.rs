//! File-to-file commands. Each reads GeoJSON, applies one transform and
//! writes the result pretty-printed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use compute::analysis::SpatialAnalysis;
use compute::animation::{AnimationParams, interpolate_parcels, simulate_timeline};
use compute::category::{ActivityCategory, LandUseStatistics, categorize_parcels, land_use_statistics};
use compute::layout::{LayoutOptions, layout_parcels};
use compute::reproject::{bake_animation_properties, project_collection};
use compute::rights::arrayify_rights_type;
use compute::sections::partition_school_sections;
use compute::territories::{decade_slices, normalize_territories};
use compute::winding::{centroid_points, rewind_collection};
use compute::{Entity, LinkOptions, LinkReport, LinkSpec, deduplicate_parcels, generate_links};
use formats::FeatureCollection;
use foundation::math::AlbersProjection;
use serde::Serialize;
use tracing::info;

use crate::CliResult;
use crate::arcgis::{ArcGisClient, LayerQuery};

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read(path: &Path) -> CliResult<FeatureCollection> {
    let fc = FeatureCollection::read_path(path)?;
    info!(path = %path.display(), features = fc.len(), "read features");
    Ok(fc)
}

fn write(path: &Path, fc: &FeatureCollection) -> CliResult<()> {
    fc.write_path(path)?;
    info!(path = %path.display(), features = fc.len(), "wrote features");
    Ok(())
}

pub fn arrayify(input: &Path, output: &Path) -> CliResult<()> {
    let fc = read(input)?;
    let out = fc.with_features(arrayify_rights_type(fc.features.clone()));
    write(output, &out)
}

pub fn dedup(input: &Path, output: &Path, entity_key: &str) -> CliResult<()> {
    let fc = read(input)?;
    let out = fc.with_features(deduplicate_parcels(fc.features.clone(), entity_key));
    info!(before = fc.len(), after = out.len(), "deduplicated parcels");
    write(output, &out)
}

/// Deduplicates parcels by entity and geometry, then links each to its
/// entity.
pub fn links(
    parcels: &Path,
    entities: &Path,
    output: &Path,
    spec: &LinkSpec,
    options: &LinkOptions,
) -> CliResult<LinkReport> {
    let entity_fc = read(entities)?;
    let entities = Entity::from_features(&entity_fc.features, &spec.entity_key);

    let parcel_fc = read(parcels)?;
    let deduplicated = deduplicate_parcels(parcel_fc.features, &spec.parcel_key);
    info!(parcels = deduplicated.len(), "parcels after deduplication");

    let report = generate_links(&deduplicated, &entities, spec, options);
    write(output, &FeatureCollection::new(report.links.clone()))?;
    Ok(report)
}

/// Projects to d3's Albers USA view. With `bake`, also precomputes the
/// animation's final positions and centroids.
pub fn project(input: &Path, output: &Path, bake: bool) -> CliResult<()> {
    let fc = read(input)?;
    let projection = AlbersProjection::usa();
    let out = if bake {
        bake_animation_properties(&fc, &projection)
    } else {
        project_collection(&fc, &projection)
    };
    write(output, &out)
}

pub const REWOUND_PARCELS: &str = "parcels-rewound.geojson";
pub const REWOUND_CENTROIDS: &str = "parcel-centroids-rewound.geojson";

pub fn rewind(input: &Path, out_dir: &Path) -> CliResult<()> {
    let fc = read(input)?;
    let rewound = rewind_collection(&fc.features);
    let centroids = centroid_points(&rewound);
    write(&out_dir.join(REWOUND_PARCELS), &FeatureCollection::new(rewound))?;
    write(&out_dir.join(REWOUND_CENTROIDS), &FeatureCollection::new(centroids))
}

pub fn categorize(
    input: &Path,
    mapping: &Path,
    output: &Path,
    stats_output: Option<&Path>,
) -> CliResult<LandUseStatistics> {
    let fc = read(input)?;
    let mapping: Vec<ActivityCategory> = serde_json::from_str(&fs::read_to_string(mapping)?)?;
    let categorized = categorize_parcels(fc.features.clone(), &mapping);
    let stats = land_use_statistics(&categorized);

    info!(total_acres = stats.total_acres, "land use totals");
    for c in &stats.categories {
        info!(
            category = %c.category,
            acres = c.acres,
            percent = c.percent,
            "land use category"
        );
    }

    write(output, &fc.with_features(categorized))?;
    if let Some(path) = stats_output {
        write_json(path, &stats)?;
    }
    Ok(stats)
}

/// Writes `territories-{decade}.geojson` for each decade and returns the
/// paths written.
pub fn territories(
    input: &Path,
    out_dir: &Path,
    from: i32,
    to: i32,
    step: usize,
) -> CliResult<Vec<PathBuf>> {
    let fc = read(input)?;
    let normalized = normalize_territories(&fc.features);
    info!(kept = normalized.len(), "normalized territories");

    let mut written = Vec::new();
    for (decade, members) in decade_slices(&normalized, from, to, step) {
        let path = out_dir.join(format!("territories-{decade}.geojson"));
        write(&path, &FeatureCollection::new(members))?;
        written.push(path);
    }
    Ok(written)
}

/// `{entity: [[minLon, minLat], [maxLon, maxLat]]}` for every entity.
pub fn bounds(input: &Path, key: &str, output: &Path) -> CliResult<()> {
    let fc = read(input)?;
    let bounds: BTreeMap<String, [[f64; 2]; 2]> = SpatialAnalysis::entity_bounds(&fc.features, key)
        .into_iter()
        .map(|(name, b)| (name, [b.min, b.max]))
        .collect();
    info!(entities = bounds.len(), "computed entity bounds");
    write_json(output, &bounds)
}

pub fn layout(input: &Path, output: &Path, seed: u64) -> CliResult<()> {
    let fc = read(input)?;
    let options = LayoutOptions {
        seed,
        ..LayoutOptions::default()
    };
    let laid_out = layout_parcels(fc.features.clone(), &options)?;
    write(output, &fc.with_features(laid_out))
}

pub const SECTIONS: &str = "sections.geojson";
pub const SCHOOL_SECTIONS: &str = "sections-16-36.geojson";
pub const OTHER_SECTIONS: &str = "sections-other.geojson";

pub fn partition_sections(input: &Path, out_dir: &Path) -> CliResult<(usize, usize)> {
    let fc = read(input)?;
    let (school, other) = partition_school_sections(fc.features);
    let counts = (school.len(), other.len());
    write(&out_dir.join(SCHOOL_SECTIONS), &FeatureCollection::new(school))?;
    write(&out_dir.join(OTHER_SECTIONS), &FeatureCollection::new(other))?;
    Ok(counts)
}

/// Fetches every page of a layer into one collection.
pub async fn fetch_layer(
    client: &ArcGisClient,
    query: &LayerQuery,
    count: Option<u64>,
    page_size: u64,
    output: &Path,
) -> CliResult<usize> {
    let fc = client.fetch_paged(query, count, page_size).await?;
    write(output, &fc)?;
    Ok(fc.len())
}

/// Writes one response body as returned by the server.
pub async fn fetch_verbatim(client: &ArcGisClient, query: &LayerQuery, output: &Path) -> CliResult<()> {
    let body = client.query_raw(query).await?;
    write_json(output, &body)?;
    info!(path = %output.display(), "wrote raw layer response");
    Ok(())
}

pub async fn fetch_objects(
    client: &ArcGisClient,
    url: &str,
    ids: impl IntoIterator<Item = u64>,
    output: &Path,
) -> CliResult<usize> {
    let fc = client.fetch_object_ids(url, ids).await;
    write(output, &fc)?;
    Ok(fc.len())
}

/// Fetches the sections of one township into `sections.geojson` and splits
/// it into school and other sections alongside.
pub async fn fetch_township_sections(
    client: &ArcGisClient,
    plss_id: &str,
    out_dir: &Path,
) -> CliResult<(usize, usize)> {
    let fc = client.query_page(&LayerQuery::township_sections(plss_id), None).await?;
    let path = out_dir.join(SECTIONS);
    write(&path, &fc)?;
    partition_sections(&path, out_dir)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeOptions {
    pub frames: usize,
    pub frame_ms: i64,
    pub timeline_ms: i64,
}

impl Default for KeyframeOptions {
    fn default() -> Self {
        Self {
            frames: 5,
            frame_ms: 100,
            timeline_ms: 26_000,
        }
    }
}

/// Projects the parcels, samples the animation at evenly spaced `t` into
/// `frame-NNN.geojson`, and writes a simulated `timeline.json`.
pub fn keyframes(input: &Path, out_dir: &Path, options: &KeyframeOptions) -> CliResult<Vec<PathBuf>> {
    let fc = read(input)?;
    let projection = AlbersProjection::usa();
    let projected = project_collection(&fc, &projection);
    let params = AnimationParams::default();

    let mut written = Vec::new();
    let frames = options.frames.max(2);
    for i in 0..frames {
        let t = i as f64 / (frames - 1) as f64;
        let features = interpolate_parcels(&projected.features, t, &params, &projection);
        let path = out_dir.join(format!("frame-{i:03}.geojson"));
        write(&path, &projected.with_features(features))?;
        written.push(path);
    }

    let timeline_path = out_dir.join("timeline.json");
    write_json(
        &timeline_path,
        &simulate_timeline(params, options.frame_ms, options.timeline_ms),
    )?;
    written.push(timeline_path);
    Ok(written)
}
