use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use compute::{LinkOptions, LinkSpec};
use formats::PublishManifest;
use store::S3Store;
use tools::arcgis::{self, ArcGisClient, LayerQuery};
use tools::commands::{self, KeyframeOptions};
use tools::config::{Settings, credentials_from_env, env_var_u64};
use tools::publish::{deploy_directory, upload_files, write_manifest};
use tools::tiles::{TileFormat, generate_tiles};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Data pipeline for the land-grab university maps")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LinkKind {
    University,
    Tribe,
}

impl LinkKind {
    fn spec(self) -> LinkSpec {
        match self {
            LinkKind::University => LinkSpec::university(),
            LinkKind::Tribe => LinkSpec::tribe(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite scalar `rights_type` values as one-element lists
    Arrayify {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },

    /// Merge parcels sharing an entity and geometry
    Dedup {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Parcel property naming the owning entity
        #[arg(long, default_value = "university")]
        entity_key: String,
    },

    /// Great-circle links from each parcel to its university or tribe
    Links {
        #[arg(value_enum)]
        kind: LinkKind,
        #[arg(long)]
        parcels: PathBuf,
        /// Universities or tribes, as point (or polygon) features
        #[arg(long)]
        entities: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 100.0)]
        max_segment_km: f64,
    },

    /// Project lon/lat GeoJSON to the Albers USA view
    Project {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Also project final positions and store polygon centroids
        #[arg(long)]
        bake: bool,
    },

    /// Fix ring winding and emit a centroid per parcel
    Rewind {
        #[arg(long)]
        input: PathBuf,
        /// Defaults to the processed data directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Assign land use categories and report acreage per category
    Categorize {
        #[arg(long)]
        input: PathBuf,
        /// JSON list of `{activity, sub-activity}` entries
        #[arg(long)]
        mapping: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        stats: Option<PathBuf>,
    },

    /// Slice historical territories by decade
    Territories {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 1790)]
        from: i32,
        #[arg(long, default_value_t = 1920)]
        to: i32,
        #[arg(long, default_value_t = 10)]
        step: usize,
    },

    /// Bounding box of every entity's parcels
    Bounds {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "present_day_tribe")]
        key: String,
        #[arg(long)]
        output: PathBuf,
    },

    /// Lay parcels out in per-group circles for the collage animation
    Layout {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Sample the parcel animation into GeoJSON frames and a timeline
    Keyframes {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 5)]
        frames: usize,
        #[arg(long, default_value_t = 100)]
        frame_ms: i64,
        #[arg(long, default_value_t = 26_000)]
        timeline_ms: i64,
    },

    /// Split PLSS sections into school sections (16 and 36) and the rest
    Sections {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Download layers from ArcGIS MapServer instances
    Fetch {
        #[command(subcommand)]
        layer: FetchCommand,
    },

    /// Build vector tile archives with tippecanoe
    Tiles {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, value_enum, default_values_t = [TileFormat::Mbtiles, TileFormat::Pmtiles])]
        format: Vec<TileFormat>,
        #[arg(long, default_value = "tippecanoe")]
        tippecanoe: String,
    },

    /// Upload files to `<root>/<env>/<prefix>/<file name>`
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        prefix: String,
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Replace everything under a prefix with a build directory
    Deploy {
        dir: PathBuf,
        #[arg(long)]
        prefix: String,
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum FetchCommand {
    /// PLSS townships of a state
    Townships {
        #[arg(long, default_value = "WA")]
        state: String,
        /// Skip the count request
        #[arg(long)]
        count: Option<u64>,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// PLSS sections of a state
    Sections {
        #[arg(long, default_value = "WA")]
        state: String,
        #[arg(long)]
        count: Option<u64>,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Sections of one township, split into school and other sections
    PlssSections {
        #[arg(long, default_value = "WA330150N0160E0")]
        plss_id: String,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// BIA Land Area Representations, one request per object id
    Lars {
        #[arg(long, default_value_t = 1)]
        first_id: u64,
        #[arg(long, default_value_t = 335)]
        last_id: u64,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Tribal land cessions, written as returned
    Cessions {
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Any layer, paged
    Query {
        #[arg(long)]
        url: String,
        #[arg(long = "where", default_value = "1=1")]
        where_clause: String,
        #[arg(long, default_value = "*")]
        out_fields: String,
        #[arg(long)]
        count: Option<u64>,
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = Settings::from_env();

    match args.command {
        Command::Arrayify { input, output } => commands::arrayify(&input, &output)?,
        Command::Dedup {
            input,
            output,
            entity_key,
        } => commands::dedup(&input, &output, &entity_key)?,
        Command::Links {
            kind,
            parcels,
            entities,
            output,
            max_segment_km,
        } => {
            commands::links(
                &parcels,
                &entities,
                &output,
                &kind.spec(),
                &LinkOptions { max_segment_km },
            )?;
        }
        Command::Project { input, output, bake } => commands::project(&input, &output, bake)?,
        Command::Rewind { input, out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| settings.processed_dir());
            commands::rewind(&input, &out_dir)?
        }
        Command::Categorize {
            input,
            mapping,
            output,
            stats,
        } => {
            commands::categorize(&input, &mapping, &output, stats.as_deref())?;
        }
        Command::Territories {
            input,
            out_dir,
            from,
            to,
            step,
        } => {
            let out_dir = out_dir.unwrap_or_else(|| settings.processed_dir());
            let written = commands::territories(&input, &out_dir, from, to, step)?;
            info!(files = written.len(), "wrote territory slices");
        }
        Command::Bounds { input, key, output } => commands::bounds(&input, &key, &output)?,
        Command::Layout {
            input,
            output,
            seed,
        } => commands::layout(&input, &output, seed)?,
        Command::Keyframes {
            input,
            out_dir,
            frames,
            frame_ms,
            timeline_ms,
        } => {
            let options = KeyframeOptions {
                frames,
                frame_ms,
                timeline_ms,
            };
            let written = commands::keyframes(&input, &out_dir, &options)?;
            info!(files = written.len(), "wrote keyframes");
        }
        Command::Sections { input, out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| settings.processed_dir());
            let (school, other) = commands::partition_sections(&input, &out_dir)?;
            info!(school, other, "partitioned sections");
        }
        Command::Fetch { layer } => fetch(layer, &settings).await?,
        Command::Tiles {
            inputs,
            format,
            tippecanoe,
        } => {
            let written = generate_tiles(&tippecanoe, &inputs, &format).await;
            let expected = inputs.len() * format.len();
            if written.len() < expected {
                warn!(written = written.len(), expected, "some tile archives failed");
            }
        }
        Command::Upload {
            files,
            prefix,
            manifest,
        } => {
            let store = S3Store::connect(settings.s3_config(credentials_from_env()?)).await;
            let prefix = settings.key_prefix(&prefix);
            let mut publish = PublishManifest::new(settings.spaces_bucket.clone(), prefix.clone());

            let report = upload_files(&store, &files, &prefix, &mut publish).await;
            info!(
                uploaded = report.uploaded.len(),
                failed = report.failed.len(),
                "upload finished"
            );
            let path = manifest.unwrap_or_else(|| settings.data_dir.join("publish-manifest.json"));
            write_manifest(&mut publish, &path)?;
        }
        Command::Deploy {
            dir,
            prefix,
            manifest,
        } => {
            let store = S3Store::connect(settings.s3_config(credentials_from_env()?)).await;
            let prefix = settings.key_prefix(&prefix);
            let mut publish = PublishManifest::new(settings.spaces_bucket.clone(), prefix.clone());

            let report = deploy_directory(&store, &dir, &prefix, &mut publish).await?;
            info!(
                deleted = report.deleted,
                uploaded = report.uploaded.len(),
                failed = report.failed.len(),
                "deploy finished"
            );
            let path = manifest.unwrap_or_else(|| settings.data_dir.join("publish-manifest.json"));
            write_manifest(&mut publish, &path)?;
        }
    }

    Ok(())
}

async fn fetch(layer: FetchCommand, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let client = ArcGisClient::default();
    let page_size = env_var_u64("ARCGIS_PAGE_SIZE", arcgis::DEFAULT_PAGE_SIZE);
    let processed = settings.processed_dir();

    match layer {
        FetchCommand::Townships {
            state,
            count,
            output,
        } => {
            let output = output.unwrap_or_else(|| {
                processed.join(format!("{}-townships.geojson", state.to_lowercase()))
            });
            let query = LayerQuery::townships(&state);
            commands::fetch_layer(&client, &query, count, page_size, &output).await?;
        }
        FetchCommand::Sections {
            state,
            count,
            output,
        } => {
            let output = output.unwrap_or_else(|| {
                processed.join(format!("{}-sections.geojson", state.to_lowercase()))
            });
            let query = LayerQuery::sections(&state);
            commands::fetch_layer(&client, &query, count, page_size, &output).await?;
        }
        FetchCommand::PlssSections { plss_id, out_dir } => {
            let out_dir = out_dir.unwrap_or(processed);
            let (school, other) =
                commands::fetch_township_sections(&client, &plss_id, &out_dir).await?;
            info!(%plss_id, school, other, "fetched township sections");
        }
        FetchCommand::Lars {
            first_id,
            last_id,
            output,
        } => {
            let output = output.unwrap_or_else(|| processed.join("lars.geojson"));
            commands::fetch_objects(&client, arcgis::BIA_LARS_URL, first_id..=last_id, &output)
                .await?;
        }
        FetchCommand::Cessions { output } => {
            let output = output.unwrap_or_else(|| processed.join("cessions.geojson"));
            commands::fetch_verbatim(&client, &LayerQuery::cessions(), &output).await?;
        }
        FetchCommand::Query {
            url,
            where_clause,
            out_fields,
            count,
            output,
        } => {
            let query = LayerQuery::new(url, where_clause).with_out_fields(out_fields);
            commands::fetch_layer(&client, &query, count, page_size, &output).await?;
        }
    }
    Ok(())
}
