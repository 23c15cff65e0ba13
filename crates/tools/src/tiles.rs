use std::fmt;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{error, info};

#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum TileFormat {
    Mbtiles,
    Pmtiles,
}

impl TileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TileFormat::Mbtiles => "mbtiles",
            TileFormat::Pmtiles => "pmtiles",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Archive path next to the input, with the format's extension.
pub fn output_path(input: &Path, format: TileFormat) -> PathBuf {
    input.with_extension(format.extension())
}

/// Layer name inside the archive: the input's file stem.
pub fn layer_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "layer".to_string())
}

/// tippecanoe arguments: guessed max zoom, dropping-aware zoom extension,
/// overwrite.
pub fn tippecanoe_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-zg".to_string(),
        "-o".to_string(),
        output.display().to_string(),
        "-l".to_string(),
        layer_name(input),
        "--extend-zooms-if-still-dropping".to_string(),
        "--force".to_string(),
        input.display().to_string(),
    ]
}

async fn run_command(command: &str, args: &[String]) -> Result<(), String> {
    let output = Command::new(command)
        .args(args)
        .output()
        .await
        .map_err(|e| format!("{command} failed to start: {e}"))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(format!("{command} failed: {stderr}"))
}

/// Builds one archive per input and format. Failures are logged and the
/// remaining archives are still attempted; the return value lists the
/// archives that were written.
pub async fn generate_tiles(
    tippecanoe: &str,
    inputs: &[PathBuf],
    formats: &[TileFormat],
) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for input in inputs {
        for &format in formats {
            let output = output_path(input, format);
            info!(input = %input.display(), %format, "generating tiles");
            match run_command(tippecanoe, &tippecanoe_args(input, &output)).await {
                Ok(()) => written.push(output),
                Err(e) => error!(input = %input.display(), %format, "{e}"),
            }
        }
    }
    written
}
