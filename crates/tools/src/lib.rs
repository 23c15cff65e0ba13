//! Batch commands behind the `landgrab` binary.
//!
//! Each command reads its inputs, runs one transform from `compute`, and
//! writes files, tiles, or bucket objects.

pub mod arcgis;
pub mod commands;
pub mod config;
pub mod publish;
pub mod tiles;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;
