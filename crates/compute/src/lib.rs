//! Pure transforms over parcel, entity and territory GeoJSON.
//!
//! Nothing in this crate touches the network or the file system; the
//! `tools` binary does the reading and writing.

pub mod analysis;
pub mod animation;
pub mod category;
pub mod dedup;
pub mod layout;
pub mod links;
pub mod reproject;
pub mod rights;
pub mod sections;
pub mod territories;
pub mod winding;

use std::fmt;

use serde_json::Value;

pub use dedup::deduplicate_parcels;
pub use links::{Entity, LinkOptions, LinkReport, LinkSpec, generate_links};

#[derive(Debug, Clone, PartialEq)]
pub enum ComputeError {
    InvalidInput(String),
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for ComputeError {}

/// Renders a property value for use as a grouping or lookup key: strings
/// as-is, everything else as JSON.
pub fn property_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
