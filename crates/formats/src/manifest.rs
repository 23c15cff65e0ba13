use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const MANIFEST_VERSION: &str = "1.0";

/// Record of one publish run: which objects were written under which
/// prefix, with the blake3 hash of each body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishManifest {
    pub version: String,
    pub bucket: String,
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub objects: Vec<ObjectEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug)]
pub enum ManifestError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnsupportedVersion { found: String },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io(err) => write!(f, "I/O error: {err}"),
            ManifestError::Parse(err) => write!(f, "Manifest parse error: {err}"),
            ManifestError::UnsupportedVersion { found } => {
                write!(f, "Unsupported manifest version: {found}")
            }
        }
    }
}

impl std::error::Error for ManifestError {}

impl PublishManifest {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            bucket: bucket.into(),
            prefix: prefix.into(),
            content_hash: None,
            objects: Vec::new(),
        }
    }

    pub fn push_object(&mut self, key: impl Into<String>, body: &[u8], content_type: Option<&str>) {
        self.objects.push(ObjectEntry {
            key: key.into(),
            size: body.len() as u64,
            content_hash: content_hash_hex(body),
            content_type: content_type.map(str::to_string),
        });
    }

    /// Hash over the sorted `(key, content_hash)` pairs, so the identity does
    /// not depend on upload order.
    pub fn compute_identity(&self) -> String {
        let mut entries: Vec<_> = self
            .objects
            .iter()
            .map(|o| (o.key.as_str(), o.content_hash.as_str()))
            .collect();
        entries.sort();

        let mut hasher = blake3::Hasher::new();
        hasher.update(self.bucket.as_bytes());
        hasher.update(b"\n");
        for (key, hash) in entries {
            hasher.update(key.as_bytes());
            hasher.update(b"\0");
            hasher.update(hash.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    pub fn compute_and_set_identity(&mut self) {
        self.content_hash = Some(self.compute_identity());
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let payload = fs::read_to_string(path).map_err(ManifestError::Io)?;
        let manifest: PublishManifest =
            serde_json::from_str(&payload).map_err(ManifestError::Parse)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion {
                found: manifest.version,
            });
        }
        Ok(manifest)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ManifestError::Io)?;
        }
        let payload = serde_json::to_string_pretty(self).map_err(ManifestError::Parse)?;
        fs::write(path, payload).map_err(ManifestError::Io)
    }
}

pub fn content_hash_hex(body: &[u8]) -> String {
    blake3::hash(body).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::{MANIFEST_VERSION, ManifestError, PublishManifest};
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(label: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let id = format!("landgrab_manifest_{label}_{}", std::process::id());
        dir.push(id);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn identity_ignores_upload_order() {
        let mut a = PublishManifest::new("grist", "land-grab-ii/dev/data");
        a.push_object("x.geojson", b"{}", Some("application/geo+json"));
        a.push_object("y.pmtiles", b"PMTiles", None);

        let mut b = PublishManifest::new("grist", "land-grab-ii/dev/data");
        b.push_object("y.pmtiles", b"PMTiles", None);
        b.push_object("x.geojson", b"{}", Some("application/geo+json"));

        assert_eq!(a.compute_identity(), b.compute_identity());

        b.objects[0].content_hash = super::content_hash_hex(b"changed");
        assert_ne!(a.compute_identity(), b.compute_identity());
    }

    #[test]
    fn save_and_load() {
        let root = temp_dir("save");
        let mut manifest = PublishManifest::new("grist", "land-grab-ii/dev/data/json");
        manifest.push_object("bounds-by-tribe.json", b"{\"a\":1}", Some("application/json"));
        manifest.compute_and_set_identity();

        let path = root.join("nested").join("publish.json");
        manifest.save(&path).expect("save");
        let loaded = PublishManifest::load(&path).expect("load");
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.objects[0].size, 7);
    }

    #[test]
    fn rejects_unsupported_manifest_version() {
        let root = temp_dir("version");
        let mut manifest = PublishManifest::new("grist", "prefix");
        manifest.version = "2.0".to_string();
        let path = root.join("publish.json");
        fs::write(&path, serde_json::to_string(&manifest).unwrap()).unwrap();

        match PublishManifest::load(&path).expect_err("expect version error") {
            ManifestError::UnsupportedVersion { found } => {
                assert_eq!(found, "2.0");
                assert_ne!(found, MANIFEST_VERSION);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
