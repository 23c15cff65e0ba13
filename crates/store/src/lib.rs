//! Object storage for published artifacts.
//!
//! [`ObjectStore`] is the seam between the publishing commands and the
//! bucket. [`S3Store`] talks to any S3-compatible service (DigitalOcean
//! Spaces in production); [`InMemoryStore`] backs tests.

pub mod memory;
pub mod s3;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tracing::warn;

pub use memory::InMemoryStore;
pub use s3::{Credentials, S3Config, S3Store};

/// Error type for object store operations.
#[derive(Debug)]
pub struct StoreError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A flat key/value bucket.
///
/// Methods return boxed futures so stores can be used as trait objects.
pub trait ObjectStore: Send + Sync {
    /// Writes `body` under `key`, replacing any existing object.
    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Every key starting with `prefix`, in lexicographic order.
    fn list(&self, prefix: &str) -> BoxFuture<'_, Result<Vec<String>, StoreError>>;

    /// Removes `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Removes every object under `prefix` and returns how many there were.
    fn delete_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<usize, StoreError>> {
        Box::pin(async move {
            let keys = self.list(prefix).await?;
            for key in &keys {
                self.delete(key).await?;
            }
            Ok(keys.len())
        })
    }
}

/// Content-Type for an uploaded file, from its extension. Unknown
/// extensions are logged and sent without one.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let content_type = match ext.as_deref() {
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("geojson") => "application/geo+json",
        Some("html") => "text/html",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("pmtiles") | Some("mbtiles") => "application/octet-stream",
        _ => {
            warn!(path = %path.display(), "no content type for file extension");
            return None;
        }
    };
    Some(content_type)
}

/// Joins key segments with `/`, dropping empty segments and stray slashes.
pub fn join_key<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::{InMemoryStore, ObjectStore, content_type_for, join_key};
    use std::path::Path;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("_app/start.js")), Some("text/javascript"));
        assert_eq!(content_type_for(Path::new("style.CSS")), Some("text/css"));
        assert_eq!(content_type_for(Path::new("bounds-by-tribe.json")), Some("application/json"));
        assert_eq!(
            content_type_for(Path::new("parcels.pmtiles")),
            Some("application/octet-stream")
        );
        assert_eq!(content_type_for(Path::new("README")), None);
        assert_eq!(content_type_for(Path::new("font.woff2")), None);
    }

    #[test]
    fn join_key_normalizes_slashes() {
        assert_eq!(
            join_key(["land-grab-ii/", "dev", "", "/data/geojson/", "us.geojson"]),
            "land-grab-ii/dev/data/geojson/us.geojson"
        );
    }

    #[tokio::test]
    async fn delete_prefix_removes_only_matching_keys() {
        let store = InMemoryStore::new();
        for key in ["app/_app/a.js", "app/_app/b.css", "app/index.html", "data/x.json"] {
            store.put(key, b"x".to_vec(), None).await.unwrap();
        }
        let removed = store.delete_prefix("app/_app/").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            store.list("").await.unwrap(),
            vec!["app/index.html".to_string(), "data/x.json".to_string()]
        );
    }
}
