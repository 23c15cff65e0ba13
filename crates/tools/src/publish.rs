//! Upload and deploy: files on disk to keys in an [`ObjectStore`], with a
//! manifest of what went up.

use std::path::{Path, PathBuf};

use formats::PublishManifest;
use store::{ObjectStore, content_type_for, join_key};
use tracing::{error, info, warn};

use crate::CliResult;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub uploaded: Vec<String>,
    pub failed: Vec<PathBuf>,
    pub deleted: usize,
}

/// Every regular file under `dir`, sorted by path.
pub async fn collect_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Object key for `file`: its path relative to `base`, `/`-separated, under
/// `prefix`.
pub fn key_for(prefix: &str, base: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(base).unwrap_or(file);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    join_key(std::iter::once(prefix).chain(parts.iter().map(String::as_str)))
}

async fn upload_one(
    store: &dyn ObjectStore,
    file: &Path,
    key: String,
    manifest: &mut PublishManifest,
    report: &mut PublishReport,
) {
    let body = match tokio::fs::read(file).await {
        Ok(body) => body,
        Err(e) => {
            error!(file = %file.display(), error = %e, "failed to read file for upload");
            report.failed.push(file.to_path_buf());
            return;
        }
    };
    let content_type = content_type_for(file);
    match store.put(&key, body.clone(), content_type).await {
        Ok(()) => {
            info!(key = %key, "uploaded");
            manifest.push_object(key.clone(), &body, content_type);
            report.uploaded.push(key);
        }
        Err(e) => {
            error!(key = %key, error = %e, "upload failed");
            report.failed.push(file.to_path_buf());
        }
    }
}

/// Uploads each file to `<prefix>/<file name>`. A failed upload is logged
/// and the rest continue.
pub async fn upload_files(
    store: &dyn ObjectStore,
    files: &[PathBuf],
    prefix: &str,
    manifest: &mut PublishManifest,
) -> PublishReport {
    let mut report = PublishReport::default();
    for file in files {
        let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            warn!(file = %file.display(), "not a file path, skipping");
            report.failed.push(file.clone());
            continue;
        };
        let key = join_key([prefix, name.as_str()]);
        upload_one(store, file, key, manifest, &mut report).await;
    }
    report
}

/// Replaces everything under `prefix` with the contents of `dir`. Stale
/// objects are deleted first; a failed delete is logged and the upload
/// still runs.
pub async fn deploy_directory(
    store: &dyn ObjectStore,
    dir: &Path,
    prefix: &str,
    manifest: &mut PublishManifest,
) -> CliResult<PublishReport> {
    let mut report = PublishReport::default();

    let list_prefix = match prefix.trim_end_matches('/') {
        "" => String::new(),
        trimmed => format!("{trimmed}/"),
    };
    match store.delete_prefix(&list_prefix).await {
        Ok(0) => info!(prefix = %prefix, "nothing to delete"),
        Ok(n) => {
            info!(prefix = %prefix, deleted = n, "deleted previous deploy");
            report.deleted = n;
        }
        Err(e) => error!(prefix = %prefix, error = %e, "failed to delete previous deploy"),
    }

    let files = collect_files(dir).await?;
    info!(dir = %dir.display(), files = files.len(), "uploading build artifacts");
    for file in &files {
        let key = key_for(prefix, dir, file);
        upload_one(store, file, key, manifest, &mut report).await;
    }
    Ok(report)
}

/// Seals the manifest and writes it to `path`.
pub fn write_manifest(manifest: &mut PublishManifest, path: &Path) -> CliResult<()> {
    manifest.compute_and_set_identity();
    manifest.save(path)?;
    info!(path = %path.display(), objects = manifest.objects.len(), "wrote publish manifest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{collect_files, deploy_directory, key_for, upload_files, write_manifest};
    use formats::PublishManifest;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use store::{InMemoryStore, ObjectStore};

    #[test]
    fn keys_use_forward_slashes() {
        let base = Path::new("build/_app");
        let file = base.join("immutable").join("chunks").join("a.js");
        assert_eq!(
            key_for("land-grab-ii/dev/interactive-map/_app", base, &file),
            "land-grab-ii/dev/interactive-map/_app/immutable/chunks/a.js"
        );
    }

    #[tokio::test]
    async fn upload_records_every_object() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("university-parcel-links.geojson");
        let b = dir.path().join("bounds-by-tribe.json");
        fs::write(&a, b"{}").unwrap();
        fs::write(&b, b"[]").unwrap();
        let missing = dir.path().join("missing.json");

        let store = InMemoryStore::new();
        let mut manifest = PublishManifest::new("grist", "land-grab-ii/dev/data/geojson");
        let report = upload_files(
            &store,
            &[a, b, missing.clone()],
            "land-grab-ii/dev/data/geojson",
            &mut manifest,
        )
        .await;

        assert_eq!(report.uploaded.len(), 2);
        assert_eq!(report.failed, vec![missing]);
        let stored = store
            .get("land-grab-ii/dev/data/geojson/bounds-by-tribe.json")
            .await
            .unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("application/json"));
        assert_eq!(manifest.objects.len(), 2);

        let manifest_path = dir.path().join("manifest.json");
        write_manifest(&mut manifest, &manifest_path).unwrap();
        let loaded = PublishManifest::load(&manifest_path).unwrap();
        assert!(loaded.content_hash.is_some());
        assert_eq!(loaded.objects, manifest.objects);
    }

    #[tokio::test]
    async fn deploy_replaces_previous_objects() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("immutable")).unwrap();
        fs::write(dir.path().join("version.json"), b"{}").unwrap();
        fs::write(dir.path().join("immutable").join("start.js"), b"export {}").unwrap();

        let files = collect_files(dir.path()).await.unwrap();
        assert_eq!(files.len(), 2);

        let store = InMemoryStore::new();
        let prefix = "land-grab-ii/dev/interactive-map/_app";
        store
            .put(&format!("{prefix}/stale.js"), b"old".to_vec(), None)
            .await
            .unwrap();
        store
            .put("land-grab-ii/dev/interactive-map/_application/keep.js", b"x".to_vec(), None)
            .await
            .unwrap();

        let mut manifest = PublishManifest::new("grist", prefix);
        let report = deploy_directory(&store, dir.path(), prefix, &mut manifest)
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(
            store.list("land-grab-ii/dev/interactive-map/").await.unwrap(),
            vec![
                "land-grab-ii/dev/interactive-map/_app/immutable/start.js".to_string(),
                "land-grab-ii/dev/interactive-map/_app/version.json".to_string(),
                "land-grab-ii/dev/interactive-map/_application/keep.js".to_string(),
            ]
        );
        let start = store
            .get("land-grab-ii/dev/interactive-map/_app/immutable/start.js")
            .await
            .unwrap();
        assert_eq!(start.content_type.as_deref(), Some("text/javascript"));
    }

    #[tokio::test]
    async fn deploy_to_bucket_root_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();

        let store = InMemoryStore::new();
        store.put("old/stale.js", b"old".to_vec(), None).await.unwrap();
        store.put("favicon.png", b"old".to_vec(), None).await.unwrap();

        let mut manifest = PublishManifest::new("grist", "");
        let report = deploy_directory(&store, dir.path(), "", &mut manifest)
            .await
            .unwrap();

        assert_eq!(report.deleted, 2);
        assert_eq!(store.list("").await.unwrap(), vec!["index.html".to_string()]);
    }
}
