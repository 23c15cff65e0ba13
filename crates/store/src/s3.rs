use aws_config::BehaviorVersion;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::primitives::ByteStream;
use s3::types::{Delete, ObjectCannedAcl, ObjectIdentifier};
use tracing::{debug, info, warn};

use crate::{BoxFuture, ObjectStore, StoreError};

/// DeleteObjects accepts at most this many keys per request.
pub const DELETE_BATCH: usize = 1000;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct S3Config {
    /// Service endpoint, e.g. `https://nyc3.digitaloceanspaces.com`.
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    /// Address the bucket as `endpoint/bucket/key` instead of
    /// `bucket.endpoint/key`.
    pub path_style: bool,
    /// Canned ACL sent with every upload.
    pub acl: Option<String>,
    pub credentials: Credentials,
}

impl S3Config {
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            bucket: bucket.into(),
            path_style: false,
            acl: Some("public-read".to_string()),
            credentials,
        }
    }

    pub fn canned_acl(&self) -> Option<ObjectCannedAcl> {
        self.acl.as_deref().map(ObjectCannedAcl::from)
    }
}

/// Splits keys into DeleteObjects payloads of at most [`DELETE_BATCH`].
pub fn delete_batches(keys: &[String]) -> Result<Vec<Delete>, StoreError> {
    keys.chunks(DELETE_BATCH)
        .map(|chunk| {
            let objects = chunk
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| StoreError::with_source("building ObjectIdentifier", e))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StoreError::with_source("building Delete", e))
        })
        .collect()
}

pub struct S3Store {
    config: S3Config,
    inner: s3::Client,
}

impl S3Store {
    /// Builds a client for `config.endpoint` with static credentials.
    pub async fn connect(config: S3Config) -> Self {
        let credentials = s3::config::Credentials::new(
            config.credentials.access_key.clone(),
            config.credentials.secret_key.clone(),
            None,
            None,
            "landgrab",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.clone())
            .credentials_provider(credentials)
            .load()
            .await;
        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(config.path_style)
            .build();

        Self {
            inner: s3::Client::from_conf(s3_config),
            config,
        }
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }
}

impl ObjectStore for S3Store {
    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        let content_type = content_type.map(str::to_string);
        Box::pin(async move {
            let size = body.len();
            self.inner
                .put_object()
                .bucket(&self.config.bucket)
                .key(&key)
                .body(ByteStream::from(body))
                .set_content_type(content_type)
                .set_acl(self.config.canned_acl())
                .send()
                .await
                .map_err(|e| StoreError::with_source(format!("could not put {key}"), e))?;
            info!(bucket = %self.config.bucket, key = %key, size, "uploaded object");
            Ok(())
        })
    }

    fn list(&self, prefix: &str) -> BoxFuture<'_, Result<Vec<String>, StoreError>> {
        let prefix = prefix.to_string();
        Box::pin(async move {
            let mut pages = self
                .inner
                .list_objects_v2()
                .bucket(&self.config.bucket)
                .prefix(&prefix)
                .into_paginator()
                .send();

            let mut keys = Vec::new();
            while let Some(page) = pages.next().await {
                let page = page
                    .map_err(|e| StoreError::with_source(format!("could not list {prefix}"), e))?;
                let before = keys.len();
                keys.extend(
                    page.contents()
                        .iter()
                        .filter_map(|obj| obj.key())
                        .map(String::from),
                );
                debug!(prefix = %prefix, count = keys.len() - before, "listed objects");
            }
            Ok(keys)
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.inner
                .delete_object()
                .bucket(&self.config.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| StoreError::with_source(format!("could not delete {key}"), e))?;
            info!(bucket = %self.config.bucket, key = %key, "deleted object");
            Ok(())
        })
    }

    fn delete_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<usize, StoreError>> {
        Box::pin(async move {
            let keys = self.list(prefix).await?;
            let mut deleted = 0;
            for batch in delete_batches(&keys)? {
                let requested = batch.objects().len();
                let resp = self
                    .inner
                    .delete_objects()
                    .bucket(&self.config.bucket)
                    .delete(batch)
                    .send()
                    .await
                    .map_err(|e| {
                        StoreError::with_source(format!("could not delete under {prefix}"), e)
                    })?;
                for err in resp.errors() {
                    warn!(
                        key = err.key().unwrap_or_default(),
                        message = err.message().unwrap_or_default(),
                        "object was not deleted"
                    );
                }
                deleted += requested.saturating_sub(resp.errors().len());
            }
            info!(bucket = %self.config.bucket, prefix = %prefix, deleted, "deleted objects");
            Ok(deleted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Credentials, DELETE_BATCH, S3Config, S3Store, delete_batches};
    use aws_sdk_s3::types::ObjectCannedAcl;
    use pretty_assertions::assert_eq;

    fn config(path_style: bool) -> S3Config {
        let mut config = S3Config::new(
            "http://localhost:9000",
            "nyc3",
            "grist",
            Credentials::new("key", "secret"),
        );
        config.path_style = path_style;
        config
    }

    #[test]
    fn uploads_are_public_by_default() {
        assert_eq!(config(false).canned_acl(), Some(ObjectCannedAcl::PublicRead));

        let mut private = config(false);
        private.acl = None;
        assert_eq!(private.canned_acl(), None);
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let rendered = format!("{:?}", Credentials::new("AKID", "hunter2"));
        assert!(rendered.contains("AKID"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn deletes_are_batched_by_thousand() {
        let keys: Vec<String> = (0..2500).map(|i| format!("app/_app/{i}.js")).collect();
        let batches = delete_batches(&keys).unwrap();
        let sizes: Vec<usize> = batches.iter().map(|b| b.objects().len()).collect();
        assert_eq!(sizes, vec![DELETE_BATCH, DELETE_BATCH, 500]);
        assert_eq!(batches[2].objects()[0].key(), "app/_app/2000.js");
        assert!(delete_batches(&[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn connect_keeps_settings() {
        let store = S3Store::connect(config(true)).await;
        assert!(store.config().path_style);
        assert_eq!(store.config().bucket, "grist");
    }
}
