//! Queries against ArcGIS REST `MapServer/.../query` endpoints.
//!
//! Large layers are fetched as concurrent pages (`resultOffset`). A page or
//! object that fails is logged and left out; the rest of the fetch carries
//! on.

use std::fmt;

use formats::{Feature, FeatureCollection, GeoJsonError};
use futures_util::future::join_all;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

pub const PLSS_TOWNSHIPS_URL: &str =
    "https://gis.blm.gov/arcgis/rest/services/Cadastral/BLM_Natl_PLSS_CadNSDI/MapServer/1/query";
pub const PLSS_SECTIONS_URL: &str =
    "https://gis.blm.gov/arcgis/rest/services/Cadastral/BLM_Natl_PLSS_CadNSDI/MapServer/2/query";
pub const BIA_LARS_URL: &str =
    "https://biamaps.geoplatform.gov/server/rest/services/DivLTR/BIA_AIAN_National_LAR/MapServer/0/query";
pub const TRIBAL_CESSIONS_URL: &str =
    "https://apps.fs.usda.gov/arcx/rest/services/EDW/EDW_TribalCessionLands_01/MapServer/0/query";

/// Most ArcGIS servers cap a query at 1000 records.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Status { url: String, status: u16 },
    GeoJson(GeoJsonError),
    MissingCount(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(e) => write!(f, "request failed: {e}"),
            FetchError::Status { url, status } => write!(f, "{url} returned HTTP {status}"),
            FetchError::GeoJson(e) => write!(f, "bad GeoJSON response: {e}"),
            FetchError::MissingCount(url) => write!(f, "{url} did not return a count"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(e) => Some(e),
            FetchError::GeoJson(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(e)
    }
}

impl From<GeoJsonError> for FetchError {
    fn from(e: GeoJsonError) -> Self {
        FetchError::GeoJson(e)
    }
}

/// `where` clause and field list for a layer query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerQuery {
    pub url: String,
    pub where_clause: String,
    pub out_fields: String,
}

impl LayerQuery {
    pub fn new(url: impl Into<String>, where_clause: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            where_clause: where_clause.into(),
            out_fields: "*".to_string(),
        }
    }

    pub fn with_out_fields(mut self, out_fields: impl Into<String>) -> Self {
        self.out_fields = out_fields.into();
        self
    }

    /// PLSS townships for a state, e.g. `WA`.
    pub fn townships(state: &str) -> Self {
        Self::new(PLSS_TOWNSHIPS_URL, format!("STATEABBR='{state}'"))
    }

    /// PLSS sections for a state.
    pub fn sections(state: &str) -> Self {
        Self::new(PLSS_SECTIONS_URL, format!("PLSSID LIKE '{state}%'"))
    }

    /// The sections of one township, with only their section numbers.
    pub fn township_sections(plss_id: &str) -> Self {
        Self::new(PLSS_SECTIONS_URL, format!("PLSSID='{plss_id}'")).with_out_fields("FRSTDIVNO")
    }

    pub fn cessions() -> Self {
        Self::new(TRIBAL_CESSIONS_URL, "TRUE=TRUE")
    }

    pub fn params(&self, offset: Option<u64>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("where", self.where_clause.clone()),
            ("outFields", self.out_fields.clone()),
        ];
        if let Some(offset) = offset {
            params.push(("resultOffset", offset.to_string()));
        }
        params.push(("f", "geojson".to_string()));
        params
    }
}

/// `resultOffset` of every page needed to cover `count` records.
pub fn page_offsets(count: u64, page_size: u64) -> Vec<u64> {
    let page_size = page_size.max(1);
    let pages = count.div_ceil(page_size);
    (0..pages).map(|i| i * page_size).collect()
}

pub struct ArcGisClient {
    client: Client,
}

impl Default for ArcGisClient {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl ArcGisClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Value, FetchError> {
        let resp = self.client.get(url).query(params).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }

    /// Number of records matching the query (`returnCountOnly=true`).
    pub async fn count(&self, query: &LayerQuery) -> Result<u64, FetchError> {
        let params = [
            ("where", query.where_clause.clone()),
            ("returnCountOnly", "true".to_string()),
            ("f", "json".to_string()),
        ];
        let v = self.get_json(&query.url, &params).await?;
        v.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| FetchError::MissingCount(query.url.clone()))
    }

    /// The raw response of a single query, unparsed.
    pub async fn query_raw(&self, query: &LayerQuery) -> Result<Value, FetchError> {
        self.get_json(&query.url, &query.params(None)).await
    }

    pub async fn query_page(
        &self,
        query: &LayerQuery,
        offset: Option<u64>,
    ) -> Result<FeatureCollection, FetchError> {
        let v = self.get_json(&query.url, &query.params(offset)).await?;
        Ok(FeatureCollection::from_geojson_value(&v)?)
    }

    /// Fetches every page concurrently and concatenates them in offset order.
    /// When `count` is `None` it is asked of the server first.
    pub async fn fetch_paged(
        &self,
        query: &LayerQuery,
        count: Option<u64>,
        page_size: u64,
    ) -> Result<FeatureCollection, FetchError> {
        let count = match count {
            Some(count) => count,
            None => self.count(query).await?,
        };
        let offsets = page_offsets(count, page_size);
        info!(url = %query.url, count, pages = offsets.len(), "fetching layer pages");

        let pages = join_all(
            offsets
                .iter()
                .map(|&offset| async move { (offset, self.query_page(query, Some(offset)).await) }),
        )
        .await;

        let mut features = Vec::new();
        for (offset, page) in pages {
            match page {
                Ok(fc) => features.extend(fc.features),
                Err(e) => warn!(offset, error = %e, "failed to fetch page, skipping"),
            }
        }
        info!(fetched = features.len(), "fetched layer");
        Ok(FeatureCollection::new(features))
    }

    /// One request per object id; the first feature of each response is
    /// kept.
    pub async fn fetch_object_ids(
        &self,
        url: &str,
        ids: impl IntoIterator<Item = u64>,
    ) -> FeatureCollection {
        let ids: Vec<u64> = ids.into_iter().collect();
        let results = join_all(ids.iter().map(|&oid| async move {
            let params = [
                ("objectIds", oid.to_string()),
                ("outFields", "*".to_string()),
                ("f", "geojson".to_string()),
            ];
            let fetched = match self.get_json(url, &params).await {
                Ok(v) => FeatureCollection::from_geojson_value(&v).map_err(FetchError::from),
                Err(e) => Err(e),
            };
            (oid, fetched)
        }))
        .await;

        let features: Vec<Feature> = results
            .into_iter()
            .filter_map(|(oid, fetched)| match fetched {
                Ok(fc) => {
                    let first = fc.features.into_iter().next();
                    if first.is_none() {
                        warn!(oid, "object not found");
                    }
                    first
                }
                Err(e) => {
                    warn!(oid, error = %e, "failed to fetch object, skipping");
                    None
                }
            })
            .collect();
        info!(requested = ids.len(), fetched = features.len(), "fetched objects");
        FeatureCollection::new(features)
    }
}
