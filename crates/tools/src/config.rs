use std::env;
use std::fmt;
use std::path::PathBuf;

use store::{Credentials, S3Config};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_ENV: &str = "dev";
pub const DEFAULT_SPACES_ENDPOINT: &str = "https://nyc3.digitaloceanspaces.com";
pub const DEFAULT_SPACES_REGION: &str = "nyc3";
pub const DEFAULT_SPACES_BUCKET: &str = "grist";
pub const DEFAULT_SPACES_ROOT: &str = "land-grab-ii";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingVar(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(key) => write!(f, "environment variable {key} is not set"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Deployment settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    /// Deployment stage, the second segment of every object key.
    pub env: String,
    pub spaces_endpoint: String,
    pub spaces_region: String,
    pub spaces_bucket: String,
    /// Top-level key prefix in the bucket.
    pub spaces_root: String,
    pub spaces_path_style: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let env = lookup("LANDGRAB_ENV")
            .or_else(|| lookup("NODE_ENV"))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENV.to_string());

        Self {
            data_dir: PathBuf::from(var("LANDGRAB_DATA_DIR", DEFAULT_DATA_DIR)),
            env,
            spaces_endpoint: var("SPACES_ENDPOINT", DEFAULT_SPACES_ENDPOINT),
            spaces_region: var("SPACES_REGION", DEFAULT_SPACES_REGION),
            spaces_bucket: var("SPACES_BUCKET", DEFAULT_SPACES_BUCKET),
            spaces_root: var("SPACES_ROOT", DEFAULT_SPACES_ROOT),
            spaces_path_style: lookup("SPACES_PATH_STYLE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    /// `<root>/<env>/<prefix>`, the key prefix a publish command writes to.
    pub fn key_prefix(&self, prefix: &str) -> String {
        store::join_key([self.spaces_root.as_str(), self.env.as_str(), prefix])
    }

    pub fn s3_config(&self, credentials: Credentials) -> S3Config {
        let mut config = S3Config::new(
            self.spaces_endpoint.clone(),
            self.spaces_region.clone(),
            self.spaces_bucket.clone(),
            credentials,
        );
        config.path_style = self.spaces_path_style;
        config
    }
}

/// Spaces credentials from `DO_SPACES_KEY` / `DO_SPACES_SECRET`.
pub fn credentials_from_env() -> Result<Credentials, ConfigError> {
    let key = env::var("DO_SPACES_KEY").map_err(|_| ConfigError::MissingVar("DO_SPACES_KEY"))?;
    let secret =
        env::var("DO_SPACES_SECRET").map_err(|_| ConfigError::MissingVar("DO_SPACES_SECRET"))?;
    Ok(Credentials::new(key, secret))
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
