use facecheck_core::{
    is_valid_score, Comparator, CompareError, MatchPolicy, PerceptualComparator, RemoteConfig,
    RemoteFaceComparator,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("FACECHECK_BACKEND=remote requires FACECHECK_REMOTE_URL")]
    MissingRemoteUrl,
    #[error("comparator setup failed: {0}")]
    Comparator(#[from] CompareError),
}

/// Which comparator answers each leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Remote face-comparison API.
    Remote,
    /// Local perceptual hash equality.
    Phash,
}

impl std::str::FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" | "api" => Ok(Backend::Remote),
            "phash" | "hash" => Ok(Backend::Phash),
            _ => Err(()),
        }
    }
}

/// Service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (default: 0.0.0.0:3000).
    pub bind_addr: SocketAddr,
    pub backend: Backend,
    /// Per-leg acceptance threshold; unset accepts any reported match.
    pub min_similarity: Option<f32>,
    /// Hamming distance tolerated by the hash backend (0 = equal hashes).
    pub phash_max_distance: u32,
    pub remote_url: Option<String>,
    pub remote_api_key: Option<String>,
    /// Threshold forwarded to the remote API.
    pub remote_threshold: f32,
    pub remote_timeout_secs: u64,
    /// Whole-request timeout.
    pub request_timeout_secs: u64,
    /// Maximum multipart body size in megabytes.
    pub max_upload_mb: usize,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            backend: Backend::Phash,
            min_similarity: None,
            phash_max_distance: 0,
            remote_url: None,
            remote_api_key: None,
            remote_threshold: 80.0,
            remote_timeout_secs: 30,
            request_timeout_secs: 60,
            max_upload_mb: 10,
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from `FACECHECK_*` environment variables with
    /// defaults. A `.env` file in the working directory is read first.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("FACECHECK_BACKEND") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "FACECHECK_BACKEND",
                value: v,
            })?,
            None => defaults.backend,
        };

        let config = Self {
            bind_addr: parse_or("FACECHECK_BIND", get("FACECHECK_BIND"), defaults.bind_addr)?,
            backend,
            min_similarity: get("FACECHECK_MIN_SIMILARITY")
                .map(|v| parse_similarity("FACECHECK_MIN_SIMILARITY", v))
                .transpose()?,
            phash_max_distance: parse_or(
                "FACECHECK_PHASH_MAX_DISTANCE",
                get("FACECHECK_PHASH_MAX_DISTANCE"),
                defaults.phash_max_distance,
            )?,
            remote_url: get("FACECHECK_REMOTE_URL"),
            remote_api_key: get("FACECHECK_REMOTE_API_KEY"),
            remote_threshold: get("FACECHECK_REMOTE_THRESHOLD")
                .map(|v| parse_similarity("FACECHECK_REMOTE_THRESHOLD", v))
                .transpose()?
                .unwrap_or(defaults.remote_threshold),
            remote_timeout_secs: parse_or(
                "FACECHECK_REMOTE_TIMEOUT_SECS",
                get("FACECHECK_REMOTE_TIMEOUT_SECS"),
                defaults.remote_timeout_secs,
            )?,
            request_timeout_secs: parse_or(
                "FACECHECK_REQUEST_TIMEOUT_SECS",
                get("FACECHECK_REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout_secs,
            )?,
            max_upload_mb: get("FACECHECK_MAX_UPLOAD_MB")
                .map(|v| parse_upload_mb("FACECHECK_MAX_UPLOAD_MB", v))
                .transpose()?
                .unwrap_or(defaults.max_upload_mb),
            log_json: get("FACECHECK_LOG_JSON")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(false),
        };

        if config.backend == Backend::Remote && config.remote_url.is_none() {
            return Err(ConfigError::MissingRemoteUrl);
        }
        Ok(config)
    }

    pub fn policy(&self) -> MatchPolicy {
        MatchPolicy {
            min_similarity: self.min_similarity,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Construct the configured comparator. Called once at startup.
    pub fn build_comparator(&self) -> Result<Arc<dyn Comparator>, ConfigError> {
        match self.backend {
            Backend::Phash => Ok(Arc::new(PerceptualComparator::new(self.phash_max_distance))),
            Backend::Remote => {
                let endpoint = self.remote_url.clone().ok_or(ConfigError::MissingRemoteUrl)?;
                let remote = RemoteConfig {
                    endpoint,
                    api_key: self.remote_api_key.clone(),
                    similarity_threshold: self.remote_threshold,
                    timeout: Duration::from_secs(self.remote_timeout_secs),
                };
                Ok(Arc::new(RemoteFaceComparator::new(remote)?))
            }
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

/// Similarities live on the 0-100 scale; NaN and infinities are rejected.
fn parse_similarity(key: &'static str, value: String) -> Result<f32, ConfigError> {
    let parsed: f32 = parse(key, value.clone())?;
    if !is_valid_score(parsed) {
        return Err(ConfigError::InvalidValue { key, value });
    }
    Ok(parsed)
}

/// Upload limits must be non-zero and fit in a byte count.
fn parse_upload_mb(key: &'static str, value: String) -> Result<usize, ConfigError> {
    let parsed: usize = parse(key, value.clone())?;
    match parsed.checked_mul(BYTES_PER_MB) {
        Some(bytes) if bytes > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => parse(key, v),
        None => Ok(default),
    }
}
