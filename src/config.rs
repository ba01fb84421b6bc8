// src/config.rs

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

/// Number of questions requested when a final exam is started.
pub const EXAM_QUESTION_COUNT: u32 = 30;

/// Number of past sessions shown by default in the history list.
pub const HISTORY_LIMIT: u32 = 10;

/// Score needed for a certificate. Owned by the server; shown to the user only.
pub const PASSING_SCORE_PERCENTAGE: f64 = 75.0;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub exam_question_count: u32,
    pub history_limit: u32,
    pub certificate_dir: PathBuf,
    pub access_token: Option<String>,
    pub rust_log: String,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_url = get("API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_base_url = parse_base_url(&raw_url)?;

        let request_timeout = Duration::from_secs(parse_positive(
            "REQUEST_TIMEOUT_SECS",
            get("REQUEST_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?);

        let exam_question_count = parse_positive(
            "EXAM_QUESTION_COUNT",
            get("EXAM_QUESTION_COUNT"),
            EXAM_QUESTION_COUNT,
        )?;

        let history_limit = parse_positive("HISTORY_LIMIT", get("HISTORY_LIMIT"), HISTORY_LIMIT)?;

        let certificate_dir = get("CERTIFICATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("certificates"));

        let rust_log = get("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let log_dir = get("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("logs"));

        Ok(Self {
            api_base_url,
            request_timeout,
            exam_question_count,
            history_limit,
            certificate_dir,
            access_token: get("ACCESS_TOKEN"),
            rust_log,
            log_dir,
        })
    }

    /// Configuration pointing at `base_url` with every other value at its default.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = base_url.to_string();
        Self::from_lookup(move |key| (key == "API_BASE_URL").then(|| base_url.clone()))
    }
}

/// Parses the base URL and guarantees a trailing slash so that relative joins
/// keep any path prefix (e.g. `https://host/api/`).
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }

    let url = Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl {
        name: "API_BASE_URL",
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            name: "API_BASE_URL",
            reason: format!("unsupported base '{}'", raw),
        });
    }

    Ok(url)
}

/// Values that overflow `T` are rejected like any other bad number.
fn parse_positive<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };

    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
