//! Configuration loader for the `asv-waterquality` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use crate::clean::DEFAULT_ZSCORE_THRESHOLD;

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

pub const DEFAULT_DATA_FILE: &str = "data/raw.csv";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Where the raw CSV comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// `http://` and `https://` values are fetched; anything else is a path.
    pub fn parse(value: &str) -> Self {
        // ---
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            DataSource::Url(value.to_string())
        } else {
            DataSource::File(PathBuf::from(value))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Raw CSV to ingest at startup and on reload.
    pub data_source: DataSource,

    /// Ingestion-time z-score cutoff.
    pub zscore_threshold: f64,

    /// Upper bound on connecting to and downloading a URL data source.
    pub fetch_timeout: Duration,

    /// PostgreSQL connection string; `None` selects the in-memory store.
    pub db_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// HTTP listen port.
    pub listen_port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `DATA_FILE` – CSV path or `http(s)://` URL (default: `data/raw.csv`)
/// - `ZSCORE_THRESHOLD` – cleaning cutoff, finite and > 0 (default: 3.0)
/// - `FETCH_TIMEOUT_SECS` – URL data source timeout, > 0 (default: 30)
/// - `DATABASE_URL` – PostgreSQL connection string (default: in-memory store)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LISTEN_PORT` – HTTP port (default: 5000)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    load_from(|name| env::var(name).ok())
}

/// Same as [`load_from_env`], reading variables through `lookup`.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let data_source = DataSource::parse(
        &lookup("DATA_FILE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string()),
    );
    let db_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
    let zscore_threshold = parse_env!(lookup, "ZSCORE_THRESHOLD", f64, DEFAULT_ZSCORE_THRESHOLD);
    let fetch_timeout_secs = parse_env!(lookup, "FETCH_TIMEOUT_SECS", u64, DEFAULT_FETCH_TIMEOUT_SECS);
    let db_pool_max = parse_env!(lookup, "DB_POOL_MAX", u32, 5);
    let listen_port = parse_env!(lookup, "LISTEN_PORT", u16, 5000);

    if !zscore_threshold.is_finite() || zscore_threshold <= 0.0 {
        bail!("Invalid ZSCORE_THRESHOLD: must be a positive number, got {zscore_threshold}");
    }

    if fetch_timeout_secs == 0 {
        bail!("Invalid FETCH_TIMEOUT_SECS: must be at least 1");
    }

    Ok(Config {
        data_source,
        zscore_threshold,
        fetch_timeout: Duration::from_secs(fetch_timeout_secs),
        db_url,
        db_pool_max,
        listen_port,
    })
}

/// Hide the password part of a connection string.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let db = self
            .db_url
            .as_deref()
            .map(mask_db_url)
            .unwrap_or_else(|| "(unset, using in-memory store)".to_string());

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATA_FILE        : {}", self.data_source);
        tracing::info!("  ZSCORE_THRESHOLD : {}", self.zscore_threshold);
        tracing::info!("  FETCH_TIMEOUT    : {:?}", self.fetch_timeout);
        tracing::info!("  DATABASE_URL     : {}", db);
        tracing::info!("  DB_POOL_MAX      : {}", self.db_pool_max);
        tracing::info!("  LISTEN_PORT      : {}", self.listen_port);
    }
}
