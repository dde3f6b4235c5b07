//! Type-safe configuration loader using the `config` crate,
//! with manual environment-variable overrides for core settings.

use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::{env, path::PathBuf, str::FromStr};

/// Top-level settings loaded from `Config.toml` (optional)
/// and then overridden (where applicable) by environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// SQLite connection URL; the file is created if missing
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Root of the source tree holding the scan files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding staged chunks between skim and populate
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Lines with coherence at or below this are ignored
    #[serde(default)]
    pub threshold: f64,

    /// Records buffered before a chunk is flushed (flush once exceeded)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Extension (without the dot) of files considered during the scan
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Extra verbosity. When unset the user is asked at startup.
    #[serde(default)]
    pub verbose: Option<bool>,
}

fn default_database_url() -> String {
    "sqlite://line_finder.db".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_chunk_size() -> usize {
    50
}

fn default_file_extension() -> String {
    "txt".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: default_database_url(),
            data_dir: default_data_dir(),
            staging_dir: default_staging_dir(),
            threshold: 0.0,
            chunk_size: default_chunk_size(),
            file_extension: default_file_extension(),
            verbose: None,
        }
    }
}

impl Settings {
    /// Load settings from `Config.toml` (if present),
    /// then apply any overrides from these environment variables:
    ///
    /// - `APP__DATABASE_URL`
    /// - `APP__DATA_DIR`
    /// - `APP__STAGING_DIR`
    /// - `APP__THRESHOLD`
    /// - `APP__CHUNK_SIZE`
    /// - `APP__FILE_EXTENSION`
    /// - `APP__VERBOSE`
    pub fn new() -> Result<Self, ConfigError> {
        let mut settings = Self::from_file("Config")?;
        settings.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(settings)
    }

    /// Load settings from the named config file (extension optional); a
    /// missing file yields the defaults.
    pub fn from_file(name: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::with_name(name).required(false))
            .build()?;

        cfg.try_deserialize()
    }

    /// Apply `APP__*` overrides fetched through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("APP__DATABASE_URL") {
            self.database_url = val;
        }
        if let Some(val) = lookup("APP__DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("APP__STAGING_DIR") {
            self.staging_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("APP__THRESHOLD") {
            self.threshold = parse_override("APP__THRESHOLD", &val)?;
        }
        if let Some(val) = lookup("APP__CHUNK_SIZE") {
            self.chunk_size = parse_override("APP__CHUNK_SIZE", &val)?;
        }
        if let Some(val) = lookup("APP__FILE_EXTENSION") {
            self.file_extension = val;
        }
        if let Some(val) = lookup("APP__VERBOSE") {
            self.verbose = Some(parse_override("APP__VERBOSE", &val)?);
        }

        Ok(())
    }
}

fn parse_override<T>(key: &str, val: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    val.trim()
        .parse()
        .map_err(|e| ConfigError::Message(format!("invalid {key}={val:?}: {e}")))
}
