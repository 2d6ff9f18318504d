//! Configuration management.
//!
//! Values come from defaults, then an optional TOML file, then `SQLQUAD_*`
//! environment variables.

use crate::storage::cache::DEFAULT_CACHE_CAPACITY;
use crate::storage::sqlite::DEFAULT_BUSY_TIMEOUT_MS;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest accepted batch size.
///
/// A vertex batch binds six parameters per term and four terms per quad, so
/// this keeps a batch under `SQLite`'s bound variable limit.
pub const MAX_BATCH_SIZE: usize = 1024;

/// Default batch sizes.
pub const DEFAULT_IMPORT_BATCH_SIZE: usize = 20;
/// Default delete batch size.
pub const DEFAULT_DELETE_BATCH_SIZE: usize = 20;
/// Default vacuum batch size.
pub const DEFAULT_VACUUM_BATCH_SIZE: usize = 10;
/// Default number of rows fetched per stream page.
pub const DEFAULT_STREAM_PAGE_SIZE: usize = 500;
/// Above this many edges, estimated counts are sampled.
pub const DEFAULT_ESTIMATE_THRESHOLD: u64 = 1_000_000;

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path to the database file.
    pub db_path: PathBuf,
    /// Quads per import batch.
    pub import_batch_size: usize,
    /// Ids or quads per delete batch.
    pub delete_batch_size: usize,
    /// Vertex ids per vacuum batch.
    pub vacuum_batch_size: usize,
    /// Maximum entries in an importer's identity cache.
    pub cache_capacity: usize,
    /// Rows fetched per page when streaming matches.
    pub stream_page_size: usize,
    /// Edge count above which `count_estimate` samples.
    pub estimate_threshold: u64,
    /// How long a writer waits on a locked database.
    pub busy_timeout_ms: u32,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Logging section, applied by [`crate::observability::init_logging`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive, e.g. `info` or `sqlquad=debug`.
    pub level: Option<String>,
    /// Write logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Database path.
    pub db_path: Option<String>,
    /// Import batch size.
    pub import_batch_size: Option<usize>,
    /// Delete batch size.
    pub delete_batch_size: Option<usize>,
    /// Vacuum batch size.
    pub vacuum_batch_size: Option<usize>,
    /// Cache capacity.
    pub cache_capacity: Option<usize>,
    /// Stream page size.
    pub stream_page_size: Option<usize>,
    /// Estimate threshold.
    pub estimate_threshold: Option<u64>,
    /// Busy timeout.
    pub busy_timeout_ms: Option<u32>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("sqlquad.db"),
            import_batch_size: DEFAULT_IMPORT_BATCH_SIZE,
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
            vacuum_batch_size: DEFAULT_VACUUM_BATCH_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            stream_page_size: DEFAULT_STREAM_PAGE_SIZE,
            estimate_threshold: DEFAULT_ESTIMATE_THRESHOLD,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            logging: LoggingSettings::default(),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("config file: {e}")))?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<platform config dir>/sqlquad/config.toml`, then
    /// `~/.config/sqlquad/config.toml`. Returns defaults if neither exists.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("sqlquad").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("sqlquad")
                .join("config.toml"),
        ];
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        Self::default()
    }

    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(db_path) = file.db_path {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(v) = file.import_batch_size {
            config.import_batch_size = v;
        }
        if let Some(v) = file.delete_batch_size {
            config.delete_batch_size = v;
        }
        if let Some(v) = file.vacuum_batch_size {
            config.vacuum_batch_size = v;
        }
        if let Some(v) = file.cache_capacity {
            config.cache_capacity = v;
        }
        if let Some(v) = file.stream_page_size {
            config.stream_page_size = v;
        }
        if let Some(v) = file.estimate_threshold {
            config.estimate_threshold = v;
        }
        if let Some(v) = file.busy_timeout_ms {
            config.busy_timeout_ms = v;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Applies `SQLQUAD_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a numeric variable does not parse.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a numeric variable does not parse.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup("SQLQUAD_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        if let Some(v) = parse_var(&lookup, "SQLQUAD_IMPORT_BATCH_SIZE")? {
            self.import_batch_size = v;
        }
        if let Some(v) = parse_var(&lookup, "SQLQUAD_DELETE_BATCH_SIZE")? {
            self.delete_batch_size = v;
        }
        if let Some(v) = parse_var(&lookup, "SQLQUAD_VACUUM_BATCH_SIZE")? {
            self.vacuum_batch_size = v;
        }
        if let Some(v) = parse_var(&lookup, "SQLQUAD_CACHE_CAPACITY")? {
            self.cache_capacity = v;
        }
        if let Some(v) = parse_var(&lookup, "SQLQUAD_STREAM_PAGE_SIZE")? {
            self.stream_page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "SQLQUAD_ESTIMATE_THRESHOLD")? {
            self.estimate_threshold = v;
        }
        if let Some(format) = lookup("SQLQUAD_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(level) = lookup("SQLQUAD_LOG_LEVEL") {
            self.logging.level = Some(level);
        }

        Ok(self)
    }

    /// Checks that every size is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("import_batch_size", self.import_batch_size),
            ("delete_batch_size", self.delete_batch_size),
            ("vacuum_batch_size", self.vacuum_batch_size),
        ] {
            validate_batch_size(name, value)?;
        }
        if self.cache_capacity == 0 {
            return Err(Error::InvalidInput("cache_capacity must be at least 1".to_string()));
        }
        if self.stream_page_size == 0 {
            return Err(Error::InvalidInput(
                "stream_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Sets the import batch size.
    #[must_use]
    pub const fn with_import_batch_size(mut self, size: usize) -> Self {
        self.import_batch_size = size;
        self
    }

    /// Sets the delete batch size.
    #[must_use]
    pub const fn with_delete_batch_size(mut self, size: usize) -> Self {
        self.delete_batch_size = size;
        self
    }

    /// Sets the vacuum batch size.
    #[must_use]
    pub const fn with_vacuum_batch_size(mut self, size: usize) -> Self {
        self.vacuum_batch_size = size;
        self
    }

    /// Sets the identity cache capacity.
    #[must_use]
    pub const fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets the stream page size.
    #[must_use]
    pub const fn with_stream_page_size(mut self, size: usize) -> Self {
        self.stream_page_size = size;
        self
    }

    /// Sets the estimate threshold.
    #[must_use]
    pub const fn with_estimate_threshold(mut self, threshold: u64) -> Self {
        self.estimate_threshold = threshold;
        self
    }
}

/// Rejects a batch size of zero or above [`MAX_BATCH_SIZE`].
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] naming `name`.
pub fn validate_batch_size(name: &str, value: usize) -> Result<()> {
    if value == 0 || value > MAX_BATCH_SIZE {
        return Err(Error::InvalidInput(format!(
            "{name} must be between 1 and {MAX_BATCH_SIZE}, got {value}"
        )));
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::InvalidInput(format!("{key}={raw}: {e}")))
        })
        .transpose()
}
