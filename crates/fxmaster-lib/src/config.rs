//! Process-wide settings.
//!
//! Settings are read once at start-up from a TOML file and handed to each
//! component's constructor. Every field has a default, so an empty or
//! missing file is a valid configuration:
//!
//! ```toml
//! [store]
//! url = "http://localhost:8086"
//! database = "fxmaster"
//!
//! [ingest]
//! provider = "fxcm"
//! tolerance = 10
//! validation_mode = "fast"
//!
//! [resample]
//! frequency = "1min"
//! ```

use fxmaster_ingest::{DEFAULT_TOLERANCE, LoadOptions, ValidationMode};
use fxmaster_journal::{JournalError, JournalStore};
use fxmaster_resample::DEFAULT_CHUNK_HOURS;
use fxmaster_store::{InfluxConfig, InfluxStore, MemoryStore, StoreError, TickStore};
use fxmaster_types::Frequency;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "FXMASTER_CONFIG";

/// Errors that can occur while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the settings file.
    #[error("Failed to read config '{path}': {source}")]
    Read {
        /// The settings file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the settings file.
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        /// The settings file.
        path: PathBuf,
        /// The underlying TOML error.
        source: toml::de::Error,
    },

    /// Failed to serialize settings.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Which store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// InfluxDB 1.x over HTTP.
    #[default]
    Influx,
    /// In-process store; contents are lost on exit.
    Memory,
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Store implementation.
    pub backend: StoreBackend,
    /// Server base URL.
    pub url: String,
    /// Database name.
    pub database: String,
    /// Optional user name.
    pub username: Option<String>,
    /// Optional password.
    pub password: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Points per write request.
    pub batch_size: usize,
    /// Rows per chunk for streamed selects.
    pub chunk_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let influx = InfluxConfig::default();
        Self {
            backend: StoreBackend::default(),
            url: influx.url,
            database: influx.database,
            username: None,
            password: None,
            timeout_secs: influx.timeout.as_secs(),
            batch_size: influx.batch_size,
            chunk_size: influx.chunk_size,
        }
    }
}

impl StoreSettings {
    /// Returns the InfluxDB client configuration.
    #[must_use]
    pub fn influx_config(&self) -> InfluxConfig {
        InfluxConfig {
            url: self.url.clone(),
            database: self.database.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            batch_size: self.batch_size,
            chunk_size: self.chunk_size,
            ..InfluxConfig::default()
        }
    }

    /// Opens the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn open(&self) -> Result<Arc<dyn TickStore>, StoreError> {
        Ok(match self.backend {
            StoreBackend::Influx => Arc::new(InfluxStore::new(self.influx_config())?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        })
    }
}

/// `[ingest]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Default source directory.
    pub source_dir: Option<PathBuf>,
    /// Provider tag written with every tick.
    pub provider: String,
    /// Tick table.
    pub tick_table: String,
    /// Validation cache table. Empty disables the cache.
    pub validation_table: Option<String>,
    /// Largest row difference still accepted.
    pub tolerance: u64,
    /// Pre-validation mode.
    pub validation_mode: ValidationMode,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            source_dir: None,
            provider: "fxcm".to_string(),
            tick_table: "fx_ticks".to_string(),
            validation_table: Some("fx_validation".to_string()),
            tolerance: DEFAULT_TOLERANCE,
            validation_mode: ValidationMode::default(),
        }
    }
}

impl IngestSettings {
    /// Returns bulk load options for these settings.
    #[must_use]
    pub fn load_options(&self) -> LoadOptions {
        let mut options = LoadOptions::new(&self.provider, &self.tick_table);
        options.validation_table = self
            .validation_table
            .clone()
            .filter(|table| !table.is_empty());
        options.tolerance = self.tolerance;
        options.validation_mode = self.validation_mode;
        options
    }
}

/// `[resample]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleSettings {
    /// Tick table read by the resampler.
    pub input_table: String,
    /// Bar tables are named `<output_prefix>_<frequency>`.
    pub output_prefix: String,
    /// Default bar width.
    pub frequency: Frequency,
    /// Hours of ticks read per query.
    pub chunk_hours: i64,
}

impl Default for ResampleSettings {
    fn default() -> Self {
        Self {
            input_table: "fx_ticks".to_string(),
            output_prefix: "fx".to_string(),
            frequency: Frequency::default(),
            chunk_hours: DEFAULT_CHUNK_HOURS,
        }
    }
}

/// `[playback]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Tick table replayed.
    pub table: String,
    /// Event queue capacity. `None` means unbounded.
    pub queue_capacity: Option<usize>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            table: "fx_ticks".to_string(),
            queue_capacity: None,
        }
    }
}

/// `[journal]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSettings {
    /// Journal directory. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

impl JournalSettings {
    /// Opens the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal directories cannot be created.
    pub fn open(&self) -> Result<JournalStore, JournalError> {
        self.path.as_ref().map_or_else(JournalStore::with_default_path, |path| {
            JournalStore::new(path.clone())
        })
    }
}

/// All settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Store connection.
    pub store: StoreSettings,
    /// Bulk loading.
    pub ingest: IngestSettings,
    /// Resampling.
    pub resample: ResampleSettings,
    /// Playback.
    pub playback: PlaybackSettings,
    /// Load journal.
    pub journal: JournalSettings,
}

impl Settings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid settings TOML.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads settings from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Loads settings from `path`, or from [`CONFIG_ENV`] when `path` is
    /// `None`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        match path {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                debug!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Renders the settings as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
