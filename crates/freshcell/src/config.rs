//! Cache options and file-based configuration.
//!
//! [`CacheOptions`] holds the two behavior switches bound to a cache.
//! [`CacheConfig`] is the serializable form loaded through the `config`
//! crate, with a precedence system:
//! - Bundled defaults (include_str! from freshcell.toml)
//! - User override (./freshcell.toml, optional)

use config::{Config, File, FileFormat};
use derive_getters::Getters;
use freshcell_error::{ConfigError, FreshcellError, FreshcellResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Behavior switches fixed at bind time.
///
/// # Example
///
/// ```
/// use freshcell::CacheOptions;
///
/// let options = CacheOptions::default()
///     .with_no_wait(true)
///     .with_return_last_good(true);
/// assert!(options.no_wait);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct CacheOptions {
    /// Keep serving the previous value when a refresh fails, reporting success.
    #[serde(default)]
    pub return_last_good: bool,

    /// Serve values between one and two TTLs old immediately while a
    /// background refresh runs.
    #[serde(default)]
    pub no_wait: bool,
}

/// Serializable cache configuration.
///
/// # Example
///
/// ```toml
/// ttl_ms = 30_000
/// return_last_good = true
/// no_wait = true
/// background_timeout_ms = 5_000
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct CacheConfig {
    /// Time-to-live of a refreshed value (milliseconds)
    #[serde(default = "default_ttl_ms")]
    ttl_ms: u64,

    /// See [`CacheOptions::return_last_good`]
    #[serde(default)]
    return_last_good: bool,

    /// See [`CacheOptions::no_wait`]
    #[serde(default)]
    no_wait: bool,

    /// Upper bound on detached background refreshes (milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(strip_option))]
    #[setters(strip_option)]
    background_timeout_ms: Option<u64>,
}

fn default_ttl_ms() -> u64 {
    60_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            return_last_good: false,
            no_wait: false,
            background_timeout_ms: None,
        }
    }
}

impl CacheConfig {
    /// TTL as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// The behavior switches.
    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            return_last_good: self.return_last_good,
            no_wait: self.no_wait,
        }
    }

    /// Timeout applied to background refreshes, if configured.
    pub fn background_timeout(&self) -> Option<Duration> {
        self.background_timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from a specific file path.
    ///
    /// The format is inferred from the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> FreshcellResult<Self> {
        debug!("Loading cache configuration from file");

        let origin = path.as_ref().display().to_string();
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                FreshcellError::from(ConfigError::new(&origin, format!("unreadable: {}", e)))
            })?
            .try_deserialize()
            .map_err(|e| FreshcellError::from(ConfigError::new(&origin, e.to_string())))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> FreshcellResult<Self> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(|e| FreshcellError::from(ConfigError::new("inline TOML", e.to_string())))
    }

    /// Load configuration with precedence: ./freshcell.toml > bundled default.
    ///
    /// The user file is optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> FreshcellResult<Self> {
        debug!("Loading cache configuration with precedence: current dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../freshcell.toml");

        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::with_name("freshcell").required(false))
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(|e| {
                FreshcellError::from(ConfigError::new(
                    "bundled defaults and ./freshcell.toml",
                    e.to_string(),
                ))
            })
    }
}
