//! Errors raised while loading cache configuration.

/// A configuration source that could not be read or did not describe a cache.
///
/// `origin` names the source that failed: a file path, inline TOML, or the
/// layered defaults used by `CacheConfig::load`.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache configuration from {}: {} at line {} in {}", origin, message, line, file)]
pub struct ConfigError {
    /// Source the configuration was read from
    pub origin: String,
    /// What was wrong with it
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Record that `origin` could not be turned into a cache configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use freshcell_error::ConfigError;
    ///
    /// let err = ConfigError::new("cache.toml", "invalid type for `ttl_ms`");
    /// assert_eq!(err.origin, "cache.toml");
    /// assert!(err.to_string().starts_with("Cache configuration from cache.toml"));
    /// ```
    #[track_caller]
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            origin: origin.into(),
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
