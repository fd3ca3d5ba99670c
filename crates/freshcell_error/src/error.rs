//! Top-level error wrapper types.

use crate::{CacheError, ConfigError, RefreshError};

/// Every error a freshcell operation can produce.
///
/// # Examples
///
/// ```
/// use freshcell_error::{FreshcellError, FreshcellErrorKind, RefreshError};
///
/// let err: FreshcellError = RefreshError::new("timeout").into();
/// assert!(matches!(err.kind(), FreshcellErrorKind::Refresh(_)));
/// ```
#[derive(Debug, Clone, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum FreshcellErrorKind {
    /// The bound refresh function failed
    #[from(RefreshError)]
    Refresh(RefreshError),
    /// The cache rejected the call
    #[from(CacheError)]
    Cache(CacheError),
    /// Configuration could not be loaded
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Freshcell error with kind discrimination.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Freshcell Error: {}", _0)]
pub struct FreshcellError(Box<FreshcellErrorKind>);

impl FreshcellError {
    /// Create a new error from a kind.
    pub fn new(kind: FreshcellErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &FreshcellErrorKind {
        &self.0
    }

    /// True when the error came from the refresh function.
    pub fn is_refresh(&self) -> bool {
        matches!(*self.0, FreshcellErrorKind::Refresh(_))
    }

    /// True when a refresh context deadline expired.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(
            &*self.0,
            FreshcellErrorKind::Cache(err)
                if matches!(err.kind, crate::CacheErrorKind::DeadlineExceeded(_))
        )
    }
}

impl<T> From<T> for FreshcellError
where
    T: Into<FreshcellErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for freshcell operations.
pub type FreshcellResult<T> = std::result::Result<T, FreshcellError>;
