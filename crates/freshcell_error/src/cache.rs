//! Errors raised by the cache itself rather than by a refresh.

use std::time::Duration;

/// Kinds of cache errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CacheErrorKind {
    /// The cache was queried before `init_once` bound a refresh function
    #[display("Cache queried before a refresh function was bound")]
    Unbound,
    /// The refresh context deadline passed before the refresh resolved
    #[display("Refresh deadline exceeded after {:?}", _0)]
    DeadlineExceeded(Duration),
}

/// Cache error with location tracking.
///
/// # Examples
///
/// ```
/// use freshcell_error::{CacheError, CacheErrorKind};
///
/// let err = CacheError::new(CacheErrorKind::Unbound);
/// assert!(format!("{}", err).contains("before a refresh function"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache Error: {} at line {} in {}", kind, line, file)]
pub struct CacheError {
    /// The kind of error that occurred
    pub kind: CacheErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CacheError {
    /// Create a new cache error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CacheErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CacheErrorKind {
        &self.kind
    }
}
