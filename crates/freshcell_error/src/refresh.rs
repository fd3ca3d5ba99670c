//! Refresh failure types.

use std::error::Error;
use std::sync::Arc;

/// Boxed error accepted from refresh functions.
pub type BoxedCause = Box<dyn Error + Send + Sync + 'static>;

/// A refresh function failed.
///
/// The underlying cause is held behind an `Arc` so one failure can be handed
/// to every caller that queued behind the refresh which produced it.
///
/// # Examples
///
/// ```
/// use freshcell_error::RefreshError;
///
/// let err = RefreshError::new("connection reset by peer");
/// assert_eq!(err.message(), "connection reset by peer");
/// assert!(std::error::Error::source(&err).is_some());
/// ```
#[derive(Debug, Clone, derive_more::Display)]
#[display("Refresh Error: {} at line {} in {}", cause, line, file)]
pub struct RefreshError {
    cause: Arc<dyn Error + Send + Sync + 'static>,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RefreshError {
    /// Wrap a refresh failure, recording the caller location.
    #[track_caller]
    pub fn new(cause: impl Into<BoxedCause>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            cause: Arc::from(cause.into()),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Rendered message of the underlying cause.
    pub fn message(&self) -> String {
        self.cause.to_string()
    }

    /// Attempt to view the underlying cause as a concrete error type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.cause.downcast_ref::<E>()
    }
}

impl Error for RefreshError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.cause)
    }
}
