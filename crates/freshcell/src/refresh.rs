//! The refresh capability bound to a cache.

use crate::RefreshContext;
use async_trait::async_trait;
use freshcell_error::{BoxedCause, RefreshError};
use std::future::Future;

/// Produces a new value for a cache.
///
/// Implement this for types that own their refresh resources (a client, a
/// file handle). For closures, wrap them with [`refresh_fn`].
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use freshcell::{Refresh, RefreshContext};
/// use freshcell_error::RefreshError;
///
/// struct Quota {
///     limit: u64,
/// }
///
/// #[async_trait]
/// impl Refresh<u64> for Quota {
///     async fn refresh(&self, _ctx: RefreshContext) -> Result<u64, RefreshError> {
///         Ok(self.limit)
///     }
/// }
/// ```
#[async_trait]
pub trait Refresh<T>: Send + Sync {
    /// Compute a fresh value. `ctx` carries the deadline the cache enforces.
    async fn refresh(&self, ctx: RefreshContext) -> Result<T, RefreshError>;
}

/// Adapter that turns an async closure into a [`Refresh`] implementation.
#[derive(Clone)]
pub struct RefreshFn<F> {
    f: F,
}

/// Wrap an async closure as a refresh capability.
///
/// Any error convertible into `Box<dyn Error + Send + Sync>` is accepted,
/// including `String` and `&'static str`.
///
/// ```
/// use freshcell::{refresh_fn, RefreshContext};
///
/// let refresh = refresh_fn(|_ctx: RefreshContext| async { Ok::<_, String>(42_u32) });
/// # let _ = refresh;
/// ```
pub fn refresh_fn<F>(f: F) -> RefreshFn<F> {
    RefreshFn { f }
}

#[async_trait]
impl<T, F, Fut, E> Refresh<T> for RefreshFn<F>
where
    T: Send + 'static,
    F: Fn(RefreshContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxedCause> + Send + 'static,
{
    async fn refresh(&self, ctx: RefreshContext) -> Result<T, RefreshError> {
        (self.f)(ctx).await.map_err(RefreshError::new)
    }
}

impl<F> std::fmt::Debug for RefreshFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshFn").finish_non_exhaustive()
    }
}
