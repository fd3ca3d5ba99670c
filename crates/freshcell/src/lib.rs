//! Single-flight TTL value cache.
//!
//! This crate memoizes the result of an expensive, possibly failing refresh
//! operation. Concurrent readers share one published value; at most one
//! refresh runs at a time; values past their TTL can be served while a
//! detached refresh replaces them.
//!
//! ```
//! use freshcell::{CacheOptions, RefreshContext, TtlCache};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let calls = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&calls);
//! let cache = TtlCache::from_fn(Duration::from_secs(60), CacheOptions::default(), move |_ctx: RefreshContext| {
//!     let counter = Arc::clone(&counter);
//!     async move { Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst) + 1) }
//! });
//!
//! assert_eq!(cache.get().await?, 1);
//! assert_eq!(cache.get().await?, 1);
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod context;
mod refresh;
mod snapshot;
mod stats;

pub use cache::{Binding, TtlCache};
pub use config::{CacheConfig, CacheConfigBuilder, CacheConfigBuilderError, CacheOptions};
pub use context::{RefreshContext, RefreshOrigin};
pub use refresh::{Refresh, RefreshFn, refresh_fn};
pub use snapshot::{Freshness, Snapshot};
pub use stats::CacheStats;

pub use freshcell_error::{
    BoxedCause, CacheError, CacheErrorKind, ConfigError, FreshcellError, FreshcellErrorKind,
    FreshcellResult, RefreshError,
};
