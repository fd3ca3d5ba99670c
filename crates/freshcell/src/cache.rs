//! Single-flight TTL value cache.
//!
//! [`TtlCache`] memoizes the result of one refresh capability. Readers are
//! served in one of three ways:
//! - **Fresh**: the published value is younger than the TTL and is returned
//!   without taking any lock.
//! - **Stale** (`no_wait` only): the value is between one and two TTLs old.
//!   It is returned immediately and a detached refresh is started unless one
//!   is already running.
//! - **Synchronous**: otherwise the caller queues on the update guard and
//!   either reuses the outcome of the refresh it waited on or runs a refresh
//!   itself with its own context.
//!
//! The value and its timestamp live together in one immutable [`Snapshot`]
//! swapped in atomically through an `ArcSwapOption`, so a reader can never see
//! a timestamp paired with the wrong value and never waits on a writer.
//! Subscribers registered with [`TtlCache::watch`] are notified after the swap
//! through a separate channel that readers never touch.

use crate::stats::Counters;
use arc_swap::ArcSwapOption;
use crate::{
    CacheConfig, CacheOptions, CacheStats, Freshness, Refresh, RefreshContext, RefreshOrigin,
    Snapshot, refresh_fn,
};
use freshcell_error::{BoxedCause, CacheError, CacheErrorKind, FreshcellError, FreshcellResult};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{Instrument, debug, instrument, trace, warn};

/// Refresh capability and settings bound to a cache.
pub struct Binding<T> {
    ttl: Duration,
    options: CacheOptions,
    background_timeout: Option<Duration>,
    refresh: Arc<dyn Refresh<T>>,
}

impl<T> Binding<T> {
    /// Bind `refresh` with a TTL and options. Background refreshes are unbounded.
    pub fn new(ttl: Duration, options: CacheOptions, refresh: impl Refresh<T> + 'static) -> Self {
        Self {
            ttl,
            options,
            background_timeout: None,
            refresh: Arc::new(refresh),
        }
    }

    /// Bind `refresh` with the settings of a loaded configuration.
    pub fn from_config(config: &CacheConfig, refresh: impl Refresh<T> + 'static) -> Self {
        Self {
            ttl: config.ttl(),
            options: config.options(),
            background_timeout: config.background_timeout(),
            refresh: Arc::new(refresh),
        }
    }

    /// Bound detached refreshes by `timeout`.
    pub fn with_background_timeout(mut self, timeout: Duration) -> Self {
        self.background_timeout = Some(timeout);
        self
    }

    /// The TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The behavior switches.
    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Timeout applied to detached refreshes.
    pub fn background_timeout(&self) -> Option<Duration> {
        self.background_timeout
    }
}

impl<T> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("ttl", &self.ttl)
            .field("options", &self.options)
            .field("background_timeout", &self.background_timeout)
            .finish_non_exhaustive()
    }
}

type Slot<T> = Option<Arc<Snapshot<T>>>;

/// Result of the most recent refresh attempt.
enum Outcome<T> {
    Refreshed(Arc<Snapshot<T>>),
    Suppressed(Arc<Snapshot<T>>),
    Failed(FreshcellError),
}

/// Result of a refresh together with who ran it.
struct Attempt<T> {
    origin: RefreshOrigin,
    outcome: Outcome<T>,
}

impl<T> Outcome<T> {
    fn to_result(&self) -> FreshcellResult<Arc<Snapshot<T>>> {
        match self {
            Outcome::Refreshed(snapshot) | Outcome::Suppressed(snapshot) => Ok(Arc::clone(snapshot)),
            Outcome::Failed(err) => Err(err.clone()),
        }
    }
}

/// State protected by the update guard.
struct Ledger<T> {
    completed: u64,
    last: Option<Attempt<T>>,
}

struct Shared<T> {
    binding: OnceLock<Binding<T>>,
    slot: ArcSwapOption<Snapshot<T>>,
    published: watch::Sender<Slot<T>>,
    updating: Arc<Mutex<Ledger<T>>>,
    // Mirrors `Ledger::completed` so callers can note it before queueing.
    completed: AtomicU64,
    counters: Counters,
}

/// Concurrency-safe cache of one value with a TTL.
///
/// `TtlCache` is a cheap handle; clones share the same state.
///
/// # Example
///
/// ```
/// use freshcell::{CacheOptions, RefreshContext, TtlCache};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = TtlCache::from_fn(
///     Duration::from_secs(30),
///     CacheOptions::default().with_no_wait(true),
///     |_ctx: RefreshContext| async { Ok::<_, String>(vec!["eu-west-1".to_string()]) },
/// );
///
/// let regions = cache.get().await?;
/// assert_eq!(regions, ["eu-west-1"]);
/// # Ok(())
/// # }
/// ```
pub struct TtlCache<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TtlCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an unbound cache. Bind it with [`init_once`](Self::init_once)
    /// before querying.
    pub fn new() -> Self {
        let (published, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                binding: OnceLock::new(),
                slot: ArcSwapOption::empty(),
                published,
                updating: Arc::new(Mutex::new(Ledger {
                    completed: 0,
                    last: None,
                })),
                completed: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    /// Create a cache bound to `refresh`.
    pub fn bound(ttl: Duration, options: CacheOptions, refresh: impl Refresh<T> + 'static) -> Self {
        Self::with_binding(Binding::new(ttl, options, refresh))
    }

    /// Create a cache bound to an async closure.
    pub fn from_fn<F, Fut, E>(ttl: Duration, options: CacheOptions, f: F) -> Self
    where
        F: Fn(RefreshContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxedCause> + Send + 'static,
    {
        Self::bound(ttl, options, refresh_fn(f))
    }

    /// Create a cache bound with the settings of a loaded configuration.
    pub fn from_config(config: &CacheConfig, refresh: impl Refresh<T> + 'static) -> Self {
        Self::with_binding(Binding::from_config(config, refresh))
    }

    /// Create a cache from a prepared binding.
    pub fn with_binding(binding: Binding<T>) -> Self {
        let cache = Self::new();
        cache.init_once_with(binding);
        cache
    }

    /// Bind the TTL, options and refresh capability.
    ///
    /// Only the first call takes effect; later calls are ignored and return
    /// `false`.
    pub fn init_once(
        &self,
        ttl: Duration,
        options: CacheOptions,
        refresh: impl Refresh<T> + 'static,
    ) -> bool {
        self.init_once_with(Binding::new(ttl, options, refresh))
    }

    /// Bind a prepared binding. Only the first call takes effect.
    pub fn init_once_with(&self, binding: Binding<T>) -> bool {
        let mut won = false;
        let bound = self.shared.binding.get_or_init(|| {
            won = true;
            binding
        });
        if won {
            debug!(ttl = ?bound.ttl, options = ?bound.options, "Bound cache");
        } else {
            debug!("Cache already bound, ignoring rebind");
        }
        won
    }

    /// True once a refresh capability is bound.
    pub fn is_bound(&self) -> bool {
        self.shared.binding.get().is_some()
    }

    /// The bound TTL.
    pub fn ttl(&self) -> Option<Duration> {
        self.shared.binding.get().map(Binding::ttl)
    }

    /// The bound behavior switches.
    pub fn options(&self) -> Option<CacheOptions> {
        self.shared.binding.get().map(Binding::options)
    }

    /// The currently published snapshot, without refreshing.
    pub fn snapshot(&self) -> Option<Arc<Snapshot<T>>> {
        self.shared.slot.load_full()
    }

    /// Subscribe to snapshot publications.
    ///
    /// Readers of the cache never touch this channel. Holding a borrow of the
    /// receiver only delays the notification of later publications.
    pub fn watch(&self) -> watch::Receiver<Slot<T>> {
        self.shared.published.subscribe()
    }

    /// Counters describing how callers have been served.
    pub fn stats(&self) -> CacheStats {
        self.shared.counters.snapshot()
    }

    /// Return the cached value, refreshing it first if needed.
    pub async fn get(&self) -> FreshcellResult<T> {
        self.get_with_context(RefreshContext::new()).await
    }

    /// Return the cached value, refreshing it under `ctx` if needed.
    ///
    /// The deadline in `ctx` applies to a synchronous refresh run by this
    /// call. It never applies to a background refresh this call triggers.
    /// Outside a tokio runtime a stale value is still served, but no
    /// background refresh is started.
    pub async fn get_with_context(&self, ctx: RefreshContext) -> FreshcellResult<T> {
        let binding = self.binding()?;

        if let Some(snapshot) = self.snapshot() {
            match snapshot.freshness(binding.ttl) {
                Freshness::Fresh => {
                    self.shared.counters.fresh_hit();
                    return Ok(snapshot.value().clone());
                }
                Freshness::Stale if binding.options.no_wait => {
                    trace!(age = ?snapshot.age(), "Serving stale value");
                    self.shared.counters.stale_hit();
                    self.spawn_background_refresh();
                    return Ok(snapshot.value().clone());
                }
                _ => {}
            }
        }

        let snapshot = self.refresh_blocking(binding, ctx).await?;
        Ok(snapshot.value().clone())
    }

    fn binding(&self) -> FreshcellResult<&Binding<T>> {
        self.shared
            .binding
            .get()
            .ok_or_else(|| CacheError::new(CacheErrorKind::Unbound).into())
    }

    #[instrument(level = "debug", skip_all, fields(origin = ?ctx.origin()))]
    async fn refresh_blocking(
        &self,
        binding: &Binding<T>,
        ctx: RefreshContext,
    ) -> FreshcellResult<Arc<Snapshot<T>>> {
        let seen = self.shared.completed.load(Ordering::Acquire);
        let mut ledger = self.shared.updating.lock().await;

        if let Some(snapshot) = self.snapshot() {
            if snapshot.freshness(binding.ttl) == Freshness::Fresh {
                trace!("Value refreshed while waiting");
                self.shared.counters.shared_outcome();
                return Ok(snapshot);
            }
        }

        // A refresh finished while this caller was queued; hand out its result
        // rather than starting a second one. Failures of a detached refresh are
        // bound by the background timeout, not by this caller's context.
        if ledger.completed > seen {
            if let Some(attempt) = &ledger.last {
                let foreign_failure = attempt.origin == RefreshOrigin::Background
                    && matches!(attempt.outcome, Outcome::Failed(_));
                if !foreign_failure {
                    trace!("Sharing outcome of the refresh waited on");
                    self.shared.counters.shared_outcome();
                    return attempt.outcome.to_result();
                }
                trace!("Background refresh failed while waiting, refreshing again");
            }
        }

        self.shared.counters.sync_refresh();
        self.update(binding, &mut ledger, ctx).await
    }

    fn spawn_background_refresh(&self) {
        let Ok(runtime) = Handle::try_current() else {
            trace!("No tokio runtime, skipping background refresh");
            return;
        };
        let Ok(mut ledger) = Arc::clone(&self.shared.updating).try_lock_owned() else {
            trace!("Refresh already in flight");
            return;
        };

        let cache = self.clone();
        let span = tracing::debug_span!("background_refresh");
        runtime.spawn(
            async move {
                let Some(binding) = cache.shared.binding.get() else {
                    return;
                };
                cache.shared.counters.background_refresh();
                let ctx = RefreshContext::background(binding.background_timeout);
                if cache.update(binding, &mut ledger, ctx).await.is_ok() {
                    debug!("Background refresh complete");
                }
            }
            .instrument(span),
        );
    }

    /// Run the refresh capability once and record the outcome.
    ///
    /// Must be called with the update guard held.
    async fn update(
        &self,
        binding: &Binding<T>,
        ledger: &mut Ledger<T>,
        ctx: RefreshContext,
    ) -> FreshcellResult<Arc<Snapshot<T>>> {
        let started = Instant::now();
        let origin = ctx.origin();
        let result = match ctx.deadline() {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, binding.refresh.refresh(ctx)).await {
                    Ok(result) => result.map_err(FreshcellError::from),
                    Err(_) => Err(FreshcellError::from(CacheError::new(
                        CacheErrorKind::DeadlineExceeded(started.elapsed()),
                    ))),
                }
            }
            None => binding.refresh.refresh(ctx).await.map_err(FreshcellError::from),
        };

        let outcome = match result {
            Ok(value) => {
                let snapshot = Arc::new(Snapshot::new(value));
                self.shared.slot.store(Some(Arc::clone(&snapshot)));
                self.shared.published.send_replace(Some(Arc::clone(&snapshot)));
                debug!(elapsed = ?started.elapsed(), "Published refreshed value");
                Outcome::Refreshed(snapshot)
            }
            Err(err) => match self.snapshot() {
                Some(last) if binding.options.return_last_good => {
                    warn!(error = %err, age = ?last.age(), "Refresh failed, keeping last good value");
                    self.shared.counters.suppressed_failure();
                    Outcome::Suppressed(last)
                }
                _ => {
                    warn!(error = %err, "Refresh failed");
                    self.shared.counters.failure();
                    Outcome::Failed(err)
                }
            },
        };

        let result = outcome.to_result();
        ledger.completed += 1;
        ledger.last = Some(Attempt { origin, outcome });
        self.shared.completed.store(ledger.completed, Ordering::Release);
        result
    }
}

impl<T> Default for TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TtlCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("binding", &self.shared.binding.get())
            .field("populated", &self.shared.slot.load().is_some())
            .finish()
    }
}
