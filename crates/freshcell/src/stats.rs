//! Lightweight counters describing how a cache has served its callers.

use derive_getters::Getters;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    fresh_hits: AtomicU64,
    stale_hits: AtomicU64,
    sync_refreshes: AtomicU64,
    background_refreshes: AtomicU64,
    shared_outcomes: AtomicU64,
    failures: AtomicU64,
    suppressed_failures: AtomicU64,
}

macro_rules! bump {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl Counters {
    bump! {
        fresh_hit => fresh_hits,
        stale_hit => stale_hits,
        sync_refresh => sync_refreshes,
        background_refresh => background_refreshes,
        shared_outcome => shared_outcomes,
        failure => failures,
        suppressed_failure => suppressed_failures,
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            fresh_hits: self.fresh_hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            sync_refreshes: self.sync_refreshes.load(Ordering::Relaxed),
            background_refreshes: self.background_refreshes.load(Ordering::Relaxed),
            shared_outcomes: self.shared_outcomes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            suppressed_failures: self.suppressed_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a cache's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Getters)]
pub struct CacheStats {
    /// Calls answered from a value younger than the TTL
    fresh_hits: u64,
    /// Calls answered with a stale value while a background refresh ran
    stale_hits: u64,
    /// Refreshes run on behalf of a waiting caller
    sync_refreshes: u64,
    /// Refreshes detached from the calling request
    background_refreshes: u64,
    /// Queued callers answered with the outcome of the refresh they waited on
    shared_outcomes: u64,
    /// Refresh failures not hidden by `return_last_good`
    failures: u64,
    /// Refresh failures hidden by `return_last_good`
    suppressed_failures: u64,
}

impl CacheStats {
    /// Refreshes of either kind.
    pub fn refreshes(&self) -> u64 {
        self.sync_refreshes + self.background_refreshes
    }
}
