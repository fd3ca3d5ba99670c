//! Published cache value paired with its refresh time.

use derive_getters::Getters;
use std::time::Duration;
use tokio::time::Instant;

/// One published value and the instant it was stored.
///
/// Snapshots are immutable and swapped in whole, so the value and its
/// timestamp are always observed together.
#[derive(Debug, Clone, Getters)]
pub struct Snapshot<T> {
    value: T,
    refreshed_at: Instant,
}

impl<T> Snapshot<T> {
    /// Stamp `value` with the current time.
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            refreshed_at: Instant::now(),
        }
    }

    /// Time elapsed since the value was stored.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.refreshed_at)
    }

    /// Classify this snapshot against `ttl`.
    pub fn freshness(&self, ttl: Duration) -> Freshness {
        Freshness::of(self.age(), ttl)
    }
}

/// How usable a snapshot of a given age is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Freshness {
    /// Younger than the TTL.
    Fresh,
    /// Past the TTL but younger than twice the TTL; servable without waiting
    /// when the cache runs with `no_wait`.
    Stale,
    /// Twice the TTL or older.
    Expired,
}

impl Freshness {
    /// Classify an age against `ttl`.
    pub fn of(age: Duration, ttl: Duration) -> Self {
        if age < ttl {
            Freshness::Fresh
        } else if age < ttl.saturating_mul(2) {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}
