//! Per-call refresh context.
//!
//! A [`RefreshContext`] travels with every refresh. It carries an optional
//! deadline, which the cache enforces with `tokio::time::timeout_at`, and
//! records whether the refresh was started by a caller or detached into the
//! background.
//!
//! Caller cancellation is ordinary future cancellation: dropping the future
//! returned by `get_with_context` drops a synchronous refresh along with it.
//! Background refreshes are owned by their spawned task and never observe
//! the cancellation of the request that triggered them.

use std::time::Duration;
use tokio::time::Instant;

/// Who started a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefreshOrigin {
    /// A caller waiting on the result.
    #[default]
    Caller,
    /// A detached refresh triggered from the stale-serving path.
    Background,
}

/// Deadline and origin for one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshContext {
    deadline: Option<Instant>,
    origin: RefreshOrigin,
}

impl RefreshContext {
    /// A caller context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A caller context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            origin: RefreshOrigin::Caller,
        }
    }

    /// A caller context that expires `timeout` from now.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            origin: RefreshOrigin::Caller,
        }
    }

    /// Context for a detached refresh, bounded only by its own timeout policy.
    pub fn background(timeout: Option<Duration>) -> Self {
        Self {
            deadline: timeout.and_then(|t| Instant::now().checked_add(t)),
            origin: RefreshOrigin::Background,
        }
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Who started the refresh.
    pub fn origin(&self) -> RefreshOrigin {
        self.origin
    }

    /// True for detached refreshes.
    pub fn is_background(&self) -> bool {
        self.origin == RefreshOrigin::Background
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_down() {
        let ctx = RefreshContext::with_timeout(Duration::from_millis(100));
        assert_eq!(ctx.remaining(), Some(Duration::from_millis(100)));
        assert!(!ctx.is_expired());

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert!(ctx.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_context() {
        let unbounded = RefreshContext::background(None);
        assert!(unbounded.is_background());
        assert_eq!(unbounded.deadline(), None);
        assert!(!unbounded.is_expired());

        let bounded = RefreshContext::background(Some(Duration::from_secs(5)));
        assert_eq!(bounded.origin(), RefreshOrigin::Background);
        assert_eq!(bounded.remaining(), Some(Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_timeout_means_no_deadline() {
        let ctx = RefreshContext::with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline(), None);
        assert_eq!(ctx.origin(), RefreshOrigin::Caller);
        assert!(!ctx.is_expired());

        let background = RefreshContext::background(Some(Duration::MAX));
        assert_eq!(background.deadline(), None);
        assert!(background.is_background());
    }

    #[test]
    fn test_default_is_caller_without_deadline() {
        let ctx = RefreshContext::new();
        assert_eq!(ctx.origin(), RefreshOrigin::Caller);
        assert!(ctx.remaining().is_none());
    }
}
