//! Shared helpers for cache integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use freshcell::{Refresh, RefreshContext, RefreshError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Refresh that yields 1, 2, 3, ... (one number per call, failed calls included).
#[derive(Clone, Default)]
pub struct Sequence {
    calls: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
    delay_ms: Arc<AtomicU64>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        let seq = Self::new();
        seq.set_delay(delay);
        seq
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Refresh<u64> for Sequence {
    async fn refresh(&self, _ctx: RefreshContext) -> Result<u64, RefreshError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RefreshError::new(format!("refresh {} failed", call)));
        }
        Ok(call)
    }
}
