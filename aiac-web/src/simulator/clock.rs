//! Clock abstraction for the progress scheduler
//!
//! Stage delays are presentation pacing only, so the scheduler never calls
//! `tokio::time::sleep` directly. Servers and tests inject the clock they
//! need.

use aiac_common::config::ProgressPacing;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantClock;

#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, _duration: Duration) {}
}

/// Tokio time scaled by the configured [`ProgressPacing`]
#[derive(Debug, Clone, Copy)]
pub struct PacedClock {
    pacing: ProgressPacing,
}

impl PacedClock {
    pub fn new(pacing: ProgressPacing) -> Self {
        Self { pacing }
    }
}

#[async_trait]
impl Clock for PacedClock {
    async fn sleep(&self, duration: Duration) {
        let scaled = self.pacing.scale(duration);
        if !scaled.is_zero() {
            tokio::time::sleep(scaled).await;
        }
    }
}

/// Records requested delays without waiting
#[derive(Debug, Default)]
pub struct RecordingClock {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.recorded().iter().sum()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}
