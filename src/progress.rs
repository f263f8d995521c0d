use crate::constants::PROGRESS_STEP;
use std::num::NonZeroU64;

/// Progress notifications emitted while a recording is streamed to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadProgress {
    /// Response accepted. `total` is `None` when the camera did not declare a
    /// usable `content-length`.
    Started { total: Option<u64> },
    Percent(u8),
    Finished { bytes: u64 },
}

/// Turns received byte counts into percentage notifications, one per
/// `PROGRESS_STEP` points crossed since the previous one.
///
/// A zero or missing total is kept as "unknown" and never yields a percentage.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<NonZeroU64>,
    received: u64,
    last_reported: u8,
}

impl ProgressTracker {
    pub fn new(content_length: Option<u64>) -> Self {
        Self {
            total: content_length.and_then(NonZeroU64::new),
            received: 0,
            last_reported: 0,
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total.map(NonZeroU64::get)
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn percent(&self) -> Option<u8> {
        let total = self.total?;
        let percent = (self.received as u128 * 100) / total.get() as u128;
        Some(percent.min(100) as u8)
    }

    /// Records `bytes` more and returns a percentage when a new step is reached.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.received = self.received.saturating_add(bytes);
        let percent = self.percent()?;
        if percent >= self.last_reported.saturating_add(PROGRESS_STEP) {
            self.last_reported = percent;
            return Some(percent);
        }
        None
    }
}
