//! Service clock and processing latency statistics

use std::time::Instant;
use tracing::info;

/// Monotonic nanosecond clock started with the service
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn now_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Delay samples in nanoseconds
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    samples: Vec<u64>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, delay_ns: u64) {
        self.samples.push(delay_ns);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn min(&self) -> Option<u64> {
        self.samples.iter().copied().min()
    }

    pub fn max(&self) -> Option<u64> {
        self.samples.iter().copied().max()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().map(|&s| s as f64).sum::<f64>() / self.samples.len() as f64)
    }

    /// Middle sample; mean of the two middle samples for even counts
    pub fn median(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        Some(if sorted.len() % 2 == 0 {
            (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
        } else {
            sorted[mid] as f64
        })
    }

    pub fn log_summary(&self) {
        let (Some(median), Some(mean), Some(min), Some(max)) = (self.median(), self.mean(), self.min(), self.max())
        else {
            info!("No frames processed");
            return;
        };
        info!(
            "Delay median: {:.3}s mean: {:.3}s min: {:.3}s max: {:.3}s ({} frames)",
            median * 1.0e-9,
            mean * 1.0e-9,
            min as f64 * 1.0e-9,
            max as f64 * 1.0e-9,
            self.samples.len()
        );
    }
}
