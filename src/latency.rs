use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of samples kept in the rolling window
pub const DEFAULT_LATENCY_WINDOW: usize = 100;

/// Rolling average of recent request latencies
#[derive(Clone)]
pub struct LatencyMonitor {
    samples: Arc<Mutex<VecDeque<u64>>>,
    window: usize,
}

impl LatencyMonitor {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_LATENCY_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(window))),
            window,
        }
    }

    /// Record one latency sample, evicting the oldest beyond the window
    pub fn record(&self, milliseconds: u64) {
        let mut samples = self.samples.lock();
        samples.push_back(milliseconds);
        while samples.len() > self.window {
            samples.pop_front();
        }
    }

    /// Average of the retained samples, 0 when none recorded
    pub fn average_ms(&self) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<u64>() as f64 / samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

impl Default for LatencyMonitor {
    fn default() -> Self {
        Self::new()
    }
}
