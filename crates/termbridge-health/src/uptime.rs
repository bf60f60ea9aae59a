//! Sliding uptime windows.

use std::collections::VecDeque;

/// Ring buffer of per-second health samples over a fixed horizon.
#[derive(Debug)]
pub struct UptimeWindow {
    samples: VecDeque<bool>,
    capacity: usize,
}

impl UptimeWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Append one sample, evicting the oldest once the horizon is full.
    pub fn record(&mut self, healthy: bool) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(healthy);
    }

    /// Uptime as a rounded integer percent over the recorded samples.
    /// An empty window counts as fully up.
    pub fn percent(&self) -> u32 {
        if self.samples.is_empty() {
            return 100;
        }
        let healthy = self.samples.iter().filter(|sample| **sample).count();
        (100.0 * healthy as f64 / self.samples.len() as f64).round() as u32
    }
}
