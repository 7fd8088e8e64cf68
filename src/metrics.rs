//! Rolling statistics over processed pings.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// The default number of values kept in each window.
pub const DEFAULT_WINDOW: usize = 1000;

/// The weight of the newest emergency ETA in the clearance moving average.
const EMERGENCY_EMA_WEIGHT: f64 = 0.1;

/// A fixed-capacity window which evicts its oldest value when full.
#[derive(Clone, Debug)]
struct Window {
    values: VecDeque<f64>,
    capacity: usize,
}

impl Window {
    fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }
    }
}

/// A point-in-time view of the aggregated metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub pings_processed: u64,
    pub avg_eta: f64,
    pub avg_queue: f64,
    /// Vehicles counted as cleared while their approach held green.
    pub throughput: u64,
    /// Moving average of emergency vehicle ETAs, in s.
    pub emergency_clear_ema: f64,
}

impl MetricsSnapshot {
    /// The snapshot with averages rounded to three decimals, for reporting.
    pub fn report(mut self) -> Self {
        self.avg_eta = (self.avg_eta * 1000.0).round() / 1000.0;
        self.avg_queue = (self.avg_queue * 1000.0).round() / 1000.0;
        self
    }
}

/// Bounded rolling-window statistics and running counters.
#[derive(Clone, Debug)]
pub struct MetricsAggregator {
    /// Recently predicted ETAs.
    etas: Window,
    /// Recently predicted next-step queue lengths.
    queues: Window,
    pings_processed: u64,
    throughput: u64,
    emergency_clear_ema: f64,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl MetricsAggregator {
    /// Creates an aggregator keeping the last `window` values of each series.
    /// A zero window is treated as a window of one.
    pub fn new(window: usize) -> Self {
        let window = usize::max(window, 1);
        Self {
            etas: Window::new(window),
            queues: Window::new(window),
            pings_processed: 0,
            throughput: 0,
            emergency_clear_ema: 0.0,
        }
    }

    /// Records the predictions made for one processed ping.
    pub fn record_ping(&mut self, eta: f64, queue_next: f64) {
        self.etas.push(eta);
        self.queues.push(queue_next);
        self.pings_processed += 1;
    }

    /// Counts one vehicle as cleared.
    pub fn record_cleared(&mut self) {
        self.throughput += 1;
    }

    /// Folds an emergency vehicle's ETA into the clearance moving average.
    pub fn record_emergency(&mut self, eta: f64) {
        self.emergency_clear_ema =
            self.emergency_clear_ema * (1.0 - EMERGENCY_EMA_WEIGHT) + eta * EMERGENCY_EMA_WEIGHT;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pings_processed: self.pings_processed,
            avg_eta: self.etas.mean(),
            avg_queue: self.queues.mean(),
            throughput: self.throughput,
            emergency_clear_ema: self.emergency_clear_ema,
        }
    }
}
