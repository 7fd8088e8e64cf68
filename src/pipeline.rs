use crate::approach::{Approach, ApproachStats};
use crate::controller::{ControllerSnapshot, SignalController};
use crate::error::PredictionError;
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::ping::TelemetryPing;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// A vehicle with an ETA below this, on the green approach, counts as cleared.
const CLEARED_ETA_SEC: f64 = 5.0; // s

/// Scores telemetry for the decision engine.
///
/// Implementations may be slow; they are never called while shared state is locked.
pub trait Predictor: Send + Sync {
    /// Predicts the vehicle's time to reach the stop line, in s.
    fn predict_eta(&self, ping: &TelemetryPing) -> Result<f64, PredictionError>;

    /// Predicts the lane queue length at the next step.
    fn predict_queue_next(&self, ping: &TelemetryPing) -> Result<f64, PredictionError>;
}

/// The outcome of processing one ping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PingResult {
    pub eta_seconds: f64,
    pub queue_next: f64,
    /// The green approach after the ping was applied.
    pub green: Approach,
}

/// The state shared by every caller of the pipeline.
struct Intersection {
    controller: SignalController,
    metrics: MetricsAggregator,
}

impl Intersection {
    /// Applies a scored ping. This is the only place shared state is written.
    fn apply(
        &mut self,
        ping: &TelemetryPing,
        eta: f64,
        queue_next: f64,
        now: Instant,
    ) -> PingResult {
        self.metrics.record_ping(eta, queue_next);

        let is_emergency = ping.vehicle_type.is_emergency();
        let stats = ApproachStats::new(queue_next, is_emergency);
        self.controller.update_demands_at([(ping.approach, stats)], now);

        let green = self.controller.current_green();
        if green == ping.approach && eta < CLEARED_ETA_SEC {
            self.metrics.record_cleared();
        }
        if is_emergency {
            self.metrics.record_emergency(eta);
        }

        PingResult {
            eta_seconds: eta,
            queue_next,
            green,
        }
    }
}

/// Processes telemetry one ping at a time against a shared controller and metrics.
///
/// Concurrent calls to [Self::process] are serialized: predictions run unlocked,
/// then the controller and metrics are updated together under a single write lock.
pub struct PingPipeline {
    predictor: Box<dyn Predictor>,
    state: RwLock<Intersection>,
}

impl PingPipeline {
    pub fn new(
        predictor: Box<dyn Predictor>,
        controller: SignalController,
        metrics: MetricsAggregator,
    ) -> Self {
        Self {
            predictor,
            state: RwLock::new(Intersection {
                controller,
                metrics,
            }),
        }
    }

    /// Scores a ping and applies it to the controller and metrics.
    ///
    /// If either prediction fails, nothing is updated.
    pub fn process(&self, ping: &TelemetryPing) -> Result<PingResult, PredictionError> {
        let eta = clamp(self.predictor.predict_eta(ping)?);
        let queue_next = clamp(self.predictor.predict_queue_next(ping)?);
        let mut state = self.write();
        let now = Instant::now();
        Ok(state.apply(ping, eta, queue_next, now))
    }

    /// A snapshot of the signal controller.
    pub fn controller_snapshot(&self) -> ControllerSnapshot {
        self.read().controller.snapshot()
    }

    /// A snapshot of the aggregated metrics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.read().metrics.snapshot()
    }

    // Every write completes before its guard drops, so a poisoned lock still holds
    // consistent state.
    fn read(&self) -> RwLockReadGuard<'_, Intersection> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Intersection> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Constrains a prediction to be non-negative.
fn clamp(value: f64) -> f64 {
    f64::max(value, 0.0)
}
