#![allow(dead_code)]

use signal_sim::{
    AnomalyGuard, AnomalyVerdict, Approach, Ingestor, MetricsAggregator, PingPipeline,
    PredictionError, Predictor, SignalController, SignalTiming, TelemetryPing, VehicleType,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Returns the same predictions for every ping, after an optional delay.
pub struct FixedPredictor {
    pub eta: f64,
    pub queue_next: f64,
    pub delay: Duration,
}

impl FixedPredictor {
    pub fn new(eta: f64, queue_next: f64) -> Self {
        Self {
            eta,
            queue_next,
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(1.0, 1.0)
        }
    }
}

impl Predictor for FixedPredictor {
    fn predict_eta(&self, _: &TelemetryPing) -> Result<f64, PredictionError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(self.eta)
    }

    fn predict_queue_next(&self, _: &TelemetryPing) -> Result<f64, PredictionError> {
        Ok(self.queue_next)
    }
}

/// Accepts every ping and counts how many it has seen.
#[derive(Clone, Default)]
pub struct CountingGuard {
    pub checked: Arc<AtomicU64>,
}

impl CountingGuard {
    pub fn count(&self) -> u64 {
        self.checked.load(Ordering::SeqCst)
    }
}

impl AnomalyGuard for CountingGuard {
    fn check(&self, _: &TelemetryPing) -> Result<AnomalyVerdict, PredictionError> {
        self.checked.fetch_add(1, Ordering::SeqCst);
        Ok(AnomalyVerdict {
            is_anomalous: false,
            score: 1.0,
        })
    }
}

/// An ingestor whose controller's current green phase began `held` ago.
pub fn ingestor(predictor: FixedPredictor, guard: CountingGuard, held: Duration) -> Ingestor {
    let controller =
        SignalController::with_timing_at(SignalTiming::default(), Instant::now() - held);
    let pipeline = PingPipeline::new(
        Box::new(predictor),
        controller,
        MetricsAggregator::default(),
    );
    Ingestor::new(Arc::new(guard), Arc::new(pipeline))
}

pub fn car(approach: Approach) -> TelemetryPing {
    TelemetryPing {
        vehicle_id: "v001".into(),
        vehicle_type: VehicleType::Car,
        speed: 12.5,
        distance_m: 80.0,
        approach,
        lane_queue: 5.0,
    }
}
