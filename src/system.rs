use crate::config::Settings;
use crate::controller::SignalController;
use crate::driver::SimulationDriver;
use crate::ingest::{AnomalyGuard, Ingestor};
use crate::metrics::MetricsAggregator;
use crate::pipeline::{PingPipeline, Predictor};
use std::sync::Arc;
use std::time::Instant;

/// The components of a running intersection, wired together once at start-up.
pub struct SignalSystem {
    pub pipeline: Arc<PingPipeline>,
    pub ingestor: Ingestor,
    pub driver: SimulationDriver,
}

impl SignalSystem {
    /// Builds the controller, metrics, pipeline and driver from `settings`,
    /// scoring telemetry with the given collaborators.
    pub fn new(
        settings: &Settings,
        predictor: Box<dyn Predictor>,
        guard: Arc<dyn AnomalyGuard>,
    ) -> Self {
        let controller = SignalController::with_timing_at(settings.timing, Instant::now());
        let metrics = MetricsAggregator::new(settings.window_capacity);
        let pipeline = Arc::new(PingPipeline::new(predictor, controller, metrics));
        let ingestor = Ingestor::new(guard, pipeline.clone());
        let driver = SimulationDriver::new(ingestor.clone(), settings.seed, settings.restart_wait());
        Self {
            pipeline,
            ingestor,
            driver,
        }
    }
}
