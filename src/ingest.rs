use crate::error::{IngestError, PredictionError};
use crate::ping::TelemetryPing;
use crate::pipeline::{PingPipeline, PingResult};
use std::sync::Arc;

/// The verdict of an anomaly check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnomalyVerdict {
    pub is_anomalous: bool,
    /// The raw anomaly score; lower is more anomalous.
    pub score: f64,
}

/// Screens telemetry for implausible or spoofed reports.
pub trait AnomalyGuard: Send + Sync {
    fn check(&self, ping: &TelemetryPing) -> Result<AnomalyVerdict, PredictionError>;
}

/// The entry point for telemetry: screens each ping, then feeds it to the pipeline.
///
/// Both live submissions and the simulation driver go through the same path.
#[derive(Clone)]
pub struct Ingestor {
    guard: Arc<dyn AnomalyGuard>,
    pipeline: Arc<PingPipeline>,
}

impl Ingestor {
    pub fn new(guard: Arc<dyn AnomalyGuard>, pipeline: Arc<PingPipeline>) -> Self {
        Self { guard, pipeline }
    }

    /// Submits a ping. Anomalous pings are rejected without touching any state.
    pub fn submit(&self, ping: &TelemetryPing) -> Result<PingResult, IngestError> {
        let verdict = self.guard.check(ping)?;
        if verdict.is_anomalous {
            log::debug!(
                "rejected ping from {} (score {:.3})",
                ping.vehicle_id,
                verdict.score
            );
            return Err(IngestError::Anomalous {
                score: verdict.score,
            });
        }
        Ok(self.pipeline.process(ping)?)
    }

    pub fn pipeline(&self) -> &Arc<PingPipeline> {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approach::Approach;
    use crate::controller::SignalController;
    use crate::metrics::{MetricsAggregator, MetricsSnapshot};
    use crate::ping::VehicleType;
    use crate::pipeline::Predictor;

    struct Unit;

    impl Predictor for Unit {
        fn predict_eta(&self, _: &TelemetryPing) -> Result<f64, PredictionError> {
            Ok(1.0)
        }

        fn predict_queue_next(&self, _: &TelemetryPing) -> Result<f64, PredictionError> {
            Ok(1.0)
        }
    }

    /// Flags every ping faster than the limit.
    struct SpeedLimit(f64);

    impl AnomalyGuard for SpeedLimit {
        fn check(&self, ping: &TelemetryPing) -> Result<AnomalyVerdict, PredictionError> {
            Ok(AnomalyVerdict {
                is_anomalous: ping.speed > self.0,
                score: self.0 - ping.speed,
            })
        }
    }

    struct Broken;

    impl AnomalyGuard for Broken {
        fn check(&self, _: &TelemetryPing) -> Result<AnomalyVerdict, PredictionError> {
            Err(PredictionError::Anomaly("no model".into()))
        }
    }

    fn ingestor(guard: impl AnomalyGuard + 'static) -> Ingestor {
        let pipeline = PingPipeline::new(
            Box::new(Unit),
            SignalController::new(),
            MetricsAggregator::default(),
        );
        Ingestor::new(Arc::new(guard), Arc::new(pipeline))
    }

    fn ping(speed: f64) -> TelemetryPing {
        TelemetryPing {
            vehicle_id: "x".into(),
            vehicle_type: VehicleType::Bus,
            speed,
            distance_m: 40.0,
            approach: Approach::S,
            lane_queue: 2.0,
        }
    }

    #[test]
    fn anomalous_pings_are_not_counted() {
        let ingestor = ingestor(SpeedLimit(30.0));
        let err = ingestor.submit(&ping(90.0)).unwrap_err();
        assert_eq!(err, IngestError::Anomalous { score: -60.0 });
        assert_eq!(
            ingestor.pipeline().metrics_snapshot(),
            MetricsSnapshot::default()
        );

        ingestor.submit(&ping(12.0)).unwrap();
        assert_eq!(ingestor.pipeline().metrics_snapshot().pings_processed, 1);
    }

    #[test]
    fn guard_failures_surface() {
        let ingestor = ingestor(Broken);
        let err = ingestor.submit(&ping(12.0)).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Prediction(PredictionError::Anomaly(_))
        ));
        assert_eq!(ingestor.pipeline().metrics_snapshot().pings_processed, 0);
    }
}
