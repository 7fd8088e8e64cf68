//! Lightweight stand-ins for the trained scoring models.
//!
//! These let the controller run without any model artifacts. Real deployments
//! supply their own [Predictor] and [AnomalyGuard] implementations.

use crate::error::PredictionError;
use crate::ingest::{AnomalyGuard, AnomalyVerdict};
use crate::ping::{TelemetryPing, VehicleType};
use crate::pipeline::Predictor;
use serde::{Deserialize, Serialize};

/// Speeds below this are treated as a crawl when estimating arrival, in m/s.
const CRAWL_SPEED: f64 = 0.5; // m/s

/// Vehicles closer than this to the stop line join the queue next step, in m.
const JOIN_DISTANCE: f64 = 30.0; // m

/// Estimates arrival from distance and speed, with a start-up delay for heavy vehicles.
#[derive(Clone, Copy, Debug, Default)]
pub struct KinematicPredictor;

impl KinematicPredictor {
    fn start_delay(vehicle_type: VehicleType) -> f64 {
        match vehicle_type {
            VehicleType::Car | VehicleType::Emergency => 0.0,
            VehicleType::Truck => 1.5,
            VehicleType::Bus => 2.0,
        }
    }
}

impl Predictor for KinematicPredictor {
    fn predict_eta(&self, ping: &TelemetryPing) -> Result<f64, PredictionError> {
        if !ping.distance_m.is_finite() || !ping.speed.is_finite() {
            return Err(PredictionError::Eta(format!(
                "non-finite telemetry from {}",
                ping.vehicle_id
            )));
        }
        let speed = f64::max(ping.speed, CRAWL_SPEED);
        Ok(ping.distance_m / speed + Self::start_delay(ping.vehicle_type))
    }

    fn predict_queue_next(&self, ping: &TelemetryPing) -> Result<f64, PredictionError> {
        if !ping.lane_queue.is_finite() {
            return Err(PredictionError::QueueNext(format!(
                "non-finite lane queue from {}",
                ping.vehicle_id
            )));
        }
        let joining = if ping.distance_m < JOIN_DISTANCE { 1.0 } else { 0.0 };
        // Roughly one vehicle discharges per step while traffic is moving.
        let discharged = f64::min(ping.speed / 12.0, 1.0);
        Ok(f64::max(ping.lane_queue + joining - discharged, 0.0))
    }
}

/// A normal distribution of one telemetry feature.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfile {
    pub mean: f64,
    pub stddev: f64,
}

impl FeatureProfile {
    pub const fn new(mean: f64, stddev: f64) -> Self {
        Self { mean, stddev }
    }

    fn z(&self, value: f64) -> f64 {
        ((value - self.mean) / self.stddev).abs()
    }
}

/// Flags pings whose features lie too many standard deviations from normal traffic.
///
/// The score is the margin to the threshold of the most extreme feature, so it is
/// negative exactly when the ping is flagged.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZScoreGuard {
    pub speed: FeatureProfile,
    pub distance_m: FeatureProfile,
    pub lane_queue: FeatureProfile,
    pub threshold: f64,
}

impl Default for ZScoreGuard {
    fn default() -> Self {
        Self {
            speed: FeatureProfile::new(12.0, 3.0),
            distance_m: FeatureProfile::new(80.0, 20.0),
            lane_queue: FeatureProfile::new(6.0, 3.0),
            threshold: 4.0,
        }
    }
}

impl AnomalyGuard for ZScoreGuard {
    fn check(&self, ping: &TelemetryPing) -> Result<AnomalyVerdict, PredictionError> {
        let z = [
            self.speed.z(ping.speed),
            self.distance_m.z(ping.distance_m),
            self.lane_queue.z(ping.lane_queue),
        ]
        .into_iter()
        .fold(0.0, |worst: f64, z| {
            if z.is_nan() {
                f64::INFINITY
            } else {
                worst.max(z)
            }
        });
        let score = self.threshold - z;
        Ok(AnomalyVerdict {
            is_anomalous: score < 0.0,
            score,
        })
    }
}
