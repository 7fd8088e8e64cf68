use crate::approach::{Approach, APPROACHES};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// The kind of vehicle reporting telemetry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Car,
    Bus,
    Emergency,
    Truck,
}

impl VehicleType {
    pub const ALL: [VehicleType; 4] = [
        VehicleType::Car,
        VehicleType::Bus,
        VehicleType::Emergency,
        VehicleType::Truck,
    ];

    /// The relative frequency of each vehicle type in generated traffic.
    const WEIGHTS: [f64; 4] = [0.85, 0.09, 0.01, 0.05];

    pub fn is_emergency(self) -> bool {
        self == VehicleType::Emergency
    }
}

/// A single telemetry report from a vehicle approaching the intersection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPing {
    pub vehicle_id: String,
    pub vehicle_type: VehicleType,
    /// Speed in m/s.
    pub speed: f64,
    /// Distance to the stop line in m.
    pub distance_m: f64,
    pub approach: Approach,
    /// Vehicles observed queued in the lane.
    pub lane_queue: f64,
}

/// Generates synthetic telemetry resembling normal traffic.
pub struct PingGenerator<R = StdRng> {
    rng: R,
    vehicle_types: WeightedIndex<f64>,
    speed: Normal<f64>,
    distance: Normal<f64>,
    lane_queue: Normal<f64>,
}

impl PingGenerator<StdRng> {
    /// Creates a generator seeded from system entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a generator with a reproducible sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for PingGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PingGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            vehicle_types: WeightedIndex::new(VehicleType::WEIGHTS).expect("Invalid weights"),
            speed: Normal::new(12.0, 3.0).expect("Invalid standard deviation"),
            distance: Normal::new(120.0, 40.0).expect("Invalid standard deviation"),
            lane_queue: Normal::new(6.0, 3.0).expect("Invalid standard deviation"),
        }
    }

    /// Generates the next ping.
    pub fn next_ping(&mut self) -> TelemetryPing {
        let rng = &mut self.rng;
        TelemetryPing {
            vehicle_id: format!("{:08x}", rng.gen::<u32>()),
            vehicle_type: VehicleType::ALL[self.vehicle_types.sample(rng)],
            speed: f64::max(self.speed.sample(rng), 0.0),
            distance_m: f64::max(self.distance.sample(rng), 0.0),
            approach: APPROACHES[rng.gen_range(0..APPROACHES.len())],
            lane_queue: f64::max(self.lane_queue.sample(rng), 0.0),
        }
    }
}

impl<R: Rng> Iterator for PingGenerator<R> {
    type Item = TelemetryPing;

    fn next(&mut self) -> Option<TelemetryPing> {
        Some(self.next_ping())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_pings_are_non_negative() {
        for ping in PingGenerator::seeded(7).take(2000) {
            assert!(ping.speed >= 0.0);
            assert!(ping.distance_m >= 0.0);
            assert!(ping.lane_queue >= 0.0);
            assert_eq!(ping.vehicle_id.len(), 8);
        }
    }

    #[test]
    fn seeded_generators_repeat() {
        let a = PingGenerator::seeded(42).take(50).collect::<Vec<_>>();
        let b = PingGenerator::seeded(42).take(50).collect::<Vec<_>>();
        assert_eq!(a, b);
    }

    #[test]
    fn traffic_is_mostly_cars() {
        let pings = PingGenerator::seeded(3).take(5000).collect::<Vec<_>>();
        let cars = pings
            .iter()
            .filter(|p| p.vehicle_type == VehicleType::Car)
            .count();
        assert!(cars > 4000 && cars < 4500, "{} cars", cars);
        for approach in APPROACHES {
            let n = pings.iter().filter(|p| p.approach == approach).count();
            assert!(n > 1000, "{} pings on {}", n, approach);
        }
    }

    #[test]
    fn vehicle_types_use_lowercase_names() {
        let json = serde_json::to_string(&VehicleType::Emergency).unwrap();
        assert_eq!(json, "\"emergency\"");
    }
}
