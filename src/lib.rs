pub use approach::{Approach, ApproachState, ApproachStats, UnknownApproach, APPROACHES};
pub use config::Settings;
pub use controller::{ControllerSnapshot, Decision, SignalController, SignalTiming};
pub use driver::{SimulationConfig, SimulationDriver};
pub use error::{ConfigError, IngestError, PredictionError};
pub use ingest::{AnomalyGuard, AnomalyVerdict, Ingestor};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use ping::{PingGenerator, TelemetryPing, VehicleType};
pub use pipeline::{PingPipeline, PingResult, Predictor};
pub use system::SignalSystem;

pub mod approach;
pub mod config;
mod controller;
mod driver;
mod error;
mod ingest;
pub mod metrics;
pub mod models;
mod ping;
mod pipeline;
mod system;
