use crate::ingest::Ingestor;
use crate::ping::PingGenerator;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// The slowest rate a simulation will run at, in pings per second.
const MIN_RATE: f64 = 0.1;

/// The parameters of one simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// How long the run lasts, in s.
    #[serde(alias = "duration_s")]
    pub duration_seconds: u64,
    /// How many pings to generate per second.
    #[serde(alias = "rps")]
    pub rate_per_second: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 60,
            rate_per_second: 5.0,
        }
    }
}

impl SimulationConfig {
    pub fn new(duration_seconds: u64, rate_per_second: f64) -> Self {
        Self {
            duration_seconds,
            rate_per_second,
        }
    }

    /// The interval between generated pings.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::max(self.rate_per_second, MIN_RATE))
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }
}

/// A background generator loop that is currently (or was recently) running.
struct Run {
    /// Dropped to cancel the loop.
    stop: Sender<()>,
    /// Disconnects once the loop has exited.
    done: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Run {
    fn is_finished(&self) -> bool {
        matches!(self.done.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Cancels the loop and waits up to `wait` for it to exit.
    /// Returns `false` if the loop was detached while still running.
    fn cancel(self, wait: Duration) -> bool {
        let Run { stop, done, handle } = self;
        drop(stop);
        match done.recv_timeout(wait) {
            Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    log::warn!("simulation loop panicked");
                }
                true
            }
            Ok(()) | Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

#[derive(Default)]
struct Runs {
    /// The number of runs started.
    started: u64,
    active: Option<Run>,
}

/// Feeds synthetic telemetry through an [Ingestor] in the background.
///
/// At most one generator loop submits pings at a time.
pub struct SimulationDriver {
    ingestor: Ingestor,
    /// Seeds each run's generator, offset by the run number.
    seed: Option<u64>,
    /// How long a restart waits for the previous loop to exit.
    restart_wait: Duration,
    runs: Mutex<Runs>,
}

impl SimulationDriver {
    pub fn new(ingestor: Ingestor, seed: Option<u64>, restart_wait: Duration) -> Self {
        Self {
            ingestor,
            seed,
            restart_wait,
            runs: Mutex::new(Runs::default()),
        }
    }

    /// Starts a simulation run, cancelling any run already in progress.
    pub fn start(&self, config: SimulationConfig) -> std::io::Result<()> {
        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(run) = runs.active.take() {
            if !run.is_finished() {
                log::info!("restarting simulation");
            }
            if !run.cancel(self.restart_wait) {
                log::warn!(
                    "previous simulation loop did not exit within {:?}; detaching it",
                    self.restart_wait
                );
            }
        }

        runs.started += 1;
        let generator = match self.seed {
            Some(seed) => PingGenerator::seeded(seed.wrapping_add(runs.started)),
            None => PingGenerator::new(),
        };
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let ingestor = self.ingestor.clone();

        log::info!(
            "starting simulation: {}s at {} pings/s",
            config.duration_seconds,
            config.rate_per_second
        );
        let handle = std::thread::Builder::new()
            .name(format!("simulation-{}", runs.started))
            .spawn(move || run_loop(ingestor, generator, config, stop_rx, done_tx))?;

        runs.active = Some(Run {
            stop: stop_tx,
            done: done_rx,
            handle,
        });
        Ok(())
    }

    /// Stops the active run, if any, waiting boundedly for it to exit.
    pub fn stop(&self) {
        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(run) = runs.active.take() {
            log::info!("stopping simulation");
            if !run.cancel(self.restart_wait) {
                log::warn!("simulation loop did not exit within {:?}", self.restart_wait);
            }
        }
    }

    /// Whether a generator loop is currently running.
    pub fn is_running(&self) -> bool {
        let runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        runs.active.as_ref().map_or(false, |run| !run.is_finished())
    }
}

/// Generates and submits pings until the run elapses or is cancelled.
fn run_loop(
    ingestor: Ingestor,
    mut generator: PingGenerator,
    config: SimulationConfig,
    stop: Receiver<()>,
    _done: Sender<()>,
) {
    // A deadline past what `Instant` can represent means the run never elapses.
    let deadline = Instant::now().checked_add(config.duration());
    let period = config.period();
    let mut submitted = 0usize;

    while deadline.map_or(true, |d| Instant::now() < d) && !is_cancelled(&stop) {
        let ping = generator.next_ping();
        match ingestor.submit(&ping) {
            Ok(_) => submitted += 1,
            Err(err) => log::debug!("simulated ping dropped: {}", err),
        }
        match stop.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    log::info!("simulation finished after {} pings", submitted);
}

fn is_cancelled(stop: &Receiver<()>) -> bool {
    !matches!(stop.try_recv(), Err(TryRecvError::Empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SignalController;
    use crate::error::PredictionError;
    use crate::ingest::{AnomalyGuard, AnomalyVerdict};
    use crate::metrics::MetricsAggregator;
    use crate::ping::TelemetryPing;
    use crate::pipeline::{PingPipeline, Predictor};
    use std::sync::Arc;

    struct Unit;

    impl Predictor for Unit {
        fn predict_eta(&self, _: &TelemetryPing) -> Result<f64, PredictionError> {
            Ok(1.0)
        }

        fn predict_queue_next(&self, _: &TelemetryPing) -> Result<f64, PredictionError> {
            Ok(1.0)
        }
    }

    struct AcceptAll;

    impl AnomalyGuard for AcceptAll {
        fn check(&self, _: &TelemetryPing) -> Result<AnomalyVerdict, PredictionError> {
            Ok(AnomalyVerdict {
                is_anomalous: false,
                score: 1.0,
            })
        }
    }

    fn driver() -> (SimulationDriver, Arc<PingPipeline>) {
        let pipeline = Arc::new(PingPipeline::new(
            Box::new(Unit),
            SignalController::new(),
            MetricsAggregator::default(),
        ));
        let ingestor = Ingestor::new(Arc::new(AcceptAll), pipeline.clone());
        let driver = SimulationDriver::new(ingestor, Some(11), Duration::from_secs(1));
        (driver, pipeline)
    }

    #[test]
    fn unbounded_duration_keeps_running() {
        let (driver, pipeline) = driver();
        driver.start(SimulationConfig::new(u64::MAX, 50.0)).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        assert!(driver.is_running());
        assert!(pipeline.metrics_snapshot().pings_processed > 0);
        driver.stop();
        assert!(!driver.is_running());
    }

    #[test]
    fn rate_has_a_floor() {
        assert_eq!(SimulationConfig::new(1, 0.0).period(), Duration::from_secs(10));
        assert_eq!(SimulationConfig::new(1, -4.0).period(), Duration::from_secs(10));
        assert_eq!(
            SimulationConfig::new(1, 4.0).period(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn accepts_short_field_names() {
        let config: SimulationConfig = serde_json::from_str(r#"{"duration_s": 30}"#).unwrap();
        assert_eq!(config, SimulationConfig::new(30, 5.0));
        let config: SimulationConfig =
            serde_json::from_str(r#"{"duration_seconds": 2, "rps": 50.0}"#).unwrap();
        assert_eq!(config, SimulationConfig::new(2, 50.0));
    }
}
