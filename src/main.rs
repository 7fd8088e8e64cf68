use signal_sim::models::{KinematicPredictor, ZScoreGuard};
use signal_sim::{Approach, Settings, SignalSystem, TelemetryPing, VehicleType};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(2);
        }
    };
    let system = SignalSystem::new(
        &settings,
        Box::new(KinematicPredictor),
        Arc::new(settings.anomaly),
    );

    if let Err(err) = system.driver.start(settings.simulation) {
        log::error!("failed to start simulation: {}", err);
        std::process::exit(1);
    }

    std::thread::sleep(Duration::from_secs(2));
    let ping = TelemetryPing {
        vehicle_id: "v001".into(),
        vehicle_type: VehicleType::Car,
        speed: 12.5,
        distance_m: 80.0,
        approach: Approach::E,
        lane_queue: 5.0,
    };
    match system.ingestor.submit(&ping) {
        Ok(result) => println!("{}", json(&result)),
        Err(err) => log::warn!("ping {} not processed: {}", ping.vehicle_id, err),
    }

    while system.driver.is_running() {
        println!("{}", json(&system.pipeline.controller_snapshot().report()));
        println!("{}", json(&system.pipeline.metrics_snapshot().report()));
        std::thread::sleep(Duration::from_secs(5));
    }
    println!("{}", json(&system.pipeline.metrics_snapshot().report()));
}

fn json(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("{{\"error\": \"{}\"}}", err))
}
