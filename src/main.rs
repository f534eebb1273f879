mod clock;
mod config;
mod connectivity;
mod controller;
mod firebase;
mod gas;
mod models;
mod sampler;
mod scheduler;
mod sensors;
mod utils;

use log::{error, info};
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

use clock::{SystemClock, TokioDelay};
use config::DeviceConfig;
use controller::DeviceController;
use firebase::{RemoteStore, RtdbClient};
use sampler::SamplingAverager;
use scheduler::UploadScheduler;
use sensors::IioSensorBoard;
use utils::format_datetime;

const LOOP_TICK_MS: u64 = 250;
const SENSOR_WARMUP_SECS: u64 = 15;

async fn main_loop(
    mut controller: DeviceController<IioSensorBoard, RtdbClient, SystemClock, TokioDelay>,
) {
    info!(
        "Starting upload loop at: {}",
        format_datetime(&OffsetDateTime::now_utc())
    );

    loop {
        controller.service().await;
        sleep(Duration::from_millis(LOOP_TICK_MS)).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match DeviceConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Wi-Fi provisioning is the platform's job; if the uplink is down
    // there is nothing to recover locally
    if !connectivity::ensure_online(&config.probe_url).await {
        error!("Network unreachable. Exiting for supervisor restart.");
        std::process::exit(1);
    }

    let clock = SystemClock::new();
    info!("Waiting for time sync...");
    clock::wait_for_time_sync(&clock, &TokioDelay).await;
    info!(
        "Time synced at: {}",
        format_datetime(&OffsetDateTime::now_utc())
    );

    let mut store = RtdbClient::new(&config.database_url, config.auth.clone())?;
    store.maintain().await;

    let board = IioSensorBoard::new(config.sensor_paths.clone());

    info!("Warming up sensors...");
    sleep(Duration::from_secs(SENSOR_WARMUP_SECS)).await;

    let controller = DeviceController::new(
        board,
        store,
        clock,
        TokioDelay,
        UploadScheduler::new(config.send_interval_ms),
        SamplingAverager::new(config.calibration, config.divisor),
    );

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        let _ = tx.send(());
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        _ = main_loop(controller) => {}
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
