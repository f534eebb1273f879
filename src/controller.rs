/// Device control: session upkeep, the upload gate, the per-cycle
/// write sequence and per-write status reporting. All mutable device
/// state lives here; the main loop just polls.
use log::{error, info, warn};

use crate::clock::{Clock, Delay};
use crate::firebase::RemoteStore;
use crate::models::AveragedReading;
use crate::sampler::{SamplingAverager, SAMPLE_COUNT};
use crate::scheduler::UploadScheduler;
use crate::sensors::SensorBoard;

pub struct DeviceController<B, S, C, D> {
    board: B,
    store: S,
    clock: C,
    delay: D,
    scheduler: UploadScheduler,
    averager: SamplingAverager,
}

impl<B, S, C, D> DeviceController<B, S, C, D>
where
    B: SensorBoard,
    S: RemoteStore,
    C: Clock,
    D: Delay,
{
    pub fn new(
        board: B,
        store: S,
        clock: C,
        delay: D,
        scheduler: UploadScheduler,
        averager: SamplingAverager,
    ) -> Self {
        DeviceController {
            board,
            store,
            clock,
            delay,
            scheduler,
            averager,
        }
    }

    /// One control-loop pass: keep the session alive, then check the
    /// gate. Readiness is evaluated before the gate so a not-ready
    /// interval is carried over instead of consumed.
    pub async fn service(&mut self) {
        self.store.maintain().await;

        let now = self.clock.monotonic_millis();
        if self.store.ready() && self.scheduler.poll(now) {
            self.run_upload_cycle().await;
        }
    }

    /// One upload cycle: heartbeat first, then the averaged data
    /// unless a fresh climate reading fails the precheck.
    async fn run_upload_cycle(&mut self) {
        self.send_heartbeat().await;

        let climate = self.board.read_climate();
        if !climate.is_valid() {
            warn!("Climate read failed; heartbeat sent, skipping full upload");
            return;
        }

        let avg = self.averager.collect(&mut self.board, &self.delay).await;
        self.send_averaged(&avg).await;
    }

    async fn send_heartbeat(&mut self) {
        let timestamp = self.clock.unix_seconds();
        info!("Heartbeat: timestamp = {}", timestamp);
        let ok = self
            .store
            .set_number("/AirQuality/timestamp", timestamp as f64, 0)
            .await;
        self.report("/AirQuality/timestamp", ok);
    }

    async fn send_averaged(&mut self, avg: &AveragedReading) {
        info!(
            "AVG temp: {:.2}°C, humid: {:.2}%, CO2: {:.2} ppm, CO: {:.2} ppm, VOC: {} ({}/{} ticks)",
            avg.temperature,
            avg.humidity,
            avg.co2_ppm,
            avg.co_ppm,
            avg.voc_index,
            avg.valid_samples,
            SAMPLE_COUNT
        );

        let timestamp = self.clock.unix_seconds();

        let ok = self
            .store
            .set_number("/AirQuality/temp", avg.temperature as f64, 2)
            .await;
        self.report("/AirQuality/temp", ok);

        let ok = self
            .store
            .set_number("/AirQuality/humid", avg.humidity as f64, 2)
            .await;
        self.report("/AirQuality/humid", ok);

        let ok = self
            .store
            .set_int("/RawData/MQ135_raw", avg.mq135_raw as i64)
            .await;
        self.report("/RawData/MQ135_raw", ok);

        let ok = self
            .store
            .set_int("/RawData/MQ7_raw", avg.mq7_raw as i64)
            .await;
        self.report("/RawData/MQ7_raw", ok);

        let ok = self
            .store
            .set_number("/AirQuality/CO2_ppm", avg.co2_ppm as f64, 2)
            .await;
        self.report("/AirQuality/CO2_ppm", ok);

        let ok = self
            .store
            .set_number("/AirQuality/CO_ppm", avg.co_ppm as f64, 2)
            .await;
        self.report("/AirQuality/CO_ppm", ok);

        let ok = self
            .store
            .set_int("/AirQuality/VOC", avg.voc_index as i64)
            .await;
        self.report("/AirQuality/VOC", ok);

        let ok = self
            .store
            .set_int("/RawData/VOC_RAW", avg.voc_raw as i64)
            .await;
        self.report("/RawData/VOC_RAW", ok);

        let ok = self
            .store
            .set_number("/AirQuality/last_data_push", timestamp as f64, 0)
            .await;
        self.report("/AirQuality/last_data_push", ok);

        let ok = self
            .store
            .set_number("/AirQuality/timestamp", timestamp as f64, 0)
            .await;
        self.report("/AirQuality/timestamp", ok);
    }

    /// Log each write's outcome; failures carry the transport's
    /// retained message and code. No retry.
    fn report(&self, path: &str, ok: bool) {
        if ok {
            info!("Data sent: {}", path);
        } else {
            match self.store.last_error() {
                Some(e) => error!("Write failed for {}: {}", path, e),
                None => error!("Write failed for {}", path),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Delay;
    use crate::firebase::FirebaseError;
    use crate::models::CalibrationConstants;
    use crate::sampler::DivisorStrategy;
    use crate::sensors::{ClimateReading, VocReading};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Write {
        Number(String, f64, u8),
        Int(String, i64),
    }

    impl Write {
        fn path(&self) -> &str {
            match self {
                Write::Number(path, _, _) | Write::Int(path, _) => path,
            }
        }
    }

    #[derive(Clone)]
    struct FakeStore {
        writes: Arc<Mutex<Vec<Write>>>,
        ready: Arc<AtomicBool>,
    }

    impl FakeStore {
        fn new(ready: bool) -> Self {
            FakeStore {
                writes: Arc::new(Mutex::new(Vec::new())),
                ready: Arc::new(AtomicBool::new(ready)),
            }
        }

        fn recorded(&self) -> Vec<Write> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteStore for FakeStore {
        async fn maintain(&mut self) {}

        fn ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn last_error(&self) -> Option<&FirebaseError> {
            None
        }

        async fn set_number(&mut self, path: &str, value: f64, decimals: u8) -> bool {
            self.writes
                .lock()
                .unwrap()
                .push(Write::Number(path.to_string(), value, decimals));
            true
        }

        async fn set_int(&mut self, path: &str, value: i64) -> bool {
            self.writes
                .lock()
                .unwrap()
                .push(Write::Int(path.to_string(), value));
            true
        }
    }

    #[derive(Clone)]
    struct TestClock {
        now_ms: Arc<AtomicU64>,
        unix: Arc<AtomicI64>,
    }

    impl Clock for TestClock {
        fn monotonic_millis(&self) -> u64 {
            self.now_ms.load(Ordering::SeqCst)
        }

        fn unix_seconds(&self) -> i64 {
            self.unix.load(Ordering::SeqCst)
        }
    }

    struct NoDelay;

    #[async_trait]
    impl Delay for NoDelay {
        async fn pause(&self, _duration: Duration) {}
    }

    struct FixedBoard {
        climate_ok: bool,
    }

    impl SensorBoard for FixedBoard {
        fn read_climate(&mut self) -> ClimateReading {
            if self.climate_ok {
                ClimateReading {
                    temperature: 22.0,
                    humidity: 50.0,
                }
            } else {
                ClimateReading::invalid()
            }
        }

        fn read_mq135_raw(&mut self) -> u16 {
            500
        }

        fn read_mq7_raw(&mut self) -> u16 {
            300
        }

        fn read_voc(&mut self, _temperature: f32, _humidity: f32) -> VocReading {
            VocReading {
                index: 100,
                raw: 30000,
            }
        }
    }

    fn controller(
        climate_ok: bool,
        store: FakeStore,
        clock: TestClock,
    ) -> DeviceController<FixedBoard, FakeStore, TestClock, NoDelay> {
        DeviceController::new(
            FixedBoard { climate_ok },
            store,
            clock,
            NoDelay,
            UploadScheduler::new(10_000),
            SamplingAverager::new(
                CalibrationConstants {
                    r0_mq135: 76.63,
                    r0_mq7: 10.0,
                },
                DivisorStrategy::FixedWindow,
            ),
        )
    }

    fn clock_at(now_ms: u64, unix: i64) -> TestClock {
        TestClock {
            now_ms: Arc::new(AtomicU64::new(now_ms)),
            unix: Arc::new(AtomicI64::new(unix)),
        }
    }

    #[tokio::test]
    async fn elapsed_interval_fires_exactly_one_cycle() {
        let store = FakeStore::new(true);
        let clock = clock_at(10_001, 1_700_000_100);
        let mut controller = controller(true, store.clone(), clock.clone());

        controller.service().await;

        let writes = store.recorded();
        let paths: Vec<&str> = writes.iter().map(|w| w.path()).collect();
        assert_eq!(
            paths,
            vec![
                "/AirQuality/timestamp",
                "/AirQuality/temp",
                "/AirQuality/humid",
                "/RawData/MQ135_raw",
                "/RawData/MQ7_raw",
                "/AirQuality/CO2_ppm",
                "/AirQuality/CO_ppm",
                "/AirQuality/VOC",
                "/RawData/VOC_RAW",
                "/AirQuality/last_data_push",
                "/AirQuality/timestamp",
            ]
        );
        assert_eq!(
            writes[0],
            Write::Number("/AirQuality/timestamp".to_string(), 1_700_000_100.0, 0)
        );
        assert_eq!(writes[3], Write::Int("/RawData/MQ135_raw".to_string(), 500));

        // Gate consumed; the immediate next pass stays quiet
        clock.now_ms.store(10_002, Ordering::SeqCst);
        controller.service().await;
        assert_eq!(store.recorded().len(), writes.len());
    }

    #[tokio::test]
    async fn no_cycle_before_interval() {
        let store = FakeStore::new(true);
        let mut controller = controller(true, store.clone(), clock_at(9_999, 1_700_000_000));

        controller.service().await;

        assert!(store.recorded().is_empty());
    }

    #[tokio::test]
    async fn not_ready_holds_the_gate_without_consuming_it() {
        let store = FakeStore::new(false);
        let clock = clock_at(20_000, 1_700_000_000);
        let mut controller = controller(true, store.clone(), clock.clone());

        controller.service().await;
        assert!(store.recorded().is_empty());

        // Session comes back one millisecond later; the overdue
        // interval must still fire
        store.ready.store(true, Ordering::SeqCst);
        clock.now_ms.store(20_001, Ordering::SeqCst);
        controller.service().await;
        assert_eq!(store.recorded().len(), 11);
    }

    #[tokio::test]
    async fn failed_climate_precheck_sends_heartbeat_only() {
        let store = FakeStore::new(true);
        let mut controller = controller(false, store.clone(), clock_at(10_001, 1_700_000_100));

        controller.service().await;

        let writes = store.recorded();
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0],
            Write::Number("/AirQuality/timestamp".to_string(), 1_700_000_100.0, 0)
        );
    }

    #[tokio::test]
    async fn averaged_values_flow_into_the_writes() {
        let store = FakeStore::new(true);
        let mut controller = controller(true, store.clone(), clock_at(10_001, 1_700_000_100));

        controller.service().await;

        let writes = store.recorded();
        match &writes[1] {
            Write::Number(path, value, 2) => {
                assert_eq!(path, "/AirQuality/temp");
                assert!((value - 22.0).abs() < 1e-6);
            }
            other => panic!("unexpected write {:?}", other),
        }
        match &writes[5] {
            Write::Number(path, value, 2) => {
                assert_eq!(path, "/AirQuality/CO2_ppm");
                assert!((value - 139.1).abs() < 0.5);
            }
            other => panic!("unexpected write {:?}", other),
        }
    }
}
