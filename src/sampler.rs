/// Fixed-window sensor sampling and averaging
use log::{debug, warn};
use tokio::time::Duration;

use crate::clock::Delay;
use crate::gas::{GasSensorModel, MQ135_CO2_CURVE, MQ7_CO_CURVE};
use crate::models::{AveragedReading, CalibrationConstants, SensorSample};
use crate::sensors::SensorBoard;

pub const SAMPLE_COUNT: u32 = 5;
pub const SAMPLE_DELAY_MS: u64 = 200;

/// What the per-field sums get divided by at the end of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivisorStrategy {
    /// Divide by the full window size even when ticks dropped out;
    /// dropped ticks pull the averages toward zero.
    FixedWindow,
    /// Divide by the number of ticks that actually contributed.
    ValidSamples,
}

impl DivisorStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "window" | "fixed" => Some(DivisorStrategy::FixedWindow),
            "valid" => Some(DivisorStrategy::ValidSamples),
            _ => None,
        }
    }
}

pub struct SamplingAverager {
    co2_model: GasSensorModel,
    co_model: GasSensorModel,
    divisor: DivisorStrategy,
    window: u32,
    tick_delay: Duration,
}

impl SamplingAverager {
    pub fn new(calibration: CalibrationConstants, divisor: DivisorStrategy) -> Self {
        SamplingAverager {
            co2_model: GasSensorModel::new(MQ135_CO2_CURVE, calibration.r0_mq135),
            co_model: GasSensorModel::new(MQ7_CO_CURVE, calibration.r0_mq7),
            divisor,
            window: SAMPLE_COUNT,
            tick_delay: Duration::from_millis(SAMPLE_DELAY_MS),
        }
    }

    /// Run one sampling window and average it
    ///
    /// Reads every sensor once per tick, `window` ticks spaced by the
    /// tick delay. A tick is accumulated only when its climate reading
    /// is valid and both gas samples are inside the concentration
    /// model's domain; otherwise the whole tick is dropped.
    ///
    /// # Arguments
    /// * `board` - sensor set to read
    /// * `delay` - inter-tick pause implementation
    ///
    /// # Returns
    /// One averaged reading covering the window
    pub async fn collect<B, D>(&self, board: &mut B, delay: &D) -> AveragedReading
    where
        B: SensorBoard + ?Sized,
        D: Delay + ?Sized,
    {
        let mut temperature_sum = 0.0f32;
        let mut humidity_sum = 0.0f32;
        let mut co2_sum = 0.0f32;
        let mut co_sum = 0.0f32;
        let mut mq135_sum = 0i64;
        let mut mq7_sum = 0i64;
        let mut voc_index_sum = 0i64;
        let mut voc_raw_sum = 0i64;
        let mut valid = 0i32;

        for tick in 0..self.window {
            let sample = read_tick(board);

            if sample.climate_valid() {
                match (
                    self.co2_model.ppm(sample.mq135_raw),
                    self.co_model.ppm(sample.mq7_raw),
                ) {
                    (Ok(co2_ppm), Ok(co_ppm)) => {
                        temperature_sum += sample.temperature;
                        humidity_sum += sample.humidity;
                        co2_sum += co2_ppm;
                        co_sum += co_ppm;
                        mq135_sum += sample.mq135_raw as i64;
                        mq7_sum += sample.mq7_raw as i64;
                        voc_index_sum += sample.voc_index as i64;
                        voc_raw_sum += sample.voc_raw as i64;
                        valid += 1;
                    }
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Dropping tick {}: gas sample out of range: {}", tick + 1, e);
                    }
                }
            } else {
                debug!("Dropping tick {}: climate read failed", tick + 1);
            }

            delay.pause(self.tick_delay).await;
        }

        let divisor = match self.divisor {
            DivisorStrategy::FixedWindow => self.window as i64,
            DivisorStrategy::ValidSamples => i64::from(valid.max(1)),
        };

        AveragedReading {
            temperature: round2(temperature_sum / divisor as f32),
            humidity: round2(humidity_sum / divisor as f32),
            mq135_raw: (mq135_sum / divisor) as i32,
            mq7_raw: (mq7_sum / divisor) as i32,
            voc_index: (voc_index_sum / divisor) as i32,
            voc_raw: (voc_raw_sum / divisor) as i32,
            co2_ppm: round2(co2_sum / divisor as f32),
            co_ppm: round2(co_sum / divisor as f32),
            valid_samples: valid,
        }
    }
}

fn read_tick<B: SensorBoard + ?Sized>(board: &mut B) -> SensorSample {
    let climate = board.read_climate();
    let mq135_raw = board.read_mq135_raw();
    let mq7_raw = board.read_mq7_raw();
    // VOC measurement takes the tick's climate for compensation, even
    // when the climate read failed; an invalid tick discards it anyway
    let voc = board.read_voc(climate.temperature, climate.humidity);

    SensorSample {
        temperature: climate.temperature,
        humidity: climate.humidity,
        mq135_raw,
        mq7_raw,
        voc_index: voc.index,
        voc_raw: voc.raw,
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
