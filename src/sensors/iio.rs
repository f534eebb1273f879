/// Sensor access through the Linux IIO sysfs interface
///
/// The board wires the DHT22, both MQ channels (via the ADC) and the
/// SGP40 to kernel drivers; each reading is one sysfs attribute file.
/// Climate attributes report millidegrees / millipercent, the gas
/// attributes raw ADC counts.
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sensors::{ClimateReading, SensorBoard, VocReading};

/// Sysfs attribute locations for every channel on the board.
#[derive(Debug, Clone)]
pub struct IioPaths {
    pub temperature: PathBuf,
    pub humidity: PathBuf,
    pub mq135: PathBuf,
    pub mq7: PathBuf,
    pub voc_index: PathBuf,
    pub voc_raw: PathBuf,
}

pub struct IioSensorBoard {
    paths: IioPaths,
}

impl IioSensorBoard {
    pub fn new(paths: IioPaths) -> Self {
        IioSensorBoard { paths }
    }

    /// Read and parse one sysfs attribute
    ///
    /// Returns None on I/O or parse failure; the caller substitutes the
    /// sentinel its validity gate understands.
    fn read_attr(path: &Path) -> Option<i64> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };

        match contents.trim().parse::<i64>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Unparseable value in {}: {}", path.display(), e);
                None
            }
        }
    }

    fn read_adc_counts(path: &Path) -> u16 {
        // A failed channel degrades to 0, which the concentration model
        // rejects as out of domain before it can reach an upload.
        Self::read_attr(path)
            .map(|value| value.clamp(0, u16::MAX as i64) as u16)
            .unwrap_or(0)
    }
}

impl SensorBoard for IioSensorBoard {
    fn read_climate(&mut self) -> ClimateReading {
        let temperature = Self::read_attr(&self.paths.temperature);
        let humidity = Self::read_attr(&self.paths.humidity);

        match (temperature, humidity) {
            (Some(temperature), Some(humidity)) => ClimateReading {
                temperature: temperature as f32 / 1000.0,
                humidity: humidity as f32 / 1000.0,
            },
            _ => ClimateReading::invalid(),
        }
    }

    fn read_mq135_raw(&mut self) -> u16 {
        Self::read_adc_counts(&self.paths.mq135)
    }

    fn read_mq7_raw(&mut self) -> u16 {
        Self::read_adc_counts(&self.paths.mq7)
    }

    fn read_voc(&mut self, _temperature: f32, _humidity: f32) -> VocReading {
        // The kernel sgp40 driver applies its own climate compensation;
        // the passed values are for boards driven directly.
        VocReading {
            index: Self::read_attr(&self.paths.voc_index).unwrap_or(0) as i32,
            raw: Self::read_attr(&self.paths.voc_raw)
                .map(|value| value.clamp(0, u16::MAX as i64) as u16)
                .unwrap_or(0),
        }
    }
}
