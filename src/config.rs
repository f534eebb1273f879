use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::firebase::auth::UserAuth;
use crate::models::CalibrationConstants;
use crate::sampler::DivisorStrategy;
use crate::sensors::IioPaths;

// Clean-air baselines measured for this board
const DEFAULT_R0_MQ135: f32 = 76.63;
const DEFAULT_R0_MQ7: f32 = 10.0;

const DEFAULT_SEND_INTERVAL_MS: u64 = 10_000;
const DEFAULT_PROBE_URL: &str = "http://connectivitycheck.gstatic.com/generate_204";

// Default IIO attribute locations for the gateway image
const DEFAULT_TEMP_PATH: &str = "/sys/bus/iio/devices/iio:device0/in_temp_input";
const DEFAULT_HUMIDITY_PATH: &str = "/sys/bus/iio/devices/iio:device0/in_humidityrelative_input";
const DEFAULT_MQ135_PATH: &str = "/sys/bus/iio/devices/iio:device1/in_voltage0_raw";
const DEFAULT_MQ7_PATH: &str = "/sys/bus/iio/devices/iio:device1/in_voltage1_raw";
const DEFAULT_VOC_INDEX_PATH: &str = "/sys/bus/iio/devices/iio:device2/in_concentration_input";
const DEFAULT_VOC_RAW_PATH: &str = "/sys/bus/iio/devices/iio:device2/in_resistance_raw";

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub database_url: String,
    pub auth: UserAuth,
    pub send_interval_ms: u64,
    pub divisor: DivisorStrategy,
    pub calibration: CalibrationConstants,
    pub probe_url: String,
    pub sensor_paths: IioPaths,
}

impl DeviceConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL environment variable not set")?;
        url::Url::parse(&database_url)
            .map_err(|e| format!("DATABASE_URL is not a valid URL: {}", e))?;

        let auth = UserAuth {
            api_key: env::var("FIREBASE_API_KEY")
                .map_err(|_| "FIREBASE_API_KEY environment variable not set")?,
            email: env::var("FIREBASE_USER_EMAIL")
                .map_err(|_| "FIREBASE_USER_EMAIL environment variable not set")?,
            password: env::var("FIREBASE_USER_PASSWORD")
                .map_err(|_| "FIREBASE_USER_PASSWORD environment variable not set")?,
        };

        let divisor = match env::var("AVG_DIVISOR") {
            Ok(value) => DivisorStrategy::parse(&value)
                .ok_or_else(|| format!("Unknown AVG_DIVISOR value '{}'", value))?,
            Err(_) => DivisorStrategy::FixedWindow,
        };

        let calibration = CalibrationConstants {
            r0_mq135: parse_or("R0_MQ135", DEFAULT_R0_MQ135)?,
            r0_mq7: parse_or("R0_MQ7", DEFAULT_R0_MQ7)?,
        };

        let sensor_paths = IioPaths {
            temperature: path_or("IIO_TEMP_PATH", DEFAULT_TEMP_PATH),
            humidity: path_or("IIO_HUMIDITY_PATH", DEFAULT_HUMIDITY_PATH),
            mq135: path_or("IIO_MQ135_PATH", DEFAULT_MQ135_PATH),
            mq7: path_or("IIO_MQ7_PATH", DEFAULT_MQ7_PATH),
            voc_index: path_or("IIO_VOC_INDEX_PATH", DEFAULT_VOC_INDEX_PATH),
            voc_raw: path_or("IIO_VOC_RAW_PATH", DEFAULT_VOC_RAW_PATH),
        };

        Ok(DeviceConfig {
            database_url,
            auth,
            send_interval_ms: parse_or("SEND_INTERVAL_MS", DEFAULT_SEND_INTERVAL_MS)?,
            divisor,
            calibration,
            probe_url: env::var("CONNECTIVITY_PROBE_URL")
                .unwrap_or_else(|_| DEFAULT_PROBE_URL.to_string()),
            sensor_paths,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| format!("Invalid {} value '{}': {}", key, value, e)),
        Err(_) => Ok(default),
    }
}

fn path_or(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env::var(key).unwrap_or_else(|_| default.to_string()))
}
