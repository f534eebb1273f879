/// Analog-to-concentration conversion for the MQ-series gas sensors
use std::error::Error;
use std::fmt;

// ADC front end shared by both MQ channels
pub const VREF: f32 = 5.0; // ADC reference voltage
pub const RL_KOHM: f32 = 10.0; // load resistor, kΩ
pub const ADC_MAX: u16 = 4095; // 12-bit resolution

/// Empirical datasheet curve: ppm = a * (Rs/R0)^b
#[derive(Debug, Clone, Copy)]
pub struct GasCurve {
    pub a: f32,
    pub b: f32,
}

/// MQ135 CO₂ approximation curve
pub const MQ135_CO2_CURVE: GasCurve = GasCurve {
    a: 116.602_068_2,
    b: -2.769_034_857,
};

/// MQ7 CO curve
pub const MQ7_CO_CURVE: GasCurve = GasCurve {
    a: 99.042,
    b: -1.518,
};

/// Raw samples the resistance model is undefined for.
///
/// A zero sample divides by zero; a saturated sample collapses Rs to
/// zero (or below) and the negative-exponent power law blows up. Both
/// must surface as errors instead of a NaN/Inf that would otherwise be
/// averaged and uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionError {
    ZeroSample,
    SaturatedSample(u16),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConversionError::ZeroSample => write!(f, "ADC sample is zero"),
            ConversionError::SaturatedSample(raw) => {
                write!(f, "ADC sample {} is at or above full scale", raw)
            }
        }
    }
}

impl Error for ConversionError {}

/// Compute the sensor load resistance (kΩ) from a raw ADC sample
///
/// Rs = (Vref - V) * RL / V with V = raw * Vref / 4095.
///
/// # Arguments
/// * `raw` - 12-bit ADC sample, must be in (0, 4095)
///
/// # Returns
/// The load resistance, or an error for samples outside the model's domain
pub fn load_resistance(raw: u16) -> Result<f32, ConversionError> {
    if raw == 0 {
        return Err(ConversionError::ZeroSample);
    }
    if raw >= ADC_MAX {
        return Err(ConversionError::SaturatedSample(raw));
    }

    let voltage = raw as f32 * (VREF / ADC_MAX as f32);
    Ok(((VREF - voltage) * RL_KOHM) / voltage)
}

/// One calibrated gas channel: a datasheet curve plus the clean-air
/// baseline resistance R0 measured for the physical sensor.
#[derive(Debug, Clone, Copy)]
pub struct GasSensorModel {
    curve: GasCurve,
    r0: f32,
}

impl GasSensorModel {
    pub fn new(curve: GasCurve, r0: f32) -> Self {
        GasSensorModel { curve, r0 }
    }

    /// Estimate the gas concentration in ppm for a raw ADC sample
    ///
    /// # Returns
    /// The ppm estimate, or an error for out-of-domain samples
    pub fn ppm(&self, raw: u16) -> Result<f32, ConversionError> {
        let rs = load_resistance(raw)?;
        let ratio = rs / self.r0;
        Ok(self.curve.a * ratio.powf(self.curve.b))
    }
}
