//! AHT20-class I2C temperature/humidity sensor driver.
//!
//! Single-shot measurement over I2C: write the measurement trigger command,
//! wait for the conversion, read back 6 status/data bytes.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: issues the real I2C transaction via hw_init's bus handle.
//! On host/test: reads from injectable static state, with optional fault
//! injection for exercising the retain-previous path in tests.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::SensorError;
use crate::pins;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

static SIM_TEMP_C_BITS: AtomicU32 = AtomicU32::new(0);
static SIM_HUM_PCT_BITS: AtomicU32 = AtomicU32::new(0);
static SIM_FAIL_NEXT: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_reading(temp_c: f32, hum_pct: f32) {
    SIM_TEMP_C_BITS.store(temp_c.to_bits(), Ordering::Relaxed);
    SIM_HUM_PCT_BITS.store(hum_pct.to_bits(), Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_fail_next_read() {
    SIM_FAIL_NEXT.store(true, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
pub struct ClimateReading {
    pub temp_c: f32,
    pub hum_pct: f32,
}

pub struct ClimateSensor {
    _i2c_addr: u8,
}

impl ClimateSensor {
    pub fn new() -> Self {
        Self {
            _i2c_addr: pins::CLIMATE_I2C_ADDR,
        }
    }

    /// Trigger a measurement and read it back. Callers retain the previous
    /// good reading on `Err` — a transient I2C glitch must not propagate a
    /// bogus value into the control path.
    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.read_i2c()
    }

    #[cfg(target_os = "espidf")]
    fn read_i2c(&mut self) -> Result<ClimateReading, SensorError> {
        hw_init::i2c_read_climate(self._i2c_addr)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_i2c(&mut self) -> Result<ClimateReading, SensorError> {
        if SIM_FAIL_NEXT.swap(false, Ordering::Relaxed) {
            return Err(SensorError::I2cReadFailed);
        }
        let temp_c = f32::from_bits(SIM_TEMP_C_BITS.load(Ordering::Relaxed));
        let hum_pct = f32::from_bits(SIM_HUM_PCT_BITS.load(Ordering::Relaxed));
        Ok(ClimateReading { temp_c, hum_pct })
    }
}

impl Default for ClimateSensor {
    fn default() -> Self {
        Self::new()
    }
}
