//! ENS160-class I2C eCO2/TVOC air-quality sensor driver.
//!
//! The sensor runs its own internal conversion cycle and exposes a
//! "new data" status bit; a read when no new sample is ready is not an
//! error, it simply yields nothing and the caller retains its last value.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: polls the status register then reads eCO2/TVOC over I2C.
//! On host/test: an injectable "sample ready" flag plus static readings.

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::error::SensorError;
use crate::pins;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

static SIM_ECO2_PPM: AtomicU16 = AtomicU16::new(400);
static SIM_TVOC_PPB: AtomicU16 = AtomicU16::new(0);
static SIM_SAMPLE_READY: AtomicBool = AtomicBool::new(true);
static SIM_FAIL_NEXT: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_reading(eco2_ppm: u16, tvoc_ppb: u16) {
    SIM_ECO2_PPM.store(eco2_ppm, Ordering::Relaxed);
    SIM_TVOC_PPB.store(tvoc_ppb, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_sample_ready(ready: bool) {
    SIM_SAMPLE_READY.store(ready, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_fail_next_read() {
    SIM_FAIL_NEXT.store(true, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
pub struct AirQualityReading {
    pub eco2_ppm: u16,
    pub tvoc_ppb: u16,
}

pub struct AirQualitySensor {
    _i2c_addr: u8,
}

impl AirQualitySensor {
    pub fn new() -> Self {
        Self {
            _i2c_addr: pins::AIR_QUALITY_I2C_ADDR,
        }
    }

    /// `Ok(None)` means the sensor has not produced a new sample since the
    /// last call — not an error, the caller should retain its last reading.
    pub fn read(&mut self) -> Result<Option<AirQualityReading>, SensorError> {
        self.read_i2c()
    }

    #[cfg(target_os = "espidf")]
    fn read_i2c(&mut self) -> Result<Option<AirQualityReading>, SensorError> {
        hw_init::i2c_read_air_quality(self._i2c_addr)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_i2c(&mut self) -> Result<Option<AirQualityReading>, SensorError> {
        if SIM_FAIL_NEXT.swap(false, Ordering::Relaxed) {
            return Err(SensorError::I2cReadFailed);
        }
        if !SIM_SAMPLE_READY.load(Ordering::Relaxed) {
            return Ok(None);
        }
        Ok(Some(AirQualityReading {
            eco2_ppm: SIM_ECO2_PPM.load(Ordering::Relaxed),
            tvoc_ppb: SIM_TVOC_PPB.load(Ordering::Relaxed),
        }))
    }
}

impl Default for AirQualitySensor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // All three scenarios share process-global simulation state, so they
    // run as one test to avoid racing against other #[test] threads.
    #[test]
    fn sample_ready_failure_and_retain_sequence() {
        let mut s = AirQualitySensor::new();

        sim_set_sample_ready(false);
        assert!(s.read().unwrap().is_none());

        sim_set_sample_ready(true);
        sim_set_reading(650, 120);
        let r = s.read().unwrap().unwrap();
        assert_eq!(r.eco2_ppm, 650);
        assert_eq!(r.tvoc_ppb, 120);

        sim_fail_next_read();
        assert!(s.read().is_err());
        assert!(s.read().is_ok());
    }
}
