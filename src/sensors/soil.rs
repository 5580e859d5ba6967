//! Capacitive soil-moisture probe — analog output, ADC1 channel.
//!
//! Raw ADC counts are mapped to a percentage using a two-point calibration
//! captured in air (dry) and in water (saturated). Calibration is typically
//! `cal_air_raw > cal_water_raw` (higher raw count in air for this class of
//! probe) but the mapping works symmetrically if reversed.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the ADC1 oneshot channel initialised by hw_init.
//! On host/test: reads from a static `AtomicU16` for injection.

use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::pins;

static SIM_SOIL_ADC: AtomicU16 = AtomicU16::new(2048);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_soil_adc(raw: u16) {
    SIM_SOIL_ADC.store(raw, Ordering::Relaxed);
}

pub struct SoilSensor {
    _adc_gpio: i32,
}

impl SoilSensor {
    pub fn new() -> Self {
        Self {
            _adc_gpio: pins::SOIL_ADC_GPIO,
        }
    }

    pub fn read_raw(&self) -> u16 {
        self.read_adc()
    }

    /// Map a raw ADC count to a moisture percentage using the two-point
    /// calibration: `cal_air_raw` (dry probe) maps to 0%, `cal_water_raw`
    /// (saturated probe) maps to 100%. Clamped to the calibrated span.
    pub fn raw_to_percent(raw: u16, cal_air_raw: i32, cal_water_raw: i32) -> u8 {
        let raw = raw as i32;
        let (lo, hi) = if cal_water_raw <= cal_air_raw {
            (cal_water_raw, cal_air_raw)
        } else {
            (cal_air_raw, cal_water_raw)
        };
        let span = (hi - lo).max(1);
        let clamped = raw.clamp(lo, hi);

        // Orient the fraction so that cal_air_raw always lands at 0% and
        // cal_water_raw always lands at 100%, regardless of which is larger.
        let fraction = if cal_water_raw <= cal_air_raw {
            (cal_air_raw - clamped) as f32 / span as f32
        } else {
            (clamped - cal_air_raw) as f32 / span as f32
        };

        (fraction * 100.0).round().clamp(0.0, 100.0) as u8
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        hw_init::adc1_read(hw_init::ADC1_CH_SOIL)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_SOIL_ADC.load(Ordering::Relaxed)
    }
}

impl Default for SoilSensor {
    fn default() -> Self {
        Self::new()
    }
}
