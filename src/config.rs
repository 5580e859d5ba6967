//! System configuration parameters.
//!
//! All tunable parameters for the greenhouse controller. Values live in NVS
//! (non-volatile storage) and are overridden at runtime by broker commands.

use serde::{Deserialize, Serialize};

/// Persisted configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum temperature (°C) before the heater turns on.
    pub temp_min: f32,
    /// Maximum temperature (°C) before the fan turns on.
    pub temp_max: f32,
    /// Maximum relative humidity (%) before the fan turns on.
    pub hum_max: f32,
    /// Soil moisture (%) below which the pump turns on.
    pub soil_dry: u8,
    /// Soil moisture (%) above which the pump turns off.
    pub soil_wet: u8,
    /// Ultrasonic distance (cm) at which the tank reads empty.
    pub tank_empty_dist: u16,
    /// Ultrasonic distance (cm) at which the tank reads full.
    pub tank_full_dist: u16,
    /// ADC raw count at fully-dry soil (calibration).
    pub cal_air_raw: i32,
    /// ADC raw count at fully-wet soil (calibration).
    pub cal_water_raw: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temp_min: 20.0,
            temp_max: 30.0,
            hum_max: 75.0,
            soil_dry: 40,
            soil_wet: 70,
            tank_empty_dist: 25,
            tank_full_dist: 5,
            cal_air_raw: 4095,
            cal_water_raw: 1670,
        }
    }
}

/// Validation error for a rejected configuration write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigInvalid(pub &'static str);

impl core::fmt::Display for ConfigInvalid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "invalid config: {}", self.0)
    }
}

/// Validate the invariants in the data model: range bounds and the
/// min/max orderings. A write that fails this check must not mutate
/// the stored configuration.
pub fn validate(cfg: &Config) -> Result<(), ConfigInvalid> {
    if !(0.0..=100.0).contains(&cfg.temp_min) || !(0.0..=100.0).contains(&cfg.temp_max) {
        return Err(ConfigInvalid("temperature out of [0,100]"));
    }
    if cfg.temp_min >= cfg.temp_max {
        return Err(ConfigInvalid("temp_min must be < temp_max"));
    }
    if !(0.0..=100.0).contains(&cfg.hum_max) {
        return Err(ConfigInvalid("hum_max out of [0,100]"));
    }
    if cfg.soil_dry > 100 || cfg.soil_wet > 100 {
        return Err(ConfigInvalid("soil thresholds out of [0,100]"));
    }
    if cfg.soil_dry >= cfg.soil_wet {
        return Err(ConfigInvalid("soil_dry must be < soil_wet"));
    }
    if cfg.tank_empty_dist == 0 || cfg.tank_empty_dist >= 1000 {
        return Err(ConfigInvalid("tank_empty_dist out of (0,1000)"));
    }
    if cfg.tank_full_dist == 0 || cfg.tank_full_dist >= 1000 {
        return Err(ConfigInvalid("tank_full_dist out of (0,1000)"));
    }
    if cfg.tank_full_dist >= cfg.tank_empty_dist {
        return Err(ConfigInvalid("tank_full_dist must be < tank_empty_dist"));
    }
    Ok(())
}
