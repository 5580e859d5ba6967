//! Sensor subsystem — individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns every sensor driver and produces a [`SensorSnapshot`] each
//! 2 s Sensing cycle. Climate and air-quality readings retain their
//! previous value across a driver error or an "no new sample" result —
//! a single flaky sensor must not propagate a bogus value into Control.

pub mod air_quality;
pub mod climate;
pub mod soil;
pub mod tank;

use crate::config::Config;
use air_quality::AirQualitySensor;
use climate::ClimateSensor;
use soil::SoilSensor;
use tank::TankSensor;

/// Unified, volatile snapshot of every sensed quantity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorSnapshot {
    pub temp_c: f32,
    pub hum_pct: f32,
    pub eco2_ppm: u16,
    pub tvoc_ppb: u16,
    pub soil_pct: u8,
    pub tank_level_pct: u8,
    pub has_water: bool,
    /// Monotonic sample timestamp (uptime seconds at acquisition).
    pub sample_timestamp: u64,
}

/// Aggregates all sensor drivers and produces a unified snapshot.
pub struct SensorHub {
    climate: ClimateSensor,
    air_quality: AirQualitySensor,
    soil: SoilSensor,
    tank: TankSensor,
    last: SensorSnapshot,
}

impl SensorHub {
    pub fn new() -> Self {
        Self {
            climate: ClimateSensor::new(),
            air_quality: AirQualitySensor::new(),
            soil: SoilSensor::new(),
            tank: TankSensor::new(),
            last: SensorSnapshot::default(),
        }
    }

    /// Read every sensor and return a unified snapshot. `now_secs` is the
    /// current uptime, stamped onto the result.
    pub fn read_all(&mut self, cfg: &Config, now_secs: u64) -> SensorSnapshot {
        if let Ok(climate) = self.climate.read() {
            self.last.temp_c = climate.temp_c;
            self.last.hum_pct = climate.hum_pct;
        }

        if let Ok(Some(air)) = self.air_quality.read() {
            self.last.eco2_ppm = air.eco2_ppm;
            self.last.tvoc_ppb = air.tvoc_ppb;
        }

        let soil_raw = self.soil.read_raw();
        self.last.soil_pct = SoilSensor::raw_to_percent(soil_raw, cfg.cal_air_raw, cfg.cal_water_raw);

        let distance_cm = self
            .tank
            .measure_distance_cm()
            .unwrap_or(cfg.tank_empty_dist);
        let (level_pct, has_water) =
            distance_to_level(distance_cm, cfg.tank_full_dist, cfg.tank_empty_dist);
        self.last.tank_level_pct = level_pct;
        self.last.has_water = has_water;

        self.last.sample_timestamp = now_secs;
        self.last
    }
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an ultrasonic distance reading to a tank-full percentage and the
/// `has_water` safety flag. Distance is clamped to
/// `[tank_full_dist, tank_empty_dist]` before mapping, so a sensor noise
/// spike beyond the calibrated span cannot produce an out-of-range percent.
fn distance_to_level(distance_cm: u16, tank_full_dist: u16, tank_empty_dist: u16) -> (u8, bool) {
    let has_water = distance_cm < tank_empty_dist;
    let span = tank_empty_dist.saturating_sub(tank_full_dist).max(1) as f32;
    let clamped = distance_cm.clamp(tank_full_dist, tank_empty_dist) as f32;
    let pct = (1.0 - (clamped - tank_full_dist as f32) / span) * 100.0;
    (pct.round().clamp(0.0, 100.0) as u8, has_water)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_tank_distance_maps_to_100_percent() {
        let (pct, has_water) = distance_to_level(5, 5, 25);
        assert_eq!(pct, 100);
        assert!(has_water);
    }

    #[test]
    fn empty_tank_distance_maps_to_0_percent_and_no_water() {
        let (pct, has_water) = distance_to_level(25, 5, 25);
        assert_eq!(pct, 0);
        assert!(!has_water);
    }

    #[test]
    fn beyond_empty_distance_clamps_to_0() {
        let (pct, has_water) = distance_to_level(50, 5, 25);
        assert_eq!(pct, 0);
        assert!(!has_water);
    }

    #[test]
    fn midpoint_distance_maps_to_roughly_half() {
        let (pct, _) = distance_to_level(15, 5, 25);
        assert!((45..=55).contains(&pct));
    }
}
