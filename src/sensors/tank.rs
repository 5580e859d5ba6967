//! HC-SR04-class ultrasonic tank-level sensor — trigger/echo pair.
//!
//! Protocol: drive the trigger pin high for 10 µs, then measure how long
//! the echo pin stays high. Echo width (µs) / 58 ≈ distance in cm. A 30 ms
//! timeout bounds the wait for an echo that never arrives (open circuit,
//! sensor unplugged, out-of-range target).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs the trigger pulse and times the echo via hw_init.
//! On host/test: reads from a static `AtomicU16` (or a timeout flag) for
//! injection.

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;
use crate::pins;

/// Echo wait budget before declaring a timeout.
pub const ECHO_TIMEOUT_MS: u32 = 30;

static SIM_DISTANCE_CM: AtomicU16 = AtomicU16::new(15);
static SIM_TIMEOUT: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_distance_cm(cm: u16) {
    SIM_DISTANCE_CM.store(cm, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_timeout(timeout: bool) {
    SIM_TIMEOUT.store(timeout, Ordering::Relaxed);
}

pub struct TankSensor {
    _trig_gpio: i32,
    _echo_gpio: i32,
}

impl TankSensor {
    pub fn new() -> Self {
        Self {
            _trig_gpio: pins::TANK_TRIG_GPIO,
            _echo_gpio: pins::TANK_ECHO_GPIO,
        }
    }

    /// Trigger a ping and measure the echo. `Err(EchoTimeout)` on a
    /// missing echo within [`ECHO_TIMEOUT_MS`] — callers must fail safe by
    /// treating a timeout as an empty tank (so the pump stays blocked).
    pub fn measure_distance_cm(&mut self) -> Result<u16, SensorError> {
        self.ping()
    }

    #[cfg(target_os = "espidf")]
    fn ping(&mut self) -> Result<u16, SensorError> {
        hw_init::ultrasonic_measure(self._trig_gpio, self._echo_gpio, ECHO_TIMEOUT_MS)
    }

    #[cfg(not(target_os = "espidf"))]
    fn ping(&mut self) -> Result<u16, SensorError> {
        if SIM_TIMEOUT.load(Ordering::Relaxed) {
            return Err(SensorError::EchoTimeout);
        }
        Ok(SIM_DISTANCE_CM.load(Ordering::Relaxed))
    }
}

impl Default for TankSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_simulated_distance() {
        sim_set_timeout(false);
        sim_set_distance_cm(12);
        let mut s = TankSensor::new();
        assert_eq!(s.measure_distance_cm().unwrap(), 12);
    }

    #[test]
    fn timeout_surfaces_as_echo_timeout_error() {
        sim_set_timeout(true);
        let mut s = TankSensor::new();
        assert_eq!(s.measure_distance_cm(), Err(SensorError::EchoTimeout));
        sim_set_timeout(false);
    }
}
