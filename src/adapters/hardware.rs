//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and the relay driver, exposing them through
//! [`SensorPort`] and [`ActuatorPort`]. This is the only module in the
//! system that touches actual hardware; on non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::config::Config;
use crate::drivers::relay::RelayDriver;
use crate::sensors::{SensorHub, SensorSnapshot};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    sensor_hub: SensorHub,
    relay: RelayDriver,
}

impl HardwareAdapter {
    pub fn new(sensor_hub: SensorHub, relay: RelayDriver) -> Self {
        Self { sensor_hub, relay }
    }
}

impl SensorPort for HardwareAdapter {
    fn read_all(&mut self, cfg: &Config, now_secs: u64) -> SensorSnapshot {
        self.sensor_hub.read_all(cfg, now_secs)
    }
}

impl ActuatorPort for HardwareAdapter {
    fn set_pump(&mut self, on: bool) {
        self.relay.set_pump(on);
    }

    fn set_fan(&mut self, on: bool) {
        self.relay.set_fan(on);
    }

    fn set_heater(&mut self, on: bool) {
        self.relay.set_heater(on);
    }

    fn pump_on(&self) -> bool {
        self.relay.pump_on()
    }

    fn fan_on(&self) -> bool {
        self.relay.fan_on()
    }

    fn heater_on(&self) -> bool {
        self.relay.heater_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_adapter_has_all_actuators_off() {
        let adapter = HardwareAdapter::new(SensorHub::new(), RelayDriver::new());
        assert!(!adapter.pump_on());
        assert!(!adapter.fan_on());
        assert!(!adapter.heater_on());
    }

    #[test]
    fn set_and_all_off_round_trip() {
        let mut adapter = HardwareAdapter::new(SensorHub::new(), RelayDriver::new());
        adapter.set_pump(true);
        adapter.set_fan(true);
        adapter.set_heater(true);
        assert!(adapter.pump_on());
        adapter.all_off();
        assert!(!adapter.pump_on());
        assert!(!adapter.fan_on());
        assert!(!adapter.heater_on());
    }
}
