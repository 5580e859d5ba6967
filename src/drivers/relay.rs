//! Pump / fan / heater relay outputs.
//!
//! Three independent binary GPIO outputs, active HIGH through
//! opto-isolated relay boards. Each driver only tracks the last-commanded
//! level; `ActuatorPort::all_off` drives all three low on shutdown.

use crate::pins;

pub struct RelayDriver {
    pump_gpio: i32,
    fan_gpio: i32,
    heater_gpio: i32,
    pump_on: bool,
    fan_on: bool,
    heater_on: bool,
}

impl RelayDriver {
    pub fn new() -> Self {
        Self {
            pump_gpio: pins::PUMP_RELAY_GPIO,
            fan_gpio: pins::FAN_RELAY_GPIO,
            heater_gpio: pins::HEATER_RELAY_GPIO,
            pump_on: false,
            fan_on: false,
            heater_on: false,
        }
    }

    pub fn set_pump(&mut self, on: bool) {
        self.pump_on = on;
        Self::write(self.pump_gpio, on);
    }

    pub fn set_fan(&mut self, on: bool) {
        self.fan_on = on;
        Self::write(self.fan_gpio, on);
    }

    pub fn set_heater(&mut self, on: bool) {
        self.heater_on = on;
        Self::write(self.heater_gpio, on);
    }

    pub fn pump_on(&self) -> bool {
        self.pump_on
    }

    pub fn fan_on(&self) -> bool {
        self.fan_on
    }

    pub fn heater_on(&self) -> bool {
        self.heater_on
    }

    #[cfg(target_os = "espidf")]
    fn write(gpio: i32, high: bool) {
        crate::drivers::hw_init::gpio_write(gpio, high);
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(gpio: i32, high: bool) {
        log::debug!("relay(sim): gpio {gpio} -> {}", if high { "HIGH" } else { "LOW" });
    }
}

impl Default for RelayDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relays_start_off() {
        let relay = RelayDriver::new();
        assert!(!relay.pump_on());
        assert!(!relay.fan_on());
        assert!(!relay.heater_on());
    }

    #[test]
    fn each_relay_tracks_its_own_state_independently() {
        let mut relay = RelayDriver::new();
        relay.set_pump(true);
        relay.set_heater(true);
        assert!(relay.pump_on());
        assert!(!relay.fan_on());
        assert!(relay.heater_on());

        relay.set_pump(false);
        assert!(!relay.pump_on());
        assert!(relay.heater_on());
    }
}
