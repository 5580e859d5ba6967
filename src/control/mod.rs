//! Actuator hysteresis policy.
//!
//! A single `tick()` entry point other components call once per second:
//! read the current sensor snapshot, compute the desired relay states,
//! apply them through the `ActuatorPort`, and report whether anything
//! changed so the caller can emit an event. Pure aside from the final
//! port writes — testable against a snapshot sequence without any I/O.

use crate::app::commands::{Command, Mode};
use crate::app::ports::ActuatorPort;
use crate::config::Config;
use crate::sensors::SensorSnapshot;

/// Owns the operating mode, manual overrides, and the latched relay
/// states needed for the pump's between-thresholds hysteresis.
pub struct Control {
    mode: Mode,
    pump_on: bool,
    fan_on: bool,
    heater_on: bool,
    manual_pump: bool,
    manual_fan: bool,
    manual_heater: bool,
}

/// The relay states this tick produced, and whether any of them changed
/// from the previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickResult {
    pub pump: bool,
    pub fan: bool,
    pub heater: bool,
    pub changed: bool,
}

impl Control {
    pub fn new() -> Self {
        Self {
            mode: Mode::Auto,
            pump_on: false,
            fan_on: false,
            heater_on: false,
            manual_pump: false,
            manual_fan: false,
            manual_heater: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Apply a single parsed command. Mode-switch commands take effect
    /// immediately; manual relay overrides are stored but only take
    /// effect on the next `tick()` while in `Mode::Manual` — and are
    /// ignored entirely while in `Mode::Auto`, per the command table.
    pub fn apply_command(&mut self, cmd: &Command) {
        match *cmd {
            Command::SetMode(mode) => {
                self.mode = mode;
                if mode == Mode::Auto {
                    self.manual_pump = false;
                    self.manual_fan = false;
                    self.manual_heater = false;
                }
            }
            Command::SetPump(v) if self.mode == Mode::Manual => self.manual_pump = v,
            Command::SetFan(v) if self.mode == Mode::Manual => self.manual_fan = v,
            Command::SetHeater(v) if self.mode == Mode::Manual => self.manual_heater = v,
            _ => {}
        }
    }

    /// Run one control cycle: compute desired relay states from `snapshot`
    /// and `cfg`, write them to `actuators`, and return what changed.
    pub fn tick(
        &mut self,
        snapshot: &SensorSnapshot,
        cfg: &Config,
        actuators: &mut impl ActuatorPort,
    ) -> TickResult {
        let (pump, fan, heater) = match self.mode {
            Mode::Auto => {
                let pump = if snapshot.soil_pct < cfg.soil_dry && snapshot.has_water {
                    true
                } else if snapshot.soil_pct > cfg.soil_wet || !snapshot.has_water {
                    false
                } else {
                    self.pump_on
                };
                let fan = snapshot.temp_c > cfg.temp_max || snapshot.hum_pct > cfg.hum_max;
                let heater = snapshot.temp_c < cfg.temp_min;
                (pump, fan, heater)
            }
            // MANUAL honors the latched overrides literally, bypassing
            // the dry-run interlock — see DESIGN.md's Open Question note.
            Mode::Manual => (self.manual_pump, self.manual_fan, self.manual_heater),
        };

        let changed = pump != self.pump_on || fan != self.fan_on || heater != self.heater_on;
        self.pump_on = pump;
        self.fan_on = fan;
        self.heater_on = heater;

        actuators.set_pump(pump);
        actuators.set_fan(fan);
        actuators.set_heater(heater);

        TickResult { pump, fan, heater, changed }
    }
}

impl Default for Control {
    fn default() -> Self {
        Self::new()
    }
}
