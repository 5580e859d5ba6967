//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! The telemetry/MQTT publish path is a separate concern
//! (`connectivity::telemetry`); this sink is purely diagnostic.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | T={:.1}\u{00b0}C RH={:.0}% eCO2={}ppm TVOC={}ppb soil={}% tank={}% | \
                     pump={} fan={} heater={}",
                    t.sensors.temp_c,
                    t.sensors.hum_pct,
                    t.sensors.eco2_ppm,
                    t.sensors.tvoc_ppb,
                    t.sensors.soil_pct,
                    t.sensors.tank_level_pct,
                    t.pump,
                    t.fan,
                    t.heater,
                );
            }
            AppEvent::ActuatorChanged { pump, fan, heater } => {
                info!("ACTUATOR | pump={pump} fan={fan} heater={heater}");
            }
            AppEvent::ProvisioningStateChanged { from, to } => {
                info!("PROVISIONING | {:?} -> {:?}", from, to);
            }
            AppEvent::ConnectivityUp => {
                info!("CONNECTIVITY | broker session established");
            }
            AppEvent::ConnectivityDown => {
                info!("CONNECTIVITY | broker session lost");
            }
            AppEvent::ConfigUpdated => {
                info!("CONFIG | updated and persisted");
            }
            AppEvent::CommandRejected { reason } => {
                info!("COMMAND | rejected: {reason}");
            }
            AppEvent::OtaStarted => {
                info!("OTA | update started");
            }
            AppEvent::OtaRolledBack => {
                info!("OTA | firmware rolled back after repeated crash");
            }
            AppEvent::PortalStarted => {
                info!("PORTAL | opened");
            }
            AppEvent::PortalStopped => {
                info!("PORTAL | closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorSnapshot;

    #[test]
    fn emit_does_not_panic_on_every_variant() {
        let mut sink = LogEventSink::new();
        sink.emit(&AppEvent::Telemetry(crate::app::events::TelemetryData {
            sensors: SensorSnapshot::default(),
            pump: true,
            fan: false,
            heater: false,
        }));
        sink.emit(&AppEvent::ActuatorChanged { pump: true, fan: false, heater: false });
        sink.emit(&AppEvent::ConnectivityUp);
        sink.emit(&AppEvent::ConnectivityDown);
        sink.emit(&AppEvent::ConfigUpdated);
        sink.emit(&AppEvent::CommandRejected { reason: "out of range" });
        sink.emit(&AppEvent::OtaStarted);
        sink.emit(&AppEvent::OtaRolledBack);
        sink.emit(&AppEvent::PortalStarted);
        sink.emit(&AppEvent::PortalStopped);
    }
}
