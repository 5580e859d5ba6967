//! End-to-end integration tests wiring multiple components together
//! against mock/simulation port implementations — no real hardware, no
//! real broker. Complements the per-module `#[cfg(test)]` suites, which
//! each exercise a single component in isolation.

use std::collections::HashMap;

use greenhouse_firmware::app::commands::Mode;
use greenhouse_firmware::app::events::AppEvent;
use greenhouse_firmware::app::ports::{
    ActuatorPort, ConnError, ConnectivityPort, EventSink, MqttPort, Qos, StorageError, StoragePort,
};
use greenhouse_firmware::config::Config;
use greenhouse_firmware::connectivity::command;
use greenhouse_firmware::connectivity::provisioning::Provisioning;
use greenhouse_firmware::connectivity::telemetry::{Telemetry, PROCESSING_PATH, SPOOL_PATH};
use greenhouse_firmware::control::{Control, TickResult};
use greenhouse_firmware::fsm::StateId;
use greenhouse_firmware::sensors::SensorSnapshot;

// ── Shared mocks ───────────────────────────────────────────────

#[derive(Default)]
struct MockActuators {
    pump: bool,
    fan: bool,
    heater: bool,
}

impl ActuatorPort for MockActuators {
    fn set_pump(&mut self, on: bool) {
        self.pump = on;
    }
    fn set_fan(&mut self, on: bool) {
        self.fan = on;
    }
    fn set_heater(&mut self, on: bool) {
        self.heater = on;
    }
    fn pump_on(&self) -> bool {
        self.pump
    }
    fn fan_on(&self) -> bool {
        self.fan
    }
    fn heater_on(&self) -> bool {
        self.heater
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

struct MockConn {
    has_saved: bool,
    wifi_up: bool,
    connect_result: Option<bool>,
    submitted: Option<(heapless::String<32>, heapless::String<64>)>,
}

impl MockConn {
    fn new(has_saved: bool) -> Self {
        Self { has_saved, wifi_up: false, connect_result: None, submitted: None }
    }
}

impl ConnectivityPort for MockConn {
    fn has_saved_credentials(&self) -> bool {
        self.has_saved
    }
    fn start_connect(&mut self) {}
    fn poll_connect(&mut self) -> Option<bool> {
        self.connect_result.take()
    }
    fn wifi_up(&self) -> bool {
        self.wifi_up
    }
    fn start_portal(&mut self) {}
    fn stop_portal(&mut self) {}
    fn take_submitted_credentials(&mut self) -> Option<(heapless::String<32>, heapless::String<64>)> {
        self.submitted.take()
    }
}

struct MemStorage {
    files: HashMap<String, Vec<u8>>,
}

impl MemStorage {
    fn new() -> Self {
        Self { files: HashMap::new() }
    }
}

impl StoragePort for MemStorage {
    fn read(&self, _ns: &str, _key: &str, _buf: &mut [u8]) -> Result<usize, StorageError> {
        Err(StorageError::NotFound)
    }
    fn write(&mut self, _ns: &str, _key: &str, _data: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }
    fn delete(&mut self, _ns: &str, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
    fn exists(&self, _ns: &str, _key: &str) -> bool {
        false
    }
    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        self.files.entry(path.to_string()).or_default().extend_from_slice(data);
        Ok(())
    }
    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        let data = self.files.remove(from).ok_or(StorageError::NotFound)?;
        self.files.insert(to.to_string(), data);
        Ok(())
    }
    fn iter_dir(&self, path: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        let data = self.files.get(path).ok_or(StorageError::NotFound)?;
        Ok(data.split(|&b| b == b'\n').filter(|l| !l.is_empty()).map(<[u8]>::to_vec).collect())
    }
    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        self.files.remove(path);
        Ok(())
    }
}

struct MockMqtt {
    up: bool,
    publishes: Vec<(String, Vec<u8>)>,
}

impl MockMqtt {
    fn new(up: bool) -> Self {
        Self { up, publishes: Vec::new() }
    }
}

impl MqttPort for MockMqtt {
    fn mqtt_up(&self) -> bool {
        self.up
    }
    fn try_connect(&mut self) -> bool {
        self.up = true;
        true
    }
    fn publish(&mut self, topic: &str, payload: &[u8], _qos: Qos) -> Result<bool, ConnError> {
        self.publishes.push((topic.to_string(), payload.to_vec()));
        Ok(true)
    }
    fn poll_command(&mut self) -> Option<Vec<u8>> {
        None
    }
}

fn snapshot(soil_pct: u8, has_water: bool, temp_c: f32, hum_pct: f32) -> SensorSnapshot {
    SensorSnapshot { temp_c, hum_pct, soil_pct, has_water, ..Default::default() }
}

// ── Scenario 3/4 fused: hysteresis then a manual command override ──

#[test]
fn manual_command_overrides_hysteresis_until_mode_reverts() {
    let mut cfg = Config::default();
    let mut control = Control::new();
    let mut act = MockActuators::default();
    let mut sink = RecordingSink::default();

    // AUTO hysteresis trajectory: 50 -> 35 -> 55 -> 75 -> 60, pump OFF->ON->ON->OFF->OFF.
    let trajectory = [50u8, 35, 55, 75, 60];
    let expected = [false, true, true, false, false];
    for (soil, want) in trajectory.iter().zip(expected.iter()) {
        let snap = snapshot(*soil, true, 25.0, 50.0);
        let result = control.tick(&snap, &cfg, &mut act);
        assert_eq!(result.pump, *want, "soil={soil}");
    }
    assert!(!act.pump_on());

    // A manual command with soil above the wet threshold (would be OFF in
    // AUTO) should force the pump on and keep it on across further ticks.
    let payload = br#"{"mode":"MANUAL","pump":1}"#;
    let outcome = command::dispatch(payload, &mut cfg, &mut control, &mut sink);
    assert!(!outcome.config_changed);
    assert_eq!(control.mode(), Mode::Manual);

    let high_soil = snapshot(85, true, 25.0, 50.0);
    let result = control.tick(&high_soil, &cfg, &mut act);
    assert!(result.pump, "manual override must win over AUTO hysteresis");

    // Mode reverts to AUTO; hysteresis resumes governing the pump.
    command::dispatch(br#"{"mode":"AUTO"}"#, &mut cfg, &mut control, &mut sink);
    let result = control.tick(&high_soil, &cfg, &mut act);
    assert!(!result.pump, "AUTO hysteresis must turn the pump back off above soil_wet");
}

// ── Scenario 6: invalid config is rejected end-to-end ──

#[test]
fn invalid_setpoint_command_leaves_config_and_actuators_untouched() {
    let mut cfg = Config::default();
    let original = cfg;
    let mut control = Control::new();
    let mut sink = RecordingSink::default();
    let mut act = MockActuators::default();

    let payload = br#"{"temp_min": 35.0, "temp_max": 30.0}"#;
    let outcome = command::dispatch(payload, &mut cfg, &mut control, &mut sink);

    assert!(!outcome.config_changed);
    assert_eq!(cfg, original);
    assert!(matches!(sink.events.last(), Some(AppEvent::CommandRejected { .. })));

    // No actuator state should have moved as a side effect of a rejected command.
    let snap = snapshot(50, true, 25.0, 50.0);
    control.tick(&snap, &cfg, &mut act);
    assert!(!act.pump_on());
}

#[test]
fn standalone_invalid_field_does_not_block_a_sibling_valid_field() {
    let mut cfg = Config::default();
    let mut control = Control::new();
    let mut sink = RecordingSink::default();

    // hum_max=500 fails its own range check; soil_dry=45 is independently
    // valid and must still persist alongside it per-payload.
    let payload = br#"{"hum_max": 500, "soil_dry": 45}"#;
    let outcome = command::dispatch(payload, &mut cfg, &mut control, &mut sink);

    assert!(outcome.config_changed);
    assert_eq!(cfg.hum_max, Config::default().hum_max);
    assert_eq!(cfg.soil_dry, 45);
}

// ── Scenario 1/2 fused: offline buffering, then reconnect drains the spool ──

#[test]
fn offline_spool_then_reconnect_drains_and_removes_processing_file() {
    let mut telemetry = Telemetry::new("GH-TEST01");
    let mut storage = MemStorage::new();
    let mut mqtt = MockMqtt::new(false);
    let actuators = TickResult { pump: false, fan: false, heater: false, changed: false };
    let snap = snapshot(45, true, 22.0, 55.0);

    // Offline: 50 telemetry ticks spool to /offline_log.txt, RAM batch drains to disk.
    for t in 0..50u64 {
        telemetry.tick(&snap, actuators, Mode::Auto, false, &mut mqtt, &mut storage, t);
    }
    assert_eq!(telemetry.batch_len(), 0);
    assert_eq!(storage.iter_dir(SPOOL_PATH).unwrap().len(), 50);

    // Reconnect: next tick observes mqtt_up and drains the spool.
    mqtt.try_connect();
    telemetry.tick(&snap, actuators, Mode::Auto, true, &mut mqtt, &mut storage, 50);

    assert!(storage.files.get(SPOOL_PATH).is_none() || storage.files[SPOOL_PATH].is_empty());
    assert!(!storage.files.contains_key(PROCESSING_PATH));
    assert!(mqtt.publishes.len() >= 50, "all spooled records plus the live one must be published");
}

// ── Provisioning FSM: offline self-heal and portal round trip ──

#[test]
fn offline_without_saved_credentials_waits_for_button_driven_portal() {
    let mut prov = Provisioning::new(false, 1.0);
    let mut conn = MockConn::new(false);

    prov.tick(&mut conn); // Idle -> Offline (no saved credentials)
    assert_eq!(prov.state(), StateId::Offline);

    prov.notify_button(greenhouse_firmware::fsm::context::ButtonIntent::StartReconfiguration);
    prov.tick(&mut conn);
    assert_eq!(prov.state(), StateId::Portal);
    assert!(prov.portal_active());

    let mut ssid: heapless::String<32> = heapless::String::new();
    ssid.push_str("my-network").unwrap();
    let mut password: heapless::String<64> = heapless::String::new();
    password.push_str("hunter2hunter2").unwrap();
    conn.submitted = Some((ssid, password));
    prov.tick(&mut conn);
    assert_eq!(prov.state(), StateId::ConnectSaved);

    conn.connect_result = Some(true);
    conn.wifi_up = true;
    prov.tick(&mut conn);
    assert_eq!(prov.state(), StateId::Online);
}
