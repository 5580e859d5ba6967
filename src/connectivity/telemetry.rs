//! Telemetry composition, publish, and offline spooling.
//!
//! Every 5 s tick: compose one record; if the broker session is up,
//! publish it and drain anything spooled while offline; otherwise buffer
//! it in RAM and spool the batch to disk once it reaches 50 records. The
//! two-file rename protocol in [`Self::drain`] is the crash-safety
//! invariant — a record is always in exactly one of {RAM batch, spool
//! file, processing file} or has been delivered.

use serde::Serialize;

use crate::app::commands::Mode;
use crate::app::ports::{MqttPort, Qos, StoragePort};
use crate::control::TickResult;
use crate::sensors::SensorSnapshot;

/// Active spool file — appended to while offline.
pub const SPOOL_PATH: &str = "/offline_log.txt";
/// Staging file for the in-progress drain — see [`Telemetry::drain`].
pub const PROCESSING_PATH: &str = "/processing.txt";
/// RAM batch size at which it is flushed to the spool file.
const BATCH_CAP: usize = 50;

fn data_topic(device_id: &str) -> String {
    format!("greenhouse/{device_id}/data")
}

/// One outbound telemetry record, matching the device→broker wire schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub device_id: String,
    pub version: String,
    pub timestamp: u64,
    pub temp: f32,
    pub hum: f32,
    pub soil: u8,
    pub co2: u16,
    pub tvoc: u16,
    pub tank_level: u8,
    pub pump: u8,
    pub fan: u8,
    pub heater: u8,
    pub mode: &'static str,
}

impl TelemetryRecord {
    pub fn new(
        device_id: &str,
        sensors: &SensorSnapshot,
        actuators: TickResult,
        mode: Mode,
        timestamp: u64,
    ) -> Self {
        Self {
            device_id: device_id.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            temp: sensors.temp_c,
            hum: sensors.hum_pct,
            soil: sensors.soil_pct,
            co2: sensors.eco2_ppm,
            tvoc: sensors.tvoc_ppb,
            tank_level: sensors.tank_level_pct,
            pump: actuators.pump as u8,
            fan: actuators.fan as u8,
            heater: actuators.heater as u8,
            mode: match mode {
                Mode::Auto => "AUTO",
                Mode::Manual => "MANUAL",
            },
        }
    }
}

pub struct Telemetry {
    device_id: String,
    batch: Vec<TelemetryRecord>,
}

impl Telemetry {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self { device_id: device_id.into(), batch: Vec::new() }
    }

    /// Number of records currently held in the RAM batch (test/diagnostic use).
    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    /// Run one 5 s telemetry cycle.
    pub fn tick(
        &mut self,
        sensors: &SensorSnapshot,
        actuators: TickResult,
        mode: Mode,
        mqtt_up: bool,
        mqtt: &mut impl MqttPort,
        storage: &mut impl StoragePort,
        now_secs: u64,
    ) {
        let record = TelemetryRecord::new(&self.device_id, sensors, actuators, mode, now_secs);

        if mqtt_up {
            if let Ok(line) = serde_json::to_vec(&record) {
                let _ = mqtt.publish(&data_topic(&self.device_id), &line, Qos::AtMostOnce);
            }
            self.flush_batch_to_spool(storage);
            self.drain(mqtt, storage);
        } else {
            self.batch.push(record);
            if self.batch.len() >= BATCH_CAP {
                self.flush_batch_to_spool(storage);
            }
        }
    }

    /// Append every batched record to the spool file as newline-delimited
    /// JSON and clear the batch.
    fn flush_batch_to_spool(&mut self, storage: &mut impl StoragePort) {
        for record in self.batch.drain(..) {
            if let Ok(mut line) = serde_json::to_vec(&record) {
                line.push(b'\n');
                let _ = storage.append(SPOOL_PATH, &line);
            }
        }
    }

    /// Two-phase drain: promote the spool file to the processing file,
    /// then publish its lines one at a time, stopping at the first
    /// failure so the remainder is retried next cycle.
    pub fn drain(&mut self, mqtt: &mut impl MqttPort, storage: &mut impl StoragePort) {
        match storage.iter_dir(PROCESSING_PATH) {
            Ok(lines) => {
                for line in &lines {
                    let acked = mqtt
                        .publish(&data_topic(&self.device_id), line, Qos::AtMostOnce)
                        .unwrap_or(false);
                    if !acked {
                        return;
                    }
                }
                let _ = storage.remove(PROCESSING_PATH);
            }
            Err(_) => {
                if storage.rename(SPOOL_PATH, PROCESSING_PATH).is_ok() {
                    self.drain(mqtt, storage);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::ConnError;
    use std::collections::HashMap;

    struct MemStorage {
        files: HashMap<String, Vec<u8>>,
    }

    impl MemStorage {
        fn new() -> Self {
            Self { files: HashMap::new() }
        }
    }

    impl StoragePort for MemStorage {
        fn read(&self, _ns: &str, _key: &str, _buf: &mut [u8]) -> Result<usize, crate::app::ports::StorageError> {
            Err(crate::app::ports::StorageError::NotFound)
        }
        fn write(&mut self, _ns: &str, _key: &str, _data: &[u8]) -> Result<(), crate::app::ports::StorageError> {
            Ok(())
        }
        fn delete(&mut self, _ns: &str, _key: &str) -> Result<(), crate::app::ports::StorageError> {
            Ok(())
        }
        fn exists(&self, _ns: &str, _key: &str) -> bool {
            false
        }
        fn append(&mut self, path: &str, data: &[u8]) -> Result<(), crate::app::ports::StorageError> {
            self.files.entry(path.to_string()).or_default().extend_from_slice(data);
            Ok(())
        }
        fn rename(&mut self, from: &str, to: &str) -> Result<(), crate::app::ports::StorageError> {
            let data = self.files.remove(from).ok_or(crate::app::ports::StorageError::NotFound)?;
            self.files.insert(to.to_string(), data);
            Ok(())
        }
        fn iter_dir(&self, path: &str) -> Result<Vec<Vec<u8>>, crate::app::ports::StorageError> {
            let data = self.files.get(path).ok_or(crate::app::ports::StorageError::NotFound)?;
            Ok(data.split(|&b| b == b'\n').filter(|l| !l.is_empty()).map(|l| l.to_vec()).collect())
        }
        fn remove(&mut self, path: &str) -> Result<(), crate::app::ports::StorageError> {
            self.files.remove(path);
            Ok(())
        }
    }

    struct MockMqtt {
        up: bool,
        publishes: Vec<String>,
        fail_after: Option<usize>,
    }

    impl MockMqtt {
        fn new(up: bool) -> Self {
            Self { up, publishes: Vec::new(), fail_after: None }
        }
    }

    impl MqttPort for MockMqtt {
        fn mqtt_up(&self) -> bool {
            self.up
        }
        fn try_connect(&mut self) -> bool {
            self.up = true;
            self.up
        }
        fn publish(&mut self, topic: &str, payload: &[u8], _qos: Qos) -> Result<bool, ConnError> {
            if let Some(limit) = self.fail_after {
                if self.publishes.len() >= limit {
                    return Ok(false);
                }
            }
            self.publishes.push(format!("{topic}:{}", String::from_utf8_lossy(payload)));
            Ok(true)
        }
        fn poll_command(&mut self) -> Option<Vec<u8>> {
            None
        }
    }

    fn snapshot() -> SensorSnapshot {
        SensorSnapshot { temp_c: 22.0, hum_pct: 50.0, soil_pct: 45, tank_level_pct: 80, has_water: true, ..Default::default() }
    }

    #[test]
    fn offline_batches_then_spools_at_fifty_records() {
        let mut telemetry = Telemetry::new("GH-TEST");
        let mut mqtt = MockMqtt::new(false);
        let mut storage = MemStorage::new();
        let actuators = TickResult { pump: false, fan: false, heater: false, changed: false };

        for i in 0..50u64 {
            telemetry.tick(&snapshot(), actuators, Mode::Auto, false, &mut mqtt, &mut storage, i);
        }

        assert_eq!(telemetry.batch_len(), 0);
        let lines = storage.iter_dir(SPOOL_PATH).unwrap();
        assert_eq!(lines.len(), 50);
    }

    #[test]
    fn online_publish_drains_spooled_records() {
        let mut telemetry = Telemetry::new("GH-TEST");
        let mut offline_mqtt = MockMqtt::new(false);
        let mut storage = MemStorage::new();
        let actuators = TickResult { pump: false, fan: false, heater: false, changed: false };

        for i in 0..50u64 {
            telemetry.tick(&snapshot(), actuators, Mode::Auto, false, &mut offline_mqtt, &mut storage, i);
        }
        assert!(storage.files.contains_key(SPOOL_PATH));

        let mut online_mqtt = MockMqtt::new(true);
        telemetry.tick(&snapshot(), actuators, Mode::Auto, true, &mut online_mqtt, &mut storage, 250);

        assert!(!storage.files.contains_key(SPOOL_PATH));
        assert!(!storage.files.contains_key(PROCESSING_PATH));
        // 50 spooled + 1 live record published.
        assert_eq!(online_mqtt.publishes.len(), 51);
    }

    #[test]
    fn a_failed_publish_mid_drain_leaves_the_processing_file_for_retry() {
        let mut storage = MemStorage::new();
        storage.files.insert(SPOOL_PATH.to_string(), b"{\"a\":1}\n{\"a\":2}\n".to_vec());
        let mut telemetry = Telemetry::new("GH-TEST");
        let mut mqtt = MockMqtt::new(true);
        mqtt.fail_after = Some(0);

        telemetry.drain(&mut mqtt, &mut storage);

        assert!(storage.files.contains_key(PROCESSING_PATH));
        assert!(!storage.files.contains_key(SPOOL_PATH));
    }
}
