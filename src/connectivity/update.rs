//! OTA boot-verification and rollback-alert bookkeeping.
//!
//! Runs the boot-health protocol against the persisted `crash_count` /
//! `rb_happened` pair in the `greenhouse` namespace: three unverified
//! boots trigger a rollback request to the bootloader; the first
//! successful MQTT connection afterward clears the counter and, if a
//! rollback just happened, publishes a single `ROLLBACK_EXECUTED` alert
//! at QoS 1 before clearing the flag.

use crate::app::ports::{MqttPort, Qos, StoragePort, UpdatePort};

const NAMESPACE: &str = "greenhouse";
const KEY_CRASH_COUNT: &str = "crash_count";
const KEY_RB_HAPPENED: &str = "rb_happened";

/// Boots with an unverified previous firmware image before a rollback
/// is requested.
const CRASH_THRESHOLD: u8 = 3;

fn alerts_topic(device_id: &str) -> String {
    format!("greenhouse/{device_id}/alerts")
}

fn read_u8(storage: &impl StoragePort, key: &str) -> u8 {
    let mut buf = [0u8; 1];
    match storage.read(NAMESPACE, key, &mut buf) {
        Ok(1) => buf[0],
        _ => 0,
    }
}

fn write_u8(storage: &mut impl StoragePort, key: &str, value: u8) {
    let _ = storage.write(NAMESPACE, key, &[value]);
}

fn read_bool(storage: &impl StoragePort, key: &str) -> bool {
    read_u8(storage, key) != 0
}

fn write_bool(storage: &mut impl StoragePort, key: &str, value: bool) {
    write_u8(storage, key, value as u8);
}

/// What [`BootHealth::on_boot`] decided. `main` reboots immediately on
/// [`BootAction::RollbackAndReboot`] and otherwise continues the normal
/// startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootAction {
    Continue,
    RollbackAndReboot,
}

pub struct BootHealth;

impl BootHealth {
    /// Step 1-4 of the boot-verification protocol. Call once, early in
    /// startup, before the connectivity task exists.
    pub fn on_boot(storage: &mut impl StoragePort, update: &mut impl UpdatePort) -> BootAction {
        let crash_count = read_u8(storage, KEY_CRASH_COUNT);

        if crash_count >= CRASH_THRESHOLD {
            let rolled_back = update.flash_rollback().unwrap_or(false);
            write_u8(storage, KEY_CRASH_COUNT, 0);
            if rolled_back {
                write_bool(storage, KEY_RB_HAPPENED, true);
                return BootAction::RollbackAndReboot;
            }
            return BootAction::Continue;
        }

        write_u8(storage, KEY_CRASH_COUNT, crash_count + 1);
        BootAction::Continue
    }

    /// Step 4/5: called once the first time MQTT connects this boot.
    /// Clears `crash_count` unconditionally; if a rollback happened on a
    /// prior boot, publishes the alert and clears `rb_happened` only on
    /// a successful publish.
    pub fn on_mqtt_connected(
        storage: &mut impl StoragePort,
        mqtt: &mut impl MqttPort,
        device_id: &str,
        now_secs: u64,
    ) {
        write_u8(storage, KEY_CRASH_COUNT, 0);

        if !read_bool(storage, KEY_RB_HAPPENED) {
            return;
        }

        let payload = format!(
            "{{\"alert\":\"ROLLBACK_EXECUTED\",\"message\":\"firmware rolled back after repeated boot failure\",\"timestamp\":{now_secs}}}"
        );
        let acked = mqtt
            .publish(&alerts_topic(device_id), payload.as_bytes(), Qos::AtLeastOnce)
            .unwrap_or(false);
        if acked {
            write_bool(storage, KEY_RB_HAPPENED, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{ConnError, StorageError, UpdateError};
    use std::collections::HashMap;

    struct MemStorage {
        kv: HashMap<(String, String), Vec<u8>>,
    }

    impl MemStorage {
        fn new() -> Self {
            Self { kv: HashMap::new() }
        }
    }

    impl StoragePort for MemStorage {
        fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
            let data = self.kv.get(&(ns.to_string(), key.to_string())).ok_or(StorageError::NotFound)?;
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            Ok(n)
        }
        fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
            self.kv.insert((ns.to_string(), key.to_string()), data.to_vec());
            Ok(())
        }
        fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
            self.kv.remove(&(ns.to_string(), key.to_string()));
            Ok(())
        }
        fn exists(&self, ns: &str, key: &str) -> bool {
            self.kv.contains_key(&(ns.to_string(), key.to_string()))
        }
        fn append(&mut self, _path: &str, _data: &[u8]) -> Result<(), StorageError> {
            Ok(())
        }
        fn rename(&mut self, _from: &str, _to: &str) -> Result<(), StorageError> {
            Ok(())
        }
        fn iter_dir(&self, _path: &str) -> Result<Vec<Vec<u8>>, StorageError> {
            Ok(Vec::new())
        }
        fn remove(&mut self, _path: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    struct MockUpdate {
        rollback_available: bool,
        rollback_calls: u32,
    }

    impl UpdatePort for MockUpdate {
        fn flash_update(&mut self, _url: &str) -> Result<(), UpdateError> {
            Ok(())
        }
        fn flash_rollback(&mut self) -> Result<bool, UpdateError> {
            self.rollback_calls += 1;
            Ok(self.rollback_available)
        }
        fn reboot(&mut self) {}
    }

    struct MockMqtt {
        publishes: Vec<(String, String)>,
        ack: bool,
    }

    impl MqttPort for MockMqtt {
        fn mqtt_up(&self) -> bool {
            true
        }
        fn try_connect(&mut self) -> bool {
            true
        }
        fn publish(&mut self, topic: &str, payload: &[u8], _qos: Qos) -> Result<bool, ConnError> {
            self.publishes.push((topic.to_string(), String::from_utf8_lossy(payload).to_string()));
            Ok(self.ack)
        }
        fn poll_command(&mut self) -> Option<Vec<u8>> {
            None
        }
    }

    #[test]
    fn crash_count_increments_on_each_unverified_boot() {
        let mut storage = MemStorage::new();
        let mut update = MockUpdate { rollback_available: true, rollback_calls: 0 };

        for expected in 1..=2u8 {
            let action = BootHealth::on_boot(&mut storage, &mut update);
            assert_eq!(action, BootAction::Continue);
            assert_eq!(read_u8(&storage, KEY_CRASH_COUNT), expected);
        }
    }

    #[test]
    fn third_unverified_boot_triggers_rollback_and_sets_flag() {
        let mut storage = MemStorage::new();
        write_u8(&mut storage, KEY_CRASH_COUNT, 3);
        let mut update = MockUpdate { rollback_available: true, rollback_calls: 0 };

        let action = BootHealth::on_boot(&mut storage, &mut update);

        assert_eq!(action, BootAction::RollbackAndReboot);
        assert_eq!(update.rollback_calls, 1);
        assert_eq!(read_u8(&storage, KEY_CRASH_COUNT), 0);
        assert!(read_bool(&storage, KEY_RB_HAPPENED));
    }

    #[test]
    fn no_rollback_slot_resets_counter_and_continues() {
        let mut storage = MemStorage::new();
        write_u8(&mut storage, KEY_CRASH_COUNT, 5);
        let mut update = MockUpdate { rollback_available: false, rollback_calls: 0 };

        let action = BootHealth::on_boot(&mut storage, &mut update);

        assert_eq!(action, BootAction::Continue);
        assert_eq!(read_u8(&storage, KEY_CRASH_COUNT), 0);
        assert!(!read_bool(&storage, KEY_RB_HAPPENED));
    }

    #[test]
    fn mqtt_connect_publishes_rollback_alert_and_clears_flag_only_on_ack() {
        let mut storage = MemStorage::new();
        write_bool(&mut storage, KEY_RB_HAPPENED, true);
        let mut mqtt = MockMqtt { publishes: Vec::new(), ack: true };

        BootHealth::on_mqtt_connected(&mut storage, &mut mqtt, "GH-TEST", 1_000);

        assert_eq!(mqtt.publishes.len(), 1);
        assert!(mqtt.publishes[0].1.contains("ROLLBACK_EXECUTED"));
        assert!(!read_bool(&storage, KEY_RB_HAPPENED));
        assert_eq!(read_u8(&storage, KEY_CRASH_COUNT), 0);
    }

    #[test]
    fn unacked_alert_leaves_flag_set_for_retry() {
        let mut storage = MemStorage::new();
        write_bool(&mut storage, KEY_RB_HAPPENED, true);
        let mut mqtt = MockMqtt { publishes: Vec::new(), ack: false };

        BootHealth::on_mqtt_connected(&mut storage, &mut mqtt, "GH-TEST", 1_000);

        assert!(read_bool(&storage, KEY_RB_HAPPENED));
    }

    #[test]
    fn normal_connect_with_no_rollback_pending_does_not_publish() {
        let mut storage = MemStorage::new();
        let mut mqtt = MockMqtt { publishes: Vec::new(), ack: true };

        BootHealth::on_mqtt_connected(&mut storage, &mut mqtt, "GH-TEST", 1_000);

        assert!(mqtt.publishes.is_empty());
    }
}
