//! NVS (Non-Volatile Storage) + filesystem spool adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`]. Configuration is
//! stored as individual scalar keys (not one serialized blob) under the
//! `greenhouse` namespace, matching the persisted storage layout: each
//! setpoint/threshold/calibration field gets its own NVS key, so a
//! single-field command-dispatch write touches one key rather than
//! rewriting the whole record — the same flash-wear guard
//! `connectivity/command.rs` applies at the tolerance-comparison level.
//!
//! The filesystem half (`append`/`rename`/`iter_dir`/`remove`) backs the
//! offline telemetry spool. On-target it is backed by `std::fs` against
//! the mounted LittleFS partition; off-target it is an in-memory map.
//!
//! # Security
//!
//! - Config validation: the full candidate record is range-checked via
//!   [`crate::config::validate`] before any of its keys are persisted.
//! - Encrypted NVS: on ESP32, the `auth` namespace lives on the encrypted
//!   NVS partition. The simulation backend uses plaintext (dev/test only).
//! - Namespace isolation: each subsystem uses its own namespace prefix.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{self, Config};
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::cell::RefCell;
#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "greenhouse";
const CRED_NAMESPACE: &str = "auth";

/// Filesystem mount point for the offline telemetry spool, on-target.
#[cfg(target_os = "espidf")]
const FS_ROOT: &str = "/littlefs";

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<String, Vec<u8>>>,
    #[cfg(not(target_os = "espidf"))]
    files: RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: RefCell::new(HashMap::new()),
            #[cfg(not(target_os = "espidf"))]
            files: RefCell::new(HashMap::new()),
        })
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{namespace}::{key}")
    }

    #[cfg(target_os = "espidf")]
    fn fs_path(path: &str) -> std::path::PathBuf {
        std::path::Path::new(FS_ROOT).join(path.trim_start_matches('/'))
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write { nvs_open_mode_t_NVS_READWRITE } else { nvs_open_mode_t_NVS_READONLY };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

/// Scalar config keys under the `greenhouse` namespace, per the persisted
/// storage layout. Each is stored as its own fixed-width little-endian blob.
const KEY_TEMP_MIN: &str = "temp_min";
const KEY_TEMP_MAX: &str = "temp_max";
const KEY_HUM_MAX: &str = "hum_max";
const KEY_SOIL_DRY: &str = "soil_dry";
const KEY_SOIL_WET: &str = "soil_wet";
const KEY_TANK_EMPTY: &str = "tank_empty";
const KEY_TANK_FULL: &str = "tank_full";
const KEY_CAL_AIR: &str = "cal_air";
const KEY_CAL_WATER: &str = "cal_water";

/// Flash-wear guard: a float field within this tolerance of its currently
/// stored value is treated as unchanged and its key is not rewritten.
const FLOAT_TOLERANCE: f32 = 0.1;

fn read_f32(adapter: &NvsAdapter, key: &str, default: f32) -> f32 {
    let mut buf = [0u8; 4];
    match adapter.read(CONFIG_NAMESPACE, key, &mut buf) {
        Ok(4) => f32::from_le_bytes(buf),
        _ => default,
    }
}

fn read_u8(adapter: &NvsAdapter, key: &str, default: u8) -> u8 {
    let mut buf = [0u8; 1];
    match adapter.read(CONFIG_NAMESPACE, key, &mut buf) {
        Ok(1) => buf[0],
        _ => default,
    }
}

fn read_u16(adapter: &NvsAdapter, key: &str, default: u16) -> u16 {
    let mut buf = [0u8; 2];
    match adapter.read(CONFIG_NAMESPACE, key, &mut buf) {
        Ok(2) => u16::from_le_bytes(buf),
        _ => default,
    }
}

fn read_i32(adapter: &NvsAdapter, key: &str, default: i32) -> i32 {
    let mut buf = [0u8; 4];
    match adapter.read(CONFIG_NAMESPACE, key, &mut buf) {
        Ok(4) => i32::from_le_bytes(buf),
        _ => default,
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<Config, ConfigError> {
        let defaults = Config::default();
        let cfg = Config {
            temp_min: read_f32(self, KEY_TEMP_MIN, defaults.temp_min),
            temp_max: read_f32(self, KEY_TEMP_MAX, defaults.temp_max),
            hum_max: read_f32(self, KEY_HUM_MAX, defaults.hum_max),
            soil_dry: read_u8(self, KEY_SOIL_DRY, defaults.soil_dry),
            soil_wet: read_u8(self, KEY_SOIL_WET, defaults.soil_wet),
            tank_empty_dist: read_u16(self, KEY_TANK_EMPTY, defaults.tank_empty_dist),
            tank_full_dist: read_u16(self, KEY_TANK_FULL, defaults.tank_full_dist),
            cal_air_raw: read_i32(self, KEY_CAL_AIR, defaults.cal_air_raw),
            cal_water_raw: read_i32(self, KEY_CAL_WATER, defaults.cal_water_raw),
        };
        info!("NvsAdapter: config loaded");
        Ok(cfg)
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        config::validate(cfg).map_err(|e| ConfigError::ValidationFailed(e.0))?;

        // `read`/`write` borrow `self` rather than require `&mut self` on
        // the simulation backend's RefCell, so this can stay `&self` as
        // the trait requires. Each key is read back and compared before
        // writing, so a single changed field doesn't rewrite the other
        // eight unchanged ones.
        let defaults = Config::default();

        write_f32_if_changed(self, KEY_TEMP_MIN, cfg.temp_min, defaults.temp_min)?;
        write_f32_if_changed(self, KEY_TEMP_MAX, cfg.temp_max, defaults.temp_max)?;
        write_f32_if_changed(self, KEY_HUM_MAX, cfg.hum_max, defaults.hum_max)?;
        write_u8_if_changed(self, KEY_SOIL_DRY, cfg.soil_dry, defaults.soil_dry)?;
        write_u8_if_changed(self, KEY_SOIL_WET, cfg.soil_wet, defaults.soil_wet)?;
        write_u16_if_changed(self, KEY_TANK_EMPTY, cfg.tank_empty_dist, defaults.tank_empty_dist)?;
        write_u16_if_changed(self, KEY_TANK_FULL, cfg.tank_full_dist, defaults.tank_full_dist)?;
        write_i32_if_changed(self, KEY_CAL_AIR, cfg.cal_air_raw, defaults.cal_air_raw)?;
        write_i32_if_changed(self, KEY_CAL_WATER, cfg.cal_water_raw, defaults.cal_water_raw)?;

        info!("NvsAdapter: config saved");
        Ok(())
    }
}

fn write_f32_if_changed(adapter: &NvsAdapter, key: &str, value: f32, default: f32) -> Result<(), ConfigError> {
    if (read_f32(adapter, key, default) - value).abs() <= FLOAT_TOLERANCE {
        return Ok(());
    }
    write_bytes(adapter, CONFIG_NAMESPACE, key, &value.to_le_bytes()).map_err(|_| ConfigError::IoError)
}

fn write_u8_if_changed(adapter: &NvsAdapter, key: &str, value: u8, default: u8) -> Result<(), ConfigError> {
    if read_u8(adapter, key, default) == value {
        return Ok(());
    }
    write_bytes(adapter, CONFIG_NAMESPACE, key, &[value]).map_err(|_| ConfigError::IoError)
}

fn write_u16_if_changed(adapter: &NvsAdapter, key: &str, value: u16, default: u16) -> Result<(), ConfigError> {
    if read_u16(adapter, key, default) == value {
        return Ok(());
    }
    write_bytes(adapter, CONFIG_NAMESPACE, key, &value.to_le_bytes()).map_err(|_| ConfigError::IoError)
}

fn write_i32_if_changed(adapter: &NvsAdapter, key: &str, value: i32, default: i32) -> Result<(), ConfigError> {
    if read_i32(adapter, key, default) == value {
        return Ok(());
    }
    write_bytes(adapter, CONFIG_NAMESPACE, key, &value.to_le_bytes()).map_err(|_| ConfigError::IoError)
}

/// `StoragePort::write` takes `&mut self`; `ConfigPort::save` only has
/// `&self`. Simulation goes through the `RefCell` directly; on-target NVS
/// writes don't need `&mut` either (the handle carries the mutability).
fn write_bytes(adapter: &NvsAdapter, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
    #[cfg(not(target_os = "espidf"))]
    {
        let composite = NvsAdapter::composite_key(namespace, key);
        adapter.store.borrow_mut().insert(composite, data.to_vec());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    {
        let result = NvsAdapter::with_nvs_handle(namespace, true, |handle| {
            let mut key_buf = [0u8; 16];
            let kb = key.as_bytes();
            let kl = kb.len().min(15);
            key_buf[..kl].copy_from_slice(&kb[..kl]);

            let ret = unsafe { nvs_set_blob(handle, key_buf.as_ptr() as *const _, data.as_ptr() as *const _, data.len()) };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|_| StorageError::IoError)
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let kl = kb.len().min(15);
                key_buf[..kl].copy_from_slice(&kb[..kl]);

                let mut size = buf.len();
                let ret = unsafe { nvs_get_blob(handle, key_buf.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size) };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        write_bytes(self, namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().remove(&composite);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let kl = kb.len().min(15);
                key_buf[..kl].copy_from_slice(&kb[..kl]);

                let ret = unsafe { nvs_erase_key(handle, key_buf.as_ptr() as *const _) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow().contains_key(&composite)
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let kl = kb.len().min(15);
                key_buf[..kl].copy_from_slice(&kb[..kl]);

                let ret = unsafe { nvs_find_key(handle, key_buf.as_ptr() as *const _, core::ptr::null_mut()) };
                Ok(ret == ESP_OK)
            });
            result.unwrap_or(false)
        }
    }

    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.files.borrow_mut().entry(path.to_string()).or_default().extend_from_slice(data);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(Self::fs_path(path))
                .map_err(|_| StorageError::IoError)?;
            f.write_all(data).map_err(|_| StorageError::IoError)
        }
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let data = self.files.borrow_mut().remove(from).ok_or(StorageError::NotFound)?;
            self.files.borrow_mut().insert(to.to_string(), data);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            std::fs::rename(Self::fs_path(from), Self::fs_path(to)).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound { StorageError::NotFound } else { StorageError::IoError }
            })
        }
    }

    fn iter_dir(&self, path: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let files = self.files.borrow();
            let data = files.get(path).ok_or(StorageError::NotFound)?;
            Ok(data.split(|&b| b == b'\n').filter(|l| !l.is_empty()).map(|l| l.to_vec()).collect())
        }

        #[cfg(target_os = "espidf")]
        {
            let data = std::fs::read(Self::fs_path(path)).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound { StorageError::NotFound } else { StorageError::IoError }
            })?;
            Ok(data.split(|&b| b == b'\n').filter(|l| !l.is_empty()).map(|l| l.to_vec()).collect())
        }
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.files.borrow_mut().remove(path);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            match std::fs::remove_file(Self::fs_path(path)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }
}

// ── Secure credential storage ──────────────────────────────────────
//
// Credentials (WiFi passwords, broker PSK) are stored in the "auth" NVS
// namespace. On ESP32, NVS encryption is enabled partition-wide via the
// nvs_key partition (see partitions.csv). When CONFIG_NVS_ENCRYPTION is
// set, all nvs_open / nvs_get / nvs_set calls transparently use AES-XTS
// encryption. No code change is required beyond ensuring the nvs_key
// partition exists and flash encryption is enabled in production.
impl NvsAdapter {
    pub fn store_credential(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.write(CRED_NAMESPACE, key, data)
    }

    pub fn read_credential(&self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.read(CRED_NAMESPACE, key, buf)
    }

    pub fn delete_credential(&mut self, key: &str) -> Result<(), StorageError> {
        self.delete(CRED_NAMESPACE, key)
    }

    pub fn credential_exists(&self, key: &str) -> bool {
        self.exists(CRED_NAMESPACE, key)
    }

    #[cfg(target_os = "espidf")]
    pub fn erase_credentials(&mut self) -> Result<(), StorageError> {
        let result = Self::with_nvs_handle(CRED_NAMESPACE, true, |handle| {
            let ret = unsafe { nvs_erase_all(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|_| StorageError::IoError)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn erase_credentials(&mut self) -> Result<(), StorageError> {
        let prefix = format!("{CRED_NAMESPACE}::");
        self.store.borrow_mut().retain(|k: &String, _: &mut Vec<u8>| !k.starts_with(&prefix));
        Ok(())
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        // Panics if NVS is unavailable — only use as a last-resort fallback.
        Self::new().unwrap_or_else(|_| Self {
            #[cfg(not(target_os = "espidf"))]
            store: RefCell::new(HashMap::new()),
            #[cfg(not(target_os = "espidf"))]
            files: RefCell::new(HashMap::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_save_and_load() {
        let mut nvs = NvsAdapter::new().unwrap();
        let cfg = Config::default();
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load().unwrap(), cfg);
    }

    #[test]
    fn invalid_config_is_rejected_before_any_key_is_written() {
        let nvs = NvsAdapter::new().unwrap();
        let mut bad = Config::default();
        bad.temp_min = 35.0;
        bad.temp_max = 30.0;
        assert!(matches!(nvs.save(&bad), Err(ConfigError::ValidationFailed(_))));
        // No keys were written, so a fresh load still returns all-defaults.
        assert_eq!(nvs.load().unwrap(), Config::default());
    }

    #[test]
    fn first_boot_with_no_stored_keys_loads_defaults() {
        let nvs = NvsAdapter::new().unwrap();
        assert_eq!(nvs.load().unwrap(), Config::default());
    }

    #[test]
    fn unchanged_fields_are_not_rewritten() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = Config::default();
        cfg.soil_dry = 45;
        nvs.save(&cfg).unwrap();

        let composite = NvsAdapter::composite_key(CONFIG_NAMESPACE, KEY_TEMP_MIN);
        assert!(
            !nvs.store.borrow().contains_key(&composite),
            "temp_min never changed from its default and must not be written"
        );

        let composite_soil = NvsAdapter::composite_key(CONFIG_NAMESPACE, KEY_SOIL_DRY);
        assert!(nvs.store.borrow().contains_key(&composite_soil), "the changed field must be written");
    }

    #[test]
    fn float_change_within_tolerance_is_not_rewritten() {
        let nvs = NvsAdapter::new().unwrap();
        let mut cfg = Config::default();
        cfg.temp_min = Config::default().temp_min + 0.05;
        nvs.save(&cfg).unwrap();

        let composite = NvsAdapter::composite_key(CONFIG_NAMESPACE, KEY_TEMP_MIN);
        assert!(!nvs.store.borrow().contains_key(&composite));
    }

    #[test]
    fn storage_round_trip() {
        let mut nvs = NvsAdapter::new().unwrap();
        let data = b"hello NVS";
        nvs.write("test_ns", "greeting", data).unwrap();
        assert!(nvs.exists("test_ns", "greeting"));

        let mut buf = [0u8; 64];
        let len = nvs.read("test_ns", "greeting", &mut buf).unwrap();
        assert_eq!(&buf[..len], data);

        nvs.delete("test_ns", "greeting").unwrap();
        assert!(!nvs.exists("test_ns", "greeting"));
    }

    #[test]
    fn storage_read_missing_key() {
        let nvs = NvsAdapter::new().unwrap();
        let mut buf = [0u8; 64];
        assert!(matches!(nvs.read("ns", "nope", &mut buf), Err(StorageError::NotFound)));
    }

    #[test]
    fn namespace_isolation() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write("ns_a", "key", b"alpha").unwrap();
        nvs.write("ns_b", "key", b"bravo").unwrap();

        let mut buf = [0u8; 64];
        let len = nvs.read("ns_a", "key", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"alpha");

        let len = nvs.read("ns_b", "key", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"bravo");
    }

    #[test]
    fn append_then_iter_dir_then_remove() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.append("/offline_log.txt", b"{\"a\":1}\n").unwrap();
        nvs.append("/offline_log.txt", b"{\"a\":2}\n").unwrap();

        let lines = nvs.iter_dir("/offline_log.txt").unwrap();
        assert_eq!(lines.len(), 2);

        nvs.remove("/offline_log.txt").unwrap();
        assert!(matches!(nvs.iter_dir("/offline_log.txt"), Err(StorageError::NotFound)));
    }

    #[test]
    fn rename_moves_spool_to_processing() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.append("/offline_log.txt", b"{\"a\":1}\n").unwrap();
        nvs.rename("/offline_log.txt", "/processing.txt").unwrap();

        assert!(matches!(nvs.iter_dir("/offline_log.txt"), Err(StorageError::NotFound)));
        assert_eq!(nvs.iter_dir("/processing.txt").unwrap().len(), 1);
    }

    #[test]
    fn credential_store_roundtrip() {
        let mut nvs = NvsAdapter::new().unwrap();
        let psk = [0xAA_u8; 32];
        nvs.store_credential("psk", &psk).unwrap();
        assert!(nvs.credential_exists("psk"));

        let mut buf = [0u8; 64];
        let len = nvs.read_credential("psk", &mut buf).unwrap();
        assert_eq!(&buf[..len], &psk);

        nvs.delete_credential("psk").unwrap();
        assert!(!nvs.credential_exists("psk"));
    }

    #[test]
    fn erase_credentials_clears_all() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.store_credential("psk", &[0x01; 32]).unwrap();
        nvs.store_credential("wifi_pw", b"secret123").unwrap();
        nvs.erase_credentials().unwrap();
        assert!(!nvs.credential_exists("psk"));
        assert!(!nvs.credential_exists("wifi_pw"));
    }
}
