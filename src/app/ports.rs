//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Control / Connectivity (domain)
//! ```
//!
//! Driven adapters (sensors, actuators, event sinks, storage, connectivity,
//! update) implement these traits, keeping the domain core fully testable
//! without real peripherals or a network.
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **StoragePort** implementations SHOULD encrypt sensitive keys.
//! - All port errors are typed — callers must handle every variant explicitly.

use crate::config::Config;
use crate::sensors::SensorSnapshot;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain sensor data.
pub trait SensorPort {
    /// Read every sensor and return a unified snapshot.
    fn read_all(&mut self, cfg: &Config, now_secs: u64) -> SensorSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to drive the three relays.
pub trait ActuatorPort {
    fn set_pump(&mut self, on: bool);
    fn set_fan(&mut self, on: bool);
    fn set_heater(&mut self, on: bool);

    /// Query the last-commanded state of each relay.
    fn pump_on(&self) -> bool;
    fn fan_on(&self) -> bool;
    fn heater_on(&self) -> bool;

    /// Kill all actuators — safe shutdown.
    fn all_off(&mut self) {
        self.set_pump(false);
        self.set_fan(false);
        self.set_heater(false);
    }
}

// ───────────────────────────────────────────────────────────────
// Update port (driven adapter: domain → OTA image store / bootloader)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the over-the-air update and rollback protocol.
pub trait UpdatePort {
    /// Stream a firmware image from `url` into the inactive slot and mark
    /// it bootable. Does not reboot; the caller decides when.
    fn flash_update(&mut self, url: &str) -> Result<(), UpdateError>;

    /// Request the bootloader roll back to the previous firmware slot on
    /// next boot. Returns `false` if no rollback slot is available.
    fn flash_rollback(&mut self) -> Result<bool, UpdateError>;

    /// Reboot the device. Never returns on success.
    fn reboot(&mut self);
}

#[derive(Debug)]
pub enum UpdateError {
    DownloadFailed,
    InvalidImage,
    NoRollbackSlot,
    FlashWriteFailed,
}

impl core::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DownloadFailed => write!(f, "OTA download failed"),
            Self::InvalidImage => write!(f, "OTA image invalid"),
            Self::NoRollbackSlot => write!(f, "no rollback slot available"),
            Self::FlashWriteFailed => write!(f, "flash write failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Connectivity port (driven adapter: domain → WiFi station + portal)
// ───────────────────────────────────────────────────────────────

/// WiFi station and provisioning-portal control, driven by the
/// connectivity task's provisioning state machine. Every method is
/// non-blocking: a connection attempt is started with `start_connect`
/// and its outcome collected later via `poll_connect`.
pub trait ConnectivityPort {
    /// Whether credentials from a previous portal submission are saved.
    fn has_saved_credentials(&self) -> bool;

    /// Begin a station connection attempt using saved credentials.
    fn start_connect(&mut self);

    /// Poll the in-flight connection attempt. `None` while still
    /// connecting; `Some(true/false)` once it settles.
    fn poll_connect(&mut self) -> Option<bool>;

    /// Current link state, independent of any attempt in progress.
    fn wifi_up(&self) -> bool;

    /// Start the access-point + captive portal.
    fn start_portal(&mut self);

    /// Stop the access-point + captive portal.
    fn stop_portal(&mut self);

    /// Drain one WiFi credential pair submitted through the portal form,
    /// if any. Submitting persists the credentials for future boots.
    fn take_submitted_credentials(&mut self) -> Option<(heapless::String<32>, heapless::String<64>)>;
}

// ───────────────────────────────────────────────────────────────
// MQTT port (driven adapter: domain → broker session)
// ───────────────────────────────────────────────────────────────

/// Quality of service for a single publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
}

/// Broker session control. Reconnect pacing is the caller's
/// responsibility — `try_connect` attempts once per call.
pub trait MqttPort {
    /// Whether the session is currently established.
    fn mqtt_up(&self) -> bool;

    /// Attempt to (re)connect. Registers the last-will and subscribes to
    /// the commands topic on success.
    fn try_connect(&mut self) -> bool;

    /// Publish a payload to `topic`. Returns `Ok(true)` once the broker
    /// has acknowledged the publish (always true at QoS 0).
    fn publish(&mut self, topic: &str, payload: &[u8], qos: Qos) -> Result<bool, ConnError>;

    /// Drain one pending inbound command payload, if any arrived on the
    /// subscribed commands topic since the last call. Payloads already
    /// enforce the size ceiling before reaching the command dispatcher.
    fn poll_command(&mut self) -> Option<Vec<u8>>;
}

#[derive(Debug)]
pub enum ConnError {
    NotConnected,
    Timeout,
    Io,
}

impl core::fmt::Display for ConnError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Timeout => write!(f, "timed out"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT,
/// BLE characteristic, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// # Security
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges should be rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.  This prevents a compromised BLE/RPC channel
/// from injecting dangerous operating parameters (e.g., disabling thermal
/// shutdown by setting `max_temperature_c` to `f32::MAX`).
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`Config::default()`] if no stored config exists.
    fn load(&self) -> Result<Config, ConfigError>;

    /// Validate and persist configuration.
    /// Rejects invalid values per [`crate::config::validate`].
    fn save(&self, config: &Config) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for NVS, credentials, crash logs, etc.
///
/// # Security
///
/// - Implementations SHOULD encrypt sensitive keys (WiFi passwords, tokens).
///   On ESP32, prefer the encrypted NVS partition for these.
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic — no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
/// - Callers MUST NOT store secrets in plaintext namespaces.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;

    /// Append a record to a filesystem spool file, creating it if absent.
    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Atomically rename a spool file (used by the two-phase offline drain).
    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Iterate newline-delimited records of a spool file.
    fn iter_dir(&self, path: &str) -> Result<Vec<Vec<u8>>, StorageError>;

    /// Remove a spool file. `Ok(())` even if it didn't exist.
    fn remove(&mut self, path: &str) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Encryption or decryption failed (wrong key, corrupted blob).
    EncryptionError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::EncryptionError => write!(f, "encryption error"),
        }
    }
}
