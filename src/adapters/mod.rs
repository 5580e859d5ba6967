//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements            | Connects to              |
//! |----------------|------------------------|--------------------------|
//! | `hardware`     | SensorPort/ActuatorPort| ESP32 ADC/GPIO/PWM       |
//! | `log_sink`     | EventSink              | Serial log output        |
//! | `nvs`          | ConfigPort/StoragePort | NVS + LittleFS spool     |
//! | `wifi`         | ConnectivityPort (STA) | ESP-IDF WiFi STA         |
//! | `portal`       | ConnectivityPort (AP)  | ESP-IDF WiFi AP + HTTP   |
//! | `mqtt`         | MqttPort               | rumqttc / TLS broker     |
//! | `ca_store`     | —                      | NVS `certs` partition    |
//! | `time`         | —                      | ESP32 system timer       |
//! | `device_id`    | —                      | Factory MAC/eFuse        |
//! | `ota`          | UpdatePort             | esp-ota / OTA partitions |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod ota;
pub mod time;
pub mod wifi;
pub mod portal;
pub mod mqtt;
pub mod ca_store;
pub mod device_id;
pub(super) mod utils;
