//! Greenhouse controller firmware — entry point.
//!
//! Hexagonal architecture, event-driven execution. Four cooperating
//! concerns (sensing, control, connectivity, interface) are woven through
//! one lock-free event queue and a small set of periodic hardware timers.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   Esp32TimeAdapter │
//! │  (Sensor+Actuator) (EventSink)    (Config+NVS) (TimePort)       │
//! │  ConnectivityAdapter (WiFi STA + portal)   MqttAdapter (broker) │
//! │  OtaAdapter (UpdatePort)                    CaStore (root CA)   │
//! │                                                                │
//! │  ──────────────── Port trait boundary ────────────────────     │
//! │                                                                │
//! │  Control (hysteresis)   Provisioning (FSM)   Telemetry         │
//! │  Interface (LCD+button) BootHealth           command::dispatch │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use greenhouse_firmware::adapters::ca_store::CaStore;
use greenhouse_firmware::adapters::device_id;
use greenhouse_firmware::adapters::hardware::HardwareAdapter;
use greenhouse_firmware::adapters::log_sink::LogEventSink;
use greenhouse_firmware::adapters::mqtt::MqttAdapter;
use greenhouse_firmware::adapters::nvs::NvsAdapter;
use greenhouse_firmware::adapters::ota::OtaAdapter;
use greenhouse_firmware::adapters::time::Esp32TimeAdapter;
use greenhouse_firmware::adapters::wifi::ConnectivityAdapter;
use greenhouse_firmware::app::events::AppEvent;
use greenhouse_firmware::app::ports::{ActuatorPort, ConfigPort, ConnectivityPort, EventSink, MqttPort, SensorPort, UpdatePort};
use greenhouse_firmware::config::Config;
use greenhouse_firmware::connectivity::command;
use greenhouse_firmware::connectivity::provisioning::Provisioning;
use greenhouse_firmware::connectivity::telemetry::Telemetry;
use greenhouse_firmware::connectivity::update::{BootAction, BootHealth};
use greenhouse_firmware::control::Control;
use greenhouse_firmware::diagnostics;
use greenhouse_firmware::drivers;
use greenhouse_firmware::drivers::relay::RelayDriver;
use greenhouse_firmware::events::{drain_events, push_event, Event};
use greenhouse_firmware::fsm::context::ButtonIntent;
use greenhouse_firmware::fsm::StateId;
use greenhouse_firmware::interface::{DisplayState, Interface};
use greenhouse_firmware::sensors::{SensorHub, SensorSnapshot};

/// NVS "auth" namespace keys the portal-submitted WiFi credentials are
/// mirrored under, so a saved network survives a reboot.
const CREDENTIAL_SSID_KEY: &str = "wifi_ssid";
const CREDENTIAL_PASSWORD_KEY: &str = "wifi_password";

/// How often the provisioning FSM is ticked. Matches the 1 Hz control
/// period so the 10s/30s/120s state timeouts in `fsm/states.rs` read in
/// real seconds.
const PROVISIONING_TICK_SECS: f32 = 1.0;

/// Thin decorator around [`ConnectivityAdapter`] that mirrors a portal
/// credential submission into NVS the moment `Provisioning` drains it,
/// without adding a second independent consumer of the one-shot
/// `take_submitted_credentials` channel.
struct PersistingConn<'a> {
    inner: &'a mut ConnectivityAdapter,
    nvs: &'a mut NvsAdapter,
}

impl ConnectivityPort for PersistingConn<'_> {
    fn has_saved_credentials(&self) -> bool {
        self.inner.has_saved_credentials()
    }

    fn start_connect(&mut self) {
        self.inner.start_connect();
    }

    fn poll_connect(&mut self) -> Option<bool> {
        self.inner.poll_connect()
    }

    fn wifi_up(&self) -> bool {
        self.inner.wifi_up()
    }

    fn start_portal(&mut self) {
        self.inner.start_portal();
    }

    fn stop_portal(&mut self) {
        self.inner.stop_portal();
    }

    fn take_submitted_credentials(&mut self) -> Option<(heapless::String<32>, heapless::String<64>)> {
        let creds = self.inner.take_submitted_credentials();
        if let Some((ssid, password)) = &creds {
            use greenhouse_firmware::app::ports::StoragePort;
            let _ = StoragePort::write(self.nvs, "auth", CREDENTIAL_SSID_KEY, ssid.as_bytes());
            let _ = StoragePort::write(self.nvs, "auth", CREDENTIAL_PASSWORD_KEY, password.as_bytes());
        }
        creds
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("=== greenhouse-firmware v{} ===", env!("CARGO_PKG_VERSION"));

    diagnostics::install_panic_handler();

    // ── 2. Peripheral init ─────────────────────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        log::error!("peripheral init failed: {e} — halting");
        #[allow(clippy::empty_loop)]
        loop {}
    }

    #[cfg(target_os = "espidf")]
    {
        let peripherals = esp_idf_svc::hal::peripherals::Peripherals::take()?;
        let i2c_config = esp_idf_svc::hal::i2c::config::Config::new().baudrate(100_000.into());
        let i2c = esp_idf_svc::hal::i2c::I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio14,
            peripherals.pins.gpio15,
            &i2c_config,
        )?;
        drivers::hw_init::install_i2c_driver(i2c);
    }

    drivers::hw_timer::start_timers();
    let watchdog = drivers::watchdog::Watchdog::new();

    // ── 3. Configuration from NVS (or defaults) ───────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({e}), running with defaults and no persistence");
            NvsAdapter::default()
        }
    };
    let mut cfg: Config = match nvs.load() {
        Ok(cfg) => {
            info!("config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({e}), using defaults");
            Config::default()
        }
    };

    // ── 4. Boot-health / OTA rollback gate ─────────────────────
    let mut ota = OtaAdapter::new();
    if matches!(BootHealth::on_boot(&mut nvs, &mut ota), BootAction::RollbackAndReboot) {
        warn!("repeated boot failure — rolled back to previous firmware, rebooting");
        ota.reboot();
    }

    // ── 5. Device identity ─────────────────────────────────────
    let mac = device_id::read_mac();
    let dev_id = device_id::device_id(&mac);
    info!("device id: {dev_id}");

    // ── 6. Domain adapters ──────────────────────────────────────
    let mut hw = HardwareAdapter::new(SensorHub::new(), RelayDriver::new());
    let mut log_sink = LogEventSink::new();
    let mut control = Control::new();
    let mut interface = Interface::new();
    let time = Esp32TimeAdapter::new();

    // ── 7. Connectivity / provisioning ─────────────────────────
    let mut ssid_buf = [0u8; 32];
    let mut password_buf = [0u8; 64];
    let saved_ssid = nvs
        .read_credential(CREDENTIAL_SSID_KEY, &mut ssid_buf)
        .ok()
        .and_then(|len| core::str::from_utf8(&ssid_buf[..len]).ok())
        .map(str::to_owned);
    let saved_password = nvs
        .read_credential(CREDENTIAL_PASSWORD_KEY, &mut password_buf)
        .ok()
        .and_then(|len| core::str::from_utf8(&password_buf[..len]).ok())
        .map(str::to_owned);

    let mut conn = ConnectivityAdapter::new(saved_ssid.as_deref(), saved_password.as_deref());
    let mut provisioning = Provisioning::new(conn.has_saved_credentials(), PROVISIONING_TICK_SECS);
    let mut provisioning_state = provisioning.state();

    // ── 8. MQTT broker session ─────────────────────────────────
    let broker_host = option_env!("GREENHOUSE_MQTT_HOST").unwrap_or("mqtt.greenhouse.local").to_string();
    let broker_port: u16 = option_env!("GREENHOUSE_MQTT_PORT")
        .and_then(|p| p.parse().ok())
        .unwrap_or(8883);
    let mqtt_username = option_env!("GREENHOUSE_MQTT_USERNAME").map(str::to_string);
    let mqtt_password = option_env!("GREENHOUSE_MQTT_PASSWORD").map(str::to_string);
    let ca_cert = CaStore::new().load().to_vec();

    let mut mqtt = MqttAdapter::new(dev_id.as_str(), broker_host, broker_port, ca_cert, mqtt_username, mqtt_password);
    let mut telemetry = Telemetry::new(dev_id.as_str());
    let mut mqtt_connected_once = false;
    let mut mqtt_was_up = false;

    let mut last_snapshot = SensorSnapshot::default();
    let mut pump_on = false;
    let mut fan_on = false;
    let mut heater_on = false;
    let mut pending_button_intent: Option<ButtonIntent> = None;

    info!("system ready, entering event loop");

    loop {
        // Simulate the hardware timers via sleep on non-espidf targets; on
        // the real target the CPU idles between `esp_timer` ISR wakeups.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(500));
            push_event(Event::InterfaceTick);
        }

        let now_secs = time.uptime_secs();
        let now_ms = (time.uptime_us() / 1000) as u32;

        // Commands arrive out-of-band through rumqttc's background event
        // loop; poke the queue once per iteration while a session is up so
        // any that arrived get dispatched this cycle.
        if mqtt.mqtt_up() {
            push_event(Event::CommandReceived);
        }

        drain_events(|event| match event {
            Event::SensingTick => {
                last_snapshot = hw.read_all(&cfg, now_secs);
            }

            Event::ControlTick => {
                let result = control.tick(&last_snapshot, &cfg, &mut hw);
                if result.changed {
                    log_sink.emit(&AppEvent::ActuatorChanged {
                        pump: result.pump,
                        fan: result.fan,
                        heater: result.heater,
                    });
                }
                pump_on = result.pump;
                fan_on = result.fan;
                heater_on = result.heater;

                {
                    let mut pconn = PersistingConn { inner: &mut conn, nvs: &mut nvs };
                    provisioning.tick(&mut pconn);
                }
            }

            Event::InterfaceTick => {
                let state = DisplayState {
                    sensors: last_snapshot,
                    pump: pump_on,
                    fan: fan_on,
                    heater: heater_on,
                    portal_active: provisioning.portal_active(),
                    reconfigure_pending: provisioning.reconfigure_pending(),
                    mqtt_up: mqtt.mqtt_up(),
                };
                interface.render(&state);

                if let Some(intent) = interface.poll_button(now_ms, provisioning.portal_active()) {
                    pending_button_intent = Some(intent);
                    push_event(Event::ButtonPressed);
                }
            }

            Event::ButtonPressed => {
                if let Some(intent) = pending_button_intent.take() {
                    provisioning.notify_button(intent);
                }
            }

            Event::ReconnectTick => {
                let mut pconn = PersistingConn { inner: &mut conn, nvs: &mut nvs };
                provisioning.tick(&mut pconn);
            }

            Event::TelemetryTick => {
                let result = greenhouse_firmware::control::TickResult {
                    pump: pump_on,
                    fan: fan_on,
                    heater: heater_on,
                    changed: false,
                };
                telemetry.tick(&last_snapshot, result, control.mode(), mqtt.mqtt_up(), &mut mqtt, &mut nvs, now_secs);
            }

            Event::CommandReceived => {
                while let Some(payload) = mqtt.poll_command() {
                    let outcome = command::dispatch(&payload, &mut cfg, &mut control, &mut log_sink);

                    if outcome.config_changed {
                        match nvs.save(&cfg) {
                            Ok(()) => log_sink.emit(&AppEvent::ConfigUpdated),
                            Err(e) => warn!("config persist failed: {e}"),
                        }
                    }

                    if let Some(url) = outcome.ota_requested {
                        log_sink.emit(&AppEvent::OtaStarted);
                        match ota.flash_update(&url) {
                            Ok(()) => ota.reboot(),
                            Err(e) => warn!("OTA update failed: {e}"),
                        }
                    }
                }
            }
        });

        // ── Provisioning state-transition side effects ─────────
        let new_state = provisioning.state();
        if new_state != provisioning_state {
            log_sink.emit(&AppEvent::ProvisioningStateChanged { from: provisioning_state, to: new_state });

            if new_state == StateId::Offline {
                drivers::hw_timer::start_reconnect_timer();
            } else if provisioning_state == StateId::Offline {
                drivers::hw_timer::stop_reconnect_timer();
            }

            if new_state == StateId::Portal {
                log_sink.emit(&AppEvent::PortalStarted);
            } else if provisioning_state == StateId::Portal {
                log_sink.emit(&AppEvent::PortalStopped);
            }

            provisioning_state = new_state;
        }

        // ── MQTT session lifecycle ──────────────────────────────
        if provisioning.state() == StateId::Online && !mqtt.mqtt_up() {
            if mqtt.try_connect() {
                log_sink.emit(&AppEvent::ConnectivityUp);
                if !mqtt_connected_once {
                    BootHealth::on_mqtt_connected(&mut nvs, &mut mqtt, dev_id.as_str(), now_secs);
                    mqtt_connected_once = true;
                }
            }
        }
        let mqtt_up_now = mqtt.mqtt_up();
        if mqtt_was_up && !mqtt_up_now {
            log_sink.emit(&AppEvent::ConnectivityDown);
        }
        mqtt_was_up = mqtt_up_now;

        watchdog.feed();
    }
}
