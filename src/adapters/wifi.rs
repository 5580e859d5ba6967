//! WiFi station mode + the `ConnectivityPort` composition.
//!
//! `WifiStation` is the non-blocking STA connect/reconnect state machine;
//! `ConnectivityAdapter` composes it with [`super::portal::Portal`] and is
//! the type that actually implements [`ConnectivityPort`] — the
//! provisioning driver only ever sees the trait, never `WifiStation` or
//! `Portal` directly.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! On disconnect the station waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) before retrying.

use log::{error, info, warn};

use super::portal::Portal;
use super::utils::is_printable_ascii;
use crate::app::ports::ConnectivityPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    AuthFailed,
}

impl core::fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AuthFailed => write!(f, "WiFi authentication failed (wrong password or AP rejection)"),
        }
    }
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn wifi_stack_init() -> Result<(), ConnectivityError> {
    use esp_idf_svc::sys::*;
    unsafe {
        if esp_netif_init() != ESP_OK as i32 {
            error!("WiFi: esp_netif_init failed");
            return Err(ConnectivityError::ConnectionFailed);
        }
        let loop_ret = esp_event_loop_create_default();
        if loop_ret != ESP_OK as i32 && loop_ret != ESP_ERR_INVALID_STATE as i32 {
            error!("WiFi: esp_event_loop_create_default failed");
            return Err(ConnectivityError::ConnectionFailed);
        }
        esp_netif_create_default_wifi_sta();
        let wifi_init_cfg = wifi_init_config_t { ..Default::default() };
        if esp_wifi_init(&wifi_init_cfg) != ESP_OK as i32 {
            return Err(ConnectivityError::ConnectionFailed);
        }
        if esp_wifi_set_mode(wifi_mode_t_WIFI_MODE_STA) != ESP_OK as i32 {
            return Err(ConnectivityError::ConnectionFailed);
        }
        if esp_wifi_start() != ESP_OK as i32 {
            return Err(ConnectivityError::ConnectionFailed);
        }
        info!("WiFi: stack initialized (STA mode)");
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn wifi_stack_init() -> Result<(), ConnectivityError> {
    info!("WiFi(sim): stack init skipped");
    Ok(())
}

const MAX_BACKOFF_SECS: u32 = 60;
/// Boot-time connect attempt window before falling back to OFFLINE.
pub const CONNECT_TIMEOUT_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StationState {
    Idle,
    Connecting { elapsed_secs: u32 },
    Connected,
    Reconnecting { attempt: u32, backoff_secs: u32 },
}

/// Non-blocking WiFi STA connect/reconnect state machine.
pub struct WifiStation {
    state: StationState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(not(target_os = "espidf"))]
    sim_connect_counter: u32,
}

impl WifiStation {
    pub fn new() -> Self {
        Self {
            state: StationState::Idle,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_connect_counter: 0,
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.ssid.is_empty()
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(())
    }

    pub fn start_connect(&mut self) {
        if self.ssid.is_empty() {
            warn!("WiFi: start_connect with no saved SSID");
            return;
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        self.platform_begin_connect();
        self.state = StationState::Connecting { elapsed_secs: 0 };
    }

    pub fn is_up(&self) -> bool {
        self.state == StationState::Connected
    }

    /// Advance one second. Returns `Some(true/false)` exactly once per
    /// connect attempt, when the attempt resolves.
    pub fn poll(&mut self) -> Option<bool> {
        match self.state {
            StationState::Connecting { elapsed_secs } => {
                if self.platform_connect_ready() {
                    self.state = StationState::Connected;
                    info!("WiFi: connected");
                    return Some(true);
                }
                let elapsed = elapsed_secs + 1;
                if elapsed >= CONNECT_TIMEOUT_SECS {
                    warn!("WiFi: connect attempt timed out after {CONNECT_TIMEOUT_SECS}s");
                    self.state = StationState::Idle;
                    return Some(false);
                }
                self.state = StationState::Connecting { elapsed_secs: elapsed };
                None
            }
            StationState::Connected => {
                if !self.platform_is_connected() {
                    warn!("WiFi: connection lost, entering reconnect");
                    self.state = StationState::Reconnecting { attempt: 0, backoff_secs: 2 };
                }
                None
            }
            StationState::Reconnecting { attempt, backoff_secs } => {
                if self.platform_connect_ready() {
                    self.state = StationState::Connected;
                    info!("WiFi: reconnected after {attempt} attempts");
                    return Some(true);
                }
                self.state = StationState::Reconnecting {
                    attempt: attempt + 1,
                    backoff_secs: (backoff_secs * 2).min(MAX_BACKOFF_SECS),
                };
                None
            }
            StationState::Idle => None,
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin_connect(&mut self) {
        use esp_idf_svc::sys::*;
        unsafe {
            let mut wifi_cfg: wifi_config_t = core::mem::zeroed();
            let sta = &mut wifi_cfg.__bindgen_anon_1.sta;
            let ssid_bytes = self.ssid.as_bytes();
            let pw_bytes = self.password.as_bytes();
            sta.ssid[..ssid_bytes.len()].copy_from_slice(ssid_bytes);
            sta.password[..pw_bytes.len()].copy_from_slice(pw_bytes);
            sta.threshold.authmode = if self.password.is_empty() {
                wifi_auth_mode_t_WIFI_AUTH_OPEN
            } else {
                wifi_auth_mode_t_WIFI_AUTH_WPA2_PSK
            };
            let _ = esp_wifi_set_config(wifi_interface_t_WIFI_IF_STA, &mut wifi_cfg);
            let _ = esp_wifi_connect();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin_connect(&mut self) {
        self.sim_connect_counter = self.sim_connect_counter.wrapping_add(1);
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect_ready(&self) -> bool {
        self.platform_is_connected()
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect_ready(&self) -> bool {
        // Simulated auth failure every 10th attempt to exercise timeouts.
        self.sim_connect_counter % 10 != 3
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        use esp_idf_svc::sys::*;
        unsafe {
            let mut ap_info: wifi_ap_record_t = core::mem::zeroed();
            esp_wifi_sta_get_ap_info(&mut ap_info) == ESP_OK as i32
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == StationState::Connected
    }
}

impl Default for WifiStation {
    fn default() -> Self {
        Self::new()
    }
}

/// Composes [`WifiStation`] and [`Portal`] into the single
/// [`ConnectivityPort`] the provisioning driver talks to.
pub struct ConnectivityAdapter {
    station: WifiStation,
    portal: Portal,
}

impl ConnectivityAdapter {
    pub fn new(saved_ssid: Option<&str>, saved_password: Option<&str>) -> Self {
        let mut station = WifiStation::new();
        if let (Some(ssid), Some(password)) = (saved_ssid, saved_password) {
            let _ = station.set_credentials(ssid, password);
        }
        Self { station, portal: Portal::new() }
    }
}

impl ConnectivityPort for ConnectivityAdapter {
    fn has_saved_credentials(&self) -> bool {
        self.station.has_credentials()
    }

    fn start_connect(&mut self) {
        self.station.start_connect();
    }

    fn poll_connect(&mut self) -> Option<bool> {
        self.station.poll()
    }

    fn wifi_up(&self) -> bool {
        self.station.is_up()
    }

    fn start_portal(&mut self) {
        self.portal.start();
    }

    fn stop_portal(&mut self) {
        self.portal.stop();
    }

    fn take_submitted_credentials(&mut self) -> Option<(heapless::String<32>, heapless::String<64>)> {
        let (ssid, password) = self.portal.take_submitted()?;
        let _ = self.station.set_credentials(&ssid, &password);
        Some((ssid, password))
    }
}
