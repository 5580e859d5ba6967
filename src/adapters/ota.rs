//! Over-the-air firmware update adapter, implementing [`UpdatePort`].
//!
//! `flash_update` streams a firmware image over HTTPS straight into the
//! inactive OTA partition using the `esp-ota` crate. `flash_rollback` has
//! no safe wrapper in `esp-ota`, so it drops to the raw `esp_idf_sys`
//! partition-table API the same way `adapters::nvs` drops to raw FFI
//! where no higher-level binding exists.

use log::{error, info, warn};

use crate::app::ports::{UpdateError, UpdatePort};

/// Chunk size used when streaming the downloaded image into flash.
const DOWNLOAD_CHUNK: usize = 4096;
/// Reject obviously-wrong images before touching the flash partition.
const MAX_FIRMWARE_SIZE: usize = 4 * 1024 * 1024;

pub struct OtaAdapter {
    #[cfg(not(target_os = "espidf"))]
    last_url: Option<String>,
}

impl OtaAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            last_url: None,
        }
    }
}

impl Default for OtaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl UpdatePort for OtaAdapter {
    fn flash_update(&mut self, url: &str) -> Result<(), UpdateError> {
        use embedded_svc::http::client::Client as HttpClient;
        use embedded_svc::io::Read;
        use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};

        info!("ota: downloading firmware from {url}");

        let connection = EspHttpConnection::new(&HttpConfig {
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })
        .map_err(|e| {
            error!("ota: http connection setup failed: {e}");
            UpdateError::DownloadFailed
        })?;
        let mut client = HttpClient::wrap(connection);

        let request = client.get(url).map_err(|e| {
            error!("ota: http GET failed: {e}");
            UpdateError::DownloadFailed
        })?;
        let response = request.submit().map_err(|e| {
            error!("ota: http request submit failed: {e}");
            UpdateError::DownloadFailed
        })?;

        if response.status() != 200 {
            error!("ota: unexpected HTTP status {}", response.status());
            return Err(UpdateError::DownloadFailed);
        }

        let content_len = response.header("Content-Length").and_then(|v| v.parse::<usize>().ok());
        if let Some(len) = content_len {
            if len == 0 || len > MAX_FIRMWARE_SIZE {
                error!("ota: declared image size {len} out of range");
                return Err(UpdateError::InvalidImage);
            }
        }

        let mut update = esp_ota::OtaUpdate::begin().map_err(|e| {
            error!("ota: esp-ota begin failed: {e:?}");
            UpdateError::FlashWriteFailed
        })?;

        let mut body = response;
        let mut buf = [0u8; DOWNLOAD_CHUNK];
        let mut total = 0usize;
        loop {
            let n = body.read(&mut buf).map_err(|e| {
                error!("ota: download read failed: {e}");
                UpdateError::DownloadFailed
            })?;
            if n == 0 {
                break;
            }
            total += n;
            if total > MAX_FIRMWARE_SIZE {
                error!("ota: image exceeded {MAX_FIRMWARE_SIZE} bytes, aborting");
                return Err(UpdateError::InvalidImage);
            }
            update.write(&buf[..n]).map_err(|e| {
                error!("ota: flash write failed: {e:?}");
                UpdateError::FlashWriteFailed
            })?;
        }

        if total == 0 {
            error!("ota: empty image body");
            return Err(UpdateError::InvalidImage);
        }

        let mut completed = update.finalize().map_err(|e| {
            error!("ota: finalize failed: {e:?}");
            UpdateError::InvalidImage
        })?;
        completed.set_as_boot_partition().map_err(|e| {
            error!("ota: set_as_boot_partition failed: {e:?}");
            UpdateError::FlashWriteFailed
        })?;

        info!("ota: {total} bytes flashed, marked bootable");
        Ok(())
    }

    fn flash_rollback(&mut self) -> Result<bool, UpdateError> {
        // SAFETY: esp_idf_sys partition-table calls, read-only except for
        // the final esp_ota_set_boot_partition write, which ESP-IDF
        // guarantees is atomic with respect to power loss.
        unsafe {
            let running = esp_idf_svc::sys::esp_ota_get_running_partition();
            if running.is_null() {
                return Err(UpdateError::NoRollbackSlot);
            }
            let next = esp_idf_svc::sys::esp_ota_get_next_update_partition(running);
            if next.is_null() {
                warn!("ota: no previous partition available to roll back to");
                return Ok(false);
            }
            let ret = esp_idf_svc::sys::esp_ota_set_boot_partition(next);
            if ret != esp_idf_svc::sys::ESP_OK {
                error!("ota: esp_ota_set_boot_partition failed (rc={ret})");
                return Err(UpdateError::FlashWriteFailed);
            }
        }
        info!("ota: rollback partition selected for next boot");
        Ok(true)
    }

    fn reboot(&mut self) {
        info!("ota: rebooting");
        // SAFETY: esp_restart() never returns; no state to preserve.
        unsafe {
            esp_idf_svc::sys::esp_restart();
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl UpdatePort for OtaAdapter {
    fn flash_update(&mut self, url: &str) -> Result<(), UpdateError> {
        if url.is_empty() {
            return Err(UpdateError::DownloadFailed);
        }
        info!("ota(sim): pretending to flash from {url}");
        self.last_url = Some(url.to_string());
        Ok(())
    }

    fn flash_rollback(&mut self) -> Result<bool, UpdateError> {
        info!("ota(sim): rollback requested");
        Ok(self.last_url.is_some())
    }

    fn reboot(&mut self) {
        panic!("ota(sim): reboot requested (no real hardware reset)");
    }
}
