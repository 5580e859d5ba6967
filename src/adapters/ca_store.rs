//! Pinned root CA storage for the MQTT/TLS client.
//!
//! This firmware is a TLS *client* only — there is no server certificate
//! or private key to store, unlike the teacher's mutual-TLS RPC server.
//! The CA is read from the NVS-backed `certs` partition at boot and falls
//! back to a build-time embedded default if NVS holds nothing yet,
//! mirroring how the rest of configuration falls back to defaults on
//! first boot.

use log::{info, warn};

const MAX_CA_SIZE: usize = 4096;
const CA_KEY: &str = "ca_cert";

/// A build-time embedded default, used until a CA is provisioned into NVS.
const EMBEDDED_DEFAULT_CA: &[u8] = include_bytes!("../../assets/default_ca.pem");

pub struct CaStore;

impl CaStore {
    pub fn new() -> Self {
        Self
    }

    /// Load the pinned root CA: NVS first, embedded default otherwise.
    pub fn load(&self) -> heapless::Vec<u8, MAX_CA_SIZE> {
        if let Some(ca) = self.platform_load() {
            info!("CaStore: loaded CA from NVS ({}B)", ca.len());
            return ca;
        }
        warn!("CaStore: no CA in NVS, using embedded default");
        let mut v = heapless::Vec::new();
        let _ = v.extend_from_slice(&EMBEDDED_DEFAULT_CA[..EMBEDDED_DEFAULT_CA.len().min(MAX_CA_SIZE)]);
        v
    }

    /// Provision a new CA into NVS (used by the diagnostics/OTA update path
    /// when rotating the pinned certificate).
    #[cfg(target_os = "espidf")]
    pub fn store(&self, data: &[u8]) -> Result<(), CaStoreError> {
        use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

        let nvs_partition = EspNvsPartition::<NvsDefault>::take().map_err(|_| CaStoreError::PartitionNotFound)?;
        let mut nvs = EspNvs::new(nvs_partition, "certs", true).map_err(|_| CaStoreError::NvsError)?;
        nvs.set_blob(CA_KEY, data).map_err(|_| CaStoreError::WriteFailed)?;
        info!("CaStore: stored CA ({}B)", data.len());
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn store(&self, _data: &[u8]) -> Result<(), CaStoreError> {
        info!("CaStore(sim): store is a no-op in simulation");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_load(&self) -> Option<heapless::Vec<u8, MAX_CA_SIZE>> {
        use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

        let nvs_partition = EspNvsPartition::<NvsDefault>::take().ok()?;
        let nvs = EspNvs::new(nvs_partition, "certs", false).ok()?;

        let mut buf = [0u8; MAX_CA_SIZE];
        let len = nvs.get_blob(CA_KEY, &mut buf).ok()??;
        let mut v = heapless::Vec::new();
        let _ = v.extend_from_slice(&buf[..len]);
        Some(v)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_load(&self) -> Option<heapless::Vec<u8, MAX_CA_SIZE>> {
        None
    }
}

impl Default for CaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum CaStoreError {
    PartitionNotFound,
    NvsError,
    WriteFailed,
}

impl core::fmt::Display for CaStoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PartitionNotFound => write!(f, "cert partition not found"),
            Self::NvsError => write!(f, "NVS initialization error"),
            Self::WriteFailed => write!(f, "CA write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_embedded_default_off_target() {
        let store = CaStore::new();
        let ca = store.load();
        assert!(!ca.is_empty());
    }
}
