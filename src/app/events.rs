//! Outbound application events.
//!
//! Control, Connectivity and Persistence emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them — log to serial, publish to `.../alerts`,
//! etc.

use crate::fsm::StateId;
use crate::sensors::SensorSnapshot;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// A relay changed state as a result of a Control tick.
    ActuatorChanged { pump: bool, fan: bool, heater: bool },

    /// The provisioning FSM transitioned between states.
    ProvisioningStateChanged { from: StateId, to: StateId },

    /// MQTT session established.
    ConnectivityUp,

    /// MQTT session lost or never established.
    ConnectivityDown,

    /// Configuration was updated and persisted.
    ConfigUpdated,

    /// A command field was rejected by validation.
    CommandRejected { reason: &'static str },

    /// OTA download/flash started.
    OtaStarted,

    /// A firmware rollback occurred at boot (crash_count ≥ 3).
    OtaRolledBack,

    /// The provisioning portal opened or closed.
    PortalStarted,
    PortalStopped,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone)]
pub struct TelemetryData {
    pub sensors: SensorSnapshot,
    pub pump: bool,
    pub fan: bool,
    pub heater: bool,
}
