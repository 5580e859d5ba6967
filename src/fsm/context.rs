//! Shared mutable context threaded through every provisioning FSM handler.
//!
//! `ProvisioningContext` is the "blackboard" state handlers read from and
//! write to. It never touches a port adapter directly — handlers only set
//! *intents*, mirroring the actuator-commands split used by the control
//! component: the FSM decides, the connectivity driver (outside the FSM)
//! carries the decision out and reports the result back in on the next tick.

/// Requests a state handler can make of the connectivity driver for the
/// current tick. Cleared before every `on_update` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisioningIntents {
    /// Attempt a connection using saved credentials.
    pub start_connect: bool,
    /// Start the provisioning access point + captive portal.
    pub start_portal: bool,
    /// Stop the provisioning access point + captive portal.
    pub stop_portal: bool,
}

/// The shared context passed to every provisioning state handler.
pub struct ProvisioningContext {
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
    /// Duration of one tick in seconds.
    pub tick_period_secs: f32,

    /// Whether WiFi credentials are present in persistence.
    pub has_saved_credentials: bool,
    /// Outcome of the most recent connect attempt the driver carried out,
    /// consumed (set back to `None`) by the handler that reads it.
    pub connect_result: Option<bool>,
    /// Whether the portal has collected and saved new credentials this tick.
    pub credentials_submitted: bool,
    /// A button-driven request surfaced by the interface component.
    pub button_request: Option<ButtonIntent>,
    /// Live connectivity status, updated by the driver every tick.
    pub wifi_up: bool,

    /// Requests the current handler makes of the driver this tick.
    pub intents: ProvisioningIntents,
}

/// Intent the physical button expresses, depending on portal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonIntent {
    StartReconfiguration,
    StopPortal,
}

impl ProvisioningContext {
    pub fn new(has_saved_credentials: bool, tick_period_secs: f32) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            tick_period_secs,
            has_saved_credentials,
            connect_result: None,
            credentials_submitted: false,
            button_request: None,
            wifi_up: false,
            intents: ProvisioningIntents::default(),
        }
    }

    /// Seconds elapsed since the current state was entered.
    pub fn secs_in_state(&self) -> f32 {
        self.ticks_in_state as f32 * self.tick_period_secs
    }
}
