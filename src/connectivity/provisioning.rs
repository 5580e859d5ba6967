//! Drives the provisioning state machine against a live [`ConnectivityPort`].
//!
//! Owns the [`Fsm`] and its [`ProvisioningContext`]; each `tick()` pulls
//! live WiFi/portal status in, lets the state machine run, then carries
//! whatever intent it produced back out through the port. The FSM itself
//! never touches the port directly — see `fsm/context.rs`.

use crate::app::ports::ConnectivityPort;
use crate::fsm::context::{ButtonIntent, ProvisioningContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};

pub struct Provisioning {
    fsm: Fsm,
    ctx: ProvisioningContext,
}

impl Provisioning {
    pub fn new(has_saved_credentials: bool, tick_period_secs: f32) -> Self {
        let table = build_state_table();
        let mut fsm = Fsm::new(table, StateId::Idle);
        let mut ctx = ProvisioningContext::new(has_saved_credentials, tick_period_secs);
        fsm.start(&mut ctx);
        Self { fsm, ctx }
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Whether the portal is currently up — the Interface task needs this
    /// to classify a button press and to pick its display banner.
    pub fn portal_active(&self) -> bool {
        self.state() == StateId::Portal
    }

    /// Whether a portal session is open or about to open on a button
    /// request — used for the Interface's "reconfigure pending" banner.
    pub fn reconfigure_pending(&self) -> bool {
        self.ctx.button_request == Some(ButtonIntent::StartReconfiguration)
    }

    /// Surface a button-driven intent for the next tick to act on.
    pub fn notify_button(&mut self, intent: ButtonIntent) {
        self.ctx.button_request = Some(intent);
    }

    /// Run one provisioning cycle: collect the previous tick's connect
    /// result and any submitted credentials, advance the state machine,
    /// then carry out whatever it decided through `conn`.
    pub fn tick(&mut self, conn: &mut impl ConnectivityPort) {
        if let Some(result) = conn.poll_connect() {
            self.ctx.connect_result = Some(result);
        }
        self.ctx.wifi_up = conn.wifi_up();

        if conn.take_submitted_credentials().is_some() {
            self.ctx.credentials_submitted = true;
            self.ctx.has_saved_credentials = true;
        }

        self.fsm.tick(&mut self.ctx);

        if core::mem::take(&mut self.ctx.intents.start_connect) {
            conn.start_connect();
        }
        if core::mem::take(&mut self.ctx.intents.start_portal) {
            conn.start_portal();
        }
        if core::mem::take(&mut self.ctx.intents.stop_portal) {
            conn.stop_portal();
        }
    }
}
