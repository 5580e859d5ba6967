//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap. This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!  IDLE ──[boot]──▶ CONNECT_SAVED ──[connected]──▶ ONLINE
//!                         │                           │
//!                  [10s timeout /                [disconnected]
//!                   no creds]                          │
//!                         ▼                           ▼
//!                      OFFLINE ◀──────────────────────┘
//!                      │    ▲
//!           [button] │    │ [30s reconnect tick, connected]
//!                      ▼    │
//!                    PORTAL │
//!                      │    │
//!        [creds saved] │    │ [button / 120s timeout]
//!                      ▼    │
//!               CONNECT_SAVED
//! ```
//!
//! On boot the device always attempts its saved credentials before ever
//! considering the portal — the portal is opt-in via the physical button,
//! never automatic.

use super::context::{ButtonIntent, ProvisioningContext};
use super::{StateDescriptor, StateId};
use log::{info, warn};

/// Connect attempt budget before giving up and going offline.
const CONNECT_SAVED_TIMEOUT_SECS: f32 = 10.0;
/// Provisioning portal idle budget before it is torn down automatically.
const PORTAL_TIMEOUT_SECS: f32 = 120.0;
/// Self-healing reconnect cadence while offline.
const RECONNECT_INTERVAL_SECS: f32 = 30.0;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: StateId::ConnectSaved,
            name: "ConnectSaved",
            on_enter: Some(connect_saved_enter),
            on_exit: None,
            on_update: connect_saved_update,
        },
        StateDescriptor {
            id: StateId::Online,
            name: "Online",
            on_enter: Some(online_enter),
            on_exit: None,
            on_update: online_update,
        },
        StateDescriptor {
            id: StateId::Offline,
            name: "Offline",
            on_enter: Some(offline_enter),
            on_exit: None,
            on_update: offline_update,
        },
        StateDescriptor {
            id: StateId::Portal,
            name: "Portal",
            on_enter: Some(portal_enter),
            on_exit: Some(portal_exit),
            on_update: portal_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE — transient boot state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(_ctx: &mut ProvisioningContext) {
    info!("IDLE: provisioning starting up");
}

fn idle_update(ctx: &mut ProvisioningContext) -> Option<StateId> {
    if ctx.has_saved_credentials {
        Some(StateId::ConnectSaved)
    } else {
        Some(StateId::Offline)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECT_SAVED — attempting a connection with saved credentials
// ═══════════════════════════════════════════════════════════════════════════

fn connect_saved_enter(ctx: &mut ProvisioningContext) {
    ctx.connect_result = None;
    ctx.intents.start_connect = true;
    info!("CONNECT_SAVED: attempting connection with saved credentials");
}

fn connect_saved_update(ctx: &mut ProvisioningContext) -> Option<StateId> {
    if let Some(result) = ctx.connect_result.take() {
        return if result {
            info!("CONNECT_SAVED: connected");
            Some(StateId::Online)
        } else {
            warn!("CONNECT_SAVED: connect attempt failed");
            Some(StateId::Offline)
        };
    }

    if ctx.secs_in_state() >= CONNECT_SAVED_TIMEOUT_SECS {
        warn!("CONNECT_SAVED: timed out after {CONNECT_SAVED_TIMEOUT_SECS}s, going offline");
        return Some(StateId::Offline);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ONLINE — connected, MQTT session driven externally
// ═══════════════════════════════════════════════════════════════════════════

fn online_enter(_ctx: &mut ProvisioningContext) {
    info!("ONLINE: connected");
}

fn online_update(ctx: &mut ProvisioningContext) -> Option<StateId> {
    if !ctx.wifi_up {
        warn!("ONLINE: connection dropped");
        return Some(StateId::Offline);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFFLINE — no connection; self-heals on a timer, portal on button request
// ═══════════════════════════════════════════════════════════════════════════

fn offline_enter(_ctx: &mut ProvisioningContext) {
    info!("OFFLINE: no connection, will retry saved credentials periodically");
}

fn offline_update(ctx: &mut ProvisioningContext) -> Option<StateId> {
    if let Some(ButtonIntent::StartReconfiguration) = ctx.button_request.take() {
        return Some(StateId::Portal);
    }

    if ctx.has_saved_credentials && ctx.secs_in_state() >= RECONNECT_INTERVAL_SECS {
        info!("OFFLINE: self-healing reconnect attempt");
        return Some(StateId::ConnectSaved);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  PORTAL — access point + captive form collecting new credentials
// ═══════════════════════════════════════════════════════════════════════════

fn portal_enter(ctx: &mut ProvisioningContext) {
    ctx.intents.start_portal = true;
    ctx.credentials_submitted = false;
    info!("PORTAL: access point started");
}

fn portal_exit(ctx: &mut ProvisioningContext) {
    ctx.intents.stop_portal = true;
    info!("PORTAL: access point stopped");
}

fn portal_update(ctx: &mut ProvisioningContext) -> Option<StateId> {
    if ctx.credentials_submitted {
        info!("PORTAL: new credentials saved");
        return Some(StateId::ConnectSaved);
    }

    if let Some(ButtonIntent::StopPortal) = ctx.button_request.take() {
        return Some(StateId::Offline);
    }

    if ctx.secs_in_state() >= PORTAL_TIMEOUT_SECS {
        warn!("PORTAL: timed out after {PORTAL_TIMEOUT_SECS}s");
        return Some(StateId::Offline);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::Fsm;

    fn new_fsm(has_saved: bool) -> (Fsm, ProvisioningContext) {
        let table = build_state_table();
        let fsm = Fsm::new(table, StateId::Idle);
        let ctx = ProvisioningContext::new(has_saved, 1.0);
        (fsm, ctx)
    }

    #[test]
    fn boots_to_connect_saved_when_credentials_present() {
        let (mut fsm, mut ctx) = new_fsm(true);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::ConnectSaved);
    }

    #[test]
    fn boots_to_offline_without_credentials() {
        let (mut fsm, mut ctx) = new_fsm(false);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Offline);
    }

    #[test]
    fn successful_connect_goes_online() {
        let (mut fsm, mut ctx) = new_fsm(true);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx); // -> ConnectSaved
        ctx.connect_result = Some(true);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Online);
    }

    #[test]
    fn failed_connect_goes_offline() {
        let (mut fsm, mut ctx) = new_fsm(true);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx); // -> ConnectSaved
        ctx.connect_result = Some(false);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Offline);
    }

    #[test]
    fn connect_saved_times_out_after_10s() {
        let (mut fsm, mut ctx) = new_fsm(true);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx); // -> ConnectSaved
        for _ in 0..10 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), StateId::Offline);
    }

    #[test]
    fn online_drops_to_offline_when_wifi_down() {
        let (mut fsm, mut ctx) = new_fsm(true);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        ctx.connect_result = Some(true);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Online);

        ctx.wifi_up = false;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Offline);
    }

    #[test]
    fn offline_self_heals_after_30s() {
        let (mut fsm, mut ctx) = new_fsm(true);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        ctx.connect_result = Some(false);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Offline);

        for _ in 0..30 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), StateId::ConnectSaved);
    }

    #[test]
    fn offline_does_not_reconnect_without_saved_credentials() {
        let (mut fsm, mut ctx) = new_fsm(false);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Offline);

        for _ in 0..60 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), StateId::Offline);
    }

    #[test]
    fn button_request_opens_portal_from_offline() {
        let (mut fsm, mut ctx) = new_fsm(false);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Offline);

        ctx.button_request = Some(ButtonIntent::StartReconfiguration);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Portal);
    }

    #[test]
    fn portal_times_out_after_120s() {
        let (mut fsm, mut ctx) = new_fsm(false);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx); // -> Offline
        ctx.button_request = Some(ButtonIntent::StartReconfiguration);
        fsm.tick(&mut ctx); // -> Portal
        assert_eq!(fsm.current_state(), StateId::Portal);

        for _ in 0..120 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), StateId::Offline);
    }

    #[test]
    fn portal_button_stop_returns_offline() {
        let (mut fsm, mut ctx) = new_fsm(false);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx); // -> Offline
        ctx.button_request = Some(ButtonIntent::StartReconfiguration);
        fsm.tick(&mut ctx); // -> Portal

        ctx.button_request = Some(ButtonIntent::StopPortal);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Offline);
    }

    #[test]
    fn portal_credentials_submitted_moves_to_connect_saved() {
        let (mut fsm, mut ctx) = new_fsm(false);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx); // -> Offline
        ctx.button_request = Some(ButtonIntent::StartReconfiguration);
        fsm.tick(&mut ctx); // -> Portal

        ctx.has_saved_credentials = true;
        ctx.credentials_submitted = true;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::ConnectSaved);
    }
}
