//! Applies a parsed command payload to [`Config`] and [`Control`].
//!
//! `dispatch` is the single place a raw MQTT command payload becomes a
//! validated configuration change and/or a `Control` mode/override update.
//! Setpoint writes are compared against the previous value with a
//! tolerance before being considered "changed" — the same flash-wear guard
//! `adapters/nvs.rs` applies on the write side — so the caller only
//! persists when something genuinely moved.
//!
//! Each touched field is applied and validated independently: a field that
//! fails validation (alone or against the fields already applied from the
//! same payload) is dropped and the rest proceed, rather than discarding
//! the whole payload over one bad field.

use crate::app::commands::{Command, WireCommand, MAX_COMMAND_PAYLOAD_BYTES};
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::config::{self, Config};
use crate::control::Control;

/// Setpoint deltas below this are treated as unchanged (flash-wear guard).
const SETPOINT_TOLERANCE: f32 = 0.1;

/// What a dispatched payload asked for, beyond the Control/Config side
/// effects already applied in place.
#[derive(Debug, Default, PartialEq)]
pub struct DispatchOutcome {
    /// `cfg` was mutated and passed validation — the caller should persist it.
    pub config_changed: bool,
    /// An `update_url` field was present and passed through.
    pub ota_requested: Option<String>,
}

/// Parse and apply one command payload. `cfg` and `control` are mutated in
/// place. Each touched config field is applied to a working candidate and
/// validated on its own; a field whose application makes the candidate
/// invalid is reverted and reported, while the rest of the payload's fields
/// still apply.
pub fn dispatch(
    payload: &[u8],
    cfg: &mut Config,
    control: &mut Control,
    events: &mut impl EventSink,
) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();

    if payload.len() > MAX_COMMAND_PAYLOAD_BYTES {
        events.emit(&AppEvent::CommandRejected { reason: "payload exceeds 10 KiB" });
        return outcome;
    }

    let wire: WireCommand = match serde_json::from_slice(payload) {
        Ok(w) => w,
        Err(_) => {
            events.emit(&AppEvent::CommandRejected { reason: "malformed command payload" });
            return outcome;
        }
    };

    let mut candidate = *cfg;
    let mut touched = false;

    for cmd in Command::from_wire(&wire) {
        match &cmd {
            Command::SetTempMin(v) => {
                try_apply_field(&mut candidate, &mut touched, events, "temp_min out of range", |c| {
                    set_if_changed(&mut c.temp_min, *v)
                });
            }
            Command::SetTempMax(v) => {
                try_apply_field(&mut candidate, &mut touched, events, "temp_max out of range", |c| {
                    set_if_changed(&mut c.temp_max, *v)
                });
            }
            Command::SetHumMax(v) => {
                try_apply_field(&mut candidate, &mut touched, events, "hum_max out of range", |c| {
                    set_if_changed(&mut c.hum_max, *v)
                });
            }
            Command::SetSoilDry(v) => {
                try_apply_field(&mut candidate, &mut touched, events, "soil_dry out of range", |c| {
                    set_if_changed_u8(&mut c.soil_dry, *v)
                });
            }
            Command::SetSoilWet(v) => {
                try_apply_field(&mut candidate, &mut touched, events, "soil_wet out of range", |c| {
                    set_if_changed_u8(&mut c.soil_wet, *v)
                });
            }
            Command::SetTankEmptyDist(v) => {
                try_apply_field(&mut candidate, &mut touched, events, "tank_empty_dist out of range", |c| {
                    set_if_changed_u16(&mut c.tank_empty_dist, *v)
                });
            }
            Command::SetTankFullDist(v) => {
                try_apply_field(&mut candidate, &mut touched, events, "tank_full_dist out of range", |c| {
                    set_if_changed_u16(&mut c.tank_full_dist, *v)
                });
            }
            Command::SetCalAir(v) => {
                try_apply_field(&mut candidate, &mut touched, events, "cal_air_raw out of range", |c| {
                    set_if_changed_i32(&mut c.cal_air_raw, *v)
                });
            }
            Command::SetCalWater(v) => {
                try_apply_field(&mut candidate, &mut touched, events, "cal_water_raw out of range", |c| {
                    set_if_changed_i32(&mut c.cal_water_raw, *v)
                });
            }
            Command::SetMode(_) | Command::SetPump(_) | Command::SetFan(_) | Command::SetHeater(_) => {
                control.apply_command(&cmd);
            }
            Command::StartOta(url) => outcome.ota_requested = Some(url.clone()),
        }
    }

    if touched {
        *cfg = candidate;
        outcome.config_changed = true;
        events.emit(&AppEvent::ConfigUpdated);
    }

    outcome
}

/// Apply one field mutation to `candidate` and keep it only if the result
/// still satisfies [`config::validate`]; otherwise revert just this field
/// and emit a rejection, leaving whatever other fields already landed.
fn try_apply_field(
    candidate: &mut Config,
    touched: &mut bool,
    events: &mut impl EventSink,
    reason: &'static str,
    apply: impl FnOnce(&mut Config) -> bool,
) {
    let before = *candidate;
    if !apply(candidate) {
        return;
    }
    if config::validate(candidate).is_ok() {
        *touched = true;
    } else {
        *candidate = before;
        events.emit(&AppEvent::CommandRejected { reason });
    }
}

fn set_if_changed(field: &mut f32, value: f32) -> bool {
    if (*field - value).abs() > SETPOINT_TOLERANCE {
        *field = value;
        true
    } else {
        false
    }
}

fn set_if_changed_u8(field: &mut u8, value: u8) -> bool {
    if *field != value {
        *field = value;
        true
    } else {
        false
    }
}

fn set_if_changed_u16(field: &mut u16, value: u16) -> bool {
    if *field != value {
        *field = value;
        true
    } else {
        false
    }
}

fn set_if_changed_i32(field: &mut i32, value: i32) -> bool {
    if *field != value {
        *field = value;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingSink {
        events: Vec<AppEvent>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { events: Vec::new() }
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&mut self, event: &AppEvent) {
            self.events.push(event.clone());
        }
    }

    #[test]
    fn valid_setpoint_change_persists_and_emits_config_updated() {
        let mut cfg = Config::default();
        let mut control = Control::new();
        let mut sink = RecordingSink::new();

        let payload = br#"{"temp_min": 18.0}"#;
        let outcome = dispatch(payload, &mut cfg, &mut control, &mut sink);

        assert!(outcome.config_changed);
        assert_eq!(cfg.temp_min, 18.0);
        assert!(matches!(sink.events[0], AppEvent::ConfigUpdated));
    }

    #[test]
    fn invalid_config_is_rejected_and_unchanged() {
        let mut cfg = Config::default();
        let original = cfg;
        let mut control = Control::new();
        let mut sink = RecordingSink::new();

        let payload = br#"{"temp_min": 35.0, "temp_max": 30.0}"#;
        let outcome = dispatch(payload, &mut cfg, &mut control, &mut sink);

        assert!(!outcome.config_changed);
        assert_eq!(cfg, original);
        assert!(matches!(sink.events[0], AppEvent::CommandRejected { .. }));
    }

    #[test]
    fn oversized_payload_is_dropped_whole() {
        let mut cfg = Config::default();
        let mut control = Control::new();
        let mut sink = RecordingSink::new();

        let big = vec![b'a'; MAX_COMMAND_PAYLOAD_BYTES + 1];
        let outcome = dispatch(&big, &mut cfg, &mut control, &mut sink);

        assert!(!outcome.config_changed);
        assert!(matches!(sink.events[0], AppEvent::CommandRejected { .. }));
    }

    #[test]
    fn manual_override_reaches_control() {
        let mut cfg = Config::default();
        let mut control = Control::new();
        let mut sink = RecordingSink::new();

        let payload = br#"{"mode":"MANUAL","pump":1}"#;
        dispatch(payload, &mut cfg, &mut control, &mut sink);

        assert_eq!(control.mode(), crate::app::commands::Mode::Manual);
    }

    #[test]
    fn update_url_surfaces_as_ota_requested_without_touching_config() {
        let mut cfg = Config::default();
        let original = cfg;
        let mut control = Control::new();
        let mut sink = RecordingSink::new();

        let payload = br#"{"update_url":"https://fw.example.com/v2.bin"}"#;
        let outcome = dispatch(payload, &mut cfg, &mut control, &mut sink);

        assert_eq!(outcome.ota_requested.as_deref(), Some("https://fw.example.com/v2.bin"));
        assert_eq!(cfg, original);
    }

    #[test]
    fn one_invalid_field_does_not_drop_an_independently_valid_field() {
        let mut cfg = Config::default();
        let mut control = Control::new();
        let mut sink = RecordingSink::new();

        // hum_max=500 is standalone out-of-range; soil_dry=45 is independently
        // valid and must still persist.
        let payload = br#"{"hum_max": 500, "soil_dry": 45}"#;
        let outcome = dispatch(payload, &mut cfg, &mut control, &mut sink);

        assert!(outcome.config_changed);
        assert_eq!(cfg.hum_max, Config::default().hum_max, "out-of-range field must be dropped");
        assert_eq!(cfg.soil_dry, 45, "independently valid field must still apply");
        assert!(sink.events.iter().any(|e| matches!(e, AppEvent::CommandRejected { .. })));
        assert!(sink.events.iter().any(|e| matches!(e, AppEvent::ConfigUpdated)));
    }

    #[test]
    fn unchanged_setpoint_within_tolerance_does_not_persist() {
        let mut cfg = Config::default();
        let mut control = Control::new();
        let mut sink = RecordingSink::new();

        let payload = br#"{"temp_min": 20.05}"#; // within 0.1 of the 20.0 default
        let outcome = dispatch(payload, &mut cfg, &mut control, &mut sink);

        assert!(!outcome.config_changed);
        assert!(sink.events.is_empty());
    }
}
