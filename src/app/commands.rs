//! Inbound commands, parsed from the MQTT `commands` topic payload.
//!
//! Parsing happens in two stages: [`WireCommand`] is a permissive
//! `serde_json`-deserializable struct of `Option<T>` fields (unknown JSON
//! keys are ignored by serde's default behaviour); [`Command::from_wire`]
//! maps the fields that were actually present into a tagged, validated
//! [`Command`] the Control/Persistence components consume.

use serde::Deserialize;

/// Hard ceiling on an incoming command payload. Larger payloads are
/// dropped before they ever reach `serde_json`.
pub const MAX_COMMAND_PAYLOAD_BYTES: usize = 10 * 1024;

/// Raw wire shape of a command payload. Every field is optional; a field
/// absent from the JSON object, or present with an out-of-range value, is
/// simply ignored rather than rejecting the whole payload.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WireCommand {
    #[serde(alias = "min_temp")]
    pub temp_min: Option<f32>,
    #[serde(alias = "max_temp")]
    pub temp_max: Option<f32>,
    #[serde(alias = "max_hum")]
    pub hum_max: Option<f32>,
    pub soil_dry: Option<u8>,
    pub soil_wet: Option<u8>,
    pub tank_empty_dist: Option<u16>,
    pub tank_full_dist: Option<u16>,
    pub cal_air: Option<i32>,
    pub cal_water: Option<i32>,
    pub mode: Option<String>,
    pub pump: Option<u8>,
    pub fan: Option<u8>,
    pub heater: Option<u8>,
    pub update_url: Option<String>,
}

/// Operating mode toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    Manual,
}

fn parse_mode(raw: &str) -> Option<Mode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "auto" | "0" => Some(Mode::Auto),
        "manual" | "1" => Some(Mode::Manual),
        _ => None,
    }
}

fn parse_bool01(raw: u8) -> Option<bool> {
    match raw {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

/// A single field update extracted from a command payload. `Control` and
/// `Persistence` each apply the variants relevant to them and ignore the
/// rest.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetTempMin(f32),
    SetTempMax(f32),
    SetHumMax(f32),
    SetSoilDry(u8),
    SetSoilWet(u8),
    SetTankEmptyDist(u16),
    SetTankFullDist(u16),
    SetCalAir(i32),
    SetCalWater(i32),
    SetMode(Mode),
    SetPump(bool),
    SetFan(bool),
    SetHeater(bool),
    StartOta(String),
}

impl Command {
    /// Expand a parsed wire payload into the list of field updates it
    /// requests, in the order they should be applied (mode first, so a
    /// simultaneous `mode`+`pump` pair honors the new mode before the
    /// manual-override fields are considered).
    pub fn from_wire(wire: &WireCommand) -> Vec<Command> {
        let mut out = Vec::new();

        if let Some(mode) = wire.mode.as_deref().and_then(parse_mode) {
            out.push(Command::SetMode(mode));
        }
        if let Some(v) = wire.temp_min {
            out.push(Command::SetTempMin(v));
        }
        if let Some(v) = wire.temp_max {
            out.push(Command::SetTempMax(v));
        }
        if let Some(v) = wire.hum_max {
            out.push(Command::SetHumMax(v));
        }
        if let Some(v) = wire.soil_dry {
            out.push(Command::SetSoilDry(v));
        }
        if let Some(v) = wire.soil_wet {
            out.push(Command::SetSoilWet(v));
        }
        if let Some(v) = wire.tank_empty_dist {
            out.push(Command::SetTankEmptyDist(v));
        }
        if let Some(v) = wire.tank_full_dist {
            out.push(Command::SetTankFullDist(v));
        }
        if let Some(v) = wire.cal_air {
            out.push(Command::SetCalAir(v));
        }
        if let Some(v) = wire.cal_water {
            out.push(Command::SetCalWater(v));
        }
        if let Some(v) = wire.pump.and_then(parse_bool01) {
            out.push(Command::SetPump(v));
        }
        if let Some(v) = wire.fan.and_then(parse_bool01) {
            out.push(Command::SetFan(v));
        }
        if let Some(v) = wire.heater.and_then(parse_bool01) {
            out.push(Command::SetHeater(v));
        }
        if let Some(url) = &wire.update_url {
            out.push(Command::StartOta(url.clone()));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_ignored_by_serde() {
        let json = r#"{"temp_min": 18.0, "bogus_field": 42, "mode": "MANUAL"}"#;
        let wire: WireCommand = serde_json::from_str(json).unwrap();
        assert_eq!(wire.temp_min, Some(18.0));
    }

    #[test]
    fn legacy_field_aliases_parse() {
        let json = r#"{"min_temp": 19.5, "max_hum": 80.0}"#;
        let wire: WireCommand = serde_json::from_str(json).unwrap();
        assert_eq!(wire.temp_min, Some(19.5));
        assert_eq!(wire.hum_max, Some(80.0));
    }

    #[test]
    fn mode_is_case_insensitive_and_accepts_numeric() {
        assert_eq!(parse_mode("AUTO"), Some(Mode::Auto));
        assert_eq!(parse_mode("manual"), Some(Mode::Manual));
        assert_eq!(parse_mode("0"), Some(Mode::Auto));
        assert_eq!(parse_mode("1"), Some(Mode::Manual));
        assert_eq!(parse_mode("bogus"), None);
    }

    #[test]
    fn mode_applied_before_manual_overrides() {
        let wire = WireCommand {
            mode: Some("MANUAL".into()),
            pump: Some(1),
            ..Default::default()
        };
        let cmds = Command::from_wire(&wire);
        assert_eq!(cmds[0], Command::SetMode(Mode::Manual));
        assert!(cmds.contains(&Command::SetPump(true)));
    }

    #[test]
    fn out_of_range_bool_is_ignored() {
        let wire = WireCommand {
            pump: Some(7),
            ..Default::default()
        };
        assert!(Command::from_wire(&wire).is_empty());
    }

    #[test]
    fn empty_payload_yields_no_commands() {
        assert!(Command::from_wire(&WireCommand::default()).is_empty());
    }
}
