//! 4-row status rendering.
//!
//! [`render_rows`] is a pure function from shared state to display text, so
//! the layout can be exercised without an I2C bus. [`LcdDisplay`] owns the
//! actual panel write, gated the same way every other peripheral driver in
//! this firmware is: a real `hd44780` handle on target, a logged no-op in
//! simulation.

use heapless::String;

use super::DisplayState;

/// Characters per row on the target panel (20x4 character LCD).
pub const ROW_WIDTH: usize = 20;

pub type Row = String<ROW_WIDTH>;

/// Render the four status rows from the current shared state.
pub fn render_rows(state: &DisplayState) -> [Row; 4] {
    if state.portal_active {
        return [
            fit("PROVISIONING MODE"),
            fit("Connect to AP:"),
            fit("greenhouse-setup"),
            fit("Press btn to stop"),
        ];
    }

    if state.reconfigure_pending {
        return [
            fit("RECONFIGURE PENDING"),
            fit("Hold button to"),
            fit("open WiFi portal"),
            fit(""),
        ];
    }

    let s = &state.sensors;
    let row1 = fmt(format_args!("T:{:.1}C H:{:.0}%", s.temp_c, s.hum_pct));
    let row2 = fmt(format_args!("Soil:{}% Tank:{}%", s.soil_pct, s.tank_level_pct));
    let row3 = fmt(format_args!(
        "P:{} F:{} H:{}",
        onoff(state.pump),
        onoff(state.fan),
        onoff(state.heater)
    ));
    let row4 = fit(if !s.has_water {
        "TANK EMPTY"
    } else if state.mqtt_up {
        "Online"
    } else {
        "Offline"
    });

    [row1, row2, row3, row4]
}

fn onoff(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

fn fit(s: &str) -> Row {
    let mut out = Row::new();
    let _ = out.push_str(&s[..s.len().min(ROW_WIDTH)]);
    out
}

fn fmt(args: core::fmt::Arguments<'_>) -> Row {
    use core::fmt::Write;
    let mut out = Row::new();
    let _ = out.write_fmt(args);
    out
}

#[cfg(target_os = "espidf")]
pub struct LcdDisplay {
    handle: crate::drivers::hw_init::LcdHandle,
}

#[cfg(target_os = "espidf")]
impl LcdDisplay {
    pub fn new() -> Self {
        Self { handle: crate::drivers::hw_init::lcd_init() }
    }

    pub fn write(&mut self, rows: &[Row; 4]) {
        crate::drivers::hw_init::lcd_write_rows(&mut self.handle, rows);
    }
}

#[cfg(not(target_os = "espidf"))]
pub struct LcdDisplay;

#[cfg(not(target_os = "espidf"))]
impl LcdDisplay {
    pub fn new() -> Self {
        Self
    }

    pub fn write(&mut self, rows: &[Row; 4]) {
        for row in rows {
            log::debug!("lcd: {row}");
        }
    }
}

impl Default for LcdDisplay {
    fn default() -> Self {
        Self::new()
    }
}
