//! Local status display and provisioning button.
//!
//! Two concerns, neither of which ever blocks: a 4-row LCD render refreshed
//! every 500 ms from the shared sensor/actuator/provisioning state, and a
//! debounced button that turns a physical press into a [`ButtonIntent`] for
//! the Connectivity task's provisioning state machine to consume on its next
//! tick.

pub mod display;

use crate::drivers::button::{ButtonDriver, ButtonEvent};
use crate::fsm::context::ButtonIntent;
use crate::sensors::SensorSnapshot;
use display::{render_rows, LcdDisplay};

/// Everything the display needs to know, gathered from the other
/// components each render cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayState {
    pub sensors: SensorSnapshot,
    pub pump: bool,
    pub fan: bool,
    pub heater: bool,
    pub portal_active: bool,
    pub reconfigure_pending: bool,
    pub mqtt_up: bool,
}

pub struct Interface {
    button: ButtonDriver,
    lcd: LcdDisplay,
}

impl Interface {
    pub fn new() -> Self {
        Self {
            button: ButtonDriver::new(crate::pins::BUTTON_GPIO),
            lcd: LcdDisplay::new(),
        }
    }

    /// Redraw the panel from the current state. Call at the 500 ms
    /// Interface tick period.
    pub fn render(&mut self, state: &DisplayState) {
        let rows = render_rows(state);
        self.lcd.write(&rows);
    }

    /// Poll the button. `portal_active` decides which intent a confirmed
    /// press produces — stop the portal if it's running, else request that
    /// Connectivity open one.
    pub fn poll_button(&mut self, now_ms: u32, portal_active: bool) -> Option<ButtonIntent> {
        match self.button.tick(now_ms)? {
            ButtonEvent::Pressed if portal_active => Some(ButtonIntent::StopPortal),
            ButtonEvent::Pressed => Some(ButtonIntent::StartReconfiguration),
        }
    }
}

impl Default for Interface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both scenarios share the button driver's process-global ISR timestamp
    // static, so they run as one test to avoid interleaving under parallel
    // test execution.
    #[test]
    fn button_press_intent_depends_on_portal_state() {
        let mut ui = Interface::new();

        crate::drivers::button::button_isr_handler(1000);
        ui.poll_button(1000, false);
        let event = ui.poll_button(1201, false);
        assert_eq!(event, Some(ButtonIntent::StartReconfiguration));

        crate::drivers::button::button_isr_handler(2000);
        ui.poll_button(2000, true);
        let event = ui.poll_button(2201, true);
        assert_eq!(event, Some(ButtonIntent::StopPortal));
    }
}
