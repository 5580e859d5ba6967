//! GPIO / peripheral pin assignments for the greenhouse controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers. Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Relay outputs (pump / fan / heater) — plain digital GPIO, active HIGH
// through opto-isolated relay boards.
// ---------------------------------------------------------------------------

pub const PUMP_RELAY_GPIO: i32 = 1;
pub const FAN_RELAY_GPIO: i32 = 2;
pub const HEATER_RELAY_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// Soil moisture — analog (ADC1)
// ---------------------------------------------------------------------------

/// Capacitive soil moisture probe — analog output. ADC1 channel 4 (GPIO 5).
pub const SOIL_ADC_GPIO: i32 = 5;
/// ADC attenuation (11 dB -> 0-3.1 V range).
pub const SOIL_ADC_ATTEN: u32 = 3; // esp_idf_hal::adc::attenuation::DB_11

// ---------------------------------------------------------------------------
// Ultrasonic tank-level sensor (HC-SR04 style — trigger + echo)
// ---------------------------------------------------------------------------

pub const TANK_TRIG_GPIO: i32 = 6;
pub const TANK_ECHO_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// I2C bus — climate (AHT20-class) + air quality (ENS160-class) + LCD
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 14;
pub const I2C_SCL_GPIO: i32 = 15;

pub const CLIMATE_I2C_ADDR: u8 = 0x38;
pub const AIR_QUALITY_I2C_ADDR: u8 = 0x53;
pub const LCD_I2C_ADDR: u8 = 0x27;

// ---------------------------------------------------------------------------
// UART debug
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// User button (active-low with external pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button: start/stop provisioning portal.
pub const BUTTON_GPIO: i32 = 16;
