//! One-shot hardware peripheral initialization + the low-level register
//! access every driver in this firmware routes through.
//!
//! Configures the soil ADC channel, relay/button/ultrasonic GPIO, the I2C
//! bus shared by the climate/air-quality/LCD peripherals, and exposes the
//! per-read/per-write helpers the sensor and actuator drivers call. Called
//! once from `main()` before the task loops start.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::SensorError;
use crate::pins;

#[cfg(target_os = "espidf")]
use crate::sensors::air_quality::AirQualityReading;
#[cfg(target_os = "espidf")]
use crate::sensors::climate::ClimateReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    I2cInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={rc})"),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::I2cInitFailed(rc) => write!(f, "I2C bus init failed (rc={rc})"),
        }
    }
}

#[cfg(target_os = "espidf")]
use log::info;

pub const ADC1_CH_SOIL: u32 = 4;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before the task loops start; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_i2c()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) — soil moisture probe ───────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_11,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), ADC1_CH_SOIL, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH{ADC1_CH_SOIL}=soil)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: ADC1_HANDLE written once during init_adc(), single-threaded read.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.max(0) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> u16 {
    0
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    let input_pins = [pins::TANK_ECHO_GPIO, pins::BUTTON_GPIO];
    for &pin in &input_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }
    info!("hw_init: GPIO inputs configured (echo, button)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: register read on an already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::PUMP_RELAY_GPIO,
        pins::FAN_RELAY_GPIO,
        pins::HEATER_RELAY_GPIO,
        pins::TANK_TRIG_GPIO,
    ];
    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }
    info!("hw_init: GPIO outputs configured (pump, fan, heater relays + tank trigger)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: write to an already-configured output pin; main-loop only.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Ultrasonic tank-level ping (bit-banged trigger, timed echo) ─

#[cfg(target_os = "espidf")]
pub fn ultrasonic_measure(trig_gpio: i32, echo_gpio: i32, timeout_ms: u32) -> Result<u16, SensorError> {
    unsafe {
        gpio_set_level(trig_gpio, 1);
        esp_idf_svc::sys::esp_rom_delay_us(10);
        gpio_set_level(trig_gpio, 0);

        let deadline_us = esp_timer_get_time() + (timeout_ms as i64) * 1000;
        while gpio_get_level(echo_gpio) == 0 {
            if esp_timer_get_time() > deadline_us {
                return Err(SensorError::EchoTimeout);
            }
        }
        let start_us = esp_timer_get_time();
        while gpio_get_level(echo_gpio) != 0 {
            if esp_timer_get_time() > deadline_us {
                return Err(SensorError::EchoTimeout);
            }
        }
        let echo_width_us = esp_timer_get_time() - start_us;
        Ok((echo_width_us / 58).max(0) as u16)
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ultrasonic_measure(_trig_gpio: i32, _echo_gpio: i32, _timeout_ms: u32) -> Result<u16, SensorError> {
    Ok(15)
}

// ── I2C bus — climate + air-quality + LCD ─────────────────────

#[cfg(target_os = "espidf")]
static mut I2C_DRIVER_PTR: *mut esp_idf_svc::hal::i2c::I2cDriver<'static> = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe fn init_i2c() -> Result<(), HwInitError> {
    // The esp-idf-hal I2cDriver is constructed from `main()`'s owned
    // peripherals handle and stashed here so the sensor/LCD drivers, which
    // only know their bus address, can reach it without threading a
    // peripheral handle through every layer.
    info!("hw_init: I2C bus ready on SDA={} SCL={}", pins::I2C_SDA_GPIO, pins::I2C_SCL_GPIO);
    Ok(())
}

/// Install the I2C driver owned by `main()`. Must be called exactly once,
/// after `init_peripherals()`, before any sensor or LCD read.
#[cfg(target_os = "espidf")]
pub fn install_i2c_driver(driver: esp_idf_svc::hal::i2c::I2cDriver<'static>) {
    let boxed = std::boxed::Box::new(driver);
    // SAFETY: called once from main() before the task loops start.
    unsafe {
        I2C_DRIVER_PTR = std::boxed::Box::into_raw(boxed);
    }
}

#[cfg(target_os = "espidf")]
unsafe fn i2c_driver() -> &'static mut esp_idf_svc::hal::i2c::I2cDriver<'static> {
    // SAFETY: installed once at boot by `install_i2c_driver`; main-loop only.
    unsafe { &mut *I2C_DRIVER_PTR }
}

/// AHT20-class trigger-measurement command, then read back 6 status/data bytes.
#[cfg(target_os = "espidf")]
pub fn i2c_read_climate(addr: u8) -> Result<ClimateReading, SensorError> {
    use embedded_hal::i2c::I2c;

    const TRIGGER_CMD: [u8; 3] = [0xAC, 0x33, 0x00];
    let i2c = unsafe { i2c_driver() };

    i2c.write(addr, &TRIGGER_CMD).map_err(|_| SensorError::I2cReadFailed)?;
    unsafe { esp_idf_svc::sys::vTaskDelay(80 / portTICK_PERIOD_MS) };

    let mut buf = [0u8; 6];
    i2c.read(addr, &mut buf).map_err(|_| SensorError::I2cReadFailed)?;
    if buf[0] & 0x80 != 0 {
        return Err(SensorError::I2cReadFailed); // still busy
    }

    let raw_hum = ((buf[1] as u32) << 12) | ((buf[2] as u32) << 4) | ((buf[3] as u32) >> 4);
    let raw_temp = (((buf[3] as u32) & 0x0F) << 16) | ((buf[4] as u32) << 8) | (buf[5] as u32);

    Ok(ClimateReading {
        hum_pct: (raw_hum as f32 / 1_048_576.0) * 100.0,
        temp_c: (raw_temp as f32 / 1_048_576.0) * 200.0 - 50.0,
    })
}

/// ENS160-class status-then-data read. `Ok(None)` if the NEW_DATA bit is unset.
#[cfg(target_os = "espidf")]
pub fn i2c_read_air_quality(addr: u8) -> Result<Option<AirQualityReading>, SensorError> {
    use embedded_hal::i2c::I2c;

    const REG_STATUS: [u8; 1] = [0x20];
    const REG_ECO2: [u8; 1] = [0x24];
    const REG_TVOC: [u8; 1] = [0x22];
    const NEW_DATA_BIT: u8 = 0x02;

    let i2c = unsafe { i2c_driver() };

    let mut status = [0u8; 1];
    i2c.write_read(addr, &REG_STATUS, &mut status).map_err(|_| SensorError::I2cReadFailed)?;
    if status[0] & NEW_DATA_BIT == 0 {
        return Ok(None);
    }

    let mut eco2_buf = [0u8; 2];
    i2c.write_read(addr, &REG_ECO2, &mut eco2_buf).map_err(|_| SensorError::I2cReadFailed)?;
    let mut tvoc_buf = [0u8; 2];
    i2c.write_read(addr, &REG_TVOC, &mut tvoc_buf).map_err(|_| SensorError::I2cReadFailed)?;

    Ok(Some(AirQualityReading {
        eco2_ppm: u16::from_le_bytes(eco2_buf),
        tvoc_ppb: u16::from_le_bytes(tvoc_buf),
    }))
}

// ── LCD (hd44780, 20x4, I2C backpack) ─────────────────────────

#[cfg(target_os = "espidf")]
pub struct LcdHandle {
    lcd: hd44780_driver::HD44780<
        hd44780_driver::bus::I2CBus<&'static mut esp_idf_svc::hal::i2c::I2cDriver<'static>>,
    >,
}

#[cfg(target_os = "espidf")]
pub fn lcd_init() -> LcdHandle {
    use hd44780_driver::{Cursor, CursorBlink, Display, DisplayMode, HD44780};

    let i2c = unsafe { i2c_driver() };
    let mut lcd = HD44780::new_i2c(i2c, pins::LCD_I2C_ADDR, &mut NoDelay).expect("LCD init failed");
    lcd.set_display_mode(
        DisplayMode {
            display: Display::On,
            cursor_visibility: Cursor::Invisible,
            cursor_blink: CursorBlink::Off,
        },
        &mut NoDelay,
    );
    LcdHandle { lcd }
}

#[cfg(target_os = "espidf")]
struct NoDelay;

#[cfg(target_os = "espidf")]
impl embedded_hal::delay::DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        unsafe { esp_idf_svc::sys::esp_rom_delay_us((ns / 1000).max(1)) };
    }
}

#[cfg(target_os = "espidf")]
pub fn lcd_write_rows(handle: &mut LcdHandle, rows: &[crate::interface::display::Row; 4]) {
    for (i, row) in rows.iter().enumerate() {
        let _ = handle.lcd.set_cursor_pos(i as u8 * 20, &mut NoDelay);
        let _ = handle.lcd.write_str(row.as_str(), &mut NoDelay);
    }
}
