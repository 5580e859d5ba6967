//! Hardware timer module using ESP-IDF's esp_timer API.
//!
//! Creates periodic timers that push events into the lock-free SPSC queue.
//! On simulation targets, the main loop drives these ticks itself instead
//! (see the sim main loop), so `start_timers`/`stop_timers` are no-ops
//! there.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call push_event() which uses AtomicU8.
//!
//! Four timers run continuously: sensing (2s), control (1s), interface
//! (500ms) and telemetry (5s). A fifth, the reconnect timer (30s), is
//! only armed while the device is offline — the connectivity task starts
//! and stops it as it transitions in and out of the `Offline` state.

use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut SENSING_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut CONTROL_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut INTERFACE_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut TELEMETRY_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut RECONNECT_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sensing_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::SensingTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::ControlTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn interface_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::InterfaceTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn telemetry_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::TelemetryTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn reconnect_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::ReconnectTick);
}

#[cfg(target_os = "espidf")]
unsafe fn create_periodic(
    handle: &mut esp_timer_handle_t,
    callback: esp_timer_cb_t,
    name: &'static [u8],
    period_us: u64,
    label: &str,
) {
    let args = esp_timer_create_args_t {
        callback,
        arg: core::ptr::null_mut(),
        dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
        name: name.as_ptr() as *const _,
        skip_unhandled_events: false,
    };
    let ret = esp_timer_create(&args, handle);
    if ret != ESP_OK {
        log::error!("hw_timer: {label} timer create failed (rc={ret}) — continuing without it");
        return;
    }
    let ret = esp_timer_start_periodic(*handle, period_us);
    if ret != ESP_OK {
        log::error!("hw_timer: {label} timer start failed (rc={ret})");
    }
}

/// Start the four always-on hardware tick timers: sensing (2s), control
/// (1s), interface (500ms) and telemetry (5s).
#[cfg(target_os = "espidf")]
pub fn start_timers() {
    // SAFETY: the four statics are written here once at boot from the
    // single main-task context before any timer callbacks fire. Each
    // callback only calls push_event(), which is ISR-safe.
    unsafe {
        create_periodic(&mut *&raw mut SENSING_TIMER, Some(sensing_tick_cb), b"sensing\0", 2_000_000, "sensing");
        create_periodic(&mut *&raw mut CONTROL_TIMER, Some(control_tick_cb), b"control\0", 1_000_000, "control");
        create_periodic(&mut *&raw mut INTERFACE_TIMER, Some(interface_tick_cb), b"interface\0", 500_000, "interface");
        create_periodic(&mut *&raw mut TELEMETRY_TIMER, Some(telemetry_tick_cb), b"telemetry\0", 5_000_000, "telemetry");
    }
    info!("hw_timer: sensing@2s + control@1s + interface@500ms + telemetry@5s started");
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers() {
    log::info!("hw_timer(sim): timers not started (events driven by sleep loop)");
}

/// Stop the four always-on timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: handles are valid if start_timers() succeeded; null-check
    // prevents double-free. Main task only.
    unsafe {
        for handle in [&raw mut SENSING_TIMER, &raw mut CONTROL_TIMER, &raw mut INTERFACE_TIMER, &raw mut TELEMETRY_TIMER] {
            let h = *handle;
            if !h.is_null() {
                esp_timer_stop(h);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}

/// Arm the 30s reconnect timer. Called when the connectivity task enters
/// the offline state; idempotent if already running.
#[cfg(target_os = "espidf")]
pub fn start_reconnect_timer() {
    // SAFETY: main task only, mirrors start_timers()'s contract.
    unsafe {
        let handle = &raw mut RECONNECT_TIMER;
        if !(*handle).is_null() {
            return;
        }
        create_periodic(&mut *handle, Some(reconnect_tick_cb), b"reconnect\0", 30_000_000, "reconnect");
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_reconnect_timer() {}

/// Disarm the reconnect timer. Called once the device reconnects.
#[cfg(target_os = "espidf")]
pub fn stop_reconnect_timer() {
    // SAFETY: main task only.
    unsafe {
        let handle = &raw mut RECONNECT_TIMER;
        if !(*handle).is_null() {
            esp_timer_stop(*handle);
            esp_timer_delete(*handle);
            *handle = core::ptr::null_mut();
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_reconnect_timer() {}
