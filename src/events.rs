//! Lock-free inter-task event queue.
//!
//! Events are produced by GPIO ISRs (button edge), timer callbacks (sensing
//! and control ticks), and software (command arrival, sample-ready). They
//! are consumed by whichever cooperative task owns that concern — each task
//! drains the queue once per cycle rather than blocking on it.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GPIO ISR    │────▶│              │────▶│  Sensing /   │
//! │ Timer ISR   │────▶│  Event Queue │     │  Control /   │
//! │ Software    │────▶│  (lock-free) │────▶│  Interface   │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events. Power of 2 for efficient ring modulo.
const EVENT_QUEUE_CAP: usize = 16;

/// The firmware's bounded event vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// 2 s sensing-task timer fired.
    SensingTick = 0,
    /// 1 s control-task timer fired.
    ControlTick = 1,
    /// 500 ms interface-task render/button-poll timer fired.
    InterfaceTick = 2,
    /// Debounced button edge classified.
    ButtonPressed = 3,
    /// A command payload arrived on the commands topic.
    CommandReceived = 4,
    /// 5 s telemetry-composition timer fired.
    TelemetryTick = 5,
    /// Self-healing reconnect timer fired (30 s, while offline).
    ReconnectTick = 6,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// ISRs/timers write (produce), the owning task reads (consume). The buffer
// is kept in a static so ISR callbacks can reach it without a lock.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Write one byte into the event ring buffer at `slot`.
///
/// # Safety
/// The caller must be the sole producer (ISR / timer-task context).
/// `slot` must be `< EVENT_QUEUE_CAP`. SPSC discipline guarantees the
/// consumer is not reading this slot simultaneously.
unsafe fn event_buffer_write(slot: usize, val: u8) {
    unsafe {
        EVENT_BUFFER[slot] = val;
    }
}

/// Read one byte from the event ring buffer at `slot`.
///
/// # Safety
/// The caller must be the sole consumer. `slot` must be `< EVENT_QUEUE_CAP`.
/// SPSC discipline guarantees the producer is not writing this slot
/// simultaneously.
unsafe fn event_buffer_read(slot: usize) -> u8 {
    unsafe { EVENT_BUFFER[slot] }
}

/// Push an event into the queue. Safe to call from ISR context, timer
/// callbacks, and any thread. Returns `false` if the queue is full (event
/// dropped — periodic ticks are re-derived next period so a drop is benign).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false;
    }

    // SAFETY: push_event is the sole producer; event_buffer_write accesses
    // EVENT_BUFFER exclusively at the head slot while the consumer reads at
    // the tail slot — SPSC discipline holds.
    unsafe {
        event_buffer_write(head as usize, event as u8);
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue. Single consumer. Returns `None` if
/// the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None;
    }

    // SAFETY: pop_event is the sole consumer.
    let raw = unsafe { event_buffer_read(tail as usize) };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, in FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);
    tail == head
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed) as usize;
    let tail = EVENT_TAIL.load(Ordering::Relaxed) as usize;
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::SensingTick),
        1 => Some(Event::ControlTick),
        2 => Some(Event::InterfaceTick),
        3 => Some(Event::ButtonPressed),
        4 => Some(Event::CommandReceived),
        5 => Some(Event::TelemetryTick),
        6 => Some(Event::ReconnectTick),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::Ordering;

    fn reset_queue() {
        EVENT_HEAD.store(0, Ordering::Relaxed);
        EVENT_TAIL.store(0, Ordering::Relaxed);
    }

    #[test]
    fn queue_starts_empty() {
        reset_queue();
        assert!(queue_is_empty());
        assert_eq!(queue_len(), 0);
        assert!(pop_event().is_none());
    }

    #[test]
    fn push_and_pop_single() {
        reset_queue();
        assert!(push_event(Event::ControlTick));
        assert!(!queue_is_empty());
        assert_eq!(queue_len(), 1);

        let e = pop_event();
        assert_eq!(e, Some(Event::ControlTick));
        assert!(queue_is_empty());
    }

    #[test]
    fn fifo_ordering() {
        reset_queue();
        push_event(Event::SensingTick);
        push_event(Event::ControlTick);
        push_event(Event::TelemetryTick);

        assert_eq!(pop_event(), Some(Event::SensingTick));
        assert_eq!(pop_event(), Some(Event::ControlTick));
        assert_eq!(pop_event(), Some(Event::TelemetryTick));
        assert!(pop_event().is_none());
    }

    #[test]
    fn drain_events_collects_all() {
        reset_queue();
        push_event(Event::SensingTick);
        push_event(Event::ControlTick);

        let mut collected = Vec::new();
        drain_events(|e| collected.push(e));
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0], Event::SensingTick);
        assert_eq!(collected[1], Event::ControlTick);
        assert!(queue_is_empty());
    }

    #[test]
    fn overflow_returns_false() {
        reset_queue();
        for _ in 0..(EVENT_QUEUE_CAP - 1) {
            assert!(push_event(Event::ControlTick));
        }
        assert!(!push_event(Event::ControlTick));
    }

    #[test]
    fn event_from_u8_roundtrip() {
        let events = [
            Event::SensingTick,
            Event::ControlTick,
            Event::InterfaceTick,
            Event::ButtonPressed,
            Event::CommandReceived,
            Event::TelemetryTick,
            Event::ReconnectTick,
        ];
        for e in events {
            let raw = e as u8;
            assert_eq!(event_from_u8(raw), Some(e));
        }
    }

    #[test]
    fn event_from_invalid_u8_returns_none() {
        assert!(event_from_u8(255).is_none());
        assert!(event_from_u8(99).is_none());
    }
}
