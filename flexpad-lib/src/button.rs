//! Buttons: interrupt-side edge handling and the polling task.
//!
//! Each button has one [`PressSignal`], a binary semaphore shared between the
//! GPIO interrupt and the [`ButtonSampler`]. The press edge gives it, the
//! release edge takes it back. A press released before the sampler's next
//! poll is therefore cancelled and never reported; only presses held across a
//! poll produce an event. There is no timer-based debounce.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker};
use heapless::Vec;
use log::{debug, trace};
use portable_atomic::{AtomicBool, Ordering};

use crate::{
    config::{BUTTON_PERIOD_MS, ENQUEUE_TIMEOUT_MS, Polarity},
    event::{ButtonId, Event},
    queue::EventQueue,
};

/// Pico SDK `GPIO_IRQ_EDGE_FALL`.
pub const IRQ_EDGE_FALL: u32 = 0x04;
/// Pico SDK `GPIO_IRQ_EDGE_RISE`.
pub const IRQ_EDGE_RISE: u32 = 0x08;

/// Pending-press flag for one button. Safe to touch from interrupt context.
#[derive(Debug, Default)]
pub struct PressSignal {
    pending: AtomicBool,
}

impl PressSignal {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Mark a press as pending. Giving an already pending signal is a no-op.
    pub fn give(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Interrupt-side take: withdraws a press the task has not seen yet.
    /// Returns whether there was one to withdraw.
    pub fn take_from_isr(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Task-side non-blocking take.
    pub fn try_take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    /// Decode the event mask an edge interrupt was raised with. Masks with
    /// neither or both edge bits are spurious.
    pub const fn from_irq_events(events: u32) -> Option<Self> {
        match events & (IRQ_EDGE_FALL | IRQ_EDGE_RISE) {
            IRQ_EDGE_RISE => Some(Edge::Rising),
            IRQ_EDGE_FALL => Some(Edge::Falling),
            _ => None,
        }
    }
}

/// Interrupt handler body for one button.
#[derive(Clone, Copy)]
pub struct EdgeDebouncer<'a> {
    signal: &'a PressSignal,
    press_edge: Edge,
}

impl<'a> EdgeDebouncer<'a> {
    pub const fn new(signal: &'a PressSignal, polarity: Polarity) -> Self {
        let press_edge = match polarity {
            Polarity::ActiveHigh => Edge::Rising,
            Polarity::ActiveLow => Edge::Falling,
        };
        Self { signal, press_edge }
    }

    /// Never blocks; callable from interrupt context.
    pub fn on_edge(&self, edge: Edge) {
        if edge == self.press_edge {
            self.signal.give();
        } else {
            self.signal.take_from_isr();
        }
    }

    pub fn on_irq(&self, events: u32) {
        if let Some(edge) = Edge::from_irq_events(events) {
            self.on_edge(edge);
        }
    }
}

/// Polls the press signals of up to `N` buttons in a fixed order.
pub struct ButtonSampler<'a, const N: usize> {
    buttons: [(ButtonId, &'a PressSignal); N],
}

impl<'a, const N: usize> ButtonSampler<'a, N> {
    pub const fn new(buttons: [(ButtonId, &'a PressSignal); N]) -> Self {
        Self { buttons }
    }

    /// Consume every pending press; events come out in configuration order.
    pub fn poll(&self) -> Vec<Event, N> {
        let mut events = Vec::new();
        for (id, signal) in self.buttons.iter() {
            if signal.try_take() {
                debug!("button {} pressed", id.get());
                // At most one event per button, so this cannot overflow.
                let _ = events.push(Event::button(*id));
            }
        }
        events
    }

    pub async fn run<M: RawMutex, const Q: usize>(self, queue: &EventQueue<M, Q>) -> ! {
        let mut ticker = Ticker::every(Duration::from_millis(BUTTON_PERIOD_MS));
        let timeout = Duration::from_millis(ENQUEUE_TIMEOUT_MS);

        loop {
            for event in self.poll() {
                if let Err(e) = queue.enqueue(event, timeout).await {
                    trace!("{}", e);
                }
            }
            ticker.next().await;
        }
    }
}
