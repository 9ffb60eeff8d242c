use embassy_sync::{
    blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex},
    channel::Channel,
};
use embassy_time::{Duration, with_timeout};

use crate::{config::QUEUE_CAPACITY, event::Event};

/// The queue every sampler publishes into. Lives in a `static` and is handed
/// to tasks as `&'static`.
pub type SharedEventQueue = EventQueue<CriticalSectionRawMutex, QUEUE_CAPACITY>;

/// The event was dropped because the queue stayed full for the whole wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event queue full, dropped {0:?}")]
pub struct QueueFull(pub Event);

/// Bounded FIFO between the samplers and the serializer.
///
/// Any number of producers may enqueue; there must be exactly one consumer.
/// Order out is the order in which enqueues succeeded.
pub struct EventQueue<M: RawMutex, const N: usize> {
    events: Channel<M, Event, N>,
}

impl<M: RawMutex, const N: usize> EventQueue<M, N> {
    pub const fn new() -> Self {
        Self {
            events: Channel::new(),
        }
    }

    /// Wait up to `timeout` for a free slot. On expiry the event is handed
    /// back inside [`QueueFull`]; callers drop it.
    pub async fn enqueue(&self, event: Event, timeout: Duration) -> Result<(), QueueFull> {
        with_timeout(timeout, self.events.send(event))
            .await
            .map_err(|_| QueueFull(event))
    }

    pub fn try_enqueue(&self, event: Event) -> Result<(), QueueFull> {
        self.events.try_send(event).map_err(|_| QueueFull(event))
    }

    /// Wait as long as it takes for the next event.
    pub async fn dequeue(&self) -> Event {
        self.events.receive().await
    }

    pub fn try_dequeue(&self) -> Option<Event> {
        self.events.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<M: RawMutex, const N: usize> Default for EventQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ChannelId, FlexState};
    use embassy_futures::{block_on, join::join};
    use embassy_time::{Instant, Timer};

    type TestQueue = EventQueue<CriticalSectionRawMutex, 3>;

    fn axis(v: i16) -> Event {
        Event::axis(ChannelId::AxisX, v)
    }

    #[test]
    fn dequeues_in_enqueue_order() {
        let queue = TestQueue::new();
        block_on(async {
            for v in 1..=3 {
                queue.enqueue(axis(v), Duration::from_millis(5)).await.unwrap();
            }
            assert_eq!(queue.len(), 3);
            for v in 1..=3 {
                assert_eq!(queue.dequeue().await, axis(v));
            }
        });
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_times_out_and_drops() {
        let queue = TestQueue::new();
        for v in 0..3 {
            queue.try_enqueue(axis(v)).unwrap();
        }
        assert_eq!(queue.try_enqueue(axis(9)), Err(QueueFull(axis(9))));

        let started = Instant::now();
        let result = block_on(queue.enqueue(axis(10), Duration::from_millis(20)));
        assert_eq!(result, Err(QueueFull(axis(10))));
        assert!(started.elapsed() >= Duration::from_millis(20));

        let drained: Vec<Event> = core::iter::from_fn(|| queue.try_dequeue()).collect();
        assert_eq!(drained, vec![axis(0), axis(1), axis(2)]);
    }

    #[test]
    fn blocked_producer_completes_once_consumer_frees_a_slot() {
        let queue = TestQueue::new();
        for v in 0..3 {
            queue.try_enqueue(axis(v)).unwrap();
        }

        let flex = Event::flex(FlexState::High);
        let (sent, first) = block_on(join(
            queue.enqueue(flex, Duration::from_millis(500)),
            async {
                Timer::after_millis(10).await;
                queue.dequeue().await
            },
        ));
        assert_eq!(sent, Ok(()));
        assert_eq!(first, axis(0));

        let rest: Vec<Event> = core::iter::from_fn(|| queue.try_dequeue()).collect();
        assert_eq!(rest, vec![axis(1), axis(2), flex]);
    }

    #[test]
    fn capacity_is_the_const_parameter() {
        let queue = SharedEventQueue::new();
        assert_eq!(queue.capacity(), QUEUE_CAPACITY);
    }
}
