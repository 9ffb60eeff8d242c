use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_io_async::Write;
use log::warn;

use crate::{event::Event, frame::Frame, queue::EventQueue};

/// Sole consumer of the event queue; writes one frame per event.
pub struct Serializer<W> {
    out: W,
}

impl<W: Write> Serializer<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub async fn write_event(&mut self, event: &Event) -> Result<(), W::Error> {
        self.out.write_all(&Frame::encode(event)).await?;
        self.out.flush().await
    }

    /// Drain the queue forever. Frames that fail to write are dropped.
    pub async fn run<M: RawMutex, const N: usize>(mut self, queue: &EventQueue<M, N>) -> ! {
        loop {
            let event = queue.dequeue().await;
            if let Err(e) = self.write_event(&event).await {
                warn!("dropped {:?}: {:?}", event, e);
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
