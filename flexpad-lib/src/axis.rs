use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker};
use log::{debug, trace, warn};

use crate::{
    config::{AXIS_PERIOD_MS, AxisConfig, ENQUEUE_TIMEOUT_MS},
    event::Event,
    filter::{MotionFilter, scale},
    queue::EventQueue,
};

/// Multiplexed analog converter.
///
/// Selecting the input and converting it is one call, so two axis tasks sharing
/// a converter cannot interleave their select and read.
pub trait AnalogInput {
    type Error: core::fmt::Debug;

    async fn read_channel(&mut self, channel: u8) -> Result<u16, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisState {
    Moving,
    Idle,
}

/// Smooths one joystick axis and decides which samples reach the queue.
///
/// While the scaled value is non-zero every sample is published. The first
/// zero after movement is published once as a stop event, then the axis stays
/// silent until it moves again. A new sampler counts as moving, so a stick at
/// rest announces itself with one zero at boot.
pub struct AxisSampler {
    config: AxisConfig,
    filter: MotionFilter,
    state: AxisState,
}

impl AxisSampler {
    pub const fn new(config: AxisConfig) -> Self {
        Self {
            config,
            filter: MotionFilter::new(),
            state: AxisState::Moving,
        }
    }

    pub const fn state(&self) -> AxisState {
        self.state
    }

    /// Feed one raw conversion; returns the event to publish, if any.
    pub fn step(&mut self, raw: u16) -> Option<Event> {
        let smoothed = self.filter.push_and_average(i32::from(raw));
        let scaled = scale(smoothed, self.config.invert);

        // Gate on the previous state, then update it from this sample.
        let publish = self.state == AxisState::Moving;
        let next = if scaled == 0 {
            AxisState::Idle
        } else {
            AxisState::Moving
        };
        if next != self.state {
            debug!("{:?} {:?} -> {:?}", self.config.channel, self.state, next);
            self.state = next;
        }

        publish.then(|| Event::axis(self.config.channel, scaled))
    }

    pub async fn run<A, M, const N: usize>(
        mut self,
        mut input: A,
        queue: &EventQueue<M, N>,
    ) -> !
    where
        A: AnalogInput,
        M: RawMutex,
    {
        let mut ticker = Ticker::every(Duration::from_millis(AXIS_PERIOD_MS));
        let timeout = Duration::from_millis(ENQUEUE_TIMEOUT_MS);

        loop {
            match input.read_channel(self.config.adc_channel).await {
                Ok(raw) => {
                    if let Some(event) = self.step(raw) {
                        if let Err(e) = queue.enqueue(event, timeout).await {
                            trace!("{}", e);
                        }
                    }
                }
                Err(e) => warn!("{:?}: ADC read failed: {:?}", self.config.channel, e),
            }
            ticker.next().await;
        }
    }
}
