use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker, Timer};
use embedded_hal_async::i2c::I2c;
use log::{debug, trace, warn};

use crate::{
    config::{
        ENQUEUE_TIMEOUT_MS, FLEX_ADDRESS, FLEX_CONFIG, FLEX_CONFIG_REG, FLEX_CONVERSION_REG,
        FLEX_DIVISOR, FLEX_HIGH_QUOTIENT, FLEX_PERIOD_MS, FLEX_SETTLE_MS,
    },
    event::{Event, FlexState},
    queue::EventQueue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlexError<E: core::fmt::Debug> {
    /// No acknowledge, arbitration loss or timeout on the two-wire bus.
    #[error("flex front-end bus fault: {0:?}")]
    Bus(E),
}

impl FlexState {
    /// Threshold a raw conversion. There is no hysteresis band; a reading
    /// hovering at the threshold can flip state every sample.
    pub const fn from_raw(raw: i16) -> Self {
        if raw / FLEX_DIVISOR >= FLEX_HIGH_QUOTIENT {
            FlexState::High
        } else {
            FlexState::Low
        }
    }
}

/// Register-addressed converter in front of the flex sensor.
///
/// The bus is owned outright. If it is ever shared, the configure, settle and
/// read sequence of [`FlexFrontEnd::sample`] has to run under one lock.
pub struct FlexFrontEnd<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> FlexFrontEnd<I2C> {
    pub const fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, FLEX_ADDRESS)
    }

    pub const fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub async fn configure(&mut self) -> Result<(), FlexError<I2C::Error>> {
        let [hi, lo] = FLEX_CONFIG.to_be_bytes();
        self.i2c
            .write(self.address, &[FLEX_CONFIG_REG, hi, lo])
            .await
            .map_err(FlexError::Bus)
    }

    pub async fn read_conversion(&mut self) -> Result<i16, FlexError<I2C::Error>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[FLEX_CONVERSION_REG], &mut buf)
            .await
            .map_err(FlexError::Bus)?;
        Ok(i16::from_be_bytes(buf))
    }

    /// Configure, wait for a conversion, read it.
    pub async fn sample(&mut self) -> Result<i16, FlexError<I2C::Error>> {
        self.configure().await?;
        Timer::after(Duration::from_millis(FLEX_SETTLE_MS)).await;
        self.read_conversion().await
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// Publishes the flex state only when it changes.
pub struct FlexSampler {
    previous: FlexState,
}

impl FlexSampler {
    /// Starts out `High` so that a sensor at rest reports once at boot.
    pub const fn new() -> Self {
        Self {
            previous: FlexState::High,
        }
    }

    pub const fn state(&self) -> FlexState {
        self.previous
    }

    pub fn step(&mut self, raw: i16) -> Option<Event> {
        let state = FlexState::from_raw(raw);
        if state == self.previous {
            return None;
        }
        debug!("flex {:?} -> {:?} (raw {})", self.previous, state, raw);
        self.previous = state;
        Some(Event::flex(state))
    }

    pub async fn run<I2C, M, const N: usize>(
        mut self,
        mut front_end: FlexFrontEnd<I2C>,
        queue: &EventQueue<M, N>,
    ) -> !
    where
        I2C: I2c,
        M: RawMutex,
    {
        let mut ticker = Ticker::every(Duration::from_millis(FLEX_PERIOD_MS));
        let timeout = Duration::from_millis(ENQUEUE_TIMEOUT_MS);

        loop {
            match front_end.sample().await {
                Ok(raw) => {
                    if let Some(event) = self.step(raw) {
                        if let Err(e) = queue.enqueue(event, timeout).await {
                            trace!("{}", e);
                        }
                    }
                }
                // Skip this cycle, try again next period.
                Err(e) => warn!("{}", e),
            }
            ticker.next().await;
        }
    }
}

impl Default for FlexSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::Frame, queue::SharedEventQueue, testing::{FakeI2c, run_for}};
    use embassy_futures::block_on;
    use embedded_hal_async::i2c::{ErrorKind, NoAcknowledgeSource};

    #[test]
    fn threshold_is_on_the_divided_reading() {
        assert_eq!(FlexState::from_raw(18_999), FlexState::Low);
        assert_eq!(FlexState::from_raw(19_000), FlexState::High);
        assert_eq!(FlexState::from_raw(19_099), FlexState::High);
        assert_eq!(FlexState::from_raw(i16::MIN), FlexState::Low);
    }

    #[test]
    fn first_low_reading_reports() {
        let mut flex = FlexSampler::new();
        assert_eq!(flex.step(500), Some(Event::flex(FlexState::Low)));
        assert_eq!(flex.step(500), None);
    }

    #[test]
    fn constant_input_reports_at_most_once() {
        for raw in [0, 18_900, 19_000, 30_000] {
            let mut flex = FlexSampler::new();
            let events = (0..50).filter_map(|_| flex.step(raw)).count();
            assert!(events <= 1, "raw {raw} produced {events} events");
        }
    }

    #[test]
    fn crossing_the_threshold_reports_high_once() {
        let mut flex = FlexSampler::new();
        flex.step(18_900);
        let frames: Vec<[u8; 4]> = [18_900, 19_100, 19_100, 19_100]
            .iter()
            .filter_map(|&raw| flex.step(raw))
            .map(|e| Frame::encode(&e))
            .collect();
        assert_eq!(frames, vec![[3, 1, 0, 0xFF]]);
    }

    #[test]
    fn sample_writes_config_then_reads_conversion() {
        let i2c = FakeI2c::readings(FLEX_ADDRESS, [19_100]);
        let mut front_end = FlexFrontEnd::new(i2c);
        assert_eq!(block_on(front_end.sample()), Ok(19_100));

        let i2c = front_end.release();
        assert_eq!(
            i2c.writes,
            vec![vec![FLEX_CONFIG_REG, 0xC2, 0x83], vec![FLEX_CONVERSION_REG]]
        );
    }

    #[test]
    fn wrong_address_is_a_bus_fault() {
        let mut front_end = FlexFrontEnd::with_address(FakeI2c::readings(FLEX_ADDRESS, [0]), 0x49);
        assert_eq!(
            block_on(front_end.sample()),
            Err(FlexError::Bus(ErrorKind::NoAcknowledge(
                NoAcknowledgeSource::Address
            )))
        );
    }

    #[test]
    fn run_skips_faulty_cycles_and_reports_changes() {
        static QUEUE: SharedEventQueue = SharedEventQueue::new();

        let i2c = FakeI2c::new(
            FLEX_ADDRESS,
            [
                Ok(18_900),
                Err(ErrorKind::Other),
                Ok(18_900),
                Err(ErrorKind::ArbitrationLoss),
                Ok(19_100),
            ],
        );
        run_for(
            FlexSampler::new().run(FlexFrontEnd::new(i2c), &QUEUE),
            Duration::from_millis(FLEX_PERIOD_MS * 8),
        );

        let frames: Vec<[u8; 4]> = core::iter::from_fn(|| QUEUE.try_dequeue())
            .map(|e| Frame::encode(&e))
            .collect();
        assert_eq!(frames, vec![[3, 0, 0, 0xFF], [3, 1, 0, 0xFF]]);
    }
}
