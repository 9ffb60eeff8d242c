//! Host stand-ins for the board peripherals.

use std::collections::VecDeque;

use embassy_futures::{block_on, select::select};
use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::{self, ErrorKind, NoAcknowledgeSource, Operation};
use embedded_io_async::{ErrorType, Write};

use crate::axis::AnalogInput;

/// Drive a never-ending task for `duration` of wall time, then drop it.
pub fn run_for<F: Future>(task: F, duration: Duration) {
    block_on(select(task, Timer::after(duration)));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcFault;

/// Plays back a fixed list of conversions, then repeats the last one.
pub struct FakeAdc {
    channel: u8,
    readings: VecDeque<Result<u16, AdcFault>>,
    last: u16,
}

impl FakeAdc {
    pub fn new(channel: u8, raws: impl IntoIterator<Item = u16>) -> Self {
        Self::scripted(channel, raws.into_iter().map(Ok))
    }

    pub fn scripted(channel: u8, readings: impl IntoIterator<Item = Result<u16, AdcFault>>) -> Self {
        Self {
            channel,
            readings: readings.into_iter().collect(),
            last: crate::config::ADC_CENTER as u16,
        }
    }
}

impl AnalogInput for FakeAdc {
    type Error = AdcFault;

    async fn read_channel(&mut self, channel: u8) -> Result<u16, Self::Error> {
        assert_eq!(channel, self.channel, "sampler selected the wrong input");
        match self.readings.pop_front() {
            Some(Ok(raw)) => {
                self.last = raw;
                Ok(raw)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last),
        }
    }
}

/// ADS1115 look-alike: records every write, answers reads from a script.
pub struct FakeI2c {
    address: u8,
    conversions: VecDeque<Result<i16, ErrorKind>>,
    last: i16,
    pub writes: Vec<Vec<u8>>,
}

impl FakeI2c {
    pub fn new(address: u8, conversions: impl IntoIterator<Item = Result<i16, ErrorKind>>) -> Self {
        Self {
            address,
            conversions: conversions.into_iter().collect(),
            last: 0,
            writes: Vec::new(),
        }
    }

    pub fn readings(address: u8, raws: impl IntoIterator<Item = i16>) -> Self {
        Self::new(address, raws.into_iter().map(Ok))
    }
}

impl i2c::ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl i2c::I2c for FakeI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => self.writes.push(bytes.to_vec()),
                Operation::Read(buf) => {
                    let raw = match self.conversions.pop_front() {
                        Some(Ok(raw)) => raw,
                        Some(Err(e)) => return Err(e),
                        None => self.last,
                    };
                    self.last = raw;
                    buf.copy_from_slice(&raw.to_be_bytes()[..buf.len()]);
                }
            }
        }
        Ok(())
    }
}

/// Output stream that keeps everything written to it.
#[derive(Default)]
pub struct VecSink {
    pub bytes: Vec<u8>,
    pub flushes: usize,
}

impl ErrorType for VecSink {
    type Error = core::convert::Infallible;
}

impl Write for VecSink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

/// Output stream whose link is down for the first `failures` writes.
pub struct FlakySink {
    pub failures: usize,
    pub inner: VecSink,
}

impl ErrorType for FlakySink {
    type Error = embedded_io_async::ErrorKind;
}

impl Write for FlakySink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(embedded_io_async::ErrorKind::BrokenPipe);
        }
        self.inner.write(buf).await.map_err(|e| match e {})
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush().await.map_err(|e| match e {})
    }
}
