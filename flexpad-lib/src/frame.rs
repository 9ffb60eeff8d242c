//! Four-byte framing of [`Event`]s.
//!
//! ```text
//! [channel id][value lo][value hi][0xFF]
//! ```
//!
//! There is no start marker and no checksum. The sentinel may also appear in
//! the value bytes (`-1` encodes as `FF FF`), so receivers must consume whole
//! four-byte groups instead of scanning for `0xFF`.

use crate::event::{ChannelId, Event};

pub const SENTINEL: u8 = 0xFF;
pub const FRAME_LEN: usize = 4;

pub struct Frame;

impl Frame {
    pub const fn encode(event: &Event) -> [u8; FRAME_LEN] {
        let [lo, hi] = event.value().to_le_bytes();
        [event.channel().wire_id(), lo, hi, SENTINEL]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A complete group did not end in the sentinel; one byte was discarded.
    #[error("frame does not end in sentinel (got {0:#04x})")]
    Desync(u8),
    #[error("unknown channel {channel} with value {value}")]
    UnknownChannel { channel: u8, value: i16 },
    /// Known channel, but the value is out of range for it (a button id past
    /// the last button, a flex state other than 0 or 1).
    #[error("value {value} is not valid on channel {channel}")]
    InvalidValue { channel: u8, value: i16 },
}

/// Byte-at-a-time receiver for the frame stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: [u8; FRAME_LEN],
    len: usize,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            buf: [0; FRAME_LEN],
            len: 0,
        }
    }

    /// Bytes held towards the next frame.
    pub const fn pending(&self) -> usize {
        self.len
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Feed one byte. Returns `Ok(Some(_))` when it completed a frame.
    ///
    /// On [`DecodeError::Desync`] the oldest buffered byte is dropped and the
    /// remaining three are kept, so alignment is recovered after at most three
    /// bad groups.
    pub fn push(&mut self, byte: u8) -> Result<Option<Event>, DecodeError> {
        self.buf[self.len] = byte;
        self.len += 1;
        if self.len < FRAME_LEN {
            return Ok(None);
        }

        let [channel, lo, hi, last] = self.buf;
        if last != SENTINEL {
            self.buf.copy_within(1.., 0);
            self.len = FRAME_LEN - 1;
            return Err(DecodeError::Desync(last));
        }

        self.len = 0;
        let value = i16::from_le_bytes([lo, hi]);
        match Event::from_wire(channel, value) {
            Some(event) => Ok(Some(event)),
            None if channel <= ChannelId::Flex.wire_id() => {
                Err(DecodeError::InvalidValue { channel, value })
            }
            None => Err(DecodeError::UnknownChannel { channel, value }),
        }
    }
}
