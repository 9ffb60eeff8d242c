use serde::{Deserialize, Serialize};

use crate::config::MAX_BUTTONS;

/// Index of a physical button, `0..MAX_BUTTONS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ButtonId(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("button id {0} out of range (max {max})", max = MAX_BUTTONS - 1)]
pub struct InvalidButtonId(pub u8);

impl ButtonId {
    pub const fn new(id: u8) -> Option<Self> {
        if (id as usize) < MAX_BUTTONS {
            Some(Self(id))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ButtonId {
    type Error = InvalidButtonId;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id).ok_or(InvalidButtonId(id))
    }
}

impl From<ButtonId> for u8 {
    fn from(id: ButtonId) -> Self {
        id.0
    }
}

/// Logical source of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    AxisX,
    AxisY,
    Button(ButtonId),
    Flex,
}

impl ChannelId {
    /// First byte of the frame. All buttons share one id; the value tells them apart.
    pub const fn wire_id(self) -> u8 {
        match self {
            ChannelId::AxisX => 0,
            ChannelId::AxisY => 1,
            ChannelId::Button(_) => 2,
            ChannelId::Flex => 3,
        }
    }
}

/// Thresholded flex sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexState {
    Low = 0,
    High = 1,
}

/// One state change travelling from a sampler to the wire.
///
/// Fields are private so an event cannot be altered once built; it is copied
/// into the queue slot and copied out again by the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    channel: ChannelId,
    value: i16,
}

impl Event {
    /// Axis displacement. `channel` is expected to be one of the axes.
    pub const fn axis(channel: ChannelId, value: i16) -> Self {
        Self { channel, value }
    }

    pub const fn button(id: ButtonId) -> Self {
        Self {
            channel: ChannelId::Button(id),
            value: id.0 as i16,
        }
    }

    pub const fn flex(state: FlexState) -> Self {
        Self {
            channel: ChannelId::Flex,
            value: state as i16,
        }
    }

    pub const fn channel(&self) -> ChannelId {
        self.channel
    }

    pub const fn value(&self) -> i16 {
        self.value
    }

    /// Rebuild an event from the channel byte and value of a received frame.
    pub fn from_wire(channel: u8, value: i16) -> Option<Self> {
        match channel {
            0 => Some(Self::axis(ChannelId::AxisX, value)),
            1 => Some(Self::axis(ChannelId::AxisY, value)),
            2 => {
                let id = u8::try_from(value).ok().and_then(ButtonId::new)?;
                Some(Self::button(id))
            }
            3 => match value {
                0 => Some(Self::flex(FlexState::Low)),
                1 => Some(Self::flex(FlexState::High)),
                _ => None,
            },
            _ => None,
        }
    }
}
