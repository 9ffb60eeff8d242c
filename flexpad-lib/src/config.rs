//! Fixed tuning of the controller. Nothing here changes at runtime.

use crate::event::ChannelId;

/// Raw ADC reading of a joystick axis at rest (12-bit converter).
pub const ADC_CENTER: i32 = 2047;
/// Divisor applied to the centred, smoothed axis reading.
pub const AXIS_GAIN: i32 = 8;
/// Scaled axis values with a magnitude below this collapse to zero.
pub const DEAD_ZONE: i16 = 30;
/// Number of raw samples averaged by the motion filter.
pub const FILTER_WINDOW: usize = 5;

/// Slots in the sampler -> serializer queue.
pub const QUEUE_CAPACITY: usize = 10;
/// How long a producer waits for a free slot before dropping its event.
pub const ENQUEUE_TIMEOUT_MS: u64 = 50;

pub const AXIS_PERIOD_MS: u64 = 10;
pub const BUTTON_PERIOD_MS: u64 = 10;
pub const FLEX_PERIOD_MS: u64 = 50;

pub const MAX_BUTTONS: usize = 3;

// Flex sensor front-end (ADS1115 on the two-wire bus)
pub const FLEX_ADDRESS: u8 = 0x48;
pub const FLEX_CONVERSION_REG: u8 = 0x00;
pub const FLEX_CONFIG_REG: u8 = 0x01;
/// OS=1, MUX=AIN0/GND, PGA=+-4.096V, continuous, 128 SPS, comparator off.
pub const FLEX_CONFIG: u16 = 0xC283;
pub const FLEX_SETTLE_MS: u64 = 10;
pub const FLEX_DIVISOR: i16 = 100;
/// `raw / FLEX_DIVISOR` at or above this reads as bent.
pub const FLEX_HIGH_QUOTIENT: i16 = 190;

/// Electrical level of a pressed button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Pressing drives the line high; the rising edge is the press.
    ActiveHigh,
    /// Line pulled up, pressing shorts it to ground; the falling edge is the press.
    ActiveLow,
}

/// Identity and calibration of one joystick axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisConfig {
    pub channel: ChannelId,
    /// Analog multiplexer input the axis is wired to.
    pub adc_channel: u8,
    /// Negate the scaled value before the dead zone is applied.
    pub invert: bool,
}

impl AxisConfig {
    pub const fn x() -> Self {
        Self {
            channel: ChannelId::AxisX,
            adc_channel: 0,
            invert: false,
        }
    }

    pub const fn y() -> Self {
        Self {
            channel: ChannelId::AxisY,
            adc_channel: 1,
            invert: false,
        }
    }

    /// Y axis of the later board revision, mounted upside down.
    pub const fn y_inverted() -> Self {
        Self {
            invert: true,
            ..Self::y()
        }
    }
}
