use crate::config::{ADC_CENTER, AXIS_GAIN, DEAD_ZONE, FILTER_WINDOW};

/// Moving average over the last [`FILTER_WINDOW`] raw axis samples.
#[derive(Debug, Clone)]
pub struct MotionFilter {
    window: [i32; FILTER_WINDOW],
    cursor: usize,
}

impl MotionFilter {
    /// Starts full of rest-position samples so the first averages stay near centre.
    pub const fn new() -> Self {
        Self {
            window: [ADC_CENTER; FILTER_WINDOW],
            cursor: 0,
        }
    }

    /// Replace the oldest sample with `sample` and return the mean of the window,
    /// truncated toward zero.
    pub fn push_and_average(&mut self, sample: i32) -> i32 {
        self.window[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % FILTER_WINDOW;

        let sum: i32 = self.window.iter().sum();
        sum / FILTER_WINDOW as i32
    }
}

impl Default for MotionFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Centre, scale and dead-zone a smoothed axis reading.
pub fn scale(smoothed: i32, invert: bool) -> i16 {
    let scaled = (smoothed - ADC_CENTER) / AXIS_GAIN;
    let scaled = if invert { -scaled } else { scaled };
    // 12-bit input keeps this within +-512
    dead_zone(scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
}

pub fn dead_zone(value: i16) -> i16 {
    if value.unsigned_abs() < DEAD_ZONE as u16 {
        0
    } else {
        value
    }
}
