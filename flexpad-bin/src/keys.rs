use std::{collections::HashSet, io};

use anyhow::Result;
use flexpad_lib::{ChannelId, Event};
use log::{debug, trace};

use crate::config::{AxisKeys, LoadedConfig};

/// Something that can hold keys down and let them go.
pub trait KeySink {
    fn press(&mut self, key: &str) -> io::Result<()>;
    fn release(&mut self, key: &str) -> io::Result<()>;
}

/// Prints one `press <key>` / `release <key>` line per transition.
///
/// For debugging, or for piping into an external injector on hosts without
/// a native keystroke sink.
#[cfg_attr(windows, allow(dead_code))]
pub struct StdoutSink<W: io::Write> {
    out: W,
}

#[cfg_attr(windows, allow(dead_code))]
impl<W: io::Write> StdoutSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: io::Write> KeySink for StdoutSink<W> {
    fn press(&mut self, key: &str) -> io::Result<()> {
        writeln!(self.out, "press {}", key)?;
        self.out.flush()
    }

    fn release(&mut self, key: &str) -> io::Result<()> {
        writeln!(self.out, "release {}", key)?;
        self.out.flush()
    }
}

/// Turns decoded events into key transitions, remembering which keys are held
/// so a repeated press or release never reaches the sink twice.
pub struct KeyMapper<S: KeySink> {
    sink: S,
    held: HashSet<String>,
}

impl<S: KeySink> KeyMapper<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            held: HashSet::new(),
        }
    }

    pub fn handle(&mut self, event: Event, config: &LoadedConfig) -> Result<()> {
        let threshold = config.config.axis_threshold;
        match event.channel() {
            ChannelId::AxisX => self.axis(&config.config.axis_x, event.value(), threshold),
            ChannelId::AxisY => self.axis(&config.config.axis_y, event.value(), threshold),
            ChannelId::Button(id) => match config.buttons.get(&id) {
                Some(key) => self.tap(key),
                None => {
                    trace!("Unmapped button ID: {}", id.get());
                    Ok(())
                }
            },
            ChannelId::Flex => self.tap(&config.config.flex.key),
        }
    }

    fn axis(&mut self, keys: &AxisKeys, value: i16, threshold: i16) -> Result<()> {
        let negative = value < -threshold;
        let positive = value > threshold;
        // Release first so the two directions are never held together.
        if !negative {
            self.set(&keys.negative, false)?;
        }
        if !positive {
            self.set(&keys.positive, false)?;
        }
        self.set(&keys.negative, negative)?;
        self.set(&keys.positive, positive)
    }

    pub fn tap(&mut self, key: &str) -> Result<()> {
        debug!("tap {}", key);
        self.set(key, true)?;
        self.set(key, false)
    }

    fn set(&mut self, key: &str, down: bool) -> Result<()> {
        if down == self.held.contains(key) {
            return Ok(());
        }
        if down {
            self.sink.press(key)?;
            self.held.insert(key.to_owned());
        } else {
            self.sink.release(key)?;
            self.held.remove(key);
        }
        Ok(())
    }

    /// Let go of everything, e.g. when the device disconnects.
    ///
    /// Every held key gets a release attempt. Keys whose release fails stay
    /// tracked as held, and the first failure is returned.
    pub fn release_all(&mut self) -> Result<()> {
        let mut held: Vec<String> = self.held.iter().cloned().collect();
        held.sort();

        let mut first_error = None;
        for key in held {
            match self.sink.release(&key) {
                Ok(()) => {
                    self.held.remove(&key);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }
}
