use std::{collections::HashMap, fs, io::ErrorKind, path::Path, time::Instant};

use anyhow::{Context, Result};
use flexpad_lib::ButtonId;
use log::{info, warn};

use crate::inject::virtual_key;

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Config {
    pub comm_port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_axis_threshold")]
    pub axis_threshold: i16,
    #[serde(default = "AxisKeys::default_x")]
    pub axis_x: AxisKeys,
    #[serde(default = "AxisKeys::default_y")]
    pub axis_y: AxisKeys,
    #[serde(default = "default_buttons")]
    pub button: Vec<ButtonMapping>,
    #[serde(default)]
    pub flex: FlexMapping,
}

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AxisKeys {
    pub negative: String,
    pub positive: String,
}

impl AxisKeys {
    fn new(negative: &str, positive: &str) -> Self {
        Self {
            negative: negative.to_owned(),
            positive: positive.to_owned(),
        }
    }

    fn default_x() -> Self {
        Self::new("a", "d")
    }

    fn default_y() -> Self {
        Self::new("w", "s")
    }
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct ButtonMapping {
    pub id: ButtonId,
    pub key: String,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct FlexMapping {
    pub key: String,
}

impl Default for FlexMapping {
    fn default() -> Self {
        Self { key: "e".into() }
    }
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_axis_threshold() -> i16 {
    30
}

fn default_buttons() -> Vec<ButtonMapping> {
    ["f", "r", "t"]
        .into_iter()
        .enumerate()
        .filter_map(|(id, key)| {
            Some(ButtonMapping {
                id: ButtonId::new(id as u8)?,
                key: key.into(),
            })
        })
        .collect()
}

impl Config {
    /// Bound key names that cannot be turned into a keystroke.
    pub fn unknown_keys(&self) -> Vec<&str> {
        let axes = [&self.axis_x, &self.axis_y]
            .into_iter()
            .flat_map(|a| [a.negative.as_str(), a.positive.as_str()]);
        let buttons = self.button.iter().map(|b| b.key.as_str());
        axes.chain(buttons)
            .chain([self.flex.key.as_str()])
            .filter(|key| virtual_key(key).is_none())
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            comm_port: None,
            baud_rate: default_baud_rate(),
            axis_threshold: default_axis_threshold(),
            axis_x: AxisKeys::default_x(),
            axis_y: AxisKeys::default_y(),
            button: default_buttons(),
            flex: FlexMapping::default(),
        }
    }
}

pub struct LoadedConfig {
    pub config: Config,
    pub buttons: HashMap<ButtonId, String>,
    last_modified: std::time::SystemTime,
    last_checked: std::time::Instant,
}

impl LoadedConfig {
    /// Load `filename`, falling back to built-in defaults when it does not exist.
    pub fn new_from_file(filename: &str) -> Result<Self> {
        let config_data = match fs::read_to_string(filename) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} not found, using default key bindings", filename);
                return Ok(LoadedConfig::new(Config::default(), std::time::UNIX_EPOCH));
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", filename)),
        };
        let config = parse(&config_data).with_context(|| format!("parsing {}", filename))?;
        let last_modified = modified(filename).unwrap_or(std::time::SystemTime::now());
        Ok(LoadedConfig::new(config, last_modified))
    }

    pub fn new(config: Config, last_modified: std::time::SystemTime) -> Self {
        let buttons: HashMap<ButtonId, String> = config
            .button
            .iter()
            .map(|b| (b.id, b.key.clone()))
            .collect();

        for key in config.unknown_keys() {
            warn!("Key {:?} has no keyboard mapping and will be rejected", key);
        }

        LoadedConfig {
            config,
            buttons,
            last_modified,
            last_checked: Instant::now(),
        }
    }

    fn should_reload(&mut self, filename: &str) -> bool {
        let now = Instant::now();
        // Throttle checks to once every 2 seconds
        if now.duration_since(self.last_checked).as_secs() < 2 {
            return false;
        }
        self.last_checked = now;

        match modified(filename) {
            Some(modified_time) if modified_time > self.last_modified => {
                self.last_modified = modified_time;
                true
            }
            _ => false,
        }
    }

    pub fn reload_if_needed(&mut self, filename: &str) -> Result<()> {
        if self.should_reload(filename) {
            let config_data = fs::read_to_string(filename)?;
            let config = parse(&config_data)?;
            *self = LoadedConfig::new(config, self.last_modified);
            info!("Configuration reloaded from {}", filename);
        }
        Ok(())
    }
}

fn parse(data: &str) -> Result<Config> {
    Ok(toml::from_str(data)?)
}

fn modified(filename: impl AsRef<Path>) -> Option<std::time::SystemTime> {
    fs::metadata(filename).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> ButtonId {
        ButtonId::new(n).unwrap()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.comm_port, None);
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.axis_threshold, 30);
        assert_eq!(config.axis_x, AxisKeys::new("a", "d"));
        assert_eq!(config.axis_y, AxisKeys::new("w", "s"));
        assert_eq!(config.flex.key, "e");

        let loaded = LoadedConfig::new(config, std::time::UNIX_EPOCH);
        assert_eq!(loaded.buttons.get(&id(0)).map(String::as_str), Some("f"));
        assert_eq!(loaded.buttons.get(&id(2)).map(String::as_str), Some("t"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = parse(
            r#"
            comm_port = "COM4"
            axis_threshold = 50

            [axis_y]
            negative = "up"
            positive = "down"

            [[button]]
            id = 1
            key = "space"
            "#,
        )
        .unwrap();

        assert_eq!(config.comm_port.as_deref(), Some("COM4"));
        assert_eq!(config.axis_threshold, 50);
        assert_eq!(config.axis_y, AxisKeys::new("up", "down"));

        let loaded = LoadedConfig::new(config, std::time::UNIX_EPOCH);
        assert_eq!(loaded.buttons.len(), 1);
        assert_eq!(loaded.buttons.get(&id(1)).map(String::as_str), Some("space"));
    }

    #[test]
    fn out_of_range_button_is_rejected() {
        let err = parse(
            r#"
            [[button]]
            id = 3
            key = "x"
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn shipped_config_parses() {
        let data = include_str!("../../flexpad.toml");
        let loaded = LoadedConfig::new(parse(data).unwrap(), std::time::UNIX_EPOCH);
        assert_eq!(loaded.buttons.len(), 3);
        assert_eq!(loaded.config.flex.key, "e");
        assert!(loaded.config.unknown_keys().is_empty());
    }

    #[test]
    fn unknown_key_names_are_listed() {
        let config = parse(
            r#"
            [flex]
            key = "hyper"

            [axis_x]
            negative = "left"
            positive = "rightish"
            "#,
        )
        .unwrap();
        assert_eq!(config.unknown_keys(), vec!["rightish", "hyper"]);
    }
}
