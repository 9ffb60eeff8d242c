mod config;
mod inject;
mod keys;

use anyhow::{Result, anyhow};
use flexpad_lib::{DecodeError, FrameDecoder};
use log::{debug, error, info, warn};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::{
    io::{self, Read},
    time::Duration,
};

use crate::{
    config::LoadedConfig,
    keys::{KeyMapper, KeySink},
};

const CONFIG_FILE: &str = "flexpad.toml";

/// Raspberry Pi USB vendor id, reported by the Pico's USB serial bridge.
const PICO_USB_VID: u16 = 0x2E8A;

#[cfg(windows)]
fn key_sink() -> impl KeySink {
    info!("Injecting keystrokes with SendInput");
    inject::SendInputSink
}

#[cfg(not(windows))]
fn key_sink() -> impl KeySink {
    info!("No native keystroke sink on this platform, writing key events to stdout");
    keys::StdoutSink::new(io::stdout())
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let mut config = LoadedConfig::new_from_file(CONFIG_FILE)?;
    let mut keys = KeyMapper::new(key_sink());

    loop {
        if let Err(e) = config.reload_if_needed(CONFIG_FILE) {
            warn!("Failed to reload config: {}", e);
        }

        let port_name_result = resolve_port_name(&config.config.comm_port);

        match port_name_result {
            Ok(name) => {
                info!("Connecting to {}...", name);

                match serialport::new(&name, config.config.baud_rate)
                    .timeout(Duration::from_millis(500))
                    .open()
                {
                    Ok(port) => {
                        if let Err(e) = process_serial_stream(port, &mut config, &mut keys) {
                            error!("Serial connection lost: {}", e);
                        }
                        if let Err(e) = keys.release_all() {
                            warn!("Failed to release held keys: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to open port {}: {}", name, e),
                }
            }
            Err(e) => warn!("Port detection failed: {}", e),
        }

        std::thread::sleep(Duration::from_secs(5));
    }
}

fn resolve_port_name(configured_port: &Option<String>) -> Result<String> {
    match configured_port {
        Some(name) => Ok(name.clone()),
        None => {
            info!("No port specified, scanning for USB devices...");
            let ports = serialport::available_ports()?;

            pick_usb_port(ports)
                .map(|name| {
                    info!("Found USB device on {}", name);
                    name
                })
                .ok_or_else(|| anyhow!("No USB serial device found"))
        }
    }
}

/// A port whose USB vendor is the Pico's wins; any other USB port is the fallback.
fn pick_usb_port(ports: Vec<SerialPortInfo>) -> Option<String> {
    let mut fallback = None;
    for port in ports {
        match &port.port_type {
            SerialPortType::UsbPort(usb) if usb.vid == PICO_USB_VID => return Some(port.port_name),
            SerialPortType::UsbPort(_) => {
                fallback.get_or_insert(port.port_name);
            }
            _ => debug!("Skipping non-USB port {}", port.port_name),
        }
    }
    fallback
}

fn process_serial_stream<S: KeySink>(
    mut port: Box<dyn SerialPort>,
    config: &mut LoadedConfig,
    keys: &mut KeyMapper<S>,
) -> Result<()> {
    let mut decoder = FrameDecoder::new();
    let mut buffer = [0u8; 64];

    info!("Listening for controller events...");

    loop {
        match port.read(&mut buffer) {
            Ok(0) => continue,
            Ok(bytes_read) => {
                if let Err(e) = config.reload_if_needed(CONFIG_FILE) {
                    warn!("Config reload failed: {}", e);
                }
                feed(&mut decoder, &buffer[..bytes_read], config, keys);
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(e.into()), // Critical IO error, break the loop to reconnect
        }
    }
}

fn feed<S: KeySink>(
    decoder: &mut FrameDecoder,
    bytes: &[u8],
    config: &LoadedConfig,
    keys: &mut KeyMapper<S>,
) {
    for &byte in bytes {
        match decoder.push(byte) {
            Ok(Some(event)) => {
                if let Err(e) = keys.handle(event, config) {
                    warn!("Key output failed: {}", e);
                }
            }
            Ok(None) => {}
            Err(e @ DecodeError::Desync(_)) => debug!("{}", e),
            Err(e) => warn!("{}", e),
        }
    }
}
