//! Keystroke injection into the foreground window.

/// Windows virtual-key code for a key name from `flexpad.toml`.
///
/// Single letters and digits map to themselves; a handful of named keys
/// cover the rest. Names are case-insensitive.
pub fn virtual_key(name: &str) -> Option<u16> {
    let name = name.to_ascii_lowercase();
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return match c {
            'a'..='z' => Some(c.to_ascii_uppercase() as u16),
            '0'..='9' => Some(c as u16),
            ' ' => Some(0x20),
            _ => None,
        };
    }

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
        return (1..=12).contains(&n).then(|| 0x70 + n - 1);
    }

    let vk = match name.as_str() {
        "space" => 0x20,
        "enter" | "return" => 0x0D,
        "tab" => 0x09,
        "esc" | "escape" => 0x1B,
        "backspace" => 0x08,
        "shift" => 0x10,
        "ctrl" | "control" => 0x11,
        "alt" => 0x12,
        "left" => 0x25,
        "up" => 0x26,
        "right" => 0x27,
        "down" => 0x28,
        _ => return None,
    };
    Some(vk)
}

#[cfg(windows)]
pub use self::windows_sink::SendInputSink;

#[cfg(windows)]
mod windows_sink {
    use std::io;

    use log::trace;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        INPUT, INPUT_0, INPUT_KEYBOARD, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_KEYUP, SendInput,
        VIRTUAL_KEY,
    };

    use super::virtual_key;
    use crate::keys::KeySink;

    /// Presses and releases real keys through `SendInput`.
    #[derive(Default)]
    pub struct SendInputSink;

    impl SendInputSink {
        fn send(&self, key: &str, flags: KEYBD_EVENT_FLAGS) -> io::Result<()> {
            let vk = virtual_key(key).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("unknown key {:?}", key))
            })?;

            let input = INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: VIRTUAL_KEY(vk),
                        wScan: 0,
                        dwFlags: flags,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            };

            let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
            if sent != 1 {
                return Err(io::Error::last_os_error());
            }
            trace!("SendInput {} ({:#04x}) flags {:?}", key, vk, flags);
            Ok(())
        }
    }

    impl KeySink for SendInputSink {
        fn press(&mut self, key: &str) -> io::Result<()> {
            self.send(key, KEYBD_EVENT_FLAGS(0))
        }

        fn release(&mut self, key: &str) -> io::Result<()> {
            self.send(key, KEYEVENTF_KEYUP)
        }
    }
}
