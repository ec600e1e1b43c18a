//! Key binding configuration for bb
//!
//! Defines the `[[bindings]]` entries read from bb.toml and the parser
//! turning key names such as `"j"`, `"<c-d>"`, `"Alt+x"`, `"pgdn"` or
//! `"doubleclick"` into [Trigger]s.

use crate::app::keymap::Trigger;
use crate::core::input::{Key, MouseButton, MouseKind};

use serde::Deserialize;

/// One user binding.
/// # Examples
/// ```toml
/// [[bindings]]
/// keys = ["D"]
/// action = "rm -ri -- \"$@\""
/// description = "Delete selection"
/// normal_term = true
/// ```
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BindingConfig {
    keys: Vec<String>,
    action: String,
    description: String,
    normal_term: bool,
    show_cursor: bool,
}

impl BindingConfig {
    #[inline]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    #[inline]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn normal_term(&self) -> bool {
        self.normal_term
    }

    #[inline]
    pub fn show_cursor(&self) -> bool {
        self.show_cursor
    }
}

const CTRL: u8 = 1 << 0;
const ALT: u8 = 1 << 1;
const SHIFT: u8 = 1 << 2;

fn parse_mouse(name: &str) -> Option<MouseKind> {
    Some(match name {
        "click" | "leftclick" => MouseKind::Press(MouseButton::Left),
        "middleclick" => MouseKind::Press(MouseButton::Middle),
        "rightclick" => MouseKind::Press(MouseButton::Right),
        "doubleclick" => MouseKind::DoubleClick(MouseButton::Left),
        "middledoubleclick" => MouseKind::DoubleClick(MouseButton::Middle),
        "rightdoubleclick" => MouseKind::DoubleClick(MouseButton::Right),
        "wheelup" | "scrollup" => MouseKind::WheelUp,
        "wheeldown" | "scrolldown" => MouseKind::WheelDown,
        _ => return None,
    })
}

fn named_key(name: &str) -> Option<Key> {
    Some(match name {
        "up" => Key::Up,
        "down" => Key::Down,
        "left" => Key::Left,
        "right" => Key::Right,
        "home" => Key::Home,
        "end" => Key::End,
        "insert" | "ins" => Key::Insert,
        "delete" | "del" => Key::Delete,
        "pageup" | "pgup" => Key::PageUp,
        "pagedown" | "pgdn" => Key::PageDown,
        "backtab" => Key::BackTab,
        "enter" | "return" => Key::Byte(b'\r'),
        "esc" | "escape" => Key::Escape,
        "backspace" | "back" => Key::Byte(0x7f),
        "tab" => Key::Byte(b'\t'),
        "space" | "spc" => Key::Byte(b' '),
        _ => {
            let n: u8 = name.strip_prefix('f')?.parse().ok()?;
            if (1..=12).contains(&n) {
                Key::F(n)
            } else {
                return None;
            }
        }
    })
}

/// Parses a key or mouse name into a trigger.
pub fn parse_trigger(s: &str) -> Option<Trigger> {
    let lowered = s.to_lowercase().replace('-', "");
    let bare = lowered.trim_start_matches('<').trim_end_matches('>');
    if let Some(kind) = parse_mouse(bare) {
        return Some(Trigger::Mouse(kind));
    }

    let mut modifiers = 0u8;
    let is_bracketed = s.starts_with('<') && s.ends_with('>') && s.len() > 2;
    let mut input = if is_bracketed { &s[1..s.len() - 1] } else { s };

    if is_bracketed && input.len() > 1 && input.contains('-') {
        let (prefixes, last) = input.rsplit_once('-')?;
        for prefix in prefixes.split('-') {
            match prefix.to_lowercase().as_str() {
                "c" | "ctrl" => modifiers |= CTRL,
                "a" | "m" | "alt" => modifiers |= ALT,
                "s" | "shift" => modifiers |= SHIFT,
                _ => return None,
            }
        }
        input = last;
    }

    let mut key: Option<Key> = None;
    let parts: Vec<&str> = if input.len() > 1 {
        input.split('+').collect()
    } else {
        vec![input]
    };
    for part in parts {
        let low = part.to_lowercase();
        match low.as_str() {
            "ctrl" | "control" => modifiers |= CTRL,
            "alt" | "meta" => modifiers |= ALT,
            "shift" => modifiers |= SHIFT,
            "" => continue,
            _ => {
                let mut chars = part.chars();
                key = match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => Some(Key::Byte(c as u8)),
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => Some(named_key(&low)?),
                };
            }
        }
    }

    let key = match key? {
        Key::Byte(b) if b.is_ascii_alphabetic() && modifiers & CTRL != 0 => {
            Key::Byte(b.to_ascii_lowercase() & 0x1f)
        }
        Key::Byte(b) if modifiers & CTRL != 0 => match b {
            b'@' | b' ' => Key::Byte(0),
            b'[' => Key::Escape,
            b'\\' | b']' | b'^' | b'_' => Key::Byte(b & 0x1f),
            _ => return None,
        },
        Key::Byte(b) if modifiers & ALT != 0 => {
            let b = if modifiers & SHIFT != 0 { b.to_ascii_uppercase() } else { b };
            Key::Alt(b)
        }
        Key::Byte(b) if modifiers & SHIFT != 0 => Key::Byte(b.to_ascii_uppercase()),
        other => other,
    };
    Some(Trigger::Key(key))
}
