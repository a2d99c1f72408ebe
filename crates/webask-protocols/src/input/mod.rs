//! Clipboard and keyboard adapter traits.

use crate::error::{ClipboardError, InputError};

/// System clipboard.
pub trait Clipboard: Send {
    /// Current text content; `None` when the clipboard is empty or holds
    /// non-text data.
    fn get_text(&mut self) -> Result<Option<String>, ClipboardError>;

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;

    fn clear(&mut self) -> Result<(), ClipboardError>;
}

/// Modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Control,
    Meta,
    Shift,
    Alt,
}

/// Keys the injector needs to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Modifier(Modifier),
    Char(char),
    Enter,
    Tab,
    Escape,
}

impl Key {
    /// Parse a single key name (case-insensitive).
    pub fn parse(name: &str) -> Result<Self, InputError> {
        let key = match name.trim().to_lowercase().as_str() {
            "enter" | "return" => Key::Enter,
            "tab" => Key::Tab,
            "escape" | "esc" => Key::Escape,
            "ctrl" | "control" => Key::Modifier(Modifier::Control),
            "alt" | "option" => Key::Modifier(Modifier::Alt),
            "shift" => Key::Modifier(Modifier::Shift),
            "meta" | "cmd" | "command" | "win" | "super" => Key::Modifier(Modifier::Meta),
            "space" => Key::Char(' '),
            s if s.chars().count() == 1 => match s.chars().next() {
                Some(c) => Key::Char(c),
                None => return Err(InputError::InvalidKey(name.to_string())),
            },
            _ => return Err(InputError::InvalidKey(name.to_string())),
        };
        Ok(key)
    }

    /// Parse a `+`-separated chord such as `"meta+v"`.
    pub fn parse_chord(chord: &str) -> Result<Vec<Self>, InputError> {
        if chord.trim().is_empty() {
            return Err(InputError::InvalidKey(chord.to_string()));
        }
        chord.split('+').map(Key::parse).collect()
    }
}

/// Keystroke injection into the focused window.
pub trait Keyboard: Send {
    /// Press and release a single key.
    fn press(&mut self, key: Key) -> Result<(), InputError>;

    /// Hold every key but the last, tap the last, then release in reverse order.
    fn chord(&mut self, keys: &[Key]) -> Result<(), InputError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_keys() {
        assert_eq!(Key::parse("Enter").unwrap(), Key::Enter);
        assert_eq!(Key::parse("return").unwrap(), Key::Enter);
        assert_eq!(Key::parse("cmd").unwrap(), Key::Modifier(Modifier::Meta));
        assert_eq!(Key::parse("CTRL").unwrap(), Key::Modifier(Modifier::Control));
        assert_eq!(Key::parse("v").unwrap(), Key::Char('v'));
    }

    #[test]
    fn test_parse_invalid_key() {
        assert!(Key::parse("hyperkey").is_err());
        assert!(Key::parse("").is_err());
    }

    #[test]
    fn test_parse_chord() {
        let keys = Key::parse_chord("meta+v").unwrap();
        assert_eq!(keys, vec![Key::Modifier(Modifier::Meta), Key::Char('v')]);
        assert!(Key::parse_chord("").is_err());
        assert!(Key::parse_chord("ctrl+nope").is_err());
    }
}
