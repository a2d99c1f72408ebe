//! Keystroke injection through enigo.

use std::thread;
use std::time::Duration;

use enigo::{Direction, Enigo, Keyboard as _, Settings};
use tracing::{debug, warn};
use webask_protocols::{InputError, Key, Keyboard, Modifier};

const DEFAULT_KEY_DELAY: Duration = Duration::from_millis(30);

/// [`Keyboard`] that types into whatever window the OS has focused.
///
/// An enigo handle is opened per operation, so the adapter itself holds no
/// platform state.
pub struct EnigoKeyboard {
    key_delay: Duration,
}

impl EnigoKeyboard {
    /// Create the adapter and check that input injection is available.
    pub fn new() -> Result<Self, InputError> {
        open()?;
        Ok(Self {
            key_delay: DEFAULT_KEY_DELAY,
        })
    }

    /// Pause between the individual press/release events of a chord.
    pub fn with_key_delay(mut self, delay: Duration) -> Self {
        self.key_delay = delay;
        self
    }
}

impl Keyboard for EnigoKeyboard {
    fn press(&mut self, key: Key) -> Result<(), InputError> {
        let mut enigo = open()?;
        enigo
            .key(to_enigo(key), Direction::Click)
            .map_err(|e| InputError::Failed(e.to_string()))
    }

    fn chord(&mut self, keys: &[Key]) -> Result<(), InputError> {
        let Some((last, held)) = keys.split_last() else {
            return Err(InputError::InvalidKey("empty chord".to_string()));
        };
        debug!(?keys, "Sending chord");
        let mut enigo = open()?;

        let mut pressed = Vec::with_capacity(held.len());
        let mut result = Ok(());
        for key in held {
            let key = to_enigo(*key);
            if let Err(e) = enigo.key(key, Direction::Press) {
                result = Err(InputError::Failed(e.to_string()));
                break;
            }
            pressed.push(key);
            thread::sleep(self.key_delay);
        }

        if result.is_ok() {
            result = enigo
                .key(to_enigo(*last), Direction::Click)
                .map_err(|e| InputError::Failed(e.to_string()));
            thread::sleep(self.key_delay);
        }

        // Always release what was held, even after a failure.
        for key in pressed.into_iter().rev() {
            if let Err(e) = enigo.key(key, Direction::Release) {
                warn!("Failed to release {:?}: {}", key, e);
            }
        }

        result
    }
}

fn open() -> Result<Enigo, InputError> {
    Enigo::new(&Settings::default()).map_err(|e| InputError::Failed(e.to_string()))
}

/// Map an engine key onto enigo's key type.
pub fn to_enigo(key: Key) -> enigo::Key {
    match key {
        Key::Modifier(Modifier::Control) => enigo::Key::Control,
        Key::Modifier(Modifier::Meta) => enigo::Key::Meta,
        Key::Modifier(Modifier::Shift) => enigo::Key::Shift,
        Key::Modifier(Modifier::Alt) => enigo::Key::Alt,
        Key::Char(c) => enigo::Key::Unicode(c),
        Key::Enter => enigo::Key::Return,
        Key::Tab => enigo::Key::Tab,
        Key::Escape => enigo::Key::Escape,
    }
}
