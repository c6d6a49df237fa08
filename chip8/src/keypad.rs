//! Hexadecimal keypad.
use crate::constants::*;

/// Pressed state of the 16 keys.
///
/// Only the input producer writes to the keypad. The interpreter reads it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    /// Pressed is a 1 bit, released is a 0 bit.
    state: u16,
}

impl Keypad {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set(&mut self, key: KeyCode, pressed: bool) {
        let bit = 1 << key.as_u8();
        if pressed {
            self.state |= bit;
        } else {
            self.state &= !bit;
        }
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.state & (1 << key.as_u8()) != 0
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.state != 0
    }

    /// Retrieve the lowest key that is pressed down.
    #[inline]
    pub fn first_key(&self) -> Option<KeyCode> {
        if self.any_key() {
            KeyCode::try_from(self.state.trailing_zeros() as u8).ok()
        } else {
            None
        }
    }

    /// Set all keys to up.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.state = 0;
    }

    pub fn bits(&self) -> u16 {
        self.state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    pub const ALL: [KeyCode; KEY_COUNT as usize] = [
        Self::Key0,
        Self::Key1,
        Self::Key2,
        Self::Key3,
        Self::Key4,
        Self::Key5,
        Self::Key6,
        Self::Key7,
        Self::Key8,
        Self::Key9,
        Self::KeyA,
        Self::KeyB,
        Self::KeyC,
        Self::KeyD,
        Self::KeyE,
        Self::KeyF,
    ];

    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(key_id as usize)
            .copied()
            .ok_or(InvalidKeyCode(key_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidKeyCode(pub u8);

impl std::error::Error for InvalidKeyCode {}

impl std::fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "keycode must be in range 0 <= keycode < 16, got {}",
            self.0
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut keypad = Keypad::default();

        keypad.set(KeyCode::Key0, true);
        assert_eq!(keypad.bits(), 0b00000000_00000001);
        assert!(keypad.is_pressed(KeyCode::Key0));
        assert!(!keypad.is_pressed(KeyCode::Key1));
        assert!(!keypad.is_pressed(KeyCode::Key7));

        keypad.set(KeyCode::Key7, true);
        assert_eq!(keypad.bits(), 0b00000000_10000001);
        assert!(keypad.is_pressed(KeyCode::Key0));
        assert!(keypad.is_pressed(KeyCode::Key7));

        keypad.set(KeyCode::Key0, false);
        assert_eq!(keypad.bits(), 0b00000000_10000000);
        assert!(!keypad.is_pressed(KeyCode::Key0));
        assert!(keypad.is_pressed(KeyCode::Key7));

        keypad.set(KeyCode::KeyF, true);
        assert_eq!(keypad.bits(), 0b10000000_10000000);
        assert!(keypad.is_pressed(KeyCode::KeyF));

        keypad.clear();
        assert!(!keypad.any_key());
    }

    #[test]
    fn test_first_key() {
        let mut keypad = Keypad::default();
        assert_eq!(keypad.first_key(), None);

        keypad.set(KeyCode::KeyC, true);
        keypad.set(KeyCode::Key5, true);
        assert_eq!(keypad.first_key(), Some(KeyCode::Key5));
    }

    #[test]
    fn test_keycode_conversion() {
        for id in 0..KEY_COUNT {
            let key = KeyCode::try_from(id).unwrap();
            assert_eq!(u8::from(key), id);
        }
        assert_eq!(KeyCode::try_from(16), Err(InvalidKeyCode(16)));
        assert_eq!(KeyCode::KeyA.to_string(), "ka");
    }
}
