// kernel/src/console/keyboard.rs
//
// PS/2 keyboard: scancode set 1 -> ASCII, queued into KEYBOARD_BUFFER.
// The IRQ path only touches the decoder (its own lock, never contended:
// the keyboard gate masks interrupts) and the lock-free ring.

use lazy_static::lazy_static;
use pc_keyboard::layouts::Us104Key;
use pc_keyboard::{DecodedKey, HandleControl, Keyboard, ScancodeSet1};
use spin::Mutex;

use super::ring::KEYBOARD_BUFFER;

/// PS/2 controller data port.
pub const DATA_PORT: u16 = 0x60;

pub struct ScancodeDecoder {
    inner: Keyboard<Us104Key, ScancodeSet1>,
}

impl ScancodeDecoder {
    pub fn new() -> Self {
        ScancodeDecoder {
            inner: Keyboard::new(ScancodeSet1::new(), Us104Key, HandleControl::Ignore),
        }
    }

    /// Feeds one scancode byte; returns the ASCII byte it completes, if any.
    /// Releases, modifiers and non-ASCII keys yield nothing.
    pub fn feed(&mut self, scancode: u8) -> Option<u8> {
        let event = self.inner.add_byte(scancode).ok().flatten()?;
        match self.inner.process_keyevent(event)? {
            DecodedKey::Unicode('\r') => Some(b'\n'),
            DecodedKey::Unicode(c) if c.is_ascii() => Some(c as u8),
            _ => None,
        }
    }
}

impl Default for ScancodeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref DECODER: Mutex<ScancodeDecoder> = Mutex::new(ScancodeDecoder::new());
}

/// Keyboard IRQ body. Full buffer: the key is lost.
pub fn on_scancode(scancode: u8) {
    if let Some(byte) = DECODER.lock().feed(scancode) {
        KEYBOARD_BUFFER.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(codes: &[u8]) -> std::vec::Vec<u8> {
        let mut d = ScancodeDecoder::new();
        codes.iter().filter_map(|&c| d.feed(c)).collect()
    }

    #[test]
    fn letters_and_releases() {
        // 'a' press, 'a' release, 'b' press
        assert_eq!(decode(&[0x1E, 0x9E, 0x30]), b"ab");
    }

    #[test]
    fn shift_selects_upper_case() {
        // LShift down, 'a', LShift up, 'a'
        assert_eq!(decode(&[0x2A, 0x1E, 0x9E, 0xAA, 0x1E]), b"Aa");
    }

    #[test]
    fn enter_becomes_newline_and_backspace_is_kept() {
        assert_eq!(decode(&[0x1C]), b"\n");
        assert_eq!(decode(&[0x0E]), b"\x08");
    }

    #[test]
    fn digits_and_space() {
        assert_eq!(decode(&[0x02, 0x0B, 0x39]), b"10 ");
    }
}
