// kernel/src/console/hardware.rs
//
// Console on real hardware.
// - put(): COM1, mirrored to VGA with the `vga` feature.
// - try_get(): keyboard ring first, then the serial line.

use super::ring::KEYBOARD_BUFFER;
use super::Console;
use crate::logging::serial;
#[cfg(feature = "vga")]
use crate::logging::vga;

pub struct HardwareConsole {
    _private: (),
}

impl HardwareConsole {
    /// Needs `logging::init()` to have set up COM1 and VGA.
    pub fn new() -> Self {
        HardwareConsole { _private: () }
    }
}

impl Console for HardwareConsole {
    fn put(&mut self, byte: u8) {
        if byte == b'\n' {
            serial::write_byte(b'\r');
        }
        serial::write_byte(byte);

        #[cfg(feature = "vga")]
        vga::write_byte(byte);
    }

    fn try_get(&mut self) -> Option<u8> {
        KEYBOARD_BUFFER
            .pop()
            .or_else(|| serial::try_read_byte().map(|b| if b == b'\r' { b'\n' } else { b }))
    }
}
