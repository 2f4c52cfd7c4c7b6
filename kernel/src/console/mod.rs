// kernel/src/console/mod.rs
//
// Character console as the kernel core sees it: one byte out, one byte in
// (non-blocking). Blocking reads are built on top by the syscall layer.

pub mod keyboard;
pub mod ring;

#[cfg(target_os = "none")]
mod hardware;

#[cfg(target_os = "none")]
pub use hardware::HardwareConsole;

use core::fmt;

pub trait Console {
    fn put(&mut self, byte: u8);

    /// Next input byte, if one is ready.
    fn try_get(&mut self) -> Option<u8>;
}

/// `core::fmt::Write` over a console.
pub struct ConsoleWriter<'a, C: Console + ?Sized>(&'a mut C);

impl<'a, C: Console + ?Sized> ConsoleWriter<'a, C> {
    pub fn new(console: &'a mut C) -> Self {
        ConsoleWriter(console)
    }
}

impl<C: Console + ?Sized> fmt::Write for ConsoleWriter<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            self.0.put(b);
        }
        Ok(())
    }
}
