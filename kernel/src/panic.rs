// kernel/src/panic.rs
//
// Panic handler for the bare-metal build.
// - Fixed behaviour: emergency output (no locks) -> halt.
// - Does not go through logging or VGA: the panic may come from inside
//   either, with their locks held.
// - A second panic while reporting halts at once.
//
// Output goes to the QEMU debug port (0xE9) and straight to COM1.

use core::fmt::{self, Write};
use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::{self, cpu};

static PANIC_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

const DEBUGCON: u16 = 0xE9;
const COM1_DATA: u16 = 0x3F8;
const COM1_LINE_STATUS: u16 = 0x3FD;

fn emergency_write_byte(b: u8) {
    unsafe {
        cpu::outb(DEBUGCON, b);

        // bounded wait: a wedged UART must not hang the panic path
        for _ in 0..10_000 {
            if cpu::inb(COM1_LINE_STATUS) & 0x20 != 0 {
                break;
            }
        }
        cpu::outb(COM1_DATA, b);
    }
}

struct EmergencyWriter;

impl Write for EmergencyWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            if b == b'\n' {
                emergency_write_byte(b'\r');
            }
            emergency_write_byte(b);
        }
        Ok(())
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    cpu::disable_interrupts();

    if PANIC_IN_PROGRESS.swap(true, Ordering::AcqRel) {
        let _ = EmergencyWriter.write_str("[PANIC] re-entered => halt\n");
        arch::halt_loop();
    }

    let mut w = EmergencyWriter;
    let _ = write!(w, "[PANIC] {}", info.message());
    match info.location() {
        Some(loc) => {
            let _ = writeln!(w, " at {}:{}:{}", loc.file(), loc.line(), loc.column());
        }
        None => {
            let _ = writeln!(w, " at <unknown>");
        }
    }

    arch::halt_loop()
}
