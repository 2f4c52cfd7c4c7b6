// kernel/src/arch/mod.rs
//
// 32-bit x86 specifics. unsafe stays in here as far as possible.
// - gdt / idt / pic: table and controller encodings (host-testable) plus
//   their loaders (bare metal only)
// - cpu: port I/O, control registers, descriptor loads, hlt
// - context: context switch and ring 3 entry, the `Platform` for hardware
// - trap_entry: per-vector stubs and the Rust trap handler

pub mod gdt;
pub mod idt;
pub mod pic;

#[cfg(target_os = "none")]
pub mod context;
#[cfg(target_os = "none")]
pub mod cpu;
#[cfg(target_os = "none")]
mod trap_entry;

/// Operand of lgdt/lidt.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct DescriptorPointer {
    pub limit: u16,
    pub base: u32,
}

/// Stops the CPU for good (interrupts still serviced if enabled).
#[cfg(target_os = "none")]
pub fn halt_loop() -> ! {
    cpu::halt_loop()
}
