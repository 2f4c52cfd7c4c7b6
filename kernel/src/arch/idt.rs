// kernel/src/arch/idt.rs
//
// Role:
// - 256-entry interrupt descriptor table of 32-bit interrupt gates.
//
// Gates installed:
// - 0..32   CPU exceptions, kernel-only, routed to the fatal path
// - 0x21    keyboard (IRQ1), kernel-only
// - 0x80    syscall, callable from ring 3
// Everything else stays not-present; raising it is a #GP, which is fatal.
//
// Interrupt gates clear IF on entry, so handlers (and the syscalls they
// run) execute with interrupts off.

use core::mem::size_of;

use x86_64::PrivilegeLevel;

use super::gdt::KERNEL_CODE_SELECTOR;
use super::DescriptorPointer;
use crate::kernel::trap::{EXCEPTION_VECTORS, KEYBOARD_VECTOR, SYSCALL_VECTOR};

pub const IDT_ENTRIES: usize = 256;

const GATE_PRESENT: u8 = 0x80;
const GATE_INTERRUPT_32: u8 = 0x0E;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl GateDescriptor {
    pub const fn missing() -> Self {
        GateDescriptor {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    /// Interrupt gate into kernel code at `handler`, reachable from `dpl`.
    pub const fn interrupt_gate(handler: u32, dpl: PrivilegeLevel) -> Self {
        GateDescriptor {
            offset_low: handler as u16,
            selector: KERNEL_CODE_SELECTOR.0,
            zero: 0,
            type_attr: GATE_PRESENT | ((dpl as u8) << 5) | GATE_INTERRUPT_32,
            offset_high: (handler >> 16) as u16,
        }
    }

    pub fn handler(&self) -> u32 {
        u32::from(self.offset_high) << 16 | u32::from(self.offset_low)
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn type_attr(&self) -> u8 {
        self.type_attr
    }

    pub fn is_present(&self) -> bool {
        self.type_attr & GATE_PRESENT != 0
    }
}

#[repr(C, align(8))]
pub struct InterruptDescriptorTable {
    entries: [GateDescriptor; IDT_ENTRIES],
}

impl InterruptDescriptorTable {
    pub const fn new() -> Self {
        InterruptDescriptorTable {
            entries: [GateDescriptor::missing(); IDT_ENTRIES],
        }
    }

    /// Table with every gate this kernel uses, given the entry stub addresses.
    pub fn with_handlers(exceptions: &[u32; EXCEPTION_VECTORS as usize], keyboard: u32, syscall: u32) -> Self {
        let mut idt = Self::new();
        for (vector, &stub) in exceptions.iter().enumerate() {
            idt.set(vector as u8, GateDescriptor::interrupt_gate(stub, PrivilegeLevel::Ring0));
        }
        idt.set(KEYBOARD_VECTOR as u8, GateDescriptor::interrupt_gate(keyboard, PrivilegeLevel::Ring0));
        idt.set(SYSCALL_VECTOR as u8, GateDescriptor::interrupt_gate(syscall, PrivilegeLevel::Ring3));
        idt
    }

    pub fn set(&mut self, vector: u8, gate: GateDescriptor) {
        self.entries[vector as usize] = gate;
    }

    pub fn entry(&self, vector: u8) -> GateDescriptor {
        self.entries[vector as usize]
    }

    pub fn pointer(&self) -> DescriptorPointer {
        DescriptorPointer {
            limit: (size_of::<Self>() - 1) as u16,
            base: self as *const Self as usize as u32,
        }
    }
}

impl Default for InterruptDescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "none")]
mod hw {
    use spin::Once;

    use super::*;
    use crate::arch::cpu;
    use crate::logging;

    extern "C" {
        static protkern_exception_stubs: [u32; EXCEPTION_VECTORS as usize];
        fn protkern_isr_33();
        fn protkern_isr_128();
    }

    static IDT: Once<InterruptDescriptorTable> = Once::new();

    pub fn init() {
        let idt = IDT.call_once(|| {
            // Safety: the stub table is immutable data emitted by trap_entry.
            let exceptions = unsafe { &protkern_exception_stubs };
            InterruptDescriptorTable::with_handlers(
                exceptions,
                protkern_isr_33 as usize as u32,
                protkern_isr_128 as usize as u32,
            )
        });

        unsafe { cpu::lidt(&idt.pointer()) };
        logging::info("arch::idt::init: IDT loaded");
    }
}

#[cfg(target_os = "none")]
pub use hw::init;
