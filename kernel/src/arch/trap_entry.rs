// kernel/src/arch/trap_entry.rs
//
// Trap entry for every installed vector.
// - One stub per vector pushes (error code or 0, vector) so all traps share
//   one frame layout, then jumps to protkern_isr_common.
// - protkern_isr_common: pushad, call protkern_trap_handler(&mut TrapFrame),
//   popad, drop vector/error, iretd. eax written by a syscall is what popad
//   hands back to user code.
// - protkern_exception_stubs: stub addresses for vectors 0..32, read by idt.

use core::arch::global_asm;

use crate::arch::{cpu, pic};
use crate::console::keyboard;
use crate::kernel::entry::BootKernel;
use crate::kernel::state_ref;
use crate::kernel::trap::{self, Trap, TrapFrame, PAGE_FAULT_VECTOR};
use crate::logging;

global_asm!(
    ".pushsection .text",
    "protkern_isr_common:",
    "    pushad",
    "    cld",
    "    push esp",
    "    call {handler}",
    "    add esp, 4",
    "    popad",
    "    add esp, 8",
    "    iretd",
    "",
    ".macro protkern_isr_noerr n",
    ".global protkern_isr_\\n",
    "protkern_isr_\\n:",
    "    push 0",
    "    push \\n",
    "    jmp protkern_isr_common",
    ".endm",
    "",
    ".macro protkern_isr_err n",
    ".global protkern_isr_\\n",
    "protkern_isr_\\n:",
    "    push \\n",
    "    jmp protkern_isr_common",
    ".endm",
    "",
    // vectors where the CPU pushes an error code itself
    ".irp n, 8,10,11,12,13,14,17,21,29,30",
    "    protkern_isr_err \\n",
    ".endr",
    ".irp n, 0,1,2,3,4,5,6,7,9,15,16,18,19,20,22,23,24,25,26,27,28,31,33,128",
    "    protkern_isr_noerr \\n",
    ".endr",
    ".popsection",
    "",
    ".pushsection .rodata",
    ".balign 4",
    ".global protkern_exception_stubs",
    "protkern_exception_stubs:",
    ".irp n, 0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31",
    "    .long protkern_isr_\\n",
    ".endr",
    ".popsection",
    handler = sym protkern_trap_handler,
);

extern "C" fn protkern_trap_handler(frame: &mut TrapFrame) {
    match Trap::classify(frame.vector) {
        Trap::Keyboard => {
            // Safety: reading the PS/2 data port acknowledges the byte.
            let scancode = unsafe { cpu::inb(keyboard::DATA_PORT) };
            keyboard::on_scancode(scancode);
            pic::end_of_interrupt(pic::KEYBOARD_IRQ);
        }
        Trap::Syscall => {
            let Some(kernel) = state_ref::kernel() else {
                panic!("syscall before the kernel was registered (eip={:#010x})", frame.eip);
            };
            // Safety: the kernel sits in static storage and this path keeps
            // no reference to it across a switch.
            unsafe { BootKernel::handle_syscall(kernel, frame) };
        }
        Trap::Unexpected => {
            if frame.vector == PAGE_FAULT_VECTOR {
                logging::info_hex("page fault address", cpu::read_cr2());
            }
            trap::unexpected(frame)
        }
    }
}
