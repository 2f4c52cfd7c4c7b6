// kernel/src/arch/context.rs
//
// Role:
// - The two pieces of hand-written assembly the scheduler relies on, and
//   the `Platform` that wires them to the kernel core.
//
// protkern_switch_context(prev_sp: *mut usize, next_sp: usize)
// - Pushes ebp, ebx, esi, edi, stores esp in *prev_sp, loads next_sp, pops
//   the same four registers and returns on the new stack. The stack layout
//   is kernel::process::SwitchFrame.
//
// protkern_enter_user
// - Where a new process's first switch "returns" to. Loads the user data
//   segments and irets to USER_BASE with esp = USER_STACK_TOP and IF set.
//   Never returns.

use core::arch::global_asm;

use x86_64::registers::rflags::RFlags;

use super::cpu;
use super::gdt::{self, USER_CODE_SELECTOR, USER_DATA_SELECTOR};
use crate::kernel::Platform;
use crate::mem::addr::PhysFrame;
use crate::mem::layout::{USER_BASE, USER_STACK_TOP};

global_asm!(
    ".pushsection .text",
    ".global protkern_switch_context",
    "protkern_switch_context:",
    "    mov eax, [esp + 4]",
    "    mov edx, [esp + 8]",
    "    push ebp",
    "    push ebx",
    "    push esi",
    "    push edi",
    "    mov [eax], esp",
    "    mov esp, edx",
    "    pop edi",
    "    pop esi",
    "    pop ebx",
    "    pop ebp",
    "    ret",
    "",
    ".global protkern_enter_user",
    "protkern_enter_user:",
    "    mov ax, {user_data}",
    "    mov ds, ax",
    "    mov es, ax",
    "    mov fs, ax",
    "    mov gs, ax",
    "    push {user_data}",
    "    push {user_stack}",
    "    pushfd",
    "    or dword ptr [esp], {interrupt_flag}",
    "    push {user_code}",
    "    push {user_entry}",
    "    iretd",
    ".popsection",
    user_data = const USER_DATA_SELECTOR.0,
    user_code = const USER_CODE_SELECTOR.0,
    user_stack = const USER_STACK_TOP.0,
    user_entry = const USER_BASE.0,
    interrupt_flag = const RFlags::INTERRUPT_FLAG.bits(),
);

extern "C" {
    fn protkern_switch_context(prev_sp: *mut usize, next_sp: usize);
    fn protkern_enter_user() -> !;
}

/// The hardware `Platform`: CR3, TSS.esp0 and the assembly above.
pub struct X86Platform;

impl Platform for X86Platform {
    fn user_entry(&self) -> usize {
        protkern_enter_user as usize
    }

    fn activate(&mut self, root: PhysFrame, kernel_stack_top: usize) {
        gdt::set_kernel_stack(kernel_stack_top);
        // Safety: every process directory identity-maps the kernel window,
        // which holds this code and every kernel stack.
        unsafe { cpu::load_cr3(root) };
    }

    unsafe fn switch_to(_this: *mut Self, save_sp: *mut usize, next_sp: usize) {
        protkern_switch_context(save_sp, next_sp);
    }

    fn wait_for_interrupt(&mut self) {
        cpu::wait_for_interrupt();
    }

    fn interrupt_window(&mut self) {
        cpu::interrupt_window();
    }
}
