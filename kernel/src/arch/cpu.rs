// kernel/src/arch/cpu.rs
// CPU instruction wrappers (i686). Keep each unsafe block to one instruction
// or one fixed sequence.

use core::arch::asm;

use x86_64::structures::gdt::SegmentSelector;

use super::DescriptorPointer;
use crate::mem::addr::PhysFrame;

const CR0_PAGING: u32 = 1 << 31;

/// # Safety
/// Writing to an arbitrary port can reconfigure hardware.
pub unsafe fn outb(port: u16, value: u8) {
    asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
}

/// # Safety
/// Reads can have side effects (e.g. acknowledging a device).
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    asm!("in al, dx", out("al") value, in("dx") port, options(nomem, nostack, preserves_flags));
    value
}

/// Roughly 1us delay for slow devices (write to the POST port).
pub fn io_wait() {
    unsafe { outb(0x80, 0) };
}

/// # Safety
/// `root` must be a page directory that maps the running code and stack.
pub unsafe fn load_cr3(root: PhysFrame) {
    asm!("mov cr3, {}", in(reg) root.start_address().0, options(nostack, preserves_flags));
}

/// # Safety
/// CR3 must already hold a directory that identity-maps the kernel.
pub unsafe fn enable_paging() {
    asm!(
        "mov {tmp}, cr0",
        "or {tmp}, {pg}",
        "mov cr0, {tmp}",
        tmp = out(reg) _,
        pg = const CR0_PAGING,
        options(nostack, preserves_flags),
    );
}

/// Faulting linear address of the last page fault.
pub fn read_cr2() -> u32 {
    let value: u32;
    unsafe { asm!("mov {}, cr2", out(reg) value, options(nomem, nostack, preserves_flags)) };
    value
}

pub fn enable_interrupts() {
    unsafe { asm!("sti", options(nomem, nostack)) };
}

pub fn disable_interrupts() {
    unsafe { asm!("cli", options(nomem, nostack)) };
}

/// sti; hlt; cli. `sti` takes effect after the next instruction, so no
/// interrupt can slip in between and leave `hlt` sleeping forever.
pub fn wait_for_interrupt() {
    unsafe { asm!("sti", "hlt", "cli", options(nomem, nostack)) };
}

/// Gives pending interrupts one instruction boundary to arrive.
pub fn interrupt_window() {
    unsafe { asm!("sti", "nop", "cli", options(nomem, nostack)) };
}

/// # Safety
/// The table behind `ptr` must stay alive and valid while loaded.
pub unsafe fn lidt(ptr: &DescriptorPointer) {
    asm!("lidt [{}]", in(reg) ptr, options(readonly, nostack, preserves_flags));
}

/// Loads the GDT, reloads CS with a far return and the data segments with
/// `data`.
///
/// # Safety
/// Both selectors must name flat ring 0 segments in the new table.
pub unsafe fn lgdt(ptr: &DescriptorPointer, code: SegmentSelector, data: SegmentSelector) {
    asm!(
        "lgdt [{ptr}]",
        "push {code}",
        "lea {tmp}, [2f]",
        "push {tmp}",
        "retf",
        "2:",
        "mov ds, {data:x}",
        "mov es, {data:x}",
        "mov fs, {data:x}",
        "mov gs, {data:x}",
        "mov ss, {data:x}",
        ptr = in(reg) ptr,
        code = in(reg) u32::from(code.0),
        data = in(reg) u32::from(data.0),
        tmp = out(reg) _,
    );
}

/// # Safety
/// `selector` must name an available TSS descriptor in the loaded GDT.
pub unsafe fn ltr(selector: SegmentSelector) {
    asm!("ltr {0:x}", in(reg) u32::from(selector.0), options(nomem, nostack, preserves_flags));
}

pub fn halt_loop() -> ! {
    loop {
        unsafe {
            asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }
}
