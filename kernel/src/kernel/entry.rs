// kernel/src/kernel/entry.rs
//
// protkern: boot glue
//
// Role:
// - Bring up the CPU tables and interrupt controller, build the kernel in
//   static storage, turn paging on and hand the CPU to the first process.
//
// Does not:
// - Schedule or handle syscalls itself (Kernel does that).

use core::mem::MaybeUninit;
use core::ptr::addr_of_mut;

use super::{state_ref, user_program, Kernel};
use crate::arch::context::X86Platform;
use crate::arch::{self, cpu, gdt, idt, pic};
use crate::console::HardwareConsole;
use crate::fs::RamFs;
use crate::logging;
use crate::mem::layout::{self, KernelLayout};
use crate::mm::{IdentityMapped, PhysicalMemoryManager};

pub type BootKernel = Kernel<IdentityMapped, X86Platform, HardwareConsole, RamFs>;

/// Value a Multiboot loader leaves in eax.
pub const MULTIBOOT_BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;

// Too big for the boot stack to be comfortable; lives in .bss instead.
static mut KERNEL: MaybeUninit<BootKernel> = MaybeUninit::uninit();

pub fn kernel_main(magic: u32) -> ! {
    logging::init();
    logging::info("protkern: kernel_main");

    if magic != MULTIBOOT_BOOTLOADER_MAGIC {
        logging::error("not started by a Multiboot loader; continuing");
        logging::info_hex("magic", magic);
    }

    gdt::init();
    idt::init();
    pic::init();

    let ram = layout::free_ram();
    logging::info_hex("free ram start", ram.start.0);
    logging::info_hex("free ram end", ram.end.0);

    let pmm = PhysicalMemoryManager::new(IdentityMapped, ram.start, ram.end);
    let kernel = Kernel::new(
        pmm,
        KernelLayout::from_linker(),
        X86Platform,
        HardwareConsole::new(),
        RamFs::with_embedded(),
    );
    // Safety: written exactly once, before anything can reference it. From
    // here on the kernel is only reached through this pointer, borrowed one
    // call at a time.
    let kernel: *mut BootKernel = unsafe { (*addr_of_mut!(KERNEL)).write(kernel) };

    // Safety: the idle directory identity-maps the kernel window, which
    // holds this code, the boot stack and every page table.
    unsafe {
        cpu::load_cr3((*kernel).current_root());
        cpu::enable_paging();
    }
    logging::info("paging enabled");

    state_ref::register_kernel(kernel);

    unsafe {
        (*kernel).spawn(user_program::HELLO);
        (*kernel).spawn(user_program::ECHO);

        BootKernel::reschedule(kernel);
    }

    logging::info("idle: no runnable processes left");
    logging::info_u32("free pages", unsafe { (*kernel).pmm().free_pages() } as u32);
    cpu::enable_interrupts();
    arch::halt_loop()
}
