// kernel/src/mem/layout.rs
//
// Address-space layout shared by every process.
//
//   0x0000_0000 ..  kernel window start : unmapped except device windows (VGA)
//   kernel window (linker: __kernel_base .. __free_ram_end)
//                                      : identity-mapped, supervisor-only;
//                                        kernel image, boot stack, free RAM
//   USER_BASE (16MiB) ..               : program image, USER|WRITABLE
//   .. USER_STACK_TOP (32MiB)          : user stack, USER|WRITABLE
//
// The kernel has no address space of its own: every process directory
// already contains the kernel window.

use crate::mem::addr::{PhysAddr, VirtAddr, PAGE_SIZE};

/// Where program images are loaded and entered.
pub const USER_BASE: VirtAddr = VirtAddr(0x0100_0000);

/// Initial user stack pointer.
pub const USER_STACK_TOP: VirtAddr = VirtAddr(0x0200_0000);

pub const USER_STACK_PAGES: usize = 4;

/// Lowest address of the user stack mapping.
pub const USER_STACK_BOTTOM: VirtAddr = VirtAddr(USER_STACK_TOP.0 - USER_STACK_PAGES as u32 * PAGE_SIZE);

/// Largest program image that fits between USER_BASE and the user stack.
pub const USER_IMAGE_MAX: usize = (USER_STACK_BOTTOM.0 - USER_BASE.0) as usize;

/// VGA text buffer (80x25x2 bytes, one page).
pub const VGA_TEXT_WINDOW: Region = Region::new(PhysAddr(0x000b_8000), PhysAddr(0x000b_9000));

/// Device register windows every address space identity-maps.
pub const DEVICE_WINDOWS: &[Region] = &[VGA_TEXT_WINDOW];

/// Half-open physical range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub start: PhysAddr,
    pub end: PhysAddr,
}

impl Region {
    pub const fn new(start: PhysAddr, end: PhysAddr) -> Self {
        Region { start, end }
    }

    pub const fn contains(&self, addr: PhysAddr) -> bool {
        self.start.0 <= addr.0 && addr.0 < self.end.0
    }
}

/// What the address-space builder identity-maps into every process.
#[derive(Clone, Copy, Debug)]
pub struct KernelLayout {
    /// Kernel image plus all allocatable RAM.
    pub kernel: Region,
    pub devices: &'static [Region],
}

#[cfg(target_os = "none")]
extern "C" {
    static __kernel_base: u8;
    static __free_ram: u8;
    static __free_ram_end: u8;
}

#[cfg(target_os = "none")]
impl KernelLayout {
    /// Layout from the linker script symbols.
    pub fn from_linker() -> Self {
        KernelLayout {
            kernel: Region::new(PhysAddr(linker_addr(unsafe { &__kernel_base })), free_ram().end),
            devices: DEVICE_WINDOWS,
        }
    }
}

/// Allocatable RAM: from the end of the kernel image to the end of the window.
#[cfg(target_os = "none")]
pub fn free_ram() -> Region {
    Region::new(
        PhysAddr(linker_addr(unsafe { &__free_ram })),
        PhysAddr(linker_addr(unsafe { &__free_ram_end })),
    )
}

#[cfg(target_os = "none")]
fn linker_addr(sym: &u8) -> u32 {
    sym as *const u8 as usize as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_window_is_sane() {
        assert!(USER_BASE.is_page_aligned());
        assert!(USER_STACK_BOTTOM.is_page_aligned());
        assert!(USER_BASE < USER_STACK_BOTTOM);
        assert_eq!(USER_IMAGE_MAX, 0x0100_0000 - USER_STACK_PAGES * PAGE_SIZE as usize);
    }

    #[test]
    fn device_windows_are_page_aligned() {
        for w in DEVICE_WINDOWS {
            assert!(w.start.is_page_aligned() && w.end.is_page_aligned());
            assert!(w.start < w.end);
        }
        assert!(VGA_TEXT_WINDOW.contains(PhysAddr(0xb8f9f)));
    }
}
