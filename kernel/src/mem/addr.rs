// kernel/src/mem/addr.rs
//
// Role:
// - Typed physical/virtual addresses, frames and pages for 32-bit paging.
// - Directory/table indices derived from a virtual address.
// Does:
// - Give raw u32 values a meaning ("this is a physical frame", "this is a PDE index").
// Does not:
// - Touch CR3 or page tables (mem::address_space / arch do that).

use core::fmt;

/// Physical address (bytes).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysAddr(pub u32);

/// Virtual address (bytes).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtAddr(pub u32);

/// Page size: 4KiB, the only size this kernel maps.
pub const PAGE_SIZE: u32 = 4096;

/// Entries per page directory and per page table.
pub const ENTRY_COUNT: usize = 1024;

/// Physical frame (4KiB granularity).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysFrame {
    pub number: u32, // frame index = phys_addr / PAGE_SIZE
}

/// Virtual page (4KiB granularity).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtPage {
    pub number: u32, // page index = virt_addr / PAGE_SIZE
}

/// Index into the page directory: bits 31..22 of a virtual address.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PageDirectoryIndex(u16);

/// Index into a page table: bits 21..12 of a virtual address.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PageTableIndex(u16);

impl PageDirectoryIndex {
    pub const fn of(addr: VirtAddr) -> Self {
        PageDirectoryIndex((addr.0 >> 22) as u16)
    }

    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl PageTableIndex {
    pub const fn of(addr: VirtAddr) -> Self {
        PageTableIndex(((addr.0 >> 12) & 0x3ff) as u16)
    }

    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl PhysAddr {
    pub const fn is_page_aligned(self) -> bool {
        self.0 % PAGE_SIZE == 0
    }

    pub const fn align_down(self) -> PhysAddr {
        PhysAddr(self.0 & !(PAGE_SIZE - 1))
    }

    /// Rounds up to the next page boundary; `None` past 4GiB.
    pub fn align_up(self) -> Option<PhysAddr> {
        self.0
            .checked_add(PAGE_SIZE - 1)
            .map(|v| PhysAddr(v & !(PAGE_SIZE - 1)))
    }

    pub const fn frame(self) -> PhysFrame {
        PhysFrame {
            number: self.0 / PAGE_SIZE,
        }
    }

    pub const fn page_offset(self) -> usize {
        (self.0 % PAGE_SIZE) as usize
    }
}

impl VirtAddr {
    pub const fn is_page_aligned(self) -> bool {
        self.0 % PAGE_SIZE == 0
    }

    pub const fn align_down(self) -> VirtAddr {
        VirtAddr(self.0 & !(PAGE_SIZE - 1))
    }

    pub const fn page(self) -> VirtPage {
        VirtPage {
            number: self.0 / PAGE_SIZE,
        }
    }

    pub const fn page_offset(self) -> usize {
        (self.0 % PAGE_SIZE) as usize
    }

    pub const fn directory_index(self) -> PageDirectoryIndex {
        PageDirectoryIndex::of(self)
    }

    pub const fn table_index(self) -> PageTableIndex {
        PageTableIndex::of(self)
    }

    pub fn checked_add(self, bytes: u32) -> Option<VirtAddr> {
        self.0.checked_add(bytes).map(VirtAddr)
    }
}

impl PhysFrame {
    pub const fn start_address(self) -> PhysAddr {
        PhysAddr(self.number * PAGE_SIZE)
    }

    pub const fn from_index(number: u32) -> Self {
        PhysFrame { number }
    }
}

impl VirtPage {
    pub const fn start_address(self) -> VirtAddr {
        VirtAddr(self.number * PAGE_SIZE)
    }

    pub const fn from_index(number: u32) -> Self {
        VirtPage { number }
    }
}

// --- Debug (hex, for logs and assertion output) ---

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#x})", self.0)
    }
}

impl fmt::Debug for PhysFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysFrame({:#x})", self.start_address().0)
    }
}

impl fmt::Debug for VirtPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtPage({:#x})", self.start_address().0)
    }
}
