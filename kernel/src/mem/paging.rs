// kernel/src/mem/paging.rs
//
// 32-bit two-level paging structures: flags, entries, 1024-entry tables.

use core::fmt;
use core::ops::{Index, IndexMut};

use crate::mem::addr::{PageDirectoryIndex, PageTableIndex, PhysAddr, PhysFrame, ENTRY_COUNT, PAGE_SIZE};

bitflags::bitflags! {
    /// Page attributes (low bits of a PDE/PTE).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        /// Entry is valid.
        const PRESENT = 1 << 0;
        /// Writes allowed.
        const WRITABLE = 1 << 1;
        /// Reachable from ring 3.
        const USER = 1 << 2;
    }
}

const ADDRESS_MASK: u32 = !(PAGE_SIZE - 1);

/// One directory or table entry: frame address in bits 31..12, flags below.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    pub const fn empty() -> Self {
        PageTableEntry(0)
    }

    /// Builds an entry pointing at `frame`. PRESENT is always added.
    pub fn new(frame: PhysFrame, flags: PageFlags) -> Self {
        PageTableEntry(frame.start_address().0 | (flags | PageFlags::PRESENT).bits())
    }

    pub fn is_present(self) -> bool {
        self.flags().contains(PageFlags::PRESENT)
    }

    pub fn flags(self) -> PageFlags {
        PageFlags::from_bits_truncate(self.0)
    }

    pub fn frame(self) -> PhysFrame {
        PhysAddr(self.0 & ADDRESS_MASK).frame()
    }
}

impl fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageTableEntry({:#010x})", self.0)
    }
}

/// A page directory or page table: exactly one frame.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageTableEntry; ENTRY_COUNT],
}

impl PageTable {
    pub fn present_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_present()).count()
    }
}

impl Index<PageDirectoryIndex> for PageTable {
    type Output = PageTableEntry;

    fn index(&self, index: PageDirectoryIndex) -> &PageTableEntry {
        &self.entries[index.get()]
    }
}

impl IndexMut<PageDirectoryIndex> for PageTable {
    fn index_mut(&mut self, index: PageDirectoryIndex) -> &mut PageTableEntry {
        &mut self.entries[index.get()]
    }
}

impl Index<PageTableIndex> for PageTable {
    type Output = PageTableEntry;

    fn index(&self, index: PageTableIndex) -> &PageTableEntry {
        &self.entries[index.get()]
    }
}

impl IndexMut<PageTableIndex> for PageTable {
    fn index_mut(&mut self, index: PageTableIndex) -> &mut PageTableEntry {
        &mut self.entries[index.get()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_always_sets_present() {
        let e = PageTableEntry::new(PhysFrame::from_index(0x123), PageFlags::USER);
        assert_eq!(e.0, 0x0012_3000 | 0b101);
        assert!(e.is_present());
        assert_eq!(e.flags(), PageFlags::PRESENT | PageFlags::USER);
        assert_eq!(e.frame(), PhysFrame::from_index(0x123));
    }

    #[test]
    fn empty_entry_is_not_present() {
        assert!(!PageTableEntry::empty().is_present());
        assert_eq!(PageTableEntry::default(), PageTableEntry::empty());
    }

    #[test]
    fn table_is_one_frame() {
        assert_eq!(core::mem::size_of::<PageTable>(), PAGE_SIZE as usize);
        assert_eq!(core::mem::align_of::<PageTable>(), PAGE_SIZE as usize);
    }
}
