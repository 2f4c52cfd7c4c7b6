// kernel/src/mem/address_space.rs
//
// Role:
// - Build and inspect per-process two-level page tables.
// - Move bytes across the user/kernel boundary by walking those tables.
//
// Does:
// - map(): one 4KiB mapping, allocating the second-level table on demand.
// - for_process(): kernel window + device windows (identity, supervisor),
//   program image at USER_BASE, user stack below USER_STACK_TOP.
//
// Does not:
// - Unmap or free anything (the allocator never reclaims).
// - Load CR3 (arch does that on a switch).

use crate::mem::addr::{PhysAddr, PhysFrame, VirtAddr, PAGE_SIZE};
use crate::mem::layout::{KernelLayout, Region, USER_BASE, USER_IMAGE_MAX, USER_STACK_BOTTOM, USER_STACK_PAGES};
use crate::mem::paging::{PageFlags, PageTableEntry};
use crate::mm::{PhysMemory, PhysicalMemoryManager};

/// Flags for a freshly installed directory entry. Leaves decide the real access.
const TABLE_FLAGS: PageFlags = PageFlags::WRITABLE.union(PageFlags::USER);

/// One process's page directory. The directory, its tables and the user
/// frames belong to the owning process; the kernel window frames are shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressSpace {
    root: PhysFrame,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserAccessError {
    /// Unmapped, supervisor-only, or read-only where a write was needed.
    BadAddress,
    /// No NUL within the allowed length.
    Unterminated,
}

impl AddressSpace {
    /// Allocates an empty page directory.
    pub fn new<M: PhysMemory>(pmm: &mut PhysicalMemoryManager<M>) -> Self {
        AddressSpace {
            root: pmm.allocate_frame(),
        }
    }

    pub fn root(&self) -> PhysFrame {
        self.root
    }

    /// Maps the page at `vaddr` to the frame at `paddr`. The leaf gets exactly
    /// `flags | PRESENT`; an existing leaf is overwritten.
    pub fn map<M: PhysMemory>(
        &self,
        pmm: &mut PhysicalMemoryManager<M>,
        vaddr: VirtAddr,
        paddr: PhysAddr,
        flags: PageFlags,
    ) {
        if !vaddr.is_page_aligned() {
            panic!("map: unaligned virtual address {:?}", vaddr);
        }
        if !paddr.is_page_aligned() {
            panic!("map: unaligned physical address {:?}", paddr);
        }

        let pde = pmm.table(self.root)[vaddr.directory_index()];
        let table = if pde.is_present() {
            pde.frame()
        } else {
            let table = pmm.allocate_frame();
            pmm.table_mut(self.root)[vaddr.directory_index()] = PageTableEntry::new(table, TABLE_FLAGS);
            table
        };

        pmm.table_mut(table)[vaddr.table_index()] = PageTableEntry::new(paddr.frame(), flags);
    }

    /// Identity-maps every page touching `region`.
    pub fn identity_map<M: PhysMemory>(
        &self,
        pmm: &mut PhysicalMemoryManager<M>,
        region: Region,
        flags: PageFlags,
    ) {
        let start = region.start.align_down().0;
        let end = region.end.align_up().map_or(u32::MAX, |a| a.0);

        let mut addr = start;
        while addr < end {
            self.map(pmm, VirtAddr(addr), PhysAddr(addr), flags);
            match addr.checked_add(PAGE_SIZE) {
                Some(next) => addr = next,
                None => break,
            }
        }
    }

    /// Resolves `vaddr` to its physical address and the leaf's flags.
    pub fn translate<M: PhysMemory>(
        &self,
        pmm: &PhysicalMemoryManager<M>,
        vaddr: VirtAddr,
    ) -> Option<(PhysAddr, PageFlags)> {
        let pde = pmm.table(self.root)[vaddr.directory_index()];
        if !pde.is_present() {
            return None;
        }

        let pte = pmm.table(pde.frame())[vaddr.table_index()];
        if !pte.is_present() {
            return None;
        }

        let base = pte.frame().start_address();
        Some((PhysAddr(base.0 + vaddr.page_offset() as u32), pte.flags()))
    }

    /// Just the shared windows: the kernel image and the device regions,
    /// identity-mapped and supervisor-only.
    pub fn for_kernel<M: PhysMemory>(pmm: &mut PhysicalMemoryManager<M>, layout: &KernelLayout) -> Self {
        let space = AddressSpace::new(pmm);

        space.identity_map(pmm, layout.kernel, PageFlags::WRITABLE);
        for window in layout.devices {
            space.identity_map(pmm, *window, PageFlags::WRITABLE);
        }
        space
    }

    /// Builds a complete process address space and loads `image` at USER_BASE.
    pub fn for_process<M: PhysMemory>(
        pmm: &mut PhysicalMemoryManager<M>,
        layout: &KernelLayout,
        image: &[u8],
    ) -> Self {
        if image.len() > USER_IMAGE_MAX {
            panic!("program image too large: {} bytes (max {})", image.len(), USER_IMAGE_MAX);
        }

        let space = AddressSpace::for_kernel(pmm, layout);

        let user = PageFlags::USER | PageFlags::WRITABLE;

        // Frames arrive zeroed, so the tail of the last page is padding.
        for (i, chunk) in image.chunks(PAGE_SIZE as usize).enumerate() {
            let frame = pmm.allocate_frame();
            pmm.frame_mut(frame).0[..chunk.len()].copy_from_slice(chunk);
            let vaddr = VirtAddr(USER_BASE.0 + i as u32 * PAGE_SIZE);
            space.map(pmm, vaddr, frame.start_address(), user);
        }

        for i in 0..USER_STACK_PAGES {
            let frame = pmm.allocate_frame();
            let vaddr = VirtAddr(USER_STACK_BOTTOM.0 + i as u32 * PAGE_SIZE);
            space.map(pmm, vaddr, frame.start_address(), user);
        }

        space
    }

    fn user_frame<M: PhysMemory>(
        &self,
        pmm: &PhysicalMemoryManager<M>,
        vaddr: VirtAddr,
        write: bool,
    ) -> Result<PhysFrame, UserAccessError> {
        let (paddr, flags) = self.translate(pmm, vaddr).ok_or(UserAccessError::BadAddress)?;

        let needed = if write {
            PageFlags::USER | PageFlags::WRITABLE
        } else {
            PageFlags::USER
        };
        if !flags.contains(needed) {
            return Err(UserAccessError::BadAddress);
        }
        Ok(paddr.frame())
    }

    /// Fills `dst` from user memory starting at `src`.
    pub fn copy_from_user<M: PhysMemory>(
        &self,
        pmm: &PhysicalMemoryManager<M>,
        src: VirtAddr,
        dst: &mut [u8],
    ) -> Result<(), UserAccessError> {
        let mut done = 0;
        while done < dst.len() {
            let va = src.checked_add(done as u32).ok_or(UserAccessError::BadAddress)?;
            let offset = va.page_offset();
            let n = (PAGE_SIZE as usize - offset).min(dst.len() - done);

            let frame = self.user_frame(pmm, va, false)?;
            dst[done..done + n].copy_from_slice(&pmm.frame(frame).0[offset..offset + n]);
            done += n;
        }
        Ok(())
    }

    /// Writes `src` into user memory starting at `dst`. Pages must be writable.
    pub fn copy_to_user<M: PhysMemory>(
        &self,
        pmm: &mut PhysicalMemoryManager<M>,
        dst: VirtAddr,
        src: &[u8],
    ) -> Result<(), UserAccessError> {
        let mut done = 0;
        while done < src.len() {
            let va = dst.checked_add(done as u32).ok_or(UserAccessError::BadAddress)?;
            let offset = va.page_offset();
            let n = (PAGE_SIZE as usize - offset).min(src.len() - done);

            let frame = self.user_frame(pmm, va, true)?;
            pmm.frame_mut(frame).0[offset..offset + n].copy_from_slice(&src[done..done + n]);
            done += n;
        }
        Ok(())
    }

    /// Reads a NUL-terminated string into `buf`, returning its length without
    /// the NUL. The NUL must fall within `buf.len()` bytes.
    pub fn read_user_str<M: PhysMemory>(
        &self,
        pmm: &PhysicalMemoryManager<M>,
        src: VirtAddr,
        buf: &mut [u8],
    ) -> Result<usize, UserAccessError> {
        for i in 0..buf.len() {
            let va = src.checked_add(i as u32).ok_or(UserAccessError::BadAddress)?;
            let frame = self.user_frame(pmm, va, false)?;
            let byte = pmm.frame(frame).0[va.page_offset()];
            if byte == 0 {
                return Ok(i);
            }
            buf[i] = byte;
        }
        Err(UserAccessError::Unterminated)
    }
}
