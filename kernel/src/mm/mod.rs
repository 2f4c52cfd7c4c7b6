// kernel/src/mm/mod.rs
//
// Physical memory management.
// - A bump allocator over one contiguous RAM region: hands out zeroed,
//   page-aligned frames and never frees them.
// - Every access to physical memory goes through `PhysMemory`, so the same
//   code runs against identity-mapped RAM on hardware and a Vec in tests.
// - Running out of memory is fatal; nothing above this layer can recover.

use crate::mem::addr::{PhysAddr, PhysFrame, PAGE_SIZE};
use crate::mem::paging::PageTable;

/// The contents of one physical frame.
#[repr(C, align(4096))]
pub struct Page(pub [u8; PAGE_SIZE as usize]);

impl Page {
    pub const fn zeroed() -> Self {
        Page([0; PAGE_SIZE as usize])
    }
}

/// Kernel-visible view of physical frames.
pub trait PhysMemory {
    fn frame(&self, frame: PhysFrame) -> &Page;

    fn frame_mut(&mut self, frame: PhysFrame) -> &mut Page;

    fn table(&self, frame: PhysFrame) -> &PageTable {
        // Safety: same size and alignment, every bit pattern is a valid entry.
        unsafe { &*(self.frame(frame) as *const Page).cast::<PageTable>() }
    }

    fn table_mut(&mut self, frame: PhysFrame) -> &mut PageTable {
        // Safety: see `table`.
        unsafe { &mut *(self.frame_mut(frame) as *mut Page).cast::<PageTable>() }
    }
}

/// Physical memory as seen from the kernel on hardware: the kernel window is
/// identity-mapped in every address space, so a frame's address is a pointer.
#[cfg(target_os = "none")]
pub struct IdentityMapped;

#[cfg(target_os = "none")]
impl PhysMemory for IdentityMapped {
    fn frame(&self, frame: PhysFrame) -> &Page {
        unsafe { &*(frame.start_address().0 as usize as *const Page) }
    }

    fn frame_mut(&mut self, frame: PhysFrame) -> &mut Page {
        unsafe { &mut *(frame.start_address().0 as usize as *mut Page) }
    }
}

/// Bump allocator plus the physical memory view it hands frames out of.
///
/// State is just `next` (high-water mark) and `end`; `next` only grows.
pub struct PhysicalMemoryManager<M: PhysMemory> {
    mem: M,
    next: PhysAddr,
    end: PhysAddr,
}

impl<M: PhysMemory> PhysicalMemoryManager<M> {
    /// Manages `[start, end)`. `start` is rounded up and `end` down to a page.
    pub fn new(mem: M, start: PhysAddr, end: PhysAddr) -> Self {
        let next = start.align_up().unwrap_or(end.align_down());
        let end = end.align_down();
        PhysicalMemoryManager {
            mem,
            next: if next > end { end } else { next },
            end,
        }
    }

    /// Returns `count` contiguous zero-filled pages.
    pub fn allocate_pages(&mut self, count: usize) -> PhysAddr {
        let new_next = u32::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(PAGE_SIZE))
            .and_then(|bytes| self.next.0.checked_add(bytes))
            .filter(|&n| n <= self.end.0);

        let Some(new_next) = new_next else {
            panic!(
                "out of memory: requested {} pages, {} left (next={:#x} end={:#x})",
                count,
                self.free_pages(),
                self.next.0,
                self.end.0
            );
        };

        let base = self.next;
        self.next = PhysAddr(new_next);

        let first = base.frame().number;
        for n in first..first + count as u32 {
            self.mem.frame_mut(PhysFrame::from_index(n)).0.fill(0);
        }
        base
    }

    pub fn allocate_frame(&mut self) -> PhysFrame {
        self.allocate_pages(1).frame()
    }

    pub fn free_pages(&self) -> usize {
        ((self.end.0 - self.next.0) / PAGE_SIZE) as usize
    }

    pub fn high_water_mark(&self) -> PhysAddr {
        self.next
    }

    pub fn frame(&self, frame: PhysFrame) -> &Page {
        self.mem.frame(frame)
    }

    pub fn frame_mut(&mut self, frame: PhysFrame) -> &mut Page {
        self.mem.frame_mut(frame)
    }

    pub fn table(&self, frame: PhysFrame) -> &PageTable {
        self.mem.table(frame)
    }

    pub fn table_mut(&mut self, frame: PhysFrame) -> &mut PageTable {
        self.mem.table_mut(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRam;

    const BASE: u32 = 0x0010_0000;

    fn pmm(pages: usize) -> PhysicalMemoryManager<TestRam> {
        let ram = TestRam::new(PhysAddr(BASE), pages);
        let end = ram.end();
        PhysicalMemoryManager::new(ram, PhysAddr(BASE), end)
    }

    #[test]
    fn successive_allocations_do_not_overlap() {
        let mut pmm = pmm(16);
        for n in 1..4usize {
            let a = pmm.allocate_pages(n);
            let b = pmm.allocate_pages(n);
            assert!(a.is_page_aligned() && b.is_page_aligned());
            assert!(a.0 + n as u32 * PAGE_SIZE <= b.0, "{:?} overlaps {:?}", a, b);
        }
        assert_eq!(pmm.free_pages(), 16 - 2 * (1 + 2 + 3));
    }

    #[test]
    fn pages_come_back_zeroed() {
        let mut ram = TestRam::new(PhysAddr(BASE), 2);
        ram.frame_mut(PhysAddr(BASE).frame()).0.fill(0xAA);
        ram.frame_mut(PhysAddr(BASE + PAGE_SIZE).frame()).0.fill(0xAA);
        let end = ram.end();
        let mut pmm = PhysicalMemoryManager::new(ram, PhysAddr(BASE), end);

        let p = pmm.allocate_pages(2);
        assert!(pmm.frame(p.frame()).0.iter().all(|&b| b == 0));
        assert!(pmm.frame(PhysAddr(p.0 + PAGE_SIZE).frame()).0.iter().all(|&b| b == 0));
    }

    #[test]
    fn region_is_rounded_to_pages() {
        let ram = TestRam::new(PhysAddr(BASE), 4);
        let pmm = PhysicalMemoryManager::new(ram, PhysAddr(BASE + 1), PhysAddr(BASE + 3 * PAGE_SIZE + 7));
        assert_eq!(pmm.high_water_mark(), PhysAddr(BASE + PAGE_SIZE));
        assert_eq!(pmm.free_pages(), 2);
    }

    #[test]
    fn zero_page_request_does_not_advance() {
        let mut pmm = pmm(2);
        let before = pmm.high_water_mark();
        assert_eq!(pmm.allocate_pages(0), before);
        assert_eq!(pmm.high_water_mark(), before);
    }

    #[test]
    fn last_page_can_be_allocated() {
        let mut pmm = pmm(3);
        pmm.allocate_pages(2);
        pmm.allocate_frame();
        assert_eq!(pmm.free_pages(), 0);
    }

    #[test]
    #[should_panic(expected = "out of memory")]
    fn exhausting_ram_is_fatal() {
        let mut pmm = pmm(3);
        pmm.allocate_pages(2);
        pmm.allocate_pages(2);
    }

    #[test]
    #[should_panic(expected = "out of memory")]
    fn huge_request_does_not_wrap() {
        let mut pmm = pmm(3);
        pmm.allocate_pages(usize::MAX / 2);
    }
}
