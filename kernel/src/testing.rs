// kernel/src/testing.rs
//
// Host-side stand-ins for the hardware seams, shared by the unit tests.
// - TestRam: physical memory backed by a Vec of pages at a fake base address.
// - MockPlatform: records what a real switch would have done; switch_to
//   returns at once, which reads as "the chosen process is now running".
// - LoopbackConsole: output is captured and also fed back as input.

use std::collections::VecDeque;
use std::vec::Vec;

use crate::fs::RamFs;
use crate::kernel::{Kernel, Platform};
use crate::mem::addr::{PhysAddr, PhysFrame, PAGE_SIZE};
use crate::mem::layout::{KernelLayout, Region, DEVICE_WINDOWS};
use crate::mm::{Page, PhysMemory, PhysicalMemoryManager};
use crate::console::Console;

pub struct TestRam {
    base: PhysAddr,
    pages: Vec<Page>,
}

impl TestRam {
    pub fn new(base: PhysAddr, pages: usize) -> Self {
        assert!(base.is_page_aligned());
        TestRam {
            base,
            pages: (0..pages).map(|_| Page::zeroed()).collect(),
        }
    }

    pub fn end(&self) -> PhysAddr {
        PhysAddr(self.base.0 + self.pages.len() as u32 * PAGE_SIZE)
    }

    fn index(&self, frame: PhysFrame) -> usize {
        let addr = frame.start_address();
        assert!(
            self.base <= addr && addr < self.end(),
            "{:?} outside test RAM {:?}..{:?}",
            frame,
            self.base,
            self.end()
        );
        ((addr.0 - self.base.0) / PAGE_SIZE) as usize
    }
}

impl PhysMemory for TestRam {
    fn frame(&self, frame: PhysFrame) -> &Page {
        &self.pages[self.index(frame)]
    }

    fn frame_mut(&mut self, frame: PhysFrame) -> &mut Page {
        let i = self.index(frame);
        &mut self.pages[i]
    }
}

pub const TEST_RAM_BASE: PhysAddr = PhysAddr(0x0010_0000);
pub const TEST_RAM_PAGES: usize = 512;

pub fn test_pmm() -> PhysicalMemoryManager<TestRam> {
    let ram = TestRam::new(TEST_RAM_BASE, TEST_RAM_PAGES);
    let end = ram.end();
    PhysicalMemoryManager::new(ram, TEST_RAM_BASE, end)
}

/// Treats all of test RAM as the kernel window.
pub fn test_layout(pmm: &PhysicalMemoryManager<TestRam>) -> KernelLayout {
    let end = PhysAddr(pmm.high_water_mark().0 + pmm.free_pages() as u32 * PAGE_SIZE);
    KernelLayout {
        kernel: Region::new(TEST_RAM_BASE, end),
        devices: DEVICE_WINDOWS,
    }
}

pub const MOCK_USER_ENTRY: usize = 0x00c0_0000;

#[derive(Default)]
pub struct MockPlatform {
    /// (page directory, kernel stack top) per activation.
    pub activations: Vec<(PhysFrame, usize)>,
    /// Stack pointer switched to, per switch.
    pub switches: Vec<usize>,
    pub waits: usize,
    pub windows: usize,
}

impl Platform for MockPlatform {
    fn user_entry(&self) -> usize {
        MOCK_USER_ENTRY
    }

    fn activate(&mut self, root: PhysFrame, kernel_stack_top: usize) {
        self.activations.push((root, kernel_stack_top));
    }

    unsafe fn switch_to(this: *mut Self, _save_sp: *mut usize, next_sp: usize) {
        (*this).switches.push(next_sp);
    }

    fn wait_for_interrupt(&mut self) {
        self.waits += 1;
    }

    fn interrupt_window(&mut self) {
        self.windows += 1;
    }
}

#[derive(Default)]
pub struct LoopbackConsole {
    pub output: Vec<u8>,
    pub input: VecDeque<u8>,
}

impl Console for LoopbackConsole {
    fn put(&mut self, byte: u8) {
        self.output.push(byte);
        self.input.push_back(byte);
    }

    fn try_get(&mut self) -> Option<u8> {
        self.input.pop_front()
    }
}

pub type TestKernel = Kernel<TestRam, MockPlatform, LoopbackConsole, RamFs>;

/// Boxed: the kernel carries a process table with eight kernel stacks.
pub fn test_kernel() -> std::boxed::Box<TestKernel> {
    let pmm = test_pmm();
    let layout = test_layout(&pmm);
    std::boxed::Box::new(Kernel::new(
        pmm,
        layout,
        MockPlatform::default(),
        LoopbackConsole::default(),
        RamFs::new(),
    ))
}
