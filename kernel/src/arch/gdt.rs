// kernel/src/arch/gdt.rs
//
// Role:
// - Flat 4GiB segments for ring 0 and ring 3, plus the one TSS.
//
// Does:
// - init(): build the GDT in static storage, load it, reload segment
//   registers and TR.
// - set_kernel_stack(): point TSS.esp0 at the running process's kernel
//   stack; the CPU switches to it on every ring 3 -> ring 0 trap.
//
// Does not:
// - Use the TSS for hardware task switching (only ss0/esp0 matter).
//
// Layout (index: selector):
//   0: null, 1: 0x08 kernel code, 2: 0x10 kernel data,
//   3: 0x1B user code, 4: 0x23 user data, 5: 0x28 TSS

use core::mem::size_of;

use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

use super::DescriptorPointer;

pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(1, PrivilegeLevel::Ring0);
pub const KERNEL_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(2, PrivilegeLevel::Ring0);
pub const USER_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(3, PrivilegeLevel::Ring3);
pub const USER_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(4, PrivilegeLevel::Ring3);
pub const TSS_SELECTOR: SegmentSelector = SegmentSelector::new(5, PrivilegeLevel::Ring0);

// access bytes: present | DPL | code/data | type
const KERNEL_CODE_ACCESS: u8 = 0x9A;
const KERNEL_DATA_ACCESS: u8 = 0x92;
const USER_CODE_ACCESS: u8 = 0xFA;
const USER_DATA_ACCESS: u8 = 0xF2;
/// Present, 32-bit available TSS.
const TSS_ACCESS: u8 = 0x89;

/// 4KiB granularity, 32-bit operand size.
const FLAT_FLAGS: u8 = 0xC;
const FLAT_LIMIT: u32 = 0xF_FFFF;

const GDT_ENTRIES: usize = 6;

/// Packs one 8-byte segment descriptor.
pub const fn segment_descriptor(base: u32, limit: u32, access: u8, flags: u8) -> u64 {
    let base = base as u64;
    let limit = limit as u64;
    (limit & 0xFFFF)
        | ((base & 0xFF_FFFF) << 16)
        | ((access as u64) << 40)
        | (((limit >> 16) & 0xF) << 48)
        | (((flags as u64) & 0xF) << 52)
        | (((base >> 24) & 0xFF) << 56)
}

/// 32-bit task state segment. Only ss0/esp0 are used.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct TaskStateSegment {
    pub link: u32,
    pub esp0: u32,
    pub ss0: u32,
    /// esp1, ss1, esp2, ss2, cr3, eip, eflags, general and segment
    /// registers, ldt.
    pub unused: [u32; 22],
    pub trap: u16,
    pub iomap_base: u16,
}

impl TaskStateSegment {
    pub const fn new() -> Self {
        TaskStateSegment {
            link: 0,
            esp0: 0,
            ss0: KERNEL_DATA_SELECTOR.0 as u32,
            unused: [0; 22],
            trap: 0,
            // past the limit: no I/O permission bitmap
            iomap_base: size_of::<TaskStateSegment>() as u16,
        }
    }
}

impl Default for TaskStateSegment {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C, align(8))]
pub struct GlobalDescriptorTable([u64; GDT_ENTRIES]);

impl GlobalDescriptorTable {
    pub const fn new(tss_base: u32) -> Self {
        GlobalDescriptorTable([
            0,
            segment_descriptor(0, FLAT_LIMIT, KERNEL_CODE_ACCESS, FLAT_FLAGS),
            segment_descriptor(0, FLAT_LIMIT, KERNEL_DATA_ACCESS, FLAT_FLAGS),
            segment_descriptor(0, FLAT_LIMIT, USER_CODE_ACCESS, FLAT_FLAGS),
            segment_descriptor(0, FLAT_LIMIT, USER_DATA_ACCESS, FLAT_FLAGS),
            segment_descriptor(tss_base, size_of::<TaskStateSegment>() as u32 - 1, TSS_ACCESS, 0),
        ])
    }

    pub fn entry(&self, selector: SegmentSelector) -> u64 {
        self.0[selector.index() as usize]
    }

    pub fn pointer(&self) -> DescriptorPointer {
        DescriptorPointer {
            limit: (size_of::<Self>() - 1) as u16,
            base: self as *const Self as usize as u32,
        }
    }
}

#[cfg(target_os = "none")]
mod hw {
    use core::ptr::addr_of_mut;

    use spin::Once;

    use super::*;
    use crate::arch::cpu;
    use crate::logging;

    static mut TSS: TaskStateSegment = TaskStateSegment::new();
    static GDT: Once<GlobalDescriptorTable> = Once::new();

    pub fn init() {
        let tss_base = unsafe { addr_of_mut!(TSS) } as usize as u32;
        let gdt = GDT.call_once(|| GlobalDescriptorTable::new(tss_base));

        unsafe {
            cpu::lgdt(&gdt.pointer(), KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR);
            cpu::ltr(TSS_SELECTOR);
        }
        logging::info("arch::gdt::init: GDT/TSS loaded");
    }

    pub fn set_kernel_stack(top: usize) {
        // Safety: single CPU; only the switch path writes, with interrupts off.
        unsafe { (*addr_of_mut!(TSS)).esp0 = top as u32 };
    }
}

#[cfg(target_os = "none")]
pub use hw::{init, set_kernel_stack};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_carry_index_and_rpl() {
        assert_eq!(KERNEL_CODE_SELECTOR.0, 0x08);
        assert_eq!(KERNEL_DATA_SELECTOR.0, 0x10);
        assert_eq!(USER_CODE_SELECTOR.0, 0x1B);
        assert_eq!(USER_DATA_SELECTOR.0, 0x23);
        assert_eq!(TSS_SELECTOR.0, 0x28);
    }

    #[test]
    fn flat_segments_encode_as_expected() {
        let gdt = GlobalDescriptorTable::new(0);
        assert_eq!(gdt.0[0], 0);
        assert_eq!(gdt.entry(KERNEL_CODE_SELECTOR), 0x00CF_9A00_0000_FFFF);
        assert_eq!(gdt.entry(KERNEL_DATA_SELECTOR), 0x00CF_9200_0000_FFFF);
        assert_eq!(gdt.entry(USER_CODE_SELECTOR), 0x00CF_FA00_0000_FFFF);
        assert_eq!(gdt.entry(USER_DATA_SELECTOR), 0x00CF_F200_0000_FFFF);
    }

    #[test]
    fn tss_descriptor_splits_base() {
        let gdt = GlobalDescriptorTable::new(0x1234_5678);
        let d = gdt.entry(TSS_SELECTOR);
        assert_eq!(d & 0xFFFF, 103, "limit");
        assert_eq!((d >> 16) & 0xFF_FFFF, 0x34_5678);
        assert_eq!(d >> 56, 0x12);
        assert_eq!((d >> 40) & 0xFF, 0x89);
    }

    #[test]
    fn tss_layout() {
        assert_eq!(size_of::<TaskStateSegment>(), 104);
        assert_eq!(core::mem::offset_of!(TaskStateSegment, esp0), 4);
        assert_eq!(core::mem::offset_of!(TaskStateSegment, ss0), 8);
        assert_eq!(core::mem::offset_of!(TaskStateSegment, iomap_base), 102);

        let tss = TaskStateSegment::new();
        assert_eq!(tss.ss0, 0x10);
        assert_eq!(tss.iomap_base, 104);
    }
}
