// kernel/src/kernel/trap.rs
//
// Trap frame layout and vector classification.
// - The entry stub pushes (error code, vector) and then `pushad`, so the frame
//   reads bottom-up as pushad order, vector, error code, CPU frame.
// - user_esp/user_ss are only valid when the trap came from ring 3.

use core::fmt;

/// Register snapshot captured at trap entry and restored on `iretd`.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// `pushad`'s copy of esp; ignored by `popad`.
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub user_esp: u32,
    pub user_ss: u32,
}

impl TrapFrame {
    /// What user code sees in eax after `int 0x80` returns.
    pub fn set_return(&mut self, value: i32) {
        self.eax = value as u32;
    }

    pub fn from_user(&self) -> bool {
        self.cs & 0b11 == 0b11
    }
}

impl fmt::Debug for TrapFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrapFrame {{ vector: {:#x}, err: {:#x}, eip: {:#010x}, cs: {:#x}, eflags: {:#x}, \
             eax: {:#x}, ebx: {:#x}, ecx: {:#x}, edx: {:#x} }}",
            self.vector, self.error_code, self.eip, self.cs, self.eflags,
            self.eax, self.ebx, self.ecx, self.edx
        )
    }
}

/// CPU exceptions occupy vectors 0..32.
pub const EXCEPTION_VECTORS: u32 = 32;
/// IRQ1 after the PIC remap to 0x20.
pub const KEYBOARD_VECTOR: u32 = 0x21;
pub const SYSCALL_VECTOR: u32 = 0x80;
pub const PAGE_FAULT_VECTOR: u32 = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trap {
    Keyboard,
    Syscall,
    Unexpected,
}

impl Trap {
    pub fn classify(vector: u32) -> Trap {
        match vector {
            KEYBOARD_VECTOR => Trap::Keyboard,
            SYSCALL_VECTOR => Trap::Syscall,
            _ => Trap::Unexpected,
        }
    }
}

pub fn exception_name(vector: u32) -> &'static str {
    match vector {
        0 => "divide error",
        1 => "debug",
        2 => "non-maskable interrupt",
        3 => "breakpoint",
        4 => "overflow",
        5 => "bound range exceeded",
        6 => "invalid opcode",
        7 => "device not available",
        8 => "double fault",
        10 => "invalid TSS",
        11 => "segment not present",
        12 => "stack-segment fault",
        13 => "general protection fault",
        14 => "page fault",
        16 => "x87 floating-point error",
        17 => "alignment check",
        18 => "machine check",
        19 => "SIMD floating-point error",
        20 => "virtualization exception",
        21 => "control protection",
        v if v < EXCEPTION_VECTORS => "reserved",
        _ => "interrupt",
    }
}

/// Fatal path for any vector without a handler.
pub fn unexpected(frame: &TrapFrame) -> ! {
    panic!(
        "unexpected interrupt: vector={} ({}) err={:#x} eip={:#010x} from_user={}",
        frame.vector,
        exception_name(frame.vector),
        frame.error_code,
        frame.eip,
        frame.from_user()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_matches_stub_layout() {
        // 8 pushad slots + vector + error + eip/cs/eflags + user esp/ss
        assert_eq!(core::mem::size_of::<TrapFrame>(), 15 * 4);
        assert_eq!(core::mem::offset_of!(TrapFrame, eax), 7 * 4);
        assert_eq!(core::mem::offset_of!(TrapFrame, vector), 8 * 4);
        assert_eq!(core::mem::offset_of!(TrapFrame, eip), 10 * 4);
    }

    #[test]
    fn classification() {
        assert_eq!(Trap::classify(0x80), Trap::Syscall);
        assert_eq!(Trap::classify(0x21), Trap::Keyboard);
        assert_eq!(Trap::classify(14), Trap::Unexpected);
        assert_eq!(Trap::classify(0x20), Trap::Unexpected);
    }

    #[test]
    fn return_value_lands_in_eax() {
        let mut f = TrapFrame::default();
        f.set_return(-1);
        assert_eq!(f.eax, 0xffff_ffff);
        f.set_return(b'x' as i32);
        assert_eq!(f.eax, 0x78);
    }

    #[test]
    fn privilege_from_cs() {
        let f = TrapFrame {
            cs: 0x1b,
            ..TrapFrame::default()
        };
        assert!(f.from_user());
        assert!(!TrapFrame { cs: 0x08, ..f }.from_user());
    }

    #[test]
    #[should_panic(expected = "unexpected interrupt: vector=14 (page fault) err=0x6 eip=0x01000010")]
    fn unexpected_trap_reports_context() {
        let f = TrapFrame {
            vector: 14,
            error_code: 6,
            eip: 0x0100_0010,
            cs: 0x1b,
            ..TrapFrame::default()
        };
        unexpected(&f);
    }
}
