// kernel/src/kernel/state_ref.rs
//
// Role:
// - The single way for the trap path to reach the kernel object.
//
// Does:
// - Record the kernel's address once boot has built it.
// - Hand that address to trap handlers as a raw pointer.
//
// Does not:
// - Hand out references. A syscall that blocks switches to another process,
//   whose own syscall reaches the same kernel before the first one returns,
//   so callers borrow through the pointer one step at a time
//   (Kernel::handle_syscall, Kernel::reschedule).
// - Synchronise. One CPU, and traps run with interrupts off; the keyboard
//   IRQ never comes through here.
// - Own the kernel (entry.rs keeps it in static storage).

use core::sync::atomic::{AtomicPtr, Ordering};

use super::entry::BootKernel;

static KERNEL: AtomicPtr<BootKernel> = AtomicPtr::new(core::ptr::null_mut());

/// Called once from entry.rs after the kernel is fully built. The kernel
/// must not move afterwards.
pub fn register_kernel(kernel: *mut BootKernel) {
    KERNEL.store(kernel, Ordering::SeqCst);
}

/// `None` before register_kernel().
pub fn kernel() -> Option<*mut BootKernel> {
    let ptr = KERNEL.load(Ordering::SeqCst);
    if ptr.is_null() {
        None
    } else {
        Some(ptr)
    }
}
