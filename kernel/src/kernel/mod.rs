// kernel/src/kernel/mod.rs
//
// protkern: cooperative round-robin kernel core.
//
// - Kernel owns every piece of mutable kernel state: the frame allocator, the
//   process table, the console and storage collaborators, and the platform
//   that performs the privileged half of a context switch.
// - The trap path reaches it through state_ref (bare metal) or directly
//   (tests); nothing else holds a reference.
//
// [Invariants]
//
// 1. Slot 0 is the idle process (pid 0). It exists from construction on and
//    is only selected when no user process is Runnable.
// 2. `procs.current` is switched only by yield_now(), and the address space
//    is activated immediately before the stack swap, with interrupts off.
// 3. An Exited process is never selected again; its slot is not reused.
// 4. No `&mut Kernel` is live across a stack swap. The bare-metal paths
//    (boot, trap entry) hold a raw pointer and re-borrow after each switch,
//    because the process switched to takes its own borrow in the meantime.

pub mod process;
pub mod syscall;
pub mod trap;
pub mod user_program;

#[cfg(target_os = "none")]
pub mod entry;
#[cfg(target_os = "none")]
pub mod state_ref;

use core::ptr::addr_of_mut;

use crate::console::Console;
use crate::fs::{Storage, MAX_FILE_SIZE};
use crate::logging;
use crate::mem::addr::PhysFrame;
use crate::mem::layout::KernelLayout;
use crate::mm::{PhysMemory, PhysicalMemoryManager};

use process::{Pid, ProcessTable};

/// The privileged operations the scheduler needs from the CPU.
pub trait Platform {
    /// Address the first switch into a new process returns to.
    fn user_entry(&self) -> usize;

    /// Loads `root` as the page directory and makes `kernel_stack_top` the
    /// stack used on the next ring 3 -> ring 0 transition.
    fn activate(&mut self, root: PhysFrame, kernel_stack_top: usize);

    /// Pushes callee-saved registers, stores the stack pointer through
    /// `save_sp`, loads `next_sp` and pops the next process's registers.
    /// Returns once some later switch comes back to the caller.
    ///
    /// Takes the platform by pointer: the process switched to reaches the
    /// same platform before this call returns.
    ///
    /// # Safety
    /// `this` must be valid for the whole call. `save_sp` must stay valid
    /// until the switch back, and `next_sp` must point at a frame laid out by
    /// a previous switch or by process creation.
    unsafe fn switch_to(this: *mut Self, save_sp: *mut usize, next_sp: usize);

    /// Halts until the next interrupt has been handled.
    fn wait_for_interrupt(&mut self);

    /// Lets pending interrupts run, without halting.
    fn interrupt_window(&mut self);
}

pub struct Kernel<M: PhysMemory, P: Platform, C: Console, S: Storage> {
    pmm: PhysicalMemoryManager<M>,
    layout: KernelLayout,
    procs: ProcessTable,
    platform: P,
    console: C,
    storage: S,
    /// Bounce buffer between user memory and storage.
    transfer: [u8; MAX_FILE_SIZE],
}

impl<M: PhysMemory, P: Platform, C: Console, S: Storage> Kernel<M, P, C, S> {
    /// Builds the kernel and installs the idle process as current.
    pub fn new(
        mut pmm: PhysicalMemoryManager<M>,
        layout: KernelLayout,
        platform: P,
        console: C,
        storage: S,
    ) -> Self {
        let mut procs = ProcessTable::new();
        procs.install_idle(&mut pmm, &layout);

        Kernel {
            pmm,
            layout,
            procs,
            platform,
            console,
            storage,
            transfer: [0; MAX_FILE_SIZE],
        }
    }

    /// Creates a Runnable process from a raw program image.
    pub fn spawn(&mut self, image: &[u8]) -> Pid {
        let entry = self.platform.user_entry();
        let pid = self.procs.create(&mut self.pmm, &self.layout, image, entry);

        logging::info_u32("process created: pid", pid.0);
        logging::info_hex("  entry", entry as u32);
        pid
    }

    /// Gives the CPU to the next Runnable process. Returns false (and does
    /// nothing) when that process is the current one.
    ///
    /// For callers that own the kernel outright. Code that may be resumed by
    /// another process's switch uses [`Kernel::reschedule`].
    pub fn yield_now(&mut self) -> bool {
        // Safety: whoever holds `&mut self` is the only path to the kernel,
        // so no other process can reach it while this borrow is live.
        unsafe { Self::reschedule(self) }
    }

    /// yield_now() through a raw pointer. The kernel is only borrowed while
    /// the switch is planned, never across the stack swap itself.
    ///
    /// # Safety
    /// `this` points at a kernel that stays at that address for as long as
    /// any process it created can run, and the caller holds no reference
    /// into it across this call.
    pub unsafe fn reschedule(this: *mut Self) -> bool {
        let plan = {
            let k = &mut *this;
            let next = k.procs.select_next();
            if next == k.procs.current_slot() {
                return false;
            }

            let plan = k.procs.begin_switch(next);

            #[cfg(feature = "trace_sched")]
            {
                logging::info_u32("sched: from pid", plan.from.0);
                logging::info_u32("sched: to pid", plan.to.0);
            }

            k.platform.activate(plan.root, plan.kernel_stack_top);
            plan
        };

        // save_sp points into the process table; next_sp was saved by an
        // earlier switch or is the first-switch frame of a new process.
        P::switch_to(addr_of_mut!((*this).platform), plan.save_sp, plan.next_sp);
        true
    }

    pub fn current_pid(&self) -> Pid {
        self.procs.current_pid()
    }

    /// Page directory of the current process.
    pub fn current_root(&self) -> PhysFrame {
        match self.procs.current().address_space() {
            Some(space) => space.root(),
            None => panic!("current process {:?} has no address space", self.current_pid()),
        }
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.procs
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn pmm(&self) -> &PhysicalMemoryManager<M> {
        &self.pmm
    }
}
