// kernel/src/kernel/process.rs
//
// Role:
// - Fixed-capacity process table and the round-robin selection policy.
//
// Does:
// - create(): claim an Unused slot, build its address space, lay out the
//   first-switch frame on its kernel stack.
// - select_next(): pick the next Runnable process after `current`.
// - begin_switch(): commit `current` and hand back everything the platform
//   needs to perform the switch.
//
// Does not:
// - Touch registers or CR3 (kernel::Platform does).
// - Reclaim Exited slots.
//
// Invariants:
// - pid == slot + 1 for user processes; the idle slot has pid 0.
// - A slot is never Unused once it has been handed out.
// - `current` always names a non-Unused slot.
// - A process that has never run has no saved stack pointer: its first
//   switch starts at the frame on top of its kernel stack, wherever the
//   table lives by then. Once anything but idle has run, the table must
//   not move (live kernel stacks hold absolute addresses).

use core::mem::size_of;

use crate::mem::address_space::AddressSpace;
use crate::mem::addr::PhysFrame;
use crate::mem::layout::KernelLayout;
use crate::mm::{PhysMemory, PhysicalMemoryManager};

pub const PROCS_MAX: usize = 8;
pub const KERNEL_STACK_SIZE: usize = 8192;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl Pid {
    pub const IDLE: Pid = Pid(0);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Unused,
    Runnable,
    Exited,
}

/// What the context switch pops on its way into a process: callee-saved
/// registers lowest first, then the address `ret` jumps to.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchFrame {
    pub edi: usize,
    pub esi: usize,
    pub ebx: usize,
    pub ebp: usize,
    pub ret: usize,
}

#[repr(C, align(16))]
pub struct KernelStack([u8; KERNEL_STACK_SIZE]);

impl KernelStack {
    const fn new() -> Self {
        KernelStack([0; KERNEL_STACK_SIZE])
    }

    pub fn top(&self) -> usize {
        self.0.as_ptr() as usize + KERNEL_STACK_SIZE
    }

    /// Writes a zeroed register frame returning into `entry` at the top of the
    /// stack.
    fn prepare_first_switch(&mut self, entry: usize) {
        let frame = SwitchFrame {
            edi: 0,
            esi: 0,
            ebx: 0,
            ebp: 0,
            ret: entry,
        };
        let slot = self.0[Self::FIRST_FRAME..].as_mut_ptr().cast::<SwitchFrame>();
        unsafe { slot.write_unaligned(frame) };
    }

    const FIRST_FRAME: usize = KERNEL_STACK_SIZE - size_of::<SwitchFrame>();

    /// Where the frame written by prepare_first_switch currently is.
    fn first_switch_sp(&self) -> usize {
        self.0.as_ptr() as usize + Self::FIRST_FRAME
    }
}

pub struct Process {
    pid: Pid,
    state: ProcessState,
    /// Stack pointer saved by the last switch away from this process.
    /// Meaningless until `started`.
    saved_sp: usize,
    started: bool,
    address_space: Option<AddressSpace>,
    kernel_stack: KernelStack,
}

impl Process {
    const fn unused() -> Self {
        Process {
            pid: Pid::IDLE,
            state: ProcessState::Unused,
            saved_sp: 0,
            started: false,
            address_space: None,
            kernel_stack: KernelStack::new(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// The stack pointer a switch into this process loads.
    pub fn resume_sp(&self) -> usize {
        if self.started {
            self.saved_sp
        } else {
            self.kernel_stack.first_switch_sp()
        }
    }

    pub fn address_space(&self) -> Option<AddressSpace> {
        self.address_space
    }

    pub fn kernel_stack_top(&self) -> usize {
        self.kernel_stack.top()
    }

    fn is_schedulable(&self) -> bool {
        self.state == ProcessState::Runnable && self.pid != Pid::IDLE
    }
}

/// Everything a context switch needs, computed before any register moves.
pub struct SwitchPlan {
    pub from: Pid,
    pub to: Pid,
    /// Where the outgoing process's stack pointer is stored.
    pub save_sp: *mut usize,
    pub next_sp: usize,
    pub root: PhysFrame,
    pub kernel_stack_top: usize,
}

pub struct ProcessTable {
    procs: [Process; PROCS_MAX],
    current: usize,
    idle: usize,
}

impl ProcessTable {
    pub fn new() -> Self {
        ProcessTable {
            procs: core::array::from_fn(|_| Process::unused()),
            current: 0,
            idle: 0,
        }
    }

    /// Creates a Runnable process running `image`; its first switch returns
    /// into `entry`.
    pub fn create<M: PhysMemory>(
        &mut self,
        pmm: &mut PhysicalMemoryManager<M>,
        layout: &KernelLayout,
        image: &[u8],
        entry: usize,
    ) -> Pid {
        let slot = self.free_slot();
        let space = AddressSpace::for_process(pmm, layout, image);

        let proc = &mut self.procs[slot];
        proc.kernel_stack.prepare_first_switch(entry);
        proc.started = false;
        proc.address_space = Some(space);
        proc.state = ProcessState::Runnable;
        proc.pid = Pid(slot as u32 + 1);
        proc.pid
    }

    /// Claims a slot for the boot context and makes it current. It owns an
    /// address space with just the shared windows and is only ever chosen
    /// when nothing else is Runnable.
    pub fn install_idle<M: PhysMemory>(
        &mut self,
        pmm: &mut PhysicalMemoryManager<M>,
        layout: &KernelLayout,
    ) {
        let slot = self.free_slot();
        let space = AddressSpace::for_kernel(pmm, layout);

        let idle = &mut self.procs[slot];
        // already running: the first switch away saves its stack pointer
        idle.started = true;
        idle.address_space = Some(space);
        idle.state = ProcessState::Runnable;
        idle.pid = Pid::IDLE;

        self.idle = slot;
        self.current = slot;
    }

    fn free_slot(&self) -> usize {
        match self.procs.iter().position(|p| p.state == ProcessState::Unused) {
            Some(slot) => slot,
            None => panic!("no free process slots (max {})", PROCS_MAX),
        }
    }

    pub fn current(&self) -> &Process {
        &self.procs[self.current]
    }

    pub fn current_slot(&self) -> usize {
        self.current
    }

    pub fn current_pid(&self) -> Pid {
        self.current().pid
    }

    pub fn slot(&self, slot: usize) -> &Process {
        &self.procs[slot]
    }

    /// Finds a live (Runnable or Exited) process by pid.
    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.procs
            .iter()
            .find(|p| p.state != ProcessState::Unused && p.pid == pid)
    }

    /// Round-robin scan starting right after the current process; the idle
    /// slot when nothing else can run. May return `current` itself.
    pub fn select_next(&self) -> usize {
        let start = self.current().pid.0 as usize;
        (0..PROCS_MAX)
            .map(|i| (start + i) % PROCS_MAX)
            .find(|&slot| self.procs[slot].is_schedulable())
            .unwrap_or(self.idle)
    }

    /// Makes `next` current and describes the switch into it.
    pub fn begin_switch(&mut self, next: usize) -> SwitchPlan {
        let prev = self.current;
        let from = self.procs[prev].pid;

        let target = &self.procs[next];
        let Some(space) = target.address_space else {
            panic!("switch to slot {} without an address space", next);
        };
        let to = target.pid;
        let next_sp = target.resume_sp();
        let kernel_stack_top = target.kernel_stack_top();

        self.procs[next].started = true;
        self.current = next;

        SwitchPlan {
            from,
            to,
            save_sp: &mut self.procs[prev].saved_sp as *mut usize,
            next_sp,
            root: space.root(),
            kernel_stack_top,
        }
    }

    /// Marks the current process Exited and returns its pid.
    pub fn exit_current(&mut self) -> Pid {
        if self.current == self.idle {
            panic!("idle process cannot exit");
        }
        let proc = &mut self.procs[self.current];
        proc.state = ProcessState::Exited;
        proc.pid
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::addr::VirtAddr;
    use crate::mem::layout::{USER_BASE, USER_STACK_BOTTOM};
    use crate::testing::{test_layout, test_pmm};

    const ENTRY: usize = 0x00c0_ffee;

    fn table_with(n: usize) -> ProcessTable {
        let mut pmm = test_pmm();
        let layout = test_layout(&pmm);
        let mut t = ProcessTable::new();
        t.install_idle(&mut pmm, &layout);
        for _ in 0..n {
            t.create(&mut pmm, &layout, b"\xEB\xFE", ENTRY);
        }
        t
    }

    #[test]
    fn idle_takes_slot_zero_and_users_get_slot_plus_one() {
        let t = table_with(2);
        assert_eq!(t.current_pid(), Pid::IDLE);
        assert_eq!(t.current_slot(), 0);
        assert_eq!(t.slot(1).pid(), Pid(2));
        assert_eq!(t.slot(2).pid(), Pid(3));
        assert_eq!(t.slot(3).state(), ProcessState::Unused);
        assert_eq!(t.get(Pid(3)).map(|p| p.state()), Some(ProcessState::Runnable));
        assert!(t.get(Pid(4)).is_none());
    }

    #[test]
    fn first_switch_frame_returns_into_entry() {
        let t = table_with(1);
        let p = t.slot(1);

        assert_eq!(p.resume_sp(), p.kernel_stack_top() - size_of::<SwitchFrame>());
        let frame = unsafe { (p.resume_sp() as *const SwitchFrame).read_unaligned() };
        assert_eq!(
            frame,
            SwitchFrame {
                edi: 0,
                esi: 0,
                ebx: 0,
                ebp: 0,
                ret: ENTRY
            }
        );
        assert_eq!(p.kernel_stack_top() % 16, 0);
    }

    #[test]
    fn each_process_owns_its_address_space() {
        let mut pmm = test_pmm();
        let layout = test_layout(&pmm);
        let mut t = ProcessTable::new();
        t.install_idle(&mut pmm, &layout);
        let a = t.create(&mut pmm, &layout, b"A", ENTRY);
        let b = t.create(&mut pmm, &layout, b"B", ENTRY);

        let sa = t.get(a).and_then(|p| p.address_space()).expect("a");
        let sb = t.get(b).and_then(|p| p.address_space()).expect("b");
        assert_ne!(sa.root(), sb.root());

        let (pa, _) = sa.translate(&pmm, USER_BASE).expect("image a");
        assert_eq!(pmm.frame(pa.frame()).0[0], b'A');
    }

    #[test]
    #[should_panic(expected = "no free process slots")]
    fn full_table_is_fatal() {
        table_with(PROCS_MAX);
    }

    #[test]
    fn selection_starts_after_current_and_wraps() {
        let mut t = table_with(3); // pids 2, 3, 4 in slots 1..=3
        assert_eq!(t.select_next(), 1);

        t.begin_switch(2);
        assert_eq!(t.select_next(), 3);

        t.begin_switch(3);
        assert_eq!(t.select_next(), 1, "wraps past the idle slot");
    }

    #[test]
    fn lone_process_selects_itself() {
        let mut t = table_with(1);
        t.begin_switch(1);
        assert_eq!(t.select_next(), 1);
    }

    #[test]
    fn exited_processes_fall_back_to_idle() {
        let mut t = table_with(1);
        t.begin_switch(1);
        assert_eq!(t.exit_current(), Pid(2));
        assert_eq!(t.slot(1).state(), ProcessState::Exited);
        assert_eq!(t.slot(1).pid(), Pid(2), "pid stays nonzero");
        assert_eq!(t.select_next(), 0);
    }

    #[test]
    fn begin_switch_describes_the_target() {
        let mut t = table_with(2);
        let target_sp = t.slot(2).resume_sp();
        let target_top = t.slot(2).kernel_stack_top();
        let target_root = t.slot(2).address_space().map(|s| s.root());

        let plan = t.begin_switch(2);
        assert_eq!(plan.from, Pid::IDLE);
        assert_eq!(plan.to, Pid(3));
        assert_eq!(plan.next_sp, target_sp);
        assert_eq!(plan.kernel_stack_top, target_top);
        assert_eq!(Some(plan.root), target_root);
        assert_eq!(t.current_pid(), Pid(3));

        // the outgoing slot's saved_sp is what gets written
        unsafe { plan.save_sp.write(0x1234) };
        assert_eq!(t.slot(0).resume_sp(), 0x1234);
    }

    #[test]
    fn once_started_the_saved_pointer_is_used() {
        let mut t = table_with(1);
        let first = t.slot(1).resume_sp();

        let plan = t.begin_switch(1);
        assert_eq!(plan.next_sp, first);

        let back = t.begin_switch(0);
        unsafe { back.save_sp.write(first - 64) };
        assert_eq!(t.slot(1).resume_sp(), first - 64);
    }

    #[test]
    fn first_switch_follows_the_table_when_it_moves() {
        let t = table_with(1);
        let before = t.slot(1).resume_sp();

        let mut moved = std::boxed::Box::new(t);
        let p = moved.slot(1);
        let top = p.kernel_stack_top();
        assert_ne!(p.resume_sp(), before);
        assert!(p.resume_sp() >= top - KERNEL_STACK_SIZE && p.resume_sp() < top);

        let plan = moved.begin_switch(1);
        let frame = unsafe { (plan.next_sp as *const SwitchFrame).read_unaligned() };
        assert_eq!(frame.ret, ENTRY);
    }

    #[test]
    fn idle_space_has_only_the_shared_windows() {
        let mut pmm = test_pmm();
        let layout = test_layout(&pmm);
        let mut t = ProcessTable::new();
        t.install_idle(&mut pmm, &layout);

        let space = t.slot(0).address_space().expect("idle space");
        assert!(space.translate(&pmm, USER_STACK_BOTTOM).is_none());
        assert!(space.translate(&pmm, USER_BASE).is_none());
        assert!(space.translate(&pmm, VirtAddr(layout.kernel.start.0)).is_some());
    }

    #[test]
    #[should_panic(expected = "idle process cannot exit")]
    fn idle_cannot_exit() {
        let mut t = table_with(0);
        t.exit_current();
    }
}
