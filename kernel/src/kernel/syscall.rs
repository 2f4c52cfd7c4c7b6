// kernel/src/kernel/syscall.rs
//
// Syscall boundary (int 0x80).
// - Number in eax, arguments in ebx/ecx/edx, result back in eax.
// - File calls pass user pointers; every access walks the caller's page
//   tables, so a bad pointer becomes BadAddress instead of a fault.
// - getchar blocks by yielding and re-polling; there is no wait queue.
//
// Tracing (feature):
// - trace_syscall: log number and caller pid for every decoded call.

use core::fmt::Write;

use super::process::Pid;
use super::trap::TrapFrame;
use super::{Kernel, Platform};
use crate::console::{Console, ConsoleWriter};
use crate::fs::{FileName, FsError, Storage, MAX_NAME_LEN};
use crate::logging;
use crate::mem::address_space::{AddressSpace, UserAccessError};
use crate::mem::addr::VirtAddr;
use crate::mm::PhysMemory;

pub mod numbers {
    pub const SYS_PUTCHAR: u32 = 1;
    pub const SYS_GETCHAR: u32 = 2;
    pub const SYS_EXIT: u32 = 3;
    pub const SYS_LIST_FILES: u32 = 4;
    pub const SYS_READ_FILE: u32 = 5;
    pub const SYS_WRITE_FILE: u32 = 6;
    pub const SYS_CREATE_FILE: u32 = 7;
    pub const SYS_DELETE_FILE: u32 = 8;
    pub const SYS_PRINT_FILE: u32 = 9;
}

use numbers::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Syscall {
    PutChar(u8),
    GetChar,
    Exit,
    ListFiles,
    ReadFile { name: VirtAddr, buf: VirtAddr, len: usize },
    WriteFile { name: VirtAddr, buf: VirtAddr, len: usize },
    CreateFile { name: VirtAddr },
    DeleteFile { name: VirtAddr },
    PrintFile { name: VirtAddr },
}

impl Syscall {
    /// `None` for an unknown number.
    pub fn decode(frame: &TrapFrame) -> Option<Syscall> {
        let name = VirtAddr(frame.ebx);
        let call = match frame.eax {
            SYS_PUTCHAR => Syscall::PutChar(frame.ebx as u8),
            SYS_GETCHAR => Syscall::GetChar,
            SYS_EXIT => Syscall::Exit,
            SYS_LIST_FILES => Syscall::ListFiles,
            SYS_READ_FILE => Syscall::ReadFile {
                name,
                buf: VirtAddr(frame.ecx),
                len: frame.edx as usize,
            },
            SYS_WRITE_FILE => Syscall::WriteFile {
                name,
                buf: VirtAddr(frame.ecx),
                len: frame.edx as usize,
            },
            SYS_CREATE_FILE => Syscall::CreateFile { name },
            SYS_DELETE_FILE => Syscall::DeleteFile { name },
            SYS_PRINT_FILE => Syscall::PrintFile { name },
            _ => return None,
        };
        Some(call)
    }
}

/// Outcome of one attempt at a syscall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Value for the caller's eax.
    Complete(i32),
    /// Nothing to return yet; retry after other work has run.
    WouldBlock,
    /// The caller is gone and must never be resumed.
    Exited(Pid),
}

/// Failures reported to user code as negative results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyscallError {
    NotFound,
    AlreadyExists,
    NoSpace,
    BadAddress,
    InvalidName,
}

impl SyscallError {
    pub const fn code(self) -> i32 {
        match self {
            SyscallError::NotFound => -1,
            SyscallError::AlreadyExists => -2,
            SyscallError::NoSpace => -3,
            SyscallError::BadAddress => -4,
            SyscallError::InvalidName => -5,
        }
    }
}

impl From<FsError> for SyscallError {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound => SyscallError::NotFound,
            FsError::AlreadyExists => SyscallError::AlreadyExists,
            FsError::NoSpace => SyscallError::NoSpace,
            FsError::InvalidName => SyscallError::InvalidName,
        }
    }
}

impl From<UserAccessError> for SyscallError {
    fn from(e: UserAccessError) -> Self {
        match e {
            UserAccessError::BadAddress => SyscallError::BadAddress,
            UserAccessError::Unterminated => SyscallError::InvalidName,
        }
    }
}

fn complete(result: Result<usize, SyscallError>) -> Step {
    match result {
        Ok(n) => Step::Complete(n as i32),
        Err(e) => Step::Complete(e.code()),
    }
}

impl<M: PhysMemory, P: Platform, C: Console, S: Storage> Kernel<M, P, C, S> {
    /// Runs the syscall described by `frame` to completion and stores the
    /// result in it. An unknown number is fatal.
    ///
    /// # Safety
    /// Same contract as [`Kernel::reschedule`]: a blocking call switches to
    /// other processes, which use the kernel before this returns.
    pub unsafe fn handle_syscall(this: *mut Self, frame: &mut TrapFrame) {
        let Some(call) = Syscall::decode(frame) else {
            panic!(
                "unexpected syscall {} from pid {} (eip={:#010x})",
                frame.eax,
                (*this).current_pid().0,
                frame.eip
            );
        };

        #[cfg(feature = "trace_syscall")]
        {
            logging::info_u32("syscall: number", frame.eax);
            logging::info_u32("  pid", (*this).current_pid().0);
        }

        loop {
            match (*this).dispatch(call) {
                Step::Complete(value) => {
                    frame.set_return(value);
                    return;
                }
                Step::WouldBlock => Self::wait_for_input(this),
                Step::Exited(pid) => {
                    Self::reschedule(this);
                    panic!("exited process {} was resumed", pid.0);
                }
            }
        }
    }

    /// One attempt at `call` on behalf of the current process.
    pub fn dispatch(&mut self, call: Syscall) -> Step {
        match call {
            Syscall::PutChar(byte) => {
                self.console.put(byte);
                Step::Complete(0)
            }
            Syscall::GetChar => match self.console.try_get() {
                Some(byte) => Step::Complete(byte as i32),
                None => Step::WouldBlock,
            },
            Syscall::Exit => {
                let pid = self.procs.exit_current();
                logging::info_u32("process exited: pid", pid.0);
                Step::Exited(pid)
            }
            Syscall::ListFiles => Step::Complete(self.list_files() as i32),
            Syscall::ReadFile { name, buf, len } => complete(self.read_file(name, buf, len)),
            Syscall::WriteFile { name, buf, len } => complete(self.write_file(name, buf, len)),
            Syscall::CreateFile { name } => complete(self.create_file(name).map(|_| 0)),
            Syscall::DeleteFile { name } => complete(self.delete_file(name).map(|_| 0)),
            Syscall::PrintFile { name } => complete(self.print_file(name)),
        }
    }

    /// Lets other processes (and the keyboard IRQ) run before the next poll.
    unsafe fn wait_for_input(this: *mut Self) {
        if Self::reschedule(this) {
            (*this).platform.interrupt_window();
        } else {
            (*this).platform.wait_for_interrupt();
        }
    }

    fn current_space(&self) -> AddressSpace {
        match self.procs.current().address_space() {
            Some(space) => space,
            None => panic!("syscall from pid {} without an address space", self.current_pid().0),
        }
    }

    fn read_user_name(&self, ptr: VirtAddr) -> Result<FileName, SyscallError> {
        let mut buf = [0u8; MAX_NAME_LEN];
        let len = self.current_space().read_user_str(&self.pmm, ptr, &mut buf)?;
        Ok(FileName::from_bytes(&buf[..len])?)
    }

    fn read_file(&mut self, name: VirtAddr, buf: VirtAddr, len: usize) -> Result<usize, SyscallError> {
        let name = self.read_user_name(name)?;
        let file = self.storage.lookup(name.as_str()).ok_or(SyscallError::NotFound)?;

        let len = len.min(self.transfer.len());
        let n = self.storage.read(file, &mut self.transfer[..len]);

        let space = self.current_space();
        space.copy_to_user(&mut self.pmm, buf, &self.transfer[..n])?;
        Ok(n)
    }

    fn write_file(&mut self, name: VirtAddr, buf: VirtAddr, len: usize) -> Result<usize, SyscallError> {
        let name = self.read_user_name(name)?;
        let file = self.storage.lookup(name.as_str()).ok_or(SyscallError::NotFound)?;

        let len = len.min(self.storage.max_file_size()).min(self.transfer.len());
        let space = self.current_space();
        space.copy_from_user(&self.pmm, buf, &mut self.transfer[..len])?;

        Ok(self.storage.write(file, &self.transfer[..len]))
    }

    fn create_file(&mut self, name: VirtAddr) -> Result<(), SyscallError> {
        let name = self.read_user_name(name)?;
        self.storage.create(name.as_str())?;
        Ok(())
    }

    fn delete_file(&mut self, name: VirtAddr) -> Result<(), SyscallError> {
        let name = self.read_user_name(name)?;
        self.storage.delete(name.as_str())?;
        Ok(())
    }

    /// Prints one `name (size bytes)` line per file; returns the file count.
    fn list_files(&mut self) -> usize {
        let mut count = 0;
        let console = &mut self.console;
        self.storage.for_each_file(&mut |name, size| {
            count += 1;
            let _ = writeln!(ConsoleWriter::new(console), "{} ({} bytes)", name, size);
        });
        count
    }

    fn print_file(&mut self, name: VirtAddr) -> Result<usize, SyscallError> {
        let name = self.read_user_name(name)?;
        let file = self.storage.lookup(name.as_str()).ok_or(SyscallError::NotFound)?;

        let n = self.storage.read(file, &mut self.transfer);
        for &byte in &self.transfer[..n] {
            self.console.put(byte);
        }
        Ok(n)
    }
}
