// kernel/src/lib.rs
//
// protkern: a small protected-mode x86 kernel.
//
// Everything that does not touch hardware (allocator, page tables, process
// table, scheduler, syscalls, storage) builds on the host and is unit
// tested there. The boot binary (main.rs) links this library for the
// bare-metal i686 target.

#![cfg_attr(not(test), no_std)]

#[cfg(all(target_os = "none", not(target_arch = "x86")))]
compile_error!("protkern runs on 32-bit x86 only; build with --target kernel/i686-protkern.json");

pub mod arch;
pub mod console;
pub mod fs;
pub mod kernel;
pub mod logging;
pub mod mem;
pub mod mm;

#[cfg(target_os = "none")]
mod panic;

#[cfg(test)]
pub(crate) mod testing;
