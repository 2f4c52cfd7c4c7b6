// kernel/src/mem/mod.rs
//
// Addresses, page tables and the per-process address space.

pub mod addr;
pub mod paging;
pub mod address_space;
pub mod layout;
