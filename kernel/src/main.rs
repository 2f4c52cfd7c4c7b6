// kernel/src/main.rs
//
// Boot image: Multiboot v1 header, _start, and the hand-off into the
// library. On a hosted target this is only a pointer to the real build.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod boot {
    use core::arch::global_asm;

    const MULTIBOOT_HEADER_MAGIC: u32 = 0x1BAD_B002;
    const MULTIBOOT_HEADER_FLAGS: u32 = 0;

    global_asm!(
        ".pushsection .multiboot, \"a\"",
        ".balign 4",
        "    .long {magic}",
        "    .long {flags}",
        "    .long {checksum}",
        ".popsection",
        "",
        ".pushsection .text.boot, \"ax\"",
        ".global _start",
        "_start:",
        "    cli",
        "    mov esp, offset __boot_stack_top",
        "    push ebx",
        "    push eax",
        "    call {main}",
        "2:",
        "    hlt",
        "    jmp 2b",
        ".popsection",
        magic = const MULTIBOOT_HEADER_MAGIC,
        flags = const MULTIBOOT_HEADER_FLAGS,
        checksum = const 0u32.wrapping_sub(MULTIBOOT_HEADER_MAGIC + MULTIBOOT_HEADER_FLAGS),
        main = sym protkern_main,
    );

    /// `magic` and `info` are eax and ebx as left by the loader.
    extern "C" fn protkern_main(magic: u32, _info: u32) -> ! {
        protkern::kernel::entry::kernel_main(magic)
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("protkern is a bare-metal kernel; see .cargo/config.toml for the i686 build.");
    eprintln!("Host builds exist for unit tests: cargo test -p protkern");
}
