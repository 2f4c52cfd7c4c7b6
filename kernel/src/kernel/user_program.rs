// kernel/src/kernel/user_program.rs
//
// Built-in user programs, hand-assembled i386 machine code. Both are
// position-dependent: they expect to be loaded at USER_BASE.
//
// HELLO: putchar every byte of a NUL-terminated message, then exit.
//
//   00  BE imm32        mov esi, USER_BASE + 31      ; message
//   05  0F B6 1E        movzx ebx, byte [esi]
//   08  85 DB           test ebx, ebx
//   0A  74 0A           jz 0x16
//   0C  B8 01 00 00 00  mov eax, SYS_PUTCHAR
//   11  CD 80           int 0x80
//   13  46              inc esi
//   14  EB EF           jmp 0x05
//   16  B8 03 00 00 00  mov eax, SYS_EXIT
//   1B  CD 80           int 0x80
//   1D  EB FE           jmp $
//   1F  message
//
// ECHO: getchar; 'q' exits, anything else is written back.
//
//   00  B8 02 00 00 00  mov eax, SYS_GETCHAR
//   05  CD 80           int 0x80
//   07  3C 71           cmp al, 'q'
//   09  74 0B           jz 0x16
//   0B  89 C3           mov ebx, eax
//   0D  B8 01 00 00 00  mov eax, SYS_PUTCHAR
//   12  CD 80           int 0x80
//   14  EB EA           jmp 0x00
//   16  B8 03 00 00 00  mov eax, SYS_EXIT
//   1B  CD 80           int 0x80
//   1D  EB FE           jmp $

use crate::mem::layout::USER_BASE;

const HELLO_CODE_LEN: usize = 31;
const HELLO_MESSAGE: &[u8] = b"Hello from user mode!\n\0";
const MESSAGE_ADDR: [u8; 4] = (USER_BASE.0 + HELLO_CODE_LEN as u32).to_le_bytes();

#[rustfmt::skip]
const HELLO_CODE: [u8; HELLO_CODE_LEN] = [
    0xBE, MESSAGE_ADDR[0], MESSAGE_ADDR[1], MESSAGE_ADDR[2], MESSAGE_ADDR[3],
    0x0F, 0xB6, 0x1E,
    0x85, 0xDB,
    0x74, 0x0A,
    0xB8, 0x01, 0x00, 0x00, 0x00,
    0xCD, 0x80,
    0x46,
    0xEB, 0xEF,
    0xB8, 0x03, 0x00, 0x00, 0x00,
    0xCD, 0x80,
    0xEB, 0xFE,
];

const HELLO_IMAGE: [u8; HELLO_CODE_LEN + HELLO_MESSAGE.len()] = concat(&HELLO_CODE, HELLO_MESSAGE);

pub const HELLO: &[u8] = &HELLO_IMAGE;

#[rustfmt::skip]
pub const ECHO: &[u8] = &[
    0xB8, 0x02, 0x00, 0x00, 0x00,
    0xCD, 0x80,
    0x3C, b'q',
    0x74, 0x0B,
    0x89, 0xC3,
    0xB8, 0x01, 0x00, 0x00, 0x00,
    0xCD, 0x80,
    0xEB, 0xEA,
    0xB8, 0x03, 0x00, 0x00, 0x00,
    0xCD, 0x80,
    0xEB, 0xFE,
];

const fn concat<const N: usize>(a: &[u8], b: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let mut i = 0;
    while i < a.len() {
        out[i] = a[i];
        i += 1;
    }
    let mut j = 0;
    while j < b.len() {
        out[i + j] = b[j];
        j += 1;
    }
    out
}
