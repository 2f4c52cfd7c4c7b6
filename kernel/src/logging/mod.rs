// kernel/src/logging/mod.rs
//
// Line logger for boot milestones and kernel events.
// - Every line goes to COM1 and, with the `vga` feature, to the text screen.
// - No allocation and no core::fmt: numbers are rendered into stack buffers.
// - Hosted builds (unit tests) have no sinks; the calls are no-ops there.

#[cfg(target_os = "none")]
pub(crate) mod serial;
#[cfg(all(target_os = "none", feature = "vga"))]
pub(crate) mod vga;

pub fn init() {
    #[cfg(target_os = "none")]
    {
        serial::init();
        #[cfg(feature = "vga")]
        vga::init();
    }
}

fn emit(parts: &[&str]) {
    #[cfg(target_os = "none")]
    {
        for part in parts {
            serial::write_str(part);
        }
        serial::write_str("\r\n");

        #[cfg(feature = "vga")]
        {
            for part in parts {
                vga::write_str(part);
            }
            vga::write_byte(b'\n');
        }
    }

    #[cfg(not(target_os = "none"))]
    let _ = parts;
}

pub fn info(msg: &str) {
    emit(&["[INFO] ", msg]);
}

pub fn error(msg: &str) {
    emit(&["[ERROR] ", msg]);
}

/// `[INFO] label = 1234`
pub fn info_u32(label: &str, value: u32) {
    let mut buf = [0u8; 10];
    let digits = u32_to_decimal(value, &mut buf);
    info_kv(label, digits);
}

/// `[INFO] label = 0x0000abcd`
pub fn info_hex(label: &str, value: u32) {
    let mut buf = [0u8; 10];
    let digits = u32_to_hex(value, &mut buf);
    info_kv(label, digits);
}

fn info_kv(label: &str, value: &str) {
    if label.is_empty() {
        emit(&["[INFO] ", value]);
    } else {
        emit(&["[INFO] ", label, " = ", value]);
    }
}

fn u32_to_decimal(mut value: u32, buf: &mut [u8; 10]) -> &str {
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    core::str::from_utf8(&buf[i..]).unwrap_or("?")
}

fn u32_to_hex(value: u32, buf: &mut [u8; 10]) -> &str {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..8 {
        let nibble = (value >> ((7 - i) * 4)) & 0xF;
        buf[2 + i] = DIGITS[nibble as usize];
    }
    core::str::from_utf8(buf).unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_rendering() {
        let mut buf = [0u8; 10];
        assert_eq!(u32_to_decimal(0, &mut buf), "0");
        assert_eq!(u32_to_decimal(42, &mut buf), "42");
        assert_eq!(u32_to_decimal(u32::MAX, &mut buf), "4294967295");
    }

    #[test]
    fn hex_rendering_is_fixed_width() {
        let mut buf = [0u8; 10];
        assert_eq!(u32_to_hex(0, &mut buf), "0x00000000");
        assert_eq!(u32_to_hex(0x0100_001f, &mut buf), "0x0100001f");
        assert_eq!(u32_to_hex(u32::MAX, &mut buf), "0xffffffff");
    }
}
