// kernel/src/logging/vga.rs
//
// VGA text mode (0xb8000), 80x25, light gray on black.
// Output always lands on the bottom row; a newline scrolls everything up.

use spin::Mutex;
use volatile::Volatile;

const BUFFER_HEIGHT: usize = 25;
const BUFFER_WIDTH: usize = 80;
const BUFFER_ADDR: usize = 0xb8000;

#[derive(Clone, Copy)]
#[repr(u8)]
enum Color {
    Black = 0x0,
    LightGray = 0x7,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct ScreenChar {
    ascii_character: u8,
    color_code: u8,
}

#[repr(transparent)]
struct Buffer {
    chars: [[Volatile<ScreenChar>; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

struct Writer {
    col: usize,
    color_code: u8,
    buffer: &'static mut Buffer,
}

impl Writer {
    fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            0x08 => {
                if self.col > 0 {
                    self.col -= 1;
                    self.put(self.col, b' ');
                }
            }
            byte => {
                if self.col >= BUFFER_WIDTH {
                    self.new_line();
                }
                let printable = if (0x20..0x7f).contains(&byte) { byte } else { 0xfe };
                self.put(self.col, printable);
                self.col += 1;
            }
        }
    }

    fn put(&mut self, col: usize, byte: u8) {
        self.buffer.chars[BUFFER_HEIGHT - 1][col].write(ScreenChar {
            ascii_character: byte,
            color_code: self.color_code,
        });
    }

    fn new_line(&mut self) {
        for row in 1..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                let ch = self.buffer.chars[row][col].read();
                self.buffer.chars[row - 1][col].write(ch);
            }
        }
        self.clear_row(BUFFER_HEIGHT - 1);
        self.col = 0;
    }

    fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: self.color_code,
        };
        for col in 0..BUFFER_WIDTH {
            self.buffer.chars[row][col].write(blank);
        }
    }
}

static WRITER: Mutex<Option<Writer>> = Mutex::new(None);

pub fn init() {
    let mut writer = Writer {
        col: 0,
        color_code: (Color::LightGray as u8) | ((Color::Black as u8) << 4),
        buffer: unsafe { &mut *(BUFFER_ADDR as *mut Buffer) },
    };
    for row in 0..BUFFER_HEIGHT {
        writer.clear_row(row);
    }
    *WRITER.lock() = Some(writer);
}

pub fn write_byte(byte: u8) {
    if let Some(ref mut w) = *WRITER.lock() {
        w.write_byte(byte);
    }
}

pub fn write_str(s: &str) {
    if let Some(ref mut w) = *WRITER.lock() {
        s.bytes().for_each(|b| w.write_byte(b));
    }
}
