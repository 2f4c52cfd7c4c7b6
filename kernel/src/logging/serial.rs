// kernel/src/logging/serial.rs
//
// COM1 (0x3F8), polled.
// - init(): 115200 baud, 8N1, FIFOs on
// - write_*(): blocking transmit
// - try_read_byte(): non-blocking receive, used by the console

use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::cpu::{inb, outb};

const COM1: u16 = 0x3F8;
const DATA: u16 = COM1;
const INTERRUPT_ENABLE: u16 = COM1 + 1;
const FIFO_CONTROL: u16 = COM1 + 2;
const LINE_CONTROL: u16 = COM1 + 3;
const MODEM_CONTROL: u16 = COM1 + 4;
const LINE_STATUS: u16 = COM1 + 5;

const LSR_DATA_READY: u8 = 0x01;
const LSR_TRANSMIT_EMPTY: u8 = 0x20;

static SERIAL_INITIALIZED: AtomicBool = AtomicBool::new(false);

pub fn init() {
    if SERIAL_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    unsafe {
        outb(INTERRUPT_ENABLE, 0x00);

        // DLAB on, divisor 1
        outb(LINE_CONTROL, 0x80);
        outb(DATA, 0x01);
        outb(INTERRUPT_ENABLE, 0x00);

        outb(LINE_CONTROL, 0x03);
        outb(FIFO_CONTROL, 0xC7);
        outb(MODEM_CONTROL, 0x0B);
    }
}

pub fn write_byte(byte: u8) {
    unsafe {
        while inb(LINE_STATUS) & LSR_TRANSMIT_EMPTY == 0 {}
        outb(DATA, byte);
    }
}

pub fn write_str(s: &str) {
    for b in s.bytes() {
        write_byte(b);
    }
}

pub fn try_read_byte() -> Option<u8> {
    unsafe {
        if inb(LINE_STATUS) & LSR_DATA_READY == 0 {
            return None;
        }
        Some(inb(DATA))
    }
}
