// kernel/src/arch/pic.rs
//
// Legacy 8259 pair. Remapped so IRQ0..15 land on 0x20..0x2F, clear of the
// CPU exceptions; everything except the keyboard (IRQ1) stays masked.

pub const MASTER_COMMAND: u16 = 0x20;
pub const MASTER_DATA: u16 = 0x21;
pub const SLAVE_COMMAND: u16 = 0xA0;
pub const SLAVE_DATA: u16 = 0xA1;

pub const IRQ_BASE: u8 = 0x20;
pub const KEYBOARD_IRQ: u8 = 1;

const END_OF_INTERRUPT: u8 = 0x20;

/// (port, value) writes performed by init(), in order.
pub const INIT_SEQUENCE: [(u16, u8); 10] = [
    // ICW1: edge triggered, cascade, ICW4 follows
    (MASTER_COMMAND, 0x11),
    (SLAVE_COMMAND, 0x11),
    // ICW2: vector offsets
    (MASTER_DATA, IRQ_BASE),
    (SLAVE_DATA, IRQ_BASE + 8),
    // ICW3: slave on IRQ2
    (MASTER_DATA, 0x04),
    (SLAVE_DATA, 0x02),
    // ICW4: 8086 mode
    (MASTER_DATA, 0x01),
    (SLAVE_DATA, 0x01),
    // masks: only IRQ1
    (MASTER_DATA, !(1 << KEYBOARD_IRQ)),
    (SLAVE_DATA, 0xFF),
];

pub const fn irq_vector(irq: u8) -> u8 {
    IRQ_BASE + irq
}

#[cfg(target_os = "none")]
pub fn init() {
    use crate::arch::cpu;

    for (port, value) in INIT_SEQUENCE {
        unsafe { cpu::outb(port, value) };
        cpu::io_wait();
    }
    crate::logging::info("arch::pic::init: IRQs remapped, keyboard unmasked");
}

#[cfg(target_os = "none")]
pub fn end_of_interrupt(irq: u8) {
    use crate::arch::cpu;

    unsafe {
        if irq >= 8 {
            cpu::outb(SLAVE_COMMAND, END_OF_INTERRUPT);
        }
        cpu::outb(MASTER_COMMAND, END_OF_INTERRUPT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::trap::KEYBOARD_VECTOR;

    #[test]
    fn keyboard_irq_maps_to_its_vector() {
        assert_eq!(irq_vector(KEYBOARD_IRQ) as u32, KEYBOARD_VECTOR);
    }

    #[test]
    fn only_the_keyboard_is_unmasked() {
        let masks: std::vec::Vec<(u16, u8)> = INIT_SEQUENCE[8..].to_vec();
        assert_eq!(masks, [(MASTER_DATA, 0xFD), (SLAVE_DATA, 0xFF)]);
    }

    #[test]
    fn remap_clears_the_exception_range() {
        assert_eq!(INIT_SEQUENCE[2], (MASTER_DATA, 0x20));
        assert_eq!(INIT_SEQUENCE[3], (SLAVE_DATA, 0x28));
        assert!(IRQ_BASE as u32 >= crate::kernel::trap::EXCEPTION_VECTORS);
    }
}
