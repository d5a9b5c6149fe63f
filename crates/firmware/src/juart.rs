// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Busy-wait transmitter for the JTAG UART.

use crate::regs::{reg_addr, RegisterAccess};

pub const DATA_REG: u32 = 0;
pub const CTRL_REG: u32 = 1;

/// Free slots in the write FIFO live in the upper half of the control word.
pub const WSPACE_MASK: u32 = 0xFFFF_0000;
pub const WSPACE_SHIFT: u32 = 16;
pub const CHAR_MASK: u32 = 0xFF;

#[inline]
pub fn write_space<R: RegisterAccess + ?Sized>(regs: &mut R, base: u32) -> u32 {
    (regs.read(reg_addr(base, CTRL_REG)) & WSPACE_MASK) >> WSPACE_SHIFT
}

/// Send `bytes` up to the first NUL or the end of the slice.
///
/// Blocks on each character until the FIFO reports room. Returns the number
/// of bytes written to the data register.
pub fn write_string<R: RegisterAccess + ?Sized>(regs: &mut R, base: u32, bytes: &[u8]) -> usize {
    let mut sent = 0;
    for &byte in bytes.iter().take_while(|&&b| b != 0) {
        while write_space(regs, base) == 0 {}
        regs.write(reg_addr(base, DATA_REG), u32::from(byte) & CHAR_MASK);
        sent += 1;
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingRegs, MAP};

    #[test]
    fn test_stops_at_nul() {
        let mut regs = RecordingRegs::idle_board();
        let sent = write_string(&mut regs, MAP.jtag_uart, b"hi\0ignored");
        assert_eq!(sent, 2);
        assert_eq!(regs.writes_to(MAP.jtag_uart), vec![u32::from(b'h'), u32::from(b'i')]);
    }

    #[test]
    fn test_runs_to_end_without_nul() {
        let mut regs = RecordingRegs::idle_board();
        assert_eq!(write_string(&mut regs, MAP.jtag_uart, b"abc"), 3);
    }

    #[test]
    fn test_empty_input_touches_nothing() {
        let mut regs = RecordingRegs::idle_board();
        assert_eq!(write_string(&mut regs, MAP.jtag_uart, b""), 0);
        assert!(regs.writes.is_empty());
        assert!(regs.reads.is_empty());
    }

    #[test]
    fn test_waits_for_write_space() {
        let mut regs = RecordingRegs::new();
        let ctrl = reg_addr(MAP.jtag_uart, CTRL_REG);
        // Full twice, then one free slot; the low bits are ignored.
        regs.script(ctrl, &[0x0000_0401, 0x0000_0000, 0x0001_0000]);
        assert_eq!(write_string(&mut regs, MAP.jtag_uart, b"x"), 1);
        assert_eq!(regs.reads_of(ctrl), 3);
        assert_eq!(regs.writes_to(MAP.jtag_uart), vec![u32::from(b'x')]);
    }
}
