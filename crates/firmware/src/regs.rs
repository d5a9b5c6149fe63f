// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Register access seam.
//!
//! Peripherals on the board are Avalon-style slaves: register `n` of a
//! peripheral lives at `base + 4 * n` and is always accessed as a full
//! 32-bit word.

/// Word-wide register access at absolute byte addresses.
pub trait RegisterAccess {
    fn read(&mut self, addr: u32) -> u32;
    fn write(&mut self, addr: u32, value: u32);
}

impl<R: RegisterAccess + ?Sized> RegisterAccess for &mut R {
    #[inline]
    fn read(&mut self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    #[inline]
    fn write(&mut self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }
}

/// Byte address of word register `offset` of the peripheral at `base`.
#[inline]
pub const fn reg_addr(base: u32, offset: u32) -> u32 {
    base + offset * 4
}

/// Base addresses of the board peripherals.
///
/// The numbers come from the board configuration; the firmware treats them
/// as opaque handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardMap {
    /// Slide switches, 10 valid bits.
    pub switches: u32,
    /// Push-buttons, 4 valid bits, active low.
    pub buttons: u32,
    /// Rightmost three seven-segment digits (HEX2..HEX0).
    pub hex_low: u32,
    /// Leftmost three seven-segment digits (HEX5..HEX3).
    pub hex_high: u32,
    pub leds: u32,
    pub timer: u32,
    pub jtag_uart: u32,
}

impl BoardMap {
    /// Platform Designer addresses of the DE10-Lite blinker system.
    pub const DE10_LITE: BoardMap = BoardMap {
        switches: 0x0001_1050,
        buttons: 0x0001_1060,
        hex_low: 0x0001_1070,
        hex_high: 0x0001_1080,
        leds: 0x0001_1040,
        timer: 0x0001_1020,
        jtag_uart: 0x0001_1000,
    };
}

/// Interrupt controller id and line of the interval timer on the DE10-Lite.
pub const DE10_LITE_TIMER_IC: u32 = 0;
pub const DE10_LITE_TIMER_IRQ: u32 = 1;

/// Volatile access to real memory-mapped registers.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Every address later passed to [`RegisterAccess`] must be a valid,
    /// word-aligned peripheral register on the running target.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for Mmio {
    #[inline]
    fn read(&mut self, addr: u32) -> u32 {
        // SAFETY: Address validity is guaranteed by the contract of `Mmio::new`.
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    #[inline]
    fn write(&mut self, addr: u32, value: u32) {
        // SAFETY: Address validity is guaranteed by the contract of `Mmio::new`.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}
