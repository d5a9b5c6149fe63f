// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Interval timer driver.
//!
//! The timer counts down a 32-bit period split across two 16-bit
//! registers. Control writes are commands: `START` and `STOP` act on the
//! write itself and are not latched.

use crate::input::SWITCH_MASK;
use crate::regs::{reg_addr, RegisterAccess};

pub const STATUS_REG: u32 = 0;
pub const CONTROL_REG: u32 = 1;
pub const PERIODL_REG: u32 = 2;
pub const PERIODH_REG: u32 = 3;

/// Timer ticks per millisecond at the 50 MHz system clock.
pub const TIMER_CONVERSION: u32 = 50_000;

/// Status value that clears the timeout flag.
pub const STATUS_CLEAR_TO: u32 = 0b10;

bitflags::bitflags! {
    /// Control register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control: u32 {
        const ITO = 0x1;
        const CONT = 0x2;
        const START = 0x4;
        const STOP = 0x8;
    }
}

impl Control {
    /// Interrupt on timeout, reload continuously, start counting.
    pub const RUN: Control = Control::ITO.union(Control::CONT).union(Control::START);
}

/// Blink period in milliseconds, never zero and never wider than the switch
/// bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(u16);

impl Period {
    pub const DEFAULT: Period = Period(100);
    pub const MAX: Period = Period(SWITCH_MASK as u16);

    /// Accepts the raw switch value; `None` for zero.
    pub fn from_switches(value: u16) -> Option<Period> {
        match value & SWITCH_MASK as u16 {
            0 => None,
            v => Some(Period(v)),
        }
    }

    /// Like [`Period::from_switches`] but for configuration values, which
    /// are rejected instead of masked when out of range.
    pub const fn new(ms: u16) -> Option<Period> {
        if ms == 0 || ms > SWITCH_MASK as u16 {
            None
        } else {
            Some(Period(ms))
        }
    }

    #[inline]
    pub const fn as_ms(self) -> u16 {
        self.0
    }

    /// Timer count for this period.
    #[inline]
    pub const fn ticks(self, ticks_per_ms: u32) -> u32 {
        (self.0 as u32).wrapping_mul(ticks_per_ms)
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::DEFAULT
    }
}

impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ms", self.0)
    }
}

/// Load the period registers (high half first) and start the timer.
pub fn program_period<R: RegisterAccess + ?Sized>(
    regs: &mut R,
    base: u32,
    period: Period,
    ticks_per_ms: u32,
) {
    let count = period.ticks(ticks_per_ms);
    regs.write(reg_addr(base, PERIODH_REG), count >> 16);
    regs.write(reg_addr(base, PERIODL_REG), count & 0xFFFF);
    regs.write(reg_addr(base, CONTROL_REG), Control::RUN.bits());
}

#[inline]
pub fn stop<R: RegisterAccess + ?Sized>(regs: &mut R, base: u32) {
    regs.write(reg_addr(base, CONTROL_REG), Control::STOP.bits());
}

#[inline]
pub fn start<R: RegisterAccess + ?Sized>(regs: &mut R, base: u32) {
    regs.write(reg_addr(base, CONTROL_REG), Control::RUN.bits());
}

#[inline]
pub fn acknowledge<R: RegisterAccess + ?Sized>(regs: &mut R, base: u32) {
    regs.write(reg_addr(base, STATUS_REG), STATUS_CLEAR_TO);
}
