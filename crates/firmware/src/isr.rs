// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Interval timer interrupt: acknowledges the timeout and flips two LEDs.
//!
//! The handler owns the LED register and the pattern byte. It never touches
//! controller state, so the foreground loop and the interrupt share nothing.

use core::ffi::c_void;

use crate::regs::RegisterAccess;
use crate::timer;

pub const INITIAL_PATTERN: u8 = 0x01;
pub const TOGGLE_MASK: u8 = 0x03;

/// Something the interrupt dispatcher can call.
pub trait InterruptHandler {
    fn on_interrupt(&mut self, regs: &mut dyn RegisterAccess);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedBlinker {
    pattern: u8,
    timer_base: u32,
    led_base: u32,
}

impl LedBlinker {
    pub fn new(timer_base: u32, led_base: u32) -> Self {
        Self {
            pattern: INITIAL_PATTERN,
            timer_base,
            led_base,
        }
    }

    /// Pattern most recently written to the LEDs (or the initial one).
    pub fn pattern(&self) -> u8 {
        self.pattern
    }

    pub fn service<R: RegisterAccess + ?Sized>(&mut self, regs: &mut R) {
        timer::acknowledge(regs, self.timer_base);
        self.pattern ^= TOGGLE_MASK;
        regs.write(self.led_base, u32::from(self.pattern));
    }
}

impl InterruptHandler for LedBlinker {
    fn on_interrupt(&mut self, regs: &mut dyn RegisterAccess) {
        self.service(regs);
    }
}

/// A blinker bundled with its own register handle, for platforms that
/// register an ISR with a context pointer.
pub struct TimerIsr<R> {
    pub blinker: LedBlinker,
    pub regs: R,
}

impl<R: RegisterAccess> TimerIsr<R> {
    pub fn new(blinker: LedBlinker, regs: R) -> Self {
        Self { blinker, regs }
    }

    #[inline]
    pub fn handle(&mut self) {
        self.blinker.service(&mut self.regs);
    }
}

/// C-ABI trampoline for interrupt controllers that pass back a context
/// pointer.
///
/// # Safety
///
/// `context` must point to a live `TimerIsr<R>` that nothing else accesses
/// while the interrupt runs.
pub unsafe extern "C" fn isr_entry<R: RegisterAccess>(context: *mut c_void) {
    // SAFETY: Upheld by the caller per the contract above.
    let isr = unsafe { &mut *context.cast::<TimerIsr<R>>() };
    isr.handle();
}
