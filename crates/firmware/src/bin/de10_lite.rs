// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_std]
#![no_main]

use core::ffi::c_void;
use panic_halt as _;

use blinkwire_firmware::isr::isr_entry;
use blinkwire_firmware::regs::{Mmio, DE10_LITE_TIMER_IC, DE10_LITE_TIMER_IRQ};
use blinkwire_firmware::{BoardMap, Controller, LedBlinker, SpinDelay, TimerIsr, Timing};

type IsrHandler = unsafe extern "C" fn(*mut c_void);

extern "C" {
    // Interrupt registration from the board support package.
    fn alt_ic_isr_register(
        ic_id: u32,
        irq: u32,
        isr: Option<IsrHandler>,
        context: *mut c_void,
        flags: *mut c_void,
    ) -> i32;
}

/// Called by the board support package's startup code.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let map = BoardMap::DE10_LITE;
    // SAFETY: Every address in `DE10_LITE` is a register of this system.
    let regs = unsafe { Mmio::new() };

    let mut controller = Controller::new(regs, SpinDelay::default(), map, Timing::default());
    controller.init();

    let mut isr = TimerIsr::new(LedBlinker::new(map.timer, map.leds), regs);
    let context = (&mut isr as *mut TimerIsr<Mmio>).cast::<c_void>();
    // SAFETY: `isr` lives in this frame, which never returns, and is not
    // touched again outside the interrupt.
    let status = unsafe {
        alt_ic_isr_register(
            DE10_LITE_TIMER_IC,
            DE10_LITE_TIMER_IRQ,
            Some(isr_entry::<Mmio>),
            context,
            core::ptr::null_mut(),
        )
    };
    // Without the handler the LEDs stay dark; switches, buttons and the
    // display keep working.
    let _ = status;

    controller.run()
}
