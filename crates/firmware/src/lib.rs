// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Control loop for the BlinkWire board.
//!
//! The operator picks a blink period on the slide switches, commits it with
//! the load button and toggles a pause state with the pause button. The
//! interval timer interrupt flips two LEDs at the loaded period, the
//! seven-segment display shows the pending value (or `PAUSE`) and every newly
//! loaded period is announced on the JTAG UART.
//!
//! All hardware access goes through [`RegisterAccess`], so the same code runs
//! against real memory-mapped registers ([`regs::Mmio`]) and against the
//! hosted board model in `blinkwire-core`.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod control;
pub mod delay;
pub mod display;
pub mod input;
pub mod isr;
pub mod juart;
pub mod message;
pub mod regs;
pub mod timer;

#[cfg(test)]
mod testutil;

pub use control::{Controller, Event, ReleaseWait, Timing, WaitOutcome};
pub use delay::SpinDelay;
pub use display::{Digits, PAUSE_DIGITS};
pub use input::Keys;
pub use isr::{InterruptHandler, LedBlinker, TimerIsr};
pub use message::Notification;
pub use regs::{BoardMap, RegisterAccess};
pub use timer::Period;
