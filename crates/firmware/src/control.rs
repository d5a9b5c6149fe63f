// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Foreground control loop.
//!
//! Each [`Controller::step`] samples the switches and buttons once, handles
//! at most one button press (load takes priority over pause), and refreshes
//! the display from the switch value it sampled.

use embedded_hal::delay::DelayNs;

use crate::display::{self, PAUSE_DIGITS};
use crate::input::{self, LOAD_KEY, PAUSE_KEY};
use crate::juart;
use crate::message::Notification;
use crate::regs::{BoardMap, RegisterAccess};
use crate::timer::{self, Period, TIMER_CONVERSION};

/// How long to poll for a button release before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseWait {
    /// Poll until the button comes up, however long that takes.
    #[default]
    Forever,
    /// Give up after this many polls.
    AtMost(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Released on poll number `polls` (1-based).
    Released { polls: u32 },
    TimedOut { polls: u32 },
}

impl WaitOutcome {
    pub fn is_released(self) -> bool {
        matches!(self, WaitOutcome::Released { .. })
    }
}

/// Loop timing constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Wait after a press is seen, before acting on it.
    pub settle_ms: u32,
    /// Wait after the button has been released.
    pub release_ms: u32,
    pub default_period: Period,
    pub ticks_per_ms: u32,
    pub release_wait: ReleaseWait,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_ms: 50,
            release_ms: 100,
            default_period: Period::DEFAULT,
            ticks_per_ms: TIMER_CONVERSION,
            release_wait: ReleaseWait::Forever,
        }
    }
}

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Idle,
    Loaded(Period),
    /// Load pressed with all switches down.
    LoadIgnored,
    Paused,
    Resumed,
}

pub struct Controller<R, D> {
    regs: R,
    delay: D,
    map: BoardMap,
    timing: Timing,
    period: Period,
    paused: bool,
    last_wait: Option<WaitOutcome>,
}

impl<R: RegisterAccess, D: DelayNs> Controller<R, D> {
    pub fn new(regs: R, delay: D, map: BoardMap, timing: Timing) -> Self {
        Self {
            regs,
            delay,
            map,
            period: timing.default_period,
            timing,
            paused: false,
            last_wait: None,
        }
    }

    /// Stop the timer and start it again with the default period.
    pub fn init(&mut self) {
        timer::stop(&mut self.regs, self.map.timer);
        timer::program_period(
            &mut self.regs,
            self.map.timer,
            self.period,
            self.timing.ticks_per_ms,
        );
        fw_info!(period_ms = self.period.as_ms(), "controller initialised");
    }

    pub fn step(&mut self) -> Event {
        let value = input::read_switches(&mut self.regs, &self.map);
        let keys = input::read_buttons(&mut self.regs, &self.map);

        let event = if keys.load_pressed() {
            self.delay.delay_ms(self.timing.settle_ms);
            let event = match Period::from_switches(value) {
                Some(period) => {
                    self.load(period);
                    Event::Loaded(period)
                }
                None => {
                    fw_warn!("load pressed with zero period, ignored");
                    Event::LoadIgnored
                }
            };
            self.finish_press(LOAD_KEY);
            event
        } else if keys.pause_pressed() {
            self.delay.delay_ms(self.timing.settle_ms);
            self.paused = !self.paused;
            if self.paused {
                timer::stop(&mut self.regs, self.map.timer);
            } else {
                timer::start(&mut self.regs, self.map.timer);
            }
            display::write_digits(&mut self.regs, &self.map, &PAUSE_DIGITS);
            self.finish_press(PAUSE_KEY);
            fw_debug!(paused = self.paused, "pause toggled");
            if self.paused {
                Event::Paused
            } else {
                Event::Resumed
            }
        } else {
            Event::Idle
        };

        let digits = display::encode_value(value);
        if !self.paused {
            display::write_digits(&mut self.regs, &self.map, &digits);
        }
        event
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// Poll the buttons until every bit of `key` reads released.
    pub fn wait_release(&mut self, key: u8) -> WaitOutcome {
        let mut polls = 0u32;
        loop {
            polls = polls.saturating_add(1);
            let keys = input::read_buttons(&mut self.regs, &self.map);
            if keys.0 & key == key {
                return WaitOutcome::Released { polls };
            }
            if let ReleaseWait::AtMost(limit) = self.timing.release_wait {
                if polls >= limit {
                    fw_warn!(key, polls, "button still held, giving up");
                    return WaitOutcome::TimedOut { polls };
                }
            }
        }
    }

    fn load(&mut self, period: Period) {
        self.period = period;
        timer::stop(&mut self.regs, self.map.timer);
        let note = Notification::new(period.as_ms());
        juart::write_string(&mut self.regs, self.map.jtag_uart, note.as_bytes_with_nul());
        timer::program_period(
            &mut self.regs,
            self.map.timer,
            period,
            self.timing.ticks_per_ms,
        );
        fw_info!(period_ms = period.as_ms(), "new period loaded");
    }

    fn finish_press(&mut self, key: u8) {
        let outcome = self.wait_release(key);
        self.last_wait = Some(outcome);
        self.delay.delay_ms(self.timing.release_ms);
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Outcome of the most recent release wait, if any press was handled.
    pub fn last_wait(&self) -> Option<WaitOutcome> {
        self.last_wait
    }

    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn into_parts(self) -> (R, D) {
        (self.regs, self.delay)
    }
}
