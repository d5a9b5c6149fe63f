// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use blinkwire_firmware::timer::Control;

const STATUS: u64 = 0x00;
const CONTROL: u64 = 0x04;
const PERIODL: u64 = 0x08;
const PERIODH: u64 = 0x0C;
const SNAPL: u64 = 0x10;
const SNAPH: u64 = 0x14;

/// Timeout flag.
pub const STATUS_TO: u32 = 0x1;
/// Counter running.
pub const STATUS_RUN: u32 = 0x2;

/// 32-bit down-counting interval timer with an interrupt on timeout.
///
/// The counter reloads from the period registers, so a timeout happens every
/// `period + 1` cycles. Writing either period register stops the counter.
#[derive(Debug, serde::Serialize)]
pub struct IntervalTimer {
    period: u32,
    /// Control bits that are latched (ITO, CONT).
    control: u32,
    timeout: bool,
    running: bool,
    /// Cycles until the counter next reaches zero.
    remaining: u64,
    snap: u32,
    timeouts: u64,
}

impl Default for IntervalTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self {
            period: 0,
            control: 0,
            timeout: false,
            running: false,
            remaining: 1,
            snap: 0,
            timeouts: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    fn irq_level(&self) -> bool {
        self.timeout && (self.control & Control::ITO.bits()) != 0
    }

    fn full_count(&self) -> u64 {
        u64::from(self.period) + 1
    }

    fn counter(&self) -> u32 {
        // `remaining` is at most period + 1.
        (self.remaining.saturating_sub(1)) as u32
    }

    fn read_reg(&self, offset: u64) -> u32 {
        match offset {
            STATUS => {
                let mut s = 0;
                if self.timeout {
                    s |= STATUS_TO;
                }
                if self.running {
                    s |= STATUS_RUN;
                }
                s
            }
            CONTROL => self.control,
            PERIODL => self.period & 0xFFFF,
            PERIODH => self.period >> 16,
            SNAPL => self.snap & 0xFFFF,
            SNAPH => self.snap >> 16,
            _ => 0,
        }
    }

    fn write_reg(&mut self, offset: u64, value: u32) {
        match offset {
            // Any write clears TO.
            STATUS => self.timeout = false,
            CONTROL => {
                let bits = Control::from_bits_truncate(value);
                self.control = (bits & (Control::ITO | Control::CONT)).bits();
                if bits.contains(Control::STOP) {
                    self.running = false;
                } else if bits.contains(Control::START) {
                    self.running = true;
                }
            }
            PERIODL => {
                self.period = (self.period & 0xFFFF_0000) | (value & 0xFFFF);
                self.reload_stopped();
            }
            PERIODH => {
                self.period = (self.period & 0x0000_FFFF) | ((value & 0xFFFF) << 16);
                self.reload_stopped();
            }
            SNAPL | SNAPH => self.snap = self.counter(),
            _ => {}
        }
    }

    fn reload_stopped(&mut self) {
        self.running = false;
        self.remaining = self.full_count();
    }
}

impl crate::Peripheral for IntervalTimer {
    fn read(&self, offset: u64) -> SimResult<u32> {
        Ok(self.read_reg(offset))
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        self.write_reg(offset, value);
        Ok(())
    }

    fn tick(&mut self, cycles: u64) -> crate::PeripheralTickResult {
        let mut left = cycles;
        while self.running && left >= self.remaining {
            left -= self.remaining;
            self.timeout = true;
            self.timeouts += 1;
            self.remaining = self.full_count();
            if self.control & Control::CONT.bits() == 0 {
                self.running = false;
            }
        }
        if self.running {
            self.remaining -= left;
        }

        crate::PeripheralTickResult {
            irq: self.irq_level(),
        }
    }

    fn cycles_until_event(&self) -> Option<u64> {
        self.running.then_some(self.remaining)
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Peripheral;

    fn programmed(period: u32, control: u32) -> IntervalTimer {
        let mut tim = IntervalTimer::new();
        tim.write(PERIODH, period >> 16).unwrap();
        tim.write(PERIODL, period & 0xFFFF).unwrap();
        tim.write(CONTROL, control).unwrap();
        tim
    }

    #[test]
    fn test_timeout_after_period_plus_one() {
        let mut tim = programmed(9, 0x7);
        assert!(!tim.tick(9).irq);
        assert!(tim.tick(1).irq);
        assert_eq!(tim.read(STATUS).unwrap(), STATUS_TO | STATUS_RUN);
        assert_eq!(tim.timeouts(), 1);
    }

    #[test]
    fn test_status_write_clears_timeout() {
        let mut tim = programmed(4, 0x7);
        assert!(tim.tick(5).irq);
        tim.write(STATUS, 0b10).unwrap();
        assert!(!tim.tick(0).irq);
        assert_eq!(tim.read(STATUS).unwrap(), STATUS_RUN);
    }

    #[test]
    fn test_continuous_reload() {
        let mut tim = programmed(99, 0x7);
        tim.tick(1000);
        assert_eq!(tim.timeouts(), 10);
        assert!(tim.is_running());
        assert_eq!(tim.cycles_until_event(), Some(100));
    }

    #[test]
    fn test_one_shot_stops() {
        let mut tim = programmed(9, 0x5); // ITO | START, no CONT
        tim.tick(25);
        assert_eq!(tim.timeouts(), 1);
        assert!(!tim.is_running());
        assert_eq!(tim.cycles_until_event(), None);
    }

    #[test]
    fn test_stop_and_period_write_halt_counter() {
        let mut tim = programmed(9, 0x7);
        tim.write(CONTROL, 0x8).unwrap();
        assert!(!tim.is_running());
        assert!(!tim.tick(100).irq);

        tim.write(CONTROL, 0x7).unwrap();
        tim.tick(3);
        tim.write(PERIODL, 20).unwrap();
        assert!(!tim.is_running());
        assert_eq!(tim.read(PERIODL).unwrap(), 20);
    }

    #[test]
    fn test_irq_masked_without_ito() {
        let mut tim = programmed(1, 0x6);
        assert!(!tim.tick(2).irq);
        assert_eq!(tim.read(STATUS).unwrap() & STATUS_TO, STATUS_TO);
    }

    #[test]
    fn test_period_registers_split() {
        let tim = programmed(5_000_000, 0x8);
        assert_eq!(tim.read(PERIODH).unwrap(), 5_000_000 >> 16);
        assert_eq!(tim.read(PERIODL).unwrap(), 5_000_000 & 0xFFFF);
        assert_eq!(tim.period(), 5_000_000);
    }
}
