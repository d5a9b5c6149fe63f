// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::regs::{BoardMap, RegisterAccess};
use std::collections::{HashMap, VecDeque};

pub const MAP: BoardMap = BoardMap {
    switches: 0x0000_1000,
    buttons: 0x0000_1010,
    hex_low: 0x0000_1020,
    hex_high: 0x0000_1030,
    leds: 0x0000_1040,
    timer: 0x0000_2000,
    jtag_uart: 0x0000_3000,
};

/// Register file that records every write.
///
/// Reads return the last written value unless a script was queued for the
/// address; scripted values are consumed one per read and the final one
/// sticks.
#[derive(Debug, Default)]
pub struct RecordingRegs {
    mem: HashMap<u32, u32>,
    scripts: HashMap<u32, VecDeque<u32>>,
    pub writes: Vec<(u32, u32)>,
    pub reads: Vec<u32>,
}

impl RecordingRegs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers wired like an idle board: no buttons held, UART has room.
    pub fn idle_board() -> Self {
        let mut regs = Self::new();
        regs.set(MAP.buttons, 0xF);
        regs.set(MAP.jtag_uart + 4, 0x0040_0000);
        regs
    }

    pub fn set(&mut self, addr: u32, value: u32) {
        self.mem.insert(addr, value);
    }

    pub fn script(&mut self, addr: u32, values: &[u32]) {
        self.scripts.insert(addr, values.iter().copied().collect());
    }

    pub fn writes_to(&self, addr: u32) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn reads_of(&self, addr: u32) -> usize {
        self.reads.iter().filter(|a| **a == addr).count()
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.reads.clear();
    }
}

impl RegisterAccess for RecordingRegs {
    fn read(&mut self, addr: u32) -> u32 {
        self.reads.push(addr);
        if let Some(queue) = self.scripts.get_mut(&addr) {
            if queue.len() > 1 {
                return queue.pop_front().unwrap();
            }
            if let Some(last) = queue.front() {
                return *last;
            }
        }
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    fn write(&mut self, addr: u32, value: u32) {
        self.writes.push((addr, value));
        self.mem.insert(addr, value);
    }
}

/// Delay that records the requested durations instead of waiting.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub ms: Vec<u32>,
    pub ns: Vec<u32>,
}

impl embedded_hal::delay::DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ns.push(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ms.push(ms);
    }
}
