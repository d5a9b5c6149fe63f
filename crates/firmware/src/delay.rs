// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use embedded_hal::delay::DelayNs;

/// Loop turns per millisecond on the reference soft core.
pub const DEFAULT_LOOPS_PER_MS: u32 = 2000;

/// Calibrated spin loop. Accuracy depends entirely on the core clock and
/// the compiler output; good enough for debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinDelay {
    loops_per_ms: u32,
}

impl SpinDelay {
    pub const fn new(loops_per_ms: u32) -> Self {
        Self { loops_per_ms }
    }

    pub const fn loops_per_ms(&self) -> u32 {
        self.loops_per_ms
    }

    #[inline(never)]
    fn spin(&self, turns: u64) {
        for _ in 0..turns {
            core::hint::spin_loop();
        }
    }
}

impl Default for SpinDelay {
    fn default() -> Self {
        Self::new(DEFAULT_LOOPS_PER_MS)
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let turns = u64::from(ns) * u64::from(self.loops_per_ms) / 1_000_000;
        self.spin(turns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.spin(u64::from(ms) * u64::from(self.loops_per_ms));
    }
}
