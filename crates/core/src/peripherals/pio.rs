// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Parallel I/O ports. Only the data register (offset 0) is modelled.

use crate::SimResult;

fn width_mask(width: u32) -> u32 {
    match width {
        0 => 0,
        w if w >= 32 => u32::MAX,
        w => (1u32 << w) - 1,
    }
}

/// Input-only port driven by the outside world (switches, push-buttons).
#[derive(Debug, serde::Serialize)]
pub struct PioInput {
    mask: u32,
    value: u32,
}

impl PioInput {
    pub fn new(width: u32, idle: u32) -> Self {
        let mask = width_mask(width);
        Self {
            mask,
            value: idle & mask,
        }
    }

    pub fn input(&self) -> u32 {
        self.value
    }

    pub fn set_input(&mut self, value: u32) {
        self.value = value & self.mask;
    }

    pub fn set_bits(&mut self, bits: u32) {
        self.set_input(self.value | bits);
    }

    pub fn clear_bits(&mut self, bits: u32) {
        self.set_input(self.value & !bits);
    }
}

impl crate::Peripheral for PioInput {
    fn read(&self, offset: u64) -> SimResult<u32> {
        match offset {
            0x00 => Ok(self.value),
            _ => Ok(0),
        }
    }

    fn write(&mut self, _offset: u64, _value: u32) -> SimResult<()> {
        // Input ports ignore writes.
        Ok(())
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

/// Output-only latch (LEDs, seven-segment banks).
#[derive(Debug, Default, serde::Serialize)]
pub struct PioOutput {
    mask: u32,
    value: u32,
    writes: u64,
    /// Writes that changed the latched value.
    changes: u64,
}

impl PioOutput {
    pub fn new(width: u32) -> Self {
        Self {
            mask: width_mask(width),
            ..Default::default()
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn changes(&self) -> u64 {
        self.changes
    }
}

impl crate::Peripheral for PioOutput {
    fn read(&self, offset: u64) -> SimResult<u32> {
        match offset {
            0x00 => Ok(self.value),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        if offset == 0x00 {
            let value = value & self.mask;
            self.writes += 1;
            if value != self.value {
                self.changes += 1;
                self.value = value;
            }
        }
        Ok(())
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
    use super::{PioInput, PioOutput};
    use crate::Peripheral;

    #[test]
    fn test_input_masks_to_width() {
        let mut sw = PioInput::new(10, 0);
        sw.set_input(0xFFFF);
        assert_eq!(sw.read(0).unwrap(), 0x3FF);

        let mut keys = PioInput::new(4, 0xF);
        keys.clear_bits(0x2);
        assert_eq!(keys.read(0).unwrap(), 0xD);
        keys.set_bits(0x2);
        assert_eq!(keys.read(0).unwrap(), 0xF);
    }

    #[test]
    fn test_input_ignores_writes() {
        let mut keys = PioInput::new(4, 0xF);
        keys.write(0, 0).unwrap();
        assert_eq!(keys.input(), 0xF);
    }

    #[test]
    fn test_output_counts_changes() {
        let mut leds = PioOutput::new(10);
        leds.write(0, 0x1).unwrap();
        leds.write(0, 0x1).unwrap();
        leds.write(0, 0x2).unwrap();
        leds.write(0x4, 0x3).unwrap();
        assert_eq!(leds.value(), 0x2);
        assert_eq!(leds.writes(), 3);
        assert_eq!(leds.changes(), 2);
    }

    #[test]
    fn test_full_width_output() {
        let mut hex = PioOutput::new(32);
        hex.write(0, 0xFFFF_FFFF).unwrap();
        assert_eq!(hex.read(0).unwrap(), 0xFFFF_FFFF);
    }
}
