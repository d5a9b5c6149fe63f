// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

const DATA: u64 = 0x00;
const CONTROL: u64 = 0x04;

/// Interrupt enable bits kept in the low half of the control register.
const CONTROL_WRITABLE: u32 = 0x0000_0003;

pub const DEFAULT_FIFO_DEPTH: u32 = 64;
/// About 10 us per character at 50 MHz.
pub const DEFAULT_DRAIN_CYCLES: u64 = 500;

/// Transmit side of a JTAG UART.
///
/// Characters written to the data register enter a FIFO that the host
/// drains at a fixed rate. Free FIFO slots are reported in bits 31:16 of the
/// control register; a write to a full FIFO is lost.
#[derive(Debug, serde::Serialize)]
pub struct JtagUart {
    fifo_depth: u32,
    drain_cycles: u64,
    fifo_len: u32,
    drain_progress: u64,
    control: u32,
    tx_bytes: u64,
    dropped: u64,
    #[serde(skip)]
    sink: Option<Arc<Mutex<Vec<u8>>>>,
    echo_stdout: bool,
}

impl Default for JtagUart {
    fn default() -> Self {
        Self::new(DEFAULT_FIFO_DEPTH, DEFAULT_DRAIN_CYCLES)
    }
}

impl JtagUart {
    pub fn new(fifo_depth: u32, drain_cycles: u64) -> Self {
        Self {
            fifo_depth: fifo_depth.clamp(1, 0xFFFF),
            drain_cycles,
            fifo_len: 0,
            drain_progress: 0,
            control: 0,
            tx_bytes: 0,
            dropped: 0,
            sink: None,
            echo_stdout: true,
        }
    }

    pub fn set_sink(&mut self, sink: Option<Arc<Mutex<Vec<u8>>>>, echo_stdout: bool) {
        self.sink = sink;
        self.echo_stdout = echo_stdout;
    }

    pub fn write_space(&self) -> u32 {
        self.fifo_depth - self.fifo_len
    }

    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn push_tx(&mut self, value: u8) {
        if self.write_space() == 0 {
            self.dropped += 1;
            tracing::warn!("JTAG UART FIFO full, dropping {:#04x}", value);
            return;
        }
        self.fifo_len += 1;
        self.tx_bytes += 1;
        if self.drain_cycles == 0 {
            self.fifo_len = 0;
        }

        if let Some(sink) = &self.sink {
            if let Ok(mut guard) = sink.lock() {
                guard.push(value);
            }
        }

        if self.echo_stdout {
            #[allow(unused_must_use)]
            {
                print!("{}", value as char);
                io::stdout().flush();
            }
        }
    }
}

impl crate::Peripheral for JtagUart {
    fn read(&self, offset: u64) -> SimResult<u32> {
        match offset {
            // Nothing is ever received: RVALID stays clear.
            DATA => Ok(0),
            CONTROL => Ok((self.write_space() << 16) | self.control),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset {
            DATA => self.push_tx((value & 0xFF) as u8),
            CONTROL => self.control = value & CONTROL_WRITABLE,
            _ => {}
        }
        Ok(())
    }

    fn tick(&mut self, cycles: u64) -> crate::PeripheralTickResult {
        if self.fifo_len > 0 && self.drain_cycles > 0 {
            self.drain_progress += cycles;
            let drained = (self.drain_progress / self.drain_cycles).min(u64::from(self.fifo_len));
            self.fifo_len -= drained as u32;
            self.drain_progress -= drained * self.drain_cycles;
            if self.fifo_len == 0 {
                self.drain_progress = 0;
            }
        }
        crate::PeripheralTickResult::default()
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
    use super::JtagUart;
    use crate::Peripheral;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_transmit_reaches_sink() {
        let mut uart = JtagUart::new(8, 10);
        let sink = Arc::new(Mutex::new(Vec::new()));
        uart.set_sink(Some(sink.clone()), false);

        uart.write(0x00, u32::from(b'O')).unwrap();
        uart.write(0x00, 0x100 | u32::from(b'K')).unwrap();

        let data = sink.lock().unwrap().clone();
        assert_eq!(data, b"OK".to_vec());
        assert_eq!(uart.tx_bytes(), 2);
    }

    #[test]
    fn test_write_space_in_upper_half() {
        let mut uart = JtagUart::new(4, 10);
        uart.set_sink(None, false);
        assert_eq!(uart.read(0x04).unwrap() >> 16, 4);
        uart.write(0x00, u32::from(b'a')).unwrap();
        assert_eq!(uart.read(0x04).unwrap() >> 16, 3);
    }

    #[test]
    fn test_full_fifo_drops_and_drains() {
        let mut uart = JtagUart::new(2, 10);
        uart.set_sink(None, false);
        for b in b"xyz" {
            uart.write(0x00, u32::from(*b)).unwrap();
        }
        assert_eq!(uart.write_space(), 0);
        assert_eq!(uart.dropped(), 1);

        uart.tick(9);
        assert_eq!(uart.write_space(), 0);
        uart.tick(1);
        assert_eq!(uart.write_space(), 1);
        uart.tick(100);
        assert_eq!(uart.write_space(), 2);
    }

    #[test]
    fn test_control_keeps_enable_bits_only() {
        let mut uart = JtagUart::new(64, 0);
        uart.set_sink(None, false);
        uart.write(0x04, 0xFFFF_FFFF).unwrap();
        assert_eq!(uart.read(0x04).unwrap(), (64 << 16) | 0x3);
    }

    #[test]
    fn test_zero_drain_is_instant() {
        let mut uart = JtagUart::new(1, 0);
        uart.set_sink(None, false);
        uart.write(0x00, u32::from(b'a')).unwrap();
        uart.write(0x00, u32::from(b'b')).unwrap();
        assert_eq!(uart.dropped(), 0);
        assert_eq!(uart.write_space(), 1);
    }
}
