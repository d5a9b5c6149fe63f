// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use blinkwire_firmware::display::{decode_pattern, BLANK};
use blinkwire_firmware::{Digits, PAUSE_DIGITS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BoardSnapshot {
    pub cycles: u64,
    pub elapsed_ms: u64,
    pub switches: u32,
    pub buttons: u32,
    pub leds: u32,
    pub led_toggles: u64,
    pub display: DisplaySnapshot,
    pub timer: TimerSnapshot,
    pub uart_tx_bytes: u64,
    pub interrupts_serviced: u64,
    pub faults: usize,
    pub peripherals: BTreeMap<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DisplaySnapshot {
    pub hex_high: u32,
    pub hex_low: u32,
    pub digits: Digits,
    /// Human-readable rendering, e.g. `"000250"` or `" PAUSE"`.
    pub text: String,
}

impl DisplaySnapshot {
    pub fn new(hex_high: u32, hex_low: u32) -> Self {
        let digits = unpack_digits(hex_high, hex_low);
        Self {
            hex_high,
            hex_low,
            digits,
            text: display_text(&digits),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub running: bool,
    pub period_ticks: u32,
    pub timeouts: u64,
}

/// Inverse of the two-word packing used by the display driver.
pub fn unpack_digits(hex_high: u32, hex_low: u32) -> Digits {
    let b = |word: u32, shift: u32| ((word >> shift) & 0xFF) as u8;
    [
        b(hex_high, 16),
        b(hex_high, 8),
        b(hex_high, 0),
        b(hex_low, 16),
        b(hex_low, 8),
        b(hex_low, 0),
    ]
}

const PAUSE_TEXT: &[u8; 6] = b" PAUSE";

pub fn display_text(digits: &Digits) -> String {
    if *digits == PAUSE_DIGITS {
        return String::from_utf8_lossy(PAUSE_TEXT).into_owned();
    }
    digits
        .iter()
        .map(|&p| {
            if p == BLANK {
                ' '
            } else if let Some(v) = decode_pattern(p) {
                char::from_digit(u32::from(v), 16).unwrap_or('?')
            } else {
                PAUSE_DIGITS
                    .iter()
                    .position(|&q| q == p)
                    .map(|i| char::from(PAUSE_TEXT[i]))
                    .unwrap_or('?')
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blinkwire_firmware::display::encode_value;

    #[test]
    fn test_display_text_value() {
        let d = encode_value(250);
        let high = (u32::from(d[0]) << 16) | (u32::from(d[1]) << 8) | u32::from(d[2]);
        let low = (u32::from(d[3]) << 16) | (u32::from(d[4]) << 8) | u32::from(d[5]);
        let snap = DisplaySnapshot::new(high, low);
        assert_eq!(snap.digits, d);
        assert_eq!(snap.text, "000250");
    }

    #[test]
    fn test_display_text_pause() {
        let snap = DisplaySnapshot::new(0x00FF_0C08, 0x0041_1206);
        assert_eq!(snap.text, " PAUSE");
    }

    #[test]
    fn test_display_text_unknown_glyph() {
        assert_eq!(display_text(&[0x7F, 0x40, 0xFF, 0x0C, 0x88, 0x40]), "?0 Pa0");
    }
}
