// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Seven-segment encoding and the six-digit output driver.
//!
//! Segments are active low and bit 7 is unused, so `0xFF` turns a digit
//! completely off.

use crate::regs::{BoardMap, RegisterAccess};

/// Six digit patterns, index 0 is the leftmost digit on the board.
pub type Digits = [u8; 6];

/// Pattern for a digit with every segment off.
pub const BLANK: u8 = 0xFF;

/// Active-low patterns for 0-9 and a-f.
const SSEG_HEX_TABLE: [u8; 16] = [
    0x40, 0x79, 0x24, 0x30, 0x19, 0x92, 0x02, 0x78, 0x00, 0x10, // 0-9
    0x88, 0x03, 0x46, 0x21, 0x06, 0x0E, // a-f
];

const SEG_P: u8 = 0x0C;
const SEG_A: u8 = 0x08;
const SEG_U: u8 = 0x41;
const SEG_S: u8 = 0x12;
const SEG_E: u8 = 0x06;

/// " PAUSE" across the six digits.
pub const PAUSE_DIGITS: Digits = [BLANK, SEG_P, SEG_A, SEG_U, SEG_S, SEG_E];

/// Segment pattern for a hex digit. Anything above 15 is blank.
#[inline]
pub fn digit_pattern(value: u32) -> u8 {
    SSEG_HEX_TABLE
        .get(value as usize)
        .copied()
        .unwrap_or(BLANK)
}

/// Reverse lookup of [`digit_pattern`] for the sixteen hex glyphs.
pub fn decode_pattern(pattern: u8) -> Option<u8> {
    SSEG_HEX_TABLE
        .iter()
        .position(|&p| p == pattern)
        .map(|i| i as u8)
}

/// Encode `value` as four decimal digits behind two zero digits.
///
/// Only four digits are driven by the application; the two leftmost slots
/// always show `0`. The thousands slot is `value / 1000`, so values past
/// 9999 show a hex glyph or a blank there.
pub fn encode_value(value: u16) -> Digits {
    let mut rest = u32::from(value);
    let ones = rest % 10;
    rest /= 10;
    let tens = rest % 10;
    rest /= 10;
    let hundreds = rest % 10;
    rest /= 10;
    let thousands = rest;

    [
        digit_pattern(0),
        digit_pattern(0),
        digit_pattern(thousands),
        digit_pattern(hundreds),
        digit_pattern(tens),
        digit_pattern(ones),
    ]
}

/// Pack three patterns into one 24-bit register word, first digit in the
/// most significant byte.
#[inline]
pub fn pack(digits: &[u8; 3]) -> u32 {
    digits
        .iter()
        .fold(0u32, |word, &d| (word << 8) | u32::from(d))
}

/// Drive all six digits: `digits[0..3]` to `hex_high`, `digits[3..6]` to
/// `hex_low`.
pub fn write_digits<R: RegisterAccess + ?Sized>(regs: &mut R, map: &BoardMap, digits: &Digits) {
    let [d0, d1, d2, d3, d4, d5] = *digits;
    regs.write(map.hex_high, pack(&[d0, d1, d2]));
    regs.write(map.hex_low, pack(&[d3, d4, d5]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingRegs, MAP};

    #[test]
    fn test_digit_pattern_table() {
        let expected = [
            0x40, 0x79, 0x24, 0x30, 0x19, 0x92, 0x02, 0x78, 0x00, 0x10, 0x88, 0x03, 0x46, 0x21,
            0x06, 0x0E,
        ];
        for (v, &p) in expected.iter().enumerate() {
            assert_eq!(digit_pattern(v as u32), p, "digit {}", v);
        }
    }

    #[test]
    fn test_digit_pattern_out_of_range_is_blank() {
        for v in [16, 17, 100, 255, u32::MAX] {
            assert_eq!(digit_pattern(v), BLANK);
        }
    }

    #[test]
    fn test_encode_value_decodes_back() {
        for v in 0..=9999u16 {
            let d = encode_value(v);
            assert_eq!(d[0], digit_pattern(0));
            assert_eq!(d[1], digit_pattern(0));
            let digits: Vec<u16> = d[2..]
                .iter()
                .map(|&p| u16::from(decode_pattern(p).unwrap()))
                .collect();
            assert!(digits.iter().all(|&x| x < 10));
            let back = digits.iter().fold(0u16, |acc, &x| acc * 10 + x);
            assert_eq!(back, v);
        }
    }

    #[test]
    fn test_encode_value_250() {
        assert_eq!(encode_value(250), [0x40, 0x40, 0x40, 0x24, 0x92, 0x40]);
    }

    #[test]
    fn test_encode_value_above_four_digits() {
        // 12345 / 1000 = 12 -> 'c' glyph
        assert_eq!(encode_value(12345)[2], 0x46);
        // 65535 / 1000 = 65 -> blank
        assert_eq!(encode_value(u16::MAX)[2], BLANK);
    }

    #[test]
    fn test_decode_pattern_rejects_unknown() {
        assert_eq!(decode_pattern(BLANK), None);
        assert_eq!(decode_pattern(SEG_P), None);
        assert_eq!(decode_pattern(0x40), Some(0));
    }

    #[test]
    fn test_write_digits_packs_two_words() {
        let mut regs = RecordingRegs::new();
        let digits = encode_value(1023);
        write_digits(&mut regs, &MAP, &digits);

        assert_eq!(regs.writes.len(), 2);
        let high = (u32::from(digits[0]) << 16) | (u32::from(digits[1]) << 8) | u32::from(digits[2]);
        let low = (u32::from(digits[3]) << 16) | (u32::from(digits[4]) << 8) | u32::from(digits[5]);
        assert_eq!(regs.writes[0], (MAP.hex_high, high));
        assert_eq!(regs.writes[1], (MAP.hex_low, low));
    }

    #[test]
    fn test_pause_digits_packing() {
        let mut regs = RecordingRegs::new();
        write_digits(&mut regs, &MAP, &PAUSE_DIGITS);
        assert_eq!(regs.writes_to(MAP.hex_high), vec![0x00FF_0C08]);
        assert_eq!(regs.writes_to(MAP.hex_low), vec![0x0041_1206]);
    }
}
