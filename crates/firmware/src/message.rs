// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Fixed-layout text announcing a newly loaded period.

/// Text in front of the digits.
pub const PREFIX: &[u8] = b"New Period:";
/// Text after the digits.
pub const SUFFIX: &[u8] = b" ms\n\r";
/// Buffer size including the trailing NUL.
pub const NOTIFICATION_LEN: usize = 23;

const PAD_AT: usize = PREFIX.len();
const DIGITS_AT: usize = PAD_AT + 2;
const SUFFIX_AT: usize = DIGITS_AT + 4;
const NUL_AT: usize = SUFFIX_AT + SUFFIX.len();

/// `"New Period:00dddd ms\n\r\0"`.
///
/// The two `'0'` characters mirror the two fixed zero digits on the display.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    buf: [u8; NOTIFICATION_LEN],
}

impl Notification {
    pub fn new(value: u16) -> Self {
        let mut buf = [0u8; NOTIFICATION_LEN];
        buf[..PAD_AT].copy_from_slice(PREFIX);
        buf[PAD_AT] = b'0';
        buf[PAD_AT + 1] = b'0';

        let mut rest = value;
        for slot in buf[DIGITS_AT + 1..SUFFIX_AT].iter_mut().rev() {
            *slot = (rest % 10) as u8 + b'0';
            rest /= 10;
        }
        // Thousands keep whatever is left, like the display does.
        buf[DIGITS_AT] = rest as u8 + b'0';

        buf[SUFFIX_AT..NUL_AT].copy_from_slice(SUFFIX);
        buf[NUL_AT] = 0;
        Self { buf }
    }

    /// Text without the NUL sentinel.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..NUL_AT]
    }

    #[inline]
    pub fn as_bytes_with_nul(&self) -> &[u8; NOTIFICATION_LEN] {
        &self.buf
    }
}

impl core::fmt::Debug for Notification {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Notification(\"{}\")", self.as_bytes().escape_ascii())
    }
}

pub fn encode_notification(value: u16) -> Notification {
    Notification::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_250() {
        let n = encode_notification(250);
        assert_eq!(n.as_bytes(), b"New Period:000250 ms\n\r");
        assert_eq!(n.as_bytes_with_nul().len(), NOTIFICATION_LEN);
        assert_eq!(n.as_bytes_with_nul()[22], 0);
    }

    #[test]
    fn test_fixed_positions() {
        for v in 0..=9999u16 {
            let n = Notification::new(v);
            let b = n.as_bytes_with_nul();
            assert_eq!(&b[..11], PREFIX);
            assert_eq!(&b[11..13], b"00");
            assert_eq!(&b[17..22], SUFFIX);
            assert_eq!(b[22], 0);
            let text = core::str::from_utf8(&b[13..17]).unwrap();
            assert_eq!(text.parse::<u16>().unwrap(), v);
        }
    }

    #[test]
    fn test_no_interior_nul() {
        let n = Notification::new(7);
        assert!(!n.as_bytes().contains(&0));
    }

    #[test]
    fn test_large_value_thousands_slot() {
        // 12345 / 1000 = 12, written as '0' + 12
        let n = Notification::new(12345);
        assert_eq!(n.as_bytes()[13], b'0' + 12);
        assert_eq!(&n.as_bytes()[14..17], b"345");
    }

    #[test]
    fn test_debug_is_escaped() {
        let s = format!("{:?}", Notification::new(5));
        assert!(s.contains("New Period:000005 ms\\n\\r"));
    }
}
