// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

// Thin shims over `tracing` so that target builds carry no logging code.

macro_rules! fw_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::debug!($($arg)*);
        }
    }};
}

macro_rules! fw_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::info!($($arg)*);
        }
    }};
}

macro_rules! fw_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::warn!($($arg)*);
        }
    }};
}
