// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::regs::{BoardMap, RegisterAccess};

pub const SWITCH_MASK: u32 = 0x3FF;
pub const BUTTON_MASK: u32 = 0xF;

pub const PAUSE_KEY: u8 = 0x01;
pub const LOAD_KEY: u8 = 0x02;

/// Raw button levels. A cleared bit means the button is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keys(pub u8);

impl Keys {
    #[inline]
    pub fn load_pressed(self) -> bool {
        self.0 & LOAD_KEY == 0
    }

    #[inline]
    pub fn pause_pressed(self) -> bool {
        self.0 & PAUSE_KEY == 0
    }
}

#[inline]
pub fn read_switches<R: RegisterAccess + ?Sized>(regs: &mut R, map: &BoardMap) -> u16 {
    (regs.read(map.switches) & SWITCH_MASK) as u16
}

#[inline]
pub fn read_buttons<R: RegisterAccess + ?Sized>(regs: &mut R, map: &BoardMap) -> Keys {
    Keys((regs.read(map.buttons) & BUTTON_MASK) as u8)
}
