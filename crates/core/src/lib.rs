// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Hosted model of the BlinkWire board.
//!
//! The firmware crate runs unmodified against a [`board::Board`]: every
//! register access goes through the [`bus::SystemBus`], costs a fixed number
//! of clock cycles and gives the interval timer a chance to raise its
//! interrupt, which is then serviced before the next access.

pub mod board;
pub mod bus;
pub mod peripherals;
pub mod runner;
pub mod snapshot;
pub mod stimulus;

use std::any::Any;


pub use board::{Board, SimHandle};
pub use runner::{RunOptions, RunReport, RunStatus, ScenarioRunner};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Misaligned word access at {0:#x}")]
    MisalignedAccess(u64),
    #[error("Unknown peripheral type '{kind}' for '{id}'")]
    UnknownPeripheralType { id: String, kind: String },
    #[error("Binding '{0}' does not resolve to a peripheral")]
    MissingBinding(String),
}

pub type SimResult<T> = Result<T, SimulationError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeripheralTickResult {
    /// Interrupt line level after the tick.
    pub irq: bool,
}

/// Trait representing a memory-mapped peripheral with 32-bit registers.
pub trait Peripheral: std::fmt::Debug {
    fn read(&self, offset: u64) -> SimResult<u32>;
    fn write(&mut self, offset: u64, value: u32) -> SimResult<()>;

    /// Advance the peripheral by `cycles` clock cycles.
    fn tick(&mut self, _cycles: u64) -> PeripheralTickResult {
        PeripheralTickResult::default()
    }

    /// Cycles until the peripheral next changes state on its own, if ever.
    fn cycles_until_event(&self) -> Option<u64> {
        None
    }

    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
