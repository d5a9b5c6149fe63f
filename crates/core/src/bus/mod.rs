// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::interval_timer::IntervalTimer;
use crate::peripherals::jtag_uart::{JtagUart, DEFAULT_DRAIN_CYCLES, DEFAULT_FIFO_DEPTH};
use crate::peripherals::pio::{PioInput, PioOutput};
use crate::{Peripheral, SimResult, SimulationError};
use blinkwire_config::{BoardDescriptor, PeripheralKind};
use blinkwire_firmware::RegisterAccess;
use std::sync::{Arc, Mutex};

pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub irq: Option<u32>,
    pub dev: Box<dyn Peripheral>,
}

/// A register access that hit no peripheral.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BusFault {
    pub addr: u64,
    pub write: bool,
    pub value: Option<u32>,
    pub error: String,
}

#[derive(Default)]
pub struct SystemBus {
    pub peripherals: Vec<PeripheralEntry>,
    pub faults: Vec<BusFault>,
}

impl SystemBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(board: &BoardDescriptor) -> anyhow::Result<Self> {
        let mut bus = Self::new();

        for p_cfg in &board.peripherals {
            let Some(kind) = p_cfg.kind() else {
                return Err(SimulationError::UnknownPeripheralType {
                    id: p_cfg.id.clone(),
                    kind: p_cfg.r#type.clone(),
                }
                .into());
            };

            let width = p_cfg.config_u64("width").unwrap_or(32) as u32;
            let dev: Box<dyn Peripheral> = match kind {
                PeripheralKind::PioIn => {
                    let idle = p_cfg.config_u64("idle").unwrap_or(0) as u32;
                    Box::new(PioInput::new(width, idle))
                }
                PeripheralKind::PioOut => Box::new(PioOutput::new(width)),
                PeripheralKind::IntervalTimer => Box::new(IntervalTimer::new()),
                PeripheralKind::JtagUart => {
                    let depth = p_cfg
                        .config_u64("fifo_depth")
                        .map(|d| d as u32)
                        .unwrap_or(DEFAULT_FIFO_DEPTH);
                    let drain = p_cfg
                        .config_u64("drain_cycles")
                        .unwrap_or(DEFAULT_DRAIN_CYCLES);
                    Box::new(JtagUart::new(depth, drain))
                }
            };

            tracing::debug!(
                "Mapped {} ({}) at {:#x}",
                p_cfg.id,
                kind.as_str(),
                p_cfg.base_address
            );
            bus.peripherals.push(PeripheralEntry {
                name: p_cfg.id.clone(),
                base: p_cfg.base_address,
                size: kind.window_size(),
                irq: p_cfg.irq,
                dev,
            });
        }

        Ok(bus)
    }

    /// Attach a UART TX capture sink to any JTAG UART on this bus.
    ///
    /// When `echo_stdout` is false, UART writes will no longer be printed to stdout.
    pub fn attach_uart_tx_sink(&mut self, sink: Arc<Mutex<Vec<u8>>>, echo_stdout: bool) {
        for p in &mut self.peripherals {
            let Some(any) = p.dev.as_any_mut() else {
                continue;
            };
            let Some(uart) = any.downcast_mut::<JtagUart>() else {
                continue;
            };
            uart.set_sink(Some(sink.clone()), echo_stdout);
        }
    }

    fn entry_at(&self, addr: u64) -> Option<&PeripheralEntry> {
        self.peripherals
            .iter()
            .find(|p| addr >= p.base && addr < p.base + p.size)
    }

    fn entry_at_mut(&mut self, addr: u64) -> Option<&mut PeripheralEntry> {
        self.peripherals
            .iter_mut()
            .find(|p| addr >= p.base && addr < p.base + p.size)
    }

    /// Concrete model of the peripheral mapped at `base`.
    pub fn device<T: 'static>(&self, base: u64) -> Option<&T> {
        self.entry_at(base)?.dev.as_any()?.downcast_ref::<T>()
    }

    pub fn device_mut<T: 'static>(&mut self, base: u64) -> Option<&mut T> {
        self.entry_at_mut(base)?.dev.as_any_mut()?.downcast_mut::<T>()
    }

    pub fn read_u32(&self, addr: u64) -> SimResult<u32> {
        if addr % 4 != 0 {
            return Err(SimulationError::MisalignedAccess(addr));
        }
        match self.entry_at(addr) {
            Some(p) => p.dev.read(addr - p.base),
            None => Err(SimulationError::MemoryViolation(addr)),
        }
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        if addr % 4 != 0 {
            return Err(SimulationError::MisalignedAccess(addr));
        }
        match self.entry_at_mut(addr) {
            Some(p) => p.dev.write(addr - p.base, value),
            None => Err(SimulationError::MemoryViolation(addr)),
        }
    }

    /// Advance every peripheral by `cycles`; returns the IRQ lines that are
    /// asserted afterwards.
    pub fn tick_peripherals(&mut self, cycles: u64) -> Vec<u32> {
        let mut interrupts = Vec::new();
        for p in &mut self.peripherals {
            let res = p.dev.tick(cycles);
            if res.irq {
                if let Some(irq) = p.irq {
                    interrupts.push(irq);
                }
            }
        }
        interrupts
    }

    /// Cycles until the earliest self-timed peripheral event.
    pub fn cycles_until_event(&self) -> Option<u64> {
        self.peripherals
            .iter()
            .filter_map(|p| p.dev.cycles_until_event())
            .min()
    }

    pub fn peripheral_snapshots(&self) -> Vec<(String, serde_json::Value)> {
        self.peripherals
            .iter()
            .map(|p| (p.name.clone(), p.dev.snapshot()))
            .collect()
    }

    fn record_fault(&mut self, addr: u64, value: Option<u32>, err: SimulationError) {
        tracing::error!("Bus fault: {}", err);
        self.faults.push(BusFault {
            addr,
            write: value.is_some(),
            value,
            error: err.to_string(),
        });
    }
}

/// Firmware-facing view of the bus. Faults are recorded, reads of unmapped
/// addresses return 0.
impl RegisterAccess for SystemBus {
    fn read(&mut self, addr: u32) -> u32 {
        match self.read_u32(u64::from(addr)) {
            Ok(v) => v,
            Err(e) => {
                self.record_fault(u64::from(addr), None, e);
                0
            }
        }
    }

    fn write(&mut self, addr: u32, value: u32) {
        if let Err(e) = self.write_u32(u64::from(addr), value) {
            self.record_fault(u64::from(addr), Some(value), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blinkwire_config::default_board;

    #[test]
    fn test_system_bus_from_default_board() {
        let board = default_board().unwrap();
        let bus = SystemBus::from_config(&board).expect("Failed to create bus from config");
        assert_eq!(bus.peripherals.len(), 7);

        let timer = bus
            .peripherals
            .iter()
            .find(|p| p.name == "interval_timer")
            .expect("timer not found");
        assert_eq!(timer.base, 0x0001_1020);
        assert_eq!(timer.irq, Some(1));

        // Idle push-buttons read high.
        assert_eq!(bus.read_u32(0x0001_1060).unwrap(), 0xF);
        assert!(bus.device::<IntervalTimer>(0x0001_1020).is_some());
        assert!(bus.device::<PioInput>(0x0001_1020).is_none());
    }

    #[test]
    fn test_unmapped_access_is_recorded() {
        let mut bus = SystemBus::from_config(&default_board().unwrap()).unwrap();
        assert_eq!(RegisterAccess::read(&mut bus, 0xDEAD_0000), 0);
        RegisterAccess::write(&mut bus, 0xDEAD_0004, 7);
        assert_eq!(bus.faults.len(), 2);
        assert!(!bus.faults[0].write);
        assert_eq!(bus.faults[1].value, Some(7));
    }

    #[test]
    fn test_misaligned_access_rejected() {
        let bus = SystemBus::from_config(&default_board().unwrap()).unwrap();
        assert!(matches!(
            bus.read_u32(0x0001_1062),
            Err(SimulationError::MisalignedAccess(0x0001_1062))
        ));
    }

    #[test]
    fn test_uart_sink_attached() {
        let mut bus = SystemBus::from_config(&default_board().unwrap()).unwrap();
        let sink = Arc::new(Mutex::new(Vec::new()));
        bus.attach_uart_tx_sink(sink.clone(), false);
        bus.write_u32(0x0001_1000, u32::from(b'Z')).unwrap();
        assert_eq!(sink.lock().unwrap().as_slice(), b"Z");
    }
}
