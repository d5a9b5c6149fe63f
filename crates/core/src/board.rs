// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Board = bus + cycle clock + operator input + interrupt dispatch.
//!
//! Time only moves when the firmware touches a register or asks for a
//! delay. Delays are split at every timer expiry and every scheduled
//! stimulus so that interrupts are serviced, and inputs change, on the exact
//! cycle they are due.

use crate::bus::SystemBus;
use crate::peripherals::interval_timer::IntervalTimer;
use crate::peripherals::jtag_uart::JtagUart;
use crate::peripherals::pio::{PioInput, PioOutput};
use crate::snapshot::{unpack_digits, BoardSnapshot, DisplaySnapshot, TimerSnapshot};
use crate::stimulus::{Stimulus, StimulusQueue};
use crate::{SimResult, SimulationError};
use blinkwire_config::{BoardDescriptor, Button};
use blinkwire_firmware::{BoardMap, Digits, InterruptHandler, RegisterAccess};
use embedded_hal::delay::DelayNs;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// Clock cycles charged for one firmware register access.
pub const DEFAULT_ACCESS_CYCLES: u64 = 10;

/// Resolve every firmware role to the base address of its peripheral.
pub fn board_map(board: &BoardDescriptor) -> SimResult<BoardMap> {
    let base = |role: &str| -> SimResult<u32> {
        let addr = board
            .bound_base(role)
            .ok_or_else(|| SimulationError::MissingBinding(role.to_string()))?;
        u32::try_from(addr).map_err(|_| SimulationError::MemoryViolation(addr))
    };
    Ok(BoardMap {
        switches: base("switches")?,
        buttons: base("buttons")?,
        hex_low: base("hex_low")?,
        hex_high: base("hex_high")?,
        leds: base("leds")?,
        timer: base("timer")?,
        jtag_uart: base("jtag_uart")?,
    })
}

pub struct Board {
    pub bus: SystemBus,
    map: BoardMap,
    clock_hz: u64,
    cycles: u64,
    access_cycles: u64,
    stimuli: StimulusQueue,
    isr: Option<Box<dyn InterruptHandler>>,
    isr_irq: Option<u32>,
    interrupts_serviced: u64,
    stuck_irq_reported: bool,
}

impl Board {
    pub fn new(bus: SystemBus, map: BoardMap, clock_hz: u64) -> Self {
        Self {
            bus,
            map,
            clock_hz: clock_hz.max(1),
            cycles: 0,
            access_cycles: DEFAULT_ACCESS_CYCLES,
            stimuli: StimulusQueue::new(),
            isr: None,
            isr_irq: None,
            interrupts_serviced: 0,
            stuck_irq_reported: false,
        }
    }

    pub fn from_config(board: &BoardDescriptor) -> anyhow::Result<Self> {
        let bus = SystemBus::from_config(board)?;
        let map = board_map(board)?;
        Ok(Self::new(bus, map, board.clock_hz))
    }

    /// At least one cycle, or an idle firmware loop would never see time pass.
    pub fn set_access_cycles(&mut self, cycles: u64) {
        self.access_cycles = cycles.max(1);
    }

    /// Route interrupt line `irq` to `handler`.
    pub fn attach_isr(&mut self, irq: u32, handler: Box<dyn InterruptHandler>) {
        self.isr_irq = Some(irq);
        self.isr = Some(handler);
    }

    pub fn schedule(&mut self, stimuli: StimulusQueue) {
        self.stimuli = stimuli;
    }

    pub fn push_stimulus(&mut self, at_cycle: u64, stimulus: Stimulus) {
        self.stimuli.push(at_cycle, stimulus);
    }

    pub fn map(&self) -> &BoardMap {
        &self.map
    }

    pub fn clock_hz(&self) -> u64 {
        self.clock_hz
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.cycles.saturating_mul(1000) / self.clock_hz
    }

    pub fn ms_to_cycles(&self, ms: u64) -> u64 {
        ms.saturating_mul(self.clock_hz) / 1000
    }

    pub fn interrupts_serviced(&self) -> u64 {
        self.interrupts_serviced
    }

    /// IRQ line of the peripheral mapped at `base`.
    pub fn irq_of(&self, base: u32) -> Option<u32> {
        let base = u64::from(base);
        self.bus
            .peripherals
            .iter()
            .find(|p| p.base == base)
            .and_then(|p| p.irq)
    }

    /// Firmware-side register read: the access, then its cycle cost.
    pub fn firmware_read(&mut self, addr: u32) -> u32 {
        let value = self.bus.read(addr);
        self.advance(self.access_cycles);
        value
    }

    pub fn firmware_write(&mut self, addr: u32, value: u32) {
        self.bus.write(addr, value);
        self.advance(self.access_cycles);
    }

    pub fn delay_ns(&mut self, ns: u64) {
        let cycles = (u128::from(ns) * u128::from(self.clock_hz) / 1_000_000_000) as u64;
        self.advance(cycles);
    }

    /// Run the clock forward by `cycles`.
    pub fn advance(&mut self, cycles: u64) {
        let target = self.cycles.saturating_add(cycles);
        loop {
            self.apply_due_stimuli();
            if self.cycles >= target {
                break;
            }

            let mut step = target - self.cycles;
            if let Some(n) = self.bus.cycles_until_event() {
                step = step.min(n.max(1));
            }
            if let Some(at) = self.stimuli.next_at() {
                if at > self.cycles {
                    step = step.min(at - self.cycles);
                }
            }

            let irqs = self.bus.tick_peripherals(step);
            self.cycles += step;
            self.service(&irqs);
        }
    }

    fn apply_due_stimuli(&mut self) {
        while let Some(due) = self.stimuli.pop_due(self.cycles) {
            tracing::debug!(
                "t={}ms stimulus {:?}",
                self.elapsed_ms(),
                due.stimulus
            );
            self.apply(due.stimulus);
        }
    }

    pub fn apply(&mut self, stimulus: Stimulus) {
        match stimulus {
            Stimulus::SetSwitches(v) => self.set_switches(v),
            Stimulus::Press(b) => self.press(b),
            Stimulus::Release(b) => self.release(b),
        }
    }

    pub fn set_switches(&mut self, value: u16) {
        let base = u64::from(self.map.switches);
        match self.bus.device_mut::<PioInput>(base) {
            Some(sw) => sw.set_input(u32::from(value)),
            None => tracing::warn!("No input port at {:#x} for switches", base),
        }
    }

    /// Buttons are active low.
    pub fn press(&mut self, button: Button) {
        let base = u64::from(self.map.buttons);
        match self.bus.device_mut::<PioInput>(base) {
            Some(keys) => keys.clear_bits(button.mask()),
            None => tracing::warn!("No input port at {:#x} for buttons", base),
        }
    }

    pub fn release(&mut self, button: Button) {
        let base = u64::from(self.map.buttons);
        match self.bus.device_mut::<PioInput>(base) {
            Some(keys) => keys.set_bits(button.mask()),
            None => tracing::warn!("No input port at {:#x} for buttons", base),
        }
    }

    fn service(&mut self, irqs: &[u32]) {
        let Some(irq) = self.isr_irq else {
            return;
        };
        if !irqs.contains(&irq) {
            return;
        }
        let Some(handler) = self.isr.as_mut() else {
            return;
        };

        handler.on_interrupt(&mut self.bus);
        self.interrupts_serviced += 1;

        if self.bus.tick_peripherals(0).contains(&irq) && !self.stuck_irq_reported {
            self.stuck_irq_reported = true;
            tracing::warn!("IRQ {} still asserted after its handler returned", irq);
        }
    }

    fn output(&self, base: u32) -> Option<&PioOutput> {
        self.bus.device::<PioOutput>(u64::from(base))
    }

    pub fn leds(&self) -> u32 {
        self.output(self.map.leds).map(PioOutput::value).unwrap_or(0)
    }

    pub fn led_toggles(&self) -> u64 {
        self.output(self.map.leds).map(PioOutput::changes).unwrap_or(0)
    }

    pub fn display_words(&self) -> (u32, u32) {
        let word = |base| self.output(base).map(PioOutput::value).unwrap_or(0);
        (word(self.map.hex_high), word(self.map.hex_low))
    }

    pub fn display_digits(&self) -> Digits {
        let (high, low) = self.display_words();
        unpack_digits(high, low)
    }

    pub fn timer(&self) -> Option<&IntervalTimer> {
        self.bus.device::<IntervalTimer>(u64::from(self.map.timer))
    }

    pub fn uart(&self) -> Option<&JtagUart> {
        self.bus.device::<JtagUart>(u64::from(self.map.jtag_uart))
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let input = |base: u32| {
            self.bus
                .device::<PioInput>(u64::from(base))
                .map(PioInput::input)
                .unwrap_or(0)
        };
        let (hex_high, hex_low) = self.display_words();
        let timer = self.timer();
        BoardSnapshot {
            cycles: self.cycles,
            elapsed_ms: self.elapsed_ms(),
            switches: input(self.map.switches),
            buttons: input(self.map.buttons),
            leds: self.leds(),
            led_toggles: self.led_toggles(),
            display: DisplaySnapshot::new(hex_high, hex_low),
            timer: TimerSnapshot {
                running: timer.map(IntervalTimer::is_running).unwrap_or(false),
                period_ticks: timer.map(IntervalTimer::period).unwrap_or(0),
                timeouts: timer.map(IntervalTimer::timeouts).unwrap_or(0),
            },
            uart_tx_bytes: self.uart().map(JtagUart::tx_bytes).unwrap_or(0),
            interrupts_serviced: self.interrupts_serviced,
            faults: self.bus.faults.len(),
            peripherals: self.bus.peripheral_snapshots().into_iter().collect(),
        }
    }
}

/// Shared handle on a [`Board`], usable as both the register and the delay
/// seam of the firmware controller.
#[derive(Clone)]
pub struct SimHandle(Rc<RefCell<Board>>);

impl SimHandle {
    pub fn new(board: Board) -> Self {
        Self(Rc::new(RefCell::new(board)))
    }

    pub fn board(&self) -> Ref<'_, Board> {
        self.0.borrow()
    }

    pub fn board_mut(&self) -> RefMut<'_, Board> {
        self.0.borrow_mut()
    }
}

impl RegisterAccess for SimHandle {
    fn read(&mut self, addr: u32) -> u32 {
        self.0.borrow_mut().firmware_read(addr)
    }

    fn write(&mut self, addr: u32, value: u32) {
        self.0.borrow_mut().firmware_write(addr, value)
    }
}

impl DelayNs for SimHandle {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().delay_ns(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.0.borrow_mut().delay_ns(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().delay_ns(u64::from(ms) * 1_000_000);
    }
}
